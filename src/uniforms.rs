//! Names of every uniform the host writes, and the tables each program is
//! checked against when it is built.

use crate::lighting::MAX_POINT_LIGHTS;
use crate::shader::{UniformDescriptor, UniformKind};

pub const CAMERA_VIEW: &str = "camera.view";
pub const CAMERA_PROJECTION: &str = "camera.projection";
pub const CAMERA_POSITION: &str = "camera.position";

pub const TRANSFORM_MODEL: &str = "transform.model";
pub const TRANSFORM_NORMAL: &str = "transform.normal";

pub const MATERIAL_AMBIENT: &str = "material.ambient";
pub const MATERIAL_DIFFUSE: &str = "material.diffuse";
pub const MATERIAL_SPECULAR: &str = "material.specular";
pub const MATERIAL_SHININESS: &str = "material.shininess";

pub const DIRECTIONAL: &str = "lights.directional";
pub const SPOT: &str = "lights.spot";
pub const POINT_COUNT: &str = "lights.point_count";
pub const SPOT_ENABLED: &str = "lights.spot_enabled";

pub const LAMP_COLOR: &str = "lamp.color";

/// `lights.points[index]`
pub fn point_light(index: usize) -> String {
    format!("lights.points[{index}]")
}

/// Joins a light prefix and one of its fields, e.g. `lights.spot.cut_off`.
pub fn field(prefix: &str, name: &str) -> String {
    format!("{prefix}.{name}")
}

fn light_fields(prefix: &str, out: &mut Vec<UniformDescriptor>) {
    for name in ["ambient", "diffuse", "specular"] {
        out.push(UniformDescriptor::new(field(prefix, name), UniformKind::Vec3));
    }
    out.push(UniformDescriptor::new(
        field(prefix, "ambient_strength"),
        UniformKind::Float,
    ));
}

fn camera_and_transform(out: &mut Vec<UniformDescriptor>) {
    out.push(UniformDescriptor::new(CAMERA_VIEW, UniformKind::Mat4));
    out.push(UniformDescriptor::new(CAMERA_PROJECTION, UniformKind::Mat4));
    out.push(UniformDescriptor::new(TRANSFORM_MODEL, UniformKind::Mat4));
}

/// Everything the lit pyramid draw writes.
pub fn lighting_program() -> Vec<UniformDescriptor> {
    let mut table = Vec::new();
    camera_and_transform(&mut table);
    table.push(UniformDescriptor::new(CAMERA_POSITION, UniformKind::Vec3));
    table.push(UniformDescriptor::new(TRANSFORM_NORMAL, UniformKind::Mat4));

    for name in [MATERIAL_AMBIENT, MATERIAL_DIFFUSE, MATERIAL_SPECULAR] {
        table.push(UniformDescriptor::new(name, UniformKind::Vec3));
    }
    table.push(UniformDescriptor::new(MATERIAL_SHININESS, UniformKind::Float));

    light_fields(DIRECTIONAL, &mut table);
    table.push(UniformDescriptor::new(
        field(DIRECTIONAL, "direction"),
        UniformKind::Vec3,
    ));

    for index in 0..MAX_POINT_LIGHTS {
        let prefix = point_light(index);
        light_fields(&prefix, &mut table);
        table.push(UniformDescriptor::new(field(&prefix, "position"), UniformKind::Vec3));
        table.push(UniformDescriptor::new(
            field(&prefix, "attenuation"),
            UniformKind::Vec3,
        ));
    }

    light_fields(SPOT, &mut table);
    for name in ["position", "direction", "attenuation"] {
        table.push(UniformDescriptor::new(field(SPOT, name), UniformKind::Vec3));
    }
    for name in ["cut_off", "outer_cut_off"] {
        table.push(UniformDescriptor::new(field(SPOT, name), UniformKind::Float));
    }

    table.push(UniformDescriptor::new(POINT_COUNT, UniformKind::Int));
    table.push(UniformDescriptor::new(SPOT_ENABLED, UniformKind::Int));
    table
}

/// Everything the lamp marker draw writes.
pub fn lamp_program() -> Vec<UniformDescriptor> {
    let mut table = Vec::new();
    camera_and_transform(&mut table);
    table.push(UniformDescriptor::new(LAMP_COLOR, UniformKind::Vec3));
    table
}
