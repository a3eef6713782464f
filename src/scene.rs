use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Vec3};
use roxmltree::{Document, Node};

use crate::camera::{self, Camera};
use crate::input::{KeyBindings, KeyCode};
use crate::lighting::{
    Attenuation, DirectionalLight, LightColors, LightRig, Material, PointLight, SpotLight,
    MAX_POINT_LIGHTS,
};

/// Everything the demo draws and how it is lit.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub camera: CameraSettings,
    pub material: Material,
    pub lights: LightRig,
    pub pyramids: Vec<PyramidInstance>,
    pub controls: KeyBindings,
    pub clear_color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 7.0),
            yaw: camera::DEFAULT_YAW,
            pitch: camera::DEFAULT_PITCH,
            zoom: camera::DEFAULT_ZOOM,
            speed: camera::DEFAULT_SPEED,
            sensitivity: camera::DEFAULT_SENSITIVITY,
        }
    }
}

impl CameraSettings {
    pub fn build(&self) -> Camera {
        let mut camera = Camera::with_angles(self.position, self.yaw, self.pitch);
        camera.set_zoom(self.zoom);
        camera.movement_speed = self.speed;
        camera.mouse_sensitivity = self.sensitivity;
        camera
    }
}

/// One placed copy of the pyramid mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PyramidInstance {
    pub position: Vec3,
    /// Rotation in degrees about `axis`.
    pub angle: f32,
    pub axis: Vec3,
    pub scale: f32,
}

impl PyramidInstance {
    /// `translate * rotate * scale`
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = if self.axis.length_squared() > f32::EPSILON {
            Mat4::from_axis_angle(self.axis.normalize(), self.angle.to_radians())
        } else {
            Mat4::IDENTITY
        };
        Mat4::from_translation(self.position) * rotation * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

const PYRAMID_POSITIONS: [[f32; 3]; 10] = [
    [0.0, 0.0, 0.0],
    [2.0, 5.0, -15.0],
    [-1.5, -2.2, -2.5],
    [-3.8, -2.0, -12.3],
    [2.4, -0.4, -3.5],
    [-1.7, 3.0, -7.5],
    [1.3, -2.0, -2.5],
    [1.5, 2.0, -2.5],
    [1.5, 0.2, -1.5],
    [-1.3, 1.0, -1.5],
];

const POINT_LIGHT_POSITIONS: [[f32; 3]; 4] = [
    [0.7, 0.2, 2.0],
    [2.3, -3.3, -4.0],
    [-4.0, 2.0, -12.0],
    [0.0, 0.0, -3.0],
];

fn default_point_light(position: Vec3) -> PointLight {
    PointLight {
        position,
        colors: LightColors::new(Vec3::splat(0.05), Vec3::splat(0.8), Vec3::ONE),
        attenuation: Attenuation::new(1.0, 0.09, 0.032),
        lamp_scale: 0.2,
    }
}

fn default_spot_light() -> SpotLight {
    SpotLight::from_degrees(
        CameraSettings::default().position,
        Vec3::NEG_Z,
        LightColors::new(Vec3::ZERO, Vec3::ONE, Vec3::ONE),
        Attenuation::new(1.0, 0.09, 0.032),
        12.5,
        15.0,
    )
    .with_follow_camera(true)
}

fn default_pyramid(index: usize, position: Vec3) -> PyramidInstance {
    PyramidInstance {
        position,
        angle: 20.0 * index as f32,
        axis: Vec3::new(1.0, 0.3, 0.5),
        scale: 1.0,
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            material: Material::default(),
            lights: LightRig {
                directional: DirectionalLight {
                    direction: Vec3::new(-0.2, -1.0, -0.3),
                    colors: LightColors::new(Vec3::splat(0.05), Vec3::splat(0.4), Vec3::splat(0.5)),
                },
                points: POINT_LIGHT_POSITIONS
                    .iter()
                    .map(|&p| default_point_light(Vec3::from_array(p)))
                    .collect(),
                spot: Some(default_spot_light()),
            },
            pyramids: PYRAMID_POSITIONS
                .iter()
                .enumerate()
                .map(|(index, &p)| default_pyramid(index, Vec3::from_array(p)))
                .collect(),
            controls: KeyBindings::default(),
            clear_color: Vec3::splat(0.1),
        }
    }
}

impl Scene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        Self::from_xml(&xml).with_context(|| format!("failed to parse scene {}", path.display()))
    }

    /// Parses a scene description. Any section or field that is left out
    /// keeps its value from [`Scene::default`].
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        let mut scene = Scene::default();

        scene.clear_color = parse_vec3(optional_text(&root, "clear-color"), scene.clear_color)?;

        if let Some(node) = child(&root, "camera") {
            scene.camera = parse_camera(&node, scene.camera).context("in <camera>")?;
        }
        if let Some(node) = child(&root, "material") {
            scene.material = parse_material(&node, scene.material).context("in <material>")?;
        }
        if let Some(node) = child(&root, "directional") {
            let light = scene.lights.directional;
            scene.lights.directional = DirectionalLight {
                direction: parse_vec3(optional_text(&node, "direction"), light.direction)?,
                colors: parse_colors(&node, light.colors)?,
            };
        }

        let points: Vec<_> = children(&root, "point").collect();
        if !points.is_empty() {
            if points.len() > MAX_POINT_LIGHTS {
                bail!(
                    "scene declares {} point lights; at most {MAX_POINT_LIGHTS} are supported",
                    points.len()
                );
            }
            let template = default_point_light(Vec3::ZERO);
            scene.lights.points = points
                .iter()
                .enumerate()
                .map(|(index, node)| {
                    parse_point_light(node, template).with_context(|| format!("in <point> #{}", index + 1))
                })
                .collect::<Result<_>>()?;
        }

        if let Some(node) = child(&root, "spot") {
            scene.lights.spot = parse_spot_light(&node).context("in <spot>")?;
        }

        let pyramids: Vec<_> = children(&root, "pyramid").collect();
        if !pyramids.is_empty() {
            scene.pyramids = pyramids
                .iter()
                .enumerate()
                .map(|(index, node)| {
                    parse_pyramid(node, index).with_context(|| format!("in <pyramid> #{}", index + 1))
                })
                .collect::<Result<_>>()?;
        }

        if let Some(node) = child(&root, "controls") {
            scene.controls = parse_controls(&node, scene.controls).context("in <controls>")?;
        }

        Ok(scene)
    }
}

fn parse_camera(node: &Node<'_, '_>, defaults: CameraSettings) -> Result<CameraSettings> {
    Ok(CameraSettings {
        position: parse_vec3(optional_text(node, "position"), defaults.position)?,
        yaw: parse_f32(optional_text(node, "yaw"), defaults.yaw)?,
        pitch: parse_f32(optional_text(node, "pitch"), defaults.pitch)?,
        zoom: parse_f32(optional_text(node, "zoom"), defaults.zoom)?,
        speed: parse_f32(optional_text(node, "speed"), defaults.speed)?,
        sensitivity: parse_f32(optional_text(node, "sensitivity"), defaults.sensitivity)?,
    })
}

fn parse_material(node: &Node<'_, '_>, defaults: Material) -> Result<Material> {
    Ok(Material {
        ambient: parse_vec3(optional_text(node, "ambient"), defaults.ambient)?,
        diffuse: parse_vec3(optional_text(node, "diffuse"), defaults.diffuse)?,
        specular: parse_vec3(optional_text(node, "specular"), defaults.specular)?,
        shininess: parse_f32(optional_text(node, "shininess"), defaults.shininess)?,
    })
}

fn parse_colors(node: &Node<'_, '_>, defaults: LightColors) -> Result<LightColors> {
    Ok(LightColors {
        ambient: parse_vec3(optional_text(node, "ambient"), defaults.ambient)?,
        diffuse: parse_vec3(optional_text(node, "diffuse"), defaults.diffuse)?,
        specular: parse_vec3(optional_text(node, "specular"), defaults.specular)?,
        ambient_strength: parse_f32(
            optional_text(node, "ambient-strength"),
            defaults.ambient_strength,
        )?,
    })
}

fn parse_attenuation(node: &Node<'_, '_>, defaults: Attenuation) -> Result<Attenuation> {
    Ok(Attenuation {
        constant: parse_f32(optional_text(node, "constant"), defaults.constant)?,
        linear: parse_f32(optional_text(node, "linear"), defaults.linear)?,
        quadratic: parse_f32(optional_text(node, "quadratic"), defaults.quadratic)?,
    })
}

fn parse_point_light(node: &Node<'_, '_>, template: PointLight) -> Result<PointLight> {
    Ok(PointLight {
        position: parse_vec3(Some(required_text(node, "position")?), Vec3::ZERO)?,
        colors: parse_colors(node, template.colors)?,
        attenuation: parse_attenuation(node, template.attenuation)?,
        lamp_scale: parse_f32(optional_text(node, "lamp-scale"), template.lamp_scale)?,
    })
}

fn parse_spot_light(node: &Node<'_, '_>) -> Result<Option<SpotLight>> {
    if !parse_flag(node, "enabled", true)? {
        return Ok(None);
    }
    let defaults = default_spot_light();
    let inner = parse_f32(optional_text(node, "cutoff"), 12.5)?;
    let outer = parse_f32(optional_text(node, "outer-cutoff"), 15.0)?;
    let spot = SpotLight::from_degrees(
        parse_vec3(optional_text(node, "position"), defaults.position)?,
        parse_vec3(optional_text(node, "direction"), defaults.direction)?,
        parse_colors(node, defaults.colors)?,
        parse_attenuation(node, defaults.attenuation)?,
        inner,
        outer,
    );
    let follow_camera = parse_flag(node, "follow-camera", defaults.follow_camera)?;
    Ok(Some(spot.with_follow_camera(follow_camera)))
}

fn parse_pyramid(node: &Node<'_, '_>, index: usize) -> Result<PyramidInstance> {
    let position = parse_vec3(Some(required_text(node, "position")?), Vec3::ZERO)?;
    let defaults = default_pyramid(index, position);
    Ok(PyramidInstance {
        position,
        angle: parse_f32(optional_text(node, "angle"), defaults.angle)?,
        axis: parse_vec3(optional_text(node, "axis"), defaults.axis)?,
        scale: parse_f32(optional_text(node, "scale"), defaults.scale)?,
    })
}

fn parse_controls(node: &Node<'_, '_>, defaults: KeyBindings) -> Result<KeyBindings> {
    Ok(KeyBindings {
        forward: parse_key(optional_text(node, "forward"), defaults.forward)?,
        backward: parse_key(optional_text(node, "backward"), defaults.backward)?,
        left: parse_key(optional_text(node, "left"), defaults.left)?,
        right: parse_key(optional_text(node, "right"), defaults.right)?,
        close: parse_key(optional_text(node, "close"), defaults.close)?,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn children<'a, 'input: 'a>(
    node: &Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(|component| component.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| anyhow!("failed to parse vector `{value}`: {err}"))?;
    match components[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(anyhow!(
            "vector `{value}` has {} components, expected 3",
            components.len()
        )),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_flag(node: &Node<'_, '_>, attribute: &str, default: bool) -> Result<bool> {
    match node.attribute(attribute) {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(anyhow!(
            "attribute {attribute}=\"{other}\" must be true or false"
        )),
    }
}

fn parse_key(value: Option<String>, default: KeyCode) -> Result<KeyCode> {
    match value {
        Some(name) => KeyCode::from_name(&name).ok_or_else(|| anyhow!("unknown key `{name}`")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;

    const SAMPLE: &str = r#"
    <scene>
        <clear-color>0 0 0</clear-color>
        <camera>
            <position>1 2 3</position>
            <speed>5</speed>
        </camera>
        <directional>
            <direction>0 -1 0</direction>
            <ambient-strength>0.1</ambient-strength>
        </directional>
        <point>
            <position>0 5 0</position>
            <diffuse>1 0.5 0.5</diffuse>
            <linear>0.5</linear>
        </point>
        <spot follow-camera="false">
            <position>0 3 0</position>
            <direction>0 -1 0</direction>
            <cutoff>10</cutoff>
            <outer-cutoff>10</outer-cutoff>
        </spot>
        <pyramid>
            <position>4 0 0</position>
            <angle>45</angle>
        </pyramid>
        <controls>
            <forward>Up</forward>
            <close>Q</close>
        </controls>
    </scene>
    "#;

    #[test]
    fn default_scene_matches_demo_layout() {
        let scene = Scene::default();
        assert_eq!(scene.pyramids.len(), 10);
        assert_eq!(scene.lights.points.len(), 4);
        assert!(scene.lights.spot.is_some_and(|spot| spot.follow_camera));
        assert_eq!(scene.camera.position, Vec3::new(0.0, 0.0, 7.0));
        assert_eq!(scene.pyramids[3].angle, 60.0);
    }

    #[test]
    fn parse_scene_overrides_given_fields() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.clear_color, Vec3::ZERO);
        assert_eq!(scene.camera.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene.camera.speed, 5.0);
        assert_eq!(scene.camera.yaw, camera::DEFAULT_YAW);

        assert_eq!(scene.lights.directional.direction, Vec3::NEG_Y);
        assert_eq!(scene.lights.directional.colors.ambient_strength, 0.1);

        assert_eq!(scene.lights.points.len(), 1);
        let point = scene.lights.points[0];
        assert_eq!(point.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(point.colors.diffuse, Vec3::new(1.0, 0.5, 0.5));
        assert_eq!(point.attenuation, Attenuation::new(1.0, 0.5, 0.032));

        let spot = scene.lights.spot.unwrap();
        assert!(!spot.follow_camera);
        assert_eq!(spot.cut_off(), spot.outer_cut_off());

        assert_eq!(scene.pyramids.len(), 1);
        assert_eq!(scene.pyramids[0].angle, 45.0);
        assert_eq!(scene.pyramids[0].scale, 1.0);

        assert_eq!(scene.controls.forward, KeyCode::Named(NamedKey::Up));
        assert_eq!(scene.controls.close, KeyCode::Character('Q'));
        assert_eq!(scene.controls.left, KeyCode::Character('A'));
    }

    #[test]
    fn bundled_scene_spells_out_the_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/scene.xml");
        assert_eq!(Scene::load(path).unwrap(), Scene::default());
    }

    #[test]
    fn empty_scene_is_default() {
        assert_eq!(Scene::from_xml("<scene/>").unwrap(), Scene::default());
    }

    #[test]
    fn spot_can_be_disabled() {
        let scene = Scene::from_xml(r#"<scene><spot enabled="false"/></scene>"#).unwrap();
        assert!(scene.lights.spot.is_none());
        assert!(Scene::from_xml(r#"<scene><spot enabled="maybe"/></scene>"#).is_err());
    }

    #[test]
    fn too_many_point_lights_is_an_error() {
        let point = "<point><position>0 0 0</position></point>";
        let xml = format!("<scene>{}</scene>", point.repeat(MAX_POINT_LIGHTS + 1));
        assert!(Scene::from_xml(&xml).is_err());
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(Scene::from_xml("<scene><pyramid><angle>3</angle></pyramid></scene>").is_err());
        assert!(Scene::from_xml("<scene><camera><position>1 2</position></camera></scene>").is_err());
        assert!(Scene::from_xml("<scene><camera><zoom>wide</zoom></camera></scene>").is_err());
        assert!(Scene::from_xml("<scene><controls><left>Hyper</left></controls></scene>").is_err());
        assert!(Scene::from_xml("<scene>").is_err());
    }

    #[test]
    fn pyramid_model_matrix_applies_scale_then_rotation_then_translation() {
        let pyramid = PyramidInstance {
            position: Vec3::new(1.0, 0.0, 0.0),
            angle: 90.0,
            axis: Vec3::Y,
            scale: 2.0,
        };
        let moved = pyramid.model_matrix().transform_point3(Vec3::X);
        assert!(moved.abs_diff_eq(Vec3::new(1.0, 0.0, -2.0), 1e-5));

        let unrotated = PyramidInstance {
            axis: Vec3::ZERO,
            ..pyramid
        };
        assert!(unrotated
            .model_matrix()
            .transform_point3(Vec3::X)
            .abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn camera_settings_build_a_matching_camera() {
        let settings = CameraSettings {
            zoom: 30.0,
            ..CameraSettings::default()
        };
        let camera = settings.build();
        assert_eq!(camera.position, settings.position);
        assert_eq!(camera.zoom(), 30.0);
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }
}
