//! Phong light sources and their CPU reference model.
//!
//! [`shade`] evaluates exactly what `lighting.frag.wgsl` does for a single
//! surface point so the lighting maths can be tested without a GPU.

use glam::Vec3;

use crate::camera::Camera;
use crate::shader::ShaderProgram;
use crate::uniforms;

/// Number of point light slots in the lighting shader.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColors {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Scales the ambient term only.
    pub ambient_strength: f32,
}

impl LightColors {
    pub fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            ambient_strength: 1.0,
        }
    }

    fn upload(&self, program: &mut ShaderProgram, prefix: &str) {
        program.set_vec3(&uniforms::field(prefix, "ambient"), self.ambient);
        program.set_vec3(&uniforms::field(prefix, "diffuse"), self.diffuse);
        program.set_vec3(&uniforms::field(prefix, "specular"), self.specular);
        program.set_float(
            &uniforms::field(prefix, "ambient_strength"),
            self.ambient_strength,
        );
    }
}

/// `1 / (constant + linear * d + quadratic * d^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const NONE: Self = Self {
        constant: 1.0,
        linear: 0.0,
        quadratic: 0.0,
    };

    pub fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }

    fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.constant, self.linear, self.quadratic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in, not the direction towards it.
    pub direction: Vec3,
    pub colors: LightColors,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub colors: LightColors,
    pub attenuation: Attenuation,
    /// Edge length of the lamp marker drawn at `position`.
    pub lamp_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub colors: LightColors,
    pub attenuation: Attenuation,
    cut_off: f32,
    outer_cut_off: f32,
    /// Re-anchored to the camera position and view direction every frame.
    pub follow_camera: bool,
}

impl SpotLight {
    /// Builds a spot light from cone half-angles in degrees. The outer angle
    /// is raised to the inner one if it is smaller.
    pub fn from_degrees(
        position: Vec3,
        direction: Vec3,
        colors: LightColors,
        attenuation: Attenuation,
        inner_degrees: f32,
        outer_degrees: f32,
    ) -> Self {
        let outer_degrees = outer_degrees.max(inner_degrees);
        Self {
            position,
            direction,
            colors,
            attenuation,
            cut_off: inner_degrees.to_radians().cos(),
            outer_cut_off: outer_degrees.to_radians().cos(),
            follow_camera: false,
        }
    }

    pub fn with_follow_camera(mut self, follow_camera: bool) -> Self {
        self.follow_camera = follow_camera;
        self
    }

    /// Cosine of the inner cone half-angle.
    pub fn cut_off(&self) -> f32 {
        self.cut_off
    }

    /// Cosine of the outer cone half-angle.
    pub fn outer_cut_off(&self) -> f32 {
        self.outer_cut_off
    }

    /// Cone factor for a unit vector pointing from the surface to the light.
    pub fn intensity(&self, light_dir: Vec3) -> f32 {
        let cos_theta = light_dir.dot((-self.direction).normalize());
        spot_intensity(cos_theta, self.cut_off, self.outer_cut_off)
    }
}

/// Smooth cone edge: 1 inside the inner cone, 0 at or past the outer cone,
/// linear in between. Equal cut-offs give a hard edge.
pub fn spot_intensity(cos_theta: f32, cut_off: f32, outer_cut_off: f32) -> f32 {
    let epsilon = cut_off - outer_cut_off;
    if epsilon <= 0.0 {
        return if cos_theta > outer_cut_off { 1.0 } else { 0.0 };
    }
    ((cos_theta - outer_cut_off) / epsilon).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl Light {
    pub fn colors(&self) -> &LightColors {
        match self {
            Light::Directional(light) => &light.colors,
            Light::Point(light) => &light.colors,
            Light::Spot(light) => &light.colors,
        }
    }

    /// Phong contribution of this light at `surface`, attenuation and cone
    /// included.
    pub fn contribution(&self, surface: &SurfacePoint, material: &Material) -> Vec3 {
        match self {
            Light::Directional(light) => {
                phong(surface, material, (-light.direction).normalize(), &light.colors)
            }
            Light::Point(light) => {
                let to_light = light.position - surface.position;
                let lit = phong(surface, material, to_light.normalize(), &light.colors);
                light.attenuation.factor(to_light.length()) * lit
            }
            Light::Spot(light) => {
                let to_light = light.position - surface.position;
                let light_dir = to_light.normalize();
                let lit = phong(surface, material, light_dir, &light.colors);
                light.attenuation.factor(to_light.length()) * light.intensity(light_dir) * lit
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::splat(0.5),
            shininess: 32.0,
        }
    }
}

impl Material {
    pub fn apply(&self, program: &mut ShaderProgram) {
        program.set_vec3(uniforms::MATERIAL_AMBIENT, self.ambient);
        program.set_vec3(uniforms::MATERIAL_DIFFUSE, self.diffuse);
        program.set_vec3(uniforms::MATERIAL_SPECULAR, self.specular);
        program.set_float(uniforms::MATERIAL_SHININESS, self.shininess);
    }
}

/// A point being shaded, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub view_position: Vec3,
    /// Texture sample at the point.
    pub albedo: Vec3,
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

fn phong(surface: &SurfacePoint, material: &Material, light_dir: Vec3, colors: &LightColors) -> Vec3 {
    let normal = surface.normal.normalize();
    let view_dir = (surface.view_position - surface.position).normalize();

    let ambient = colors.ambient_strength * colors.ambient * material.ambient * surface.albedo;
    let impact = normal.dot(light_dir).max(0.0);
    let diffuse = impact * colors.diffuse * material.diffuse * surface.albedo;
    let highlight = view_dir
        .dot(reflect(-light_dir, normal))
        .max(0.0)
        .powf(material.shininess);
    let specular = highlight * colors.specular * material.specular;

    ambient + diffuse + specular
}

/// Sum of every light's contribution at `surface`.
pub fn shade(surface: &SurfacePoint, material: &Material, lights: &[Light]) -> Vec3 {
    lights
        .iter()
        .map(|light| light.contribution(surface, material))
        .sum()
}

/// The set of lights active in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub directional: DirectionalLight,
    pub points: Vec<PointLight>,
    pub spot: Option<SpotLight>,
}

impl LightRig {
    pub fn lights(&self) -> Vec<Light> {
        let mut lights = vec![Light::Directional(self.directional)];
        lights.extend(self.points.iter().copied().map(Light::Point));
        lights.extend(self.spot.map(Light::Spot));
        lights
    }

    pub fn active_point_lights(&self) -> &[PointLight] {
        &self.points[..self.points.len().min(MAX_POINT_LIGHTS)]
    }

    /// Moves a camera-following spot light onto the camera.
    pub fn follow_camera(&mut self, camera: &Camera) {
        if let Some(spot) = self.spot.as_mut().filter(|spot| spot.follow_camera) {
            spot.position = camera.position;
            spot.direction = camera.front();
        }
    }

    /// Writes every light uniform of the lighting program.
    pub fn apply(&self, program: &mut ShaderProgram) {
        let directional = &self.directional;
        directional.colors.upload(program, uniforms::DIRECTIONAL);
        program.set_vec3(
            &uniforms::field(uniforms::DIRECTIONAL, "direction"),
            directional.direction,
        );

        let points = self.active_point_lights();
        for (index, light) in points.iter().enumerate() {
            let prefix = uniforms::point_light(index);
            light.colors.upload(program, &prefix);
            program.set_vec3(&uniforms::field(&prefix, "position"), light.position);
            program.set_vec3(
                &uniforms::field(&prefix, "attenuation"),
                light.attenuation.as_vec3(),
            );
        }
        program.set_int(uniforms::POINT_COUNT, points.len() as i32);

        match &self.spot {
            Some(spot) => {
                let prefix = uniforms::SPOT;
                spot.colors.upload(program, prefix);
                program.set_vec3(&uniforms::field(prefix, "position"), spot.position);
                program.set_vec3(&uniforms::field(prefix, "direction"), spot.direction);
                program.set_vec3(
                    &uniforms::field(prefix, "attenuation"),
                    spot.attenuation.as_vec3(),
                );
                program.set_float(&uniforms::field(prefix, "cut_off"), spot.cut_off);
                program.set_float(
                    &uniforms::field(prefix, "outer_cut_off"),
                    spot.outer_cut_off,
                );
                program.set_int(uniforms::SPOT_ENABLED, 1);
            }
            None => program.set_int(uniforms::SPOT_ENABLED, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHTING_VERT: &str = include_str!("../assets/shaders/lighting.vert.wgsl");
    const LIGHTING_FRAG: &str = include_str!("../assets/shaders/lighting.frag.wgsl");
    const LAMP_VERT: &str = include_str!("../assets/shaders/lamp.vert.wgsl");
    const LAMP_FRAG: &str = include_str!("../assets/shaders/lamp.frag.wgsl");

    fn white(ambient_strength: f32) -> LightColors {
        LightColors {
            ambient_strength,
            ..LightColors::new(Vec3::ONE, Vec3::ONE, Vec3::ZERO)
        }
    }

    fn facing_quad() -> SurfacePoint {
        SurfacePoint {
            position: Vec3::ZERO,
            normal: Vec3::Z,
            view_position: Vec3::new(0.0, 0.0, 5.0),
            albedo: Vec3::ONE,
        }
    }

    fn rig() -> LightRig {
        LightRig {
            directional: DirectionalLight {
                direction: Vec3::new(-0.2, -1.0, -0.3),
                colors: white(0.1),
            },
            points: vec![PointLight {
                position: Vec3::new(0.7, 0.2, 2.0),
                colors: white(1.0),
                attenuation: Attenuation::new(1.0, 0.09, 0.032),
                lamp_scale: 0.2,
            }],
            spot: Some(SpotLight {
                follow_camera: true,
                ..SpotLight::from_degrees(
                    Vec3::ZERO,
                    Vec3::NEG_Z,
                    white(0.0),
                    Attenuation::NONE,
                    12.5,
                    15.0,
                )
            }),
        }
    }

    #[test]
    fn attenuation_without_falloff_is_one() {
        for distance in [0.0, 1.0, 7.5, 100.0] {
            assert_eq!(Attenuation::NONE.factor(distance), 1.0);
        }
        let falloff = Attenuation::new(1.0, 0.09, 0.032);
        assert!(falloff.factor(10.0) < falloff.factor(1.0));
    }

    #[test]
    fn follow_camera_builder_keeps_cone() {
        let spot = SpotLight::from_degrees(
            Vec3::ZERO,
            Vec3::NEG_Z,
            LightColors::new(Vec3::ZERO, Vec3::ONE, Vec3::ONE),
            Attenuation::NONE,
            12.5,
            15.0,
        );
        let following = spot.with_follow_camera(true);
        assert!(following.follow_camera);
        assert_eq!(following.cut_off(), spot.cut_off());
        assert_eq!(following.outer_cut_off(), spot.outer_cut_off());
        assert!(!following.with_follow_camera(false).follow_camera);
    }

    #[test]
    fn spot_intensity_fades_between_cones() {
        let inner = 12.5f32.to_radians().cos();
        let outer = 17.5f32.to_radians().cos();
        assert_eq!(spot_intensity(1.0, inner, outer), 1.0);
        assert_eq!(spot_intensity(inner, inner, outer), 1.0);
        assert_eq!(spot_intensity(outer, inner, outer), 0.0);
        assert_eq!(spot_intensity(20f32.to_radians().cos(), inner, outer), 0.0);

        let mut previous = 1.0;
        for step in 0..=10 {
            let angle = 12.5 + 0.5 * step as f32;
            let value = spot_intensity(angle.to_radians().cos(), inner, outer);
            assert!(value <= previous);
            previous = value;
        }
    }

    #[test]
    fn equal_cutoffs_give_a_hard_edge() {
        let cut = 15f32.to_radians().cos();
        assert_eq!(spot_intensity(14f32.to_radians().cos(), cut, cut), 1.0);
        assert_eq!(spot_intensity(cut, cut, cut), 0.0);
        assert_eq!(spot_intensity(16f32.to_radians().cos(), cut, cut), 0.0);
    }

    #[test]
    fn outer_angle_never_narrower_than_inner() {
        let spot = SpotLight::from_degrees(
            Vec3::ZERO,
            Vec3::NEG_Z,
            white(1.0),
            Attenuation::NONE,
            20.0,
            10.0,
        );
        assert_eq!(spot.cut_off(), spot.outer_cut_off());
    }

    #[test]
    fn head_on_directional_light_adds_ambient_and_diffuse() {
        let light = Light::Directional(DirectionalLight {
            direction: Vec3::NEG_Z,
            colors: white(0.1),
        });
        let material = Material {
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            shininess: 32.0,
        };
        let color = shade(&facing_quad(), &material, &[light]);
        assert!(color.abs_diff_eq(Vec3::splat(1.1), 1e-6));
    }

    #[test]
    fn light_behind_surface_leaves_only_ambient() {
        let light = Light::Directional(DirectionalLight {
            direction: Vec3::Z,
            colors: LightColors::new(Vec3::splat(0.2), Vec3::ONE, Vec3::ONE),
        });
        let color = shade(&facing_quad(), &Material::default(), &[light]);
        assert!(color.abs_diff_eq(Vec3::splat(0.2), 1e-6));
    }

    #[test]
    fn spot_light_outside_cone_contributes_nothing() {
        let mut spot = SpotLight::from_degrees(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::X,
            white(1.0),
            Attenuation::NONE,
            12.5,
            15.0,
        );
        let lit = Light::Spot(spot).contribution(&facing_quad(), &Material::default());
        assert_eq!(lit, Vec3::ZERO);

        spot.direction = Vec3::NEG_Z;
        let lit = Light::Spot(spot).contribution(&facing_quad(), &Material::default());
        assert!(lit.x > 1.0);
    }

    #[test]
    fn spot_follows_camera_only_when_asked() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0));
        let mut rig = rig();
        rig.follow_camera(&camera);
        let spot = rig.spot.unwrap();
        assert_eq!(spot.position, camera.position);
        assert_eq!(spot.direction, camera.front());

        let mut fixed = self::rig();
        fixed.spot.as_mut().unwrap().follow_camera = false;
        fixed.follow_camera(&camera);
        assert_eq!(fixed.spot.unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn bundled_shaders_expose_every_uniform() {
        ShaderProgram::compile_checked(LIGHTING_VERT, LIGHTING_FRAG, &uniforms::lighting_program())
            .unwrap();
        ShaderProgram::compile_checked(LAMP_VERT, LAMP_FRAG, &uniforms::lamp_program()).unwrap();
    }

    #[test]
    fn rig_uploads_into_lighting_program() {
        let mut program = ShaderProgram::compile(LIGHTING_VERT, LIGHTING_FRAG).unwrap();
        let rig = rig();
        rig.apply(&mut program);
        Material::default().apply(&mut program);

        assert_eq!(program.int("lights.point_count"), Some(1));
        assert_eq!(program.int("lights.spot_enabled"), Some(1));
        assert_eq!(
            program.vec3("lights.points[0].position"),
            Some(Vec3::new(0.7, 0.2, 2.0))
        );
        assert_eq!(
            program.vec3("lights.points[0].attenuation"),
            Some(Vec3::new(1.0, 0.09, 0.032))
        );
        assert_eq!(
            program.float("lights.spot.cut_off"),
            Some(12.5f32.to_radians().cos())
        );
        assert_eq!(program.float("lights.directional.ambient_strength"), Some(0.1));
        assert_eq!(program.float("material.shininess"), Some(32.0));
        assert_eq!(program.vec3("lights.points[1].position"), Some(Vec3::ZERO));
    }

    #[test]
    fn missing_spot_disables_it() {
        let mut program = ShaderProgram::compile(LIGHTING_VERT, LIGHTING_FRAG).unwrap();
        let mut rig = rig();
        rig.apply(&mut program);
        rig.spot = None;
        rig.apply(&mut program);
        assert_eq!(program.int("lights.spot_enabled"), Some(0));
    }
}
