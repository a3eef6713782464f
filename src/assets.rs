use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::mesh::{self, MeshData};
use crate::scene::Scene;
use crate::shader::{ShaderProgram, UniformDescriptor};
use crate::texture::{load_texture, TextureImage};
use crate::uniforms;

/// The two programs the demo draws with.
#[derive(Debug, Clone)]
pub struct ScenePrograms {
    pub lighting: ShaderProgram,
    pub lamp: ShaderProgram,
}

/// Everything loaded from disk before a window is opened.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub scene: Scene,
    pub mesh: MeshData,
    pub programs: ScenePrograms,
    pub texture: TextureImage,
    pub texture_path: PathBuf,
}

impl SceneAssets {
    pub fn load(config: &AppConfig) -> Result<Self> {
        let scene = match config.scene_path() {
            Some(path) => Scene::load(path)?,
            None => {
                info!("no scene file found; using the built-in scene");
                Scene::default()
            }
        };

        let programs = ScenePrograms {
            lighting: build_program(config, "lighting", &uniforms::lighting_program())?,
            lamp: build_program(config, "lamp", &uniforms::lamp_program())?,
        };

        let mesh = mesh::pyramid().map_err(StartupError::from)?;
        let texture_path = config.texture_path();
        let texture = load_texture(&texture_path).map_err(StartupError::from)?;
        info!(
            "loaded {} pyramids, {} point lights and texture {}",
            scene.pyramids.len(),
            scene.lights.points.len(),
            texture_path.display()
        );

        Ok(Self {
            scene,
            mesh,
            programs,
            texture,
            texture_path,
        })
    }

    /// Human-readable description printed at startup.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        let lights = &self.scene.lights;
        let _ = writeln!(
            summary,
            "Loaded scene with {} pyramids (1 directional, {} point, {} spot lights)",
            self.scene.pyramids.len(),
            lights.points.len(),
            usize::from(lights.spot.is_some())
        );
        let _ = writeln!(
            summary,
            "Pyramid mesh: {} vertices, {}-byte stride",
            self.mesh.vertex_count(),
            self.mesh.layout().stride()
        );
        for (name, program) in [
            ("Lighting", &self.programs.lighting),
            ("Lamp", &self.programs.lamp),
        ] {
            let _ = writeln!(
                summary,
                "{name} program: {} uniforms in {} blocks, {} resources",
                program.uniform_count(),
                program.uniform_blocks().len(),
                program.resources().len()
            );
        }
        let _ = write!(
            summary,
            "Texture {}: {}x{}, {} channels",
            self.texture_path.display(),
            self.texture.width(),
            self.texture.height(),
            self.texture.channels()
        );
        summary
    }
}

fn read_shader(path: &Path) -> Result<String, StartupError> {
    fs::read_to_string(path).map_err(|source| StartupError::Asset {
        path: path.to_path_buf(),
        source,
    })
}

fn build_program(
    config: &AppConfig,
    name: &str,
    required: &[UniformDescriptor],
) -> Result<ShaderProgram> {
    let vertex = read_shader(&config.shader_path(format!("{name}.vert.wgsl")))?;
    let fragment = read_shader(&config.shader_path(format!("{name}.frag.wgsl")))?;
    let program = ShaderProgram::compile_checked(&vertex, &fragment, required)
        .map_err(StartupError::from)
        .with_context(|| format!("failed to build {name} program"))?;
    info!(
        "{name} program linked ({} uniforms)",
        program.uniform_count()
    );
    Ok(program)
}
