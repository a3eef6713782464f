use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

pub const WINDOW_TITLE: &str = "Applying brick textures to Pyramid";
pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;

const USAGE: &str =
    "Usage: lit-pyramid [--assets <dir>] [--scene <file>] [--texture <file>] [--summary-only]";

/// Command line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub asset_dir: PathBuf,
    pub scene: Option<PathBuf>,
    pub texture: Option<PathBuf>,
    pub summary_only: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            scene: None,
            texture: None,
            summary_only: false,
        }
    }
}

impl AppConfig {
    /// Parses arguments without the program name.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut config = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--assets" => config.asset_dir = path_value(&arg, args.next())?,
                "--scene" => config.scene = Some(path_value(&arg, args.next())?),
                "--texture" => config.texture = Some(path_value(&arg, args.next())?),
                "--summary-only" => config.summary_only = true,
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(config)
    }

    /// Scene description to load, if any. The bundled `scene.xml` is only
    /// used when it exists; otherwise the built-in scene applies.
    pub fn scene_path(&self) -> Option<PathBuf> {
        match &self.scene {
            Some(path) => Some(path.clone()),
            None => Some(self.asset_dir.join("scene.xml")).filter(|path| path.is_file()),
        }
    }

    pub fn texture_path(&self) -> PathBuf {
        self.texture
            .clone()
            .unwrap_or_else(|| self.asset_dir.join("textures").join("brick.png"))
    }

    pub fn shader_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.asset_dir.join("shaders").join(file_name)
    }
}

fn path_value(flag: &str, value: Option<String>) -> Result<PathBuf> {
    value
        .filter(|value| !value.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("{flag} expects a path. {USAGE}"))
}
