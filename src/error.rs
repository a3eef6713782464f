use std::path::PathBuf;

use thiserror::Error;

use crate::mesh::MeshError;
use crate::shader::CompileError;
use crate::texture::TextureError;

/// Fatal problems while bringing the application up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create window: {0}")]
    WindowCreation(String),
    #[error("failed to initialise graphics: {0}")]
    GraphicsInit(String),
    #[error(transparent)]
    Shader(#[from] CompileError),
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error("failed to read {}", path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
