//! Textured pyramids lit by directional, point and spot lights.
//!
//! Everything up to the GPU boundary (camera, mesh layout, shader
//! compilation and reflection, the lighting model, scene loading and the
//! frame state machine) is plain CPU code and can be exercised without a
//! window. The `render` module wraps it with a wgpu backend.

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod lighting;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod shader;
pub mod texture;
pub mod uniforms;

pub use app::AppContext;
pub use assets::{SceneAssets, ScenePrograms};
pub use camera::{Camera, CameraMovement};
pub use config::AppConfig;
pub use error::StartupError;
pub use input::{InputState, KeyBindings, KeyCode, MouseButton, NamedKey};
pub use lighting::{
    shade, spot_intensity, Attenuation, DirectionalLight, Light, LightColors, LightRig, Material,
    PointLight, SpotLight, SurfacePoint,
};
pub use mesh::{MeshData, MeshError, VertexAttribute, VertexLayout};
pub use render::Renderer;
pub use scene::{CameraSettings, PyramidInstance, Scene};
pub use shader::{CompileError, ShaderProgram, ShaderStage, UniformDescriptor, UniformKind};
pub use texture::{load_texture, TextureError, TextureImage};
