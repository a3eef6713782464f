pub mod frame;
pub mod native;
pub mod resources;

pub use frame::{
    draw_calls, prepare_draw, DrawCall, FrameClock, FrameState, PhaseError, PhaseTracker,
    Projection, RenderPhase,
};
pub use native::Renderer;
