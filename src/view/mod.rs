// VIEW: Rendering and graphics
pub mod render;
pub mod gpu_init;

pub use render::{Renderer, EguiFrame, CameraResources, ObjectResources};
pub use gpu_init::GpuContext;
