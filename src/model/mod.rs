// MODEL: camera state, meshes and the scene layout
pub mod camera;
pub mod mesh;
pub mod scene;

pub use camera::{CameraState, Projection};
pub use mesh::{MeshPart, Model};
pub use scene::{DrawCommand, MeshRef, ModelId, Scene, SceneModels};
