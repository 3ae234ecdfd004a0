// CONTROLLER: Input, camera motion and the update loop
pub mod input;
pub mod camera_controller;
pub mod frame_loop;

pub use input::{InputEvent, InputState, InputProcessor, KeyBindings};
pub use camera_controller::CameraController;
pub use frame_loop::{FrameLoopContext, FrameClock, DriverState, InputResponse, CursorMode, CameraUniform, LightingUniform, ObjectUniform};
