use std::time::Instant;

use glam::Mat4;
use winit::event::MouseButton;

use crate::controller::camera_controller::CameraController;
use crate::controller::input::{InputEvent, InputProcessor, InputState, KeyAction};
use crate::model::camera::{self, CameraState, Projection};
use crate::model::scene::{DrawCommand, Scene};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub projection: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub light_dir: [f32; 3],
    pub diffuse: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model_view: [[f32; 4]; 4],
    pub material: [f32; 4],
}

impl From<&DrawCommand> for ObjectUniform {
    fn from(cmd: &DrawCommand) -> Self {
        Self {
            model_view: cmd.model_view.to_cols_array_2d(),
            material: cmd.material.extend(1.0).to_array(),
        }
    }
}

/// Timestamps for one frame, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Since the clock started.
    pub time: f32,
    /// Since the previous frame; zero on the first frame.
    pub delta: f32,
}

/// Monotonic frame clock
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    prev: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start, prev: None }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Delta comes from the two instants directly, so it keeps full precision however long the clock runs.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let time = now.saturating_duration_since(self.start).as_secs_f32();
        let delta = self.prev.map_or(0.0, |prev| now.saturating_duration_since(prev).as_secs_f32());
        self.prev = Some(now);
        FrameTime { time, delta }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames-per-second over a one second window
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub fps: f32,
    frame_count: u32,
    fps_timer: f64,
}

impl FrameStats {
    pub fn record(&mut self, dt: f32) {
        self.frame_count += 1;
        self.fps_timer += f64::from(dt);
        if self.fps_timer >= 1.0 {
            self.fps = (f64::from(self.frame_count) / self.fps_timer) as f32;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Crosshair, grabbed while dragging to look around
    Look,
    Normal,
}

/// Window-side effects requested while handling an input event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputResponse {
    pub quit: bool,
    pub toggle_fullscreen: bool,
    pub warp_cursor: Option<(f64, f64)>,
    pub cursor: Option<CursorMode>,
}

/// Lifecycle of the frame driver. Running only after every startup step succeeded.
#[derive(Debug)]
pub enum DriverState<T> {
    Uninitialized,
    Running(T),
}

impl<T> DriverState<T> {
    pub fn is_running(&self) -> bool {
        matches!(self, DriverState::Running(_))
    }

    pub fn running_mut(&mut self) -> Option<&mut T> {
        match self {
            DriverState::Running(inner) => Some(inner),
            DriverState::Uninitialized => None,
        }
    }
}

impl<T> Default for DriverState<T> {
    fn default() -> Self {
        DriverState::Uninitialized
    }
}

/// Main loop state and update logic
pub struct FrameLoopContext {
    pub camera: CameraState,
    pub view: Mat4,
    pub projection: Projection,
    pub controller: CameraController,
    pub input: InputState,
    pub processor: InputProcessor,
    pub scene: Scene,
    pub clock: FrameClock,
    pub stats: FrameStats,
    pub last_frame: FrameTime,
}

impl FrameLoopContext {
    /// `width`/`height` of zero fall back to a 1x1 projection until the first resize.
    pub fn new(width: u32, height: u32) -> Self {
        let camera = CameraState::new();
        let projection = Projection::new(width.max(1), height.max(1), camera.fov_degrees)
            .unwrap_or_else(|| unreachable!("size clamped to at least 1x1"));
        Self {
            camera,
            view: camera::initial_view(),
            projection,
            controller: CameraController::new(),
            input: InputState::new(),
            processor: InputProcessor::default(),
            scene: Scene::new(),
            clock: FrameClock::new(),
            stats: FrameStats::default(),
            last_frame: FrameTime { time: 0.0, delta: 0.0 },
        }
    }

    /// Advance camera and animation by one frame and return what to draw.
    pub fn update(&mut self, frame: FrameTime) -> Vec<DrawCommand> {
        self.last_frame = frame;
        self.stats.record(frame.delta);
        self.controller.update_view(&mut self.camera, &mut self.view, frame.delta);
        self.scene.advance(frame.delta);
        self.scene.draw_list(self.view)
    }

    pub fn tick(&mut self) -> Vec<DrawCommand> {
        let frame = self.clock.tick();
        self.update(frame)
    }

    pub fn window_center(&self) -> (f64, f64) {
        ((self.projection.width / 2) as f64, (self.projection.height / 2) as f64)
    }

    pub fn handle_input(&mut self, event: InputEvent) -> InputResponse {
        let mut response = InputResponse::default();
        match event {
            InputEvent::Key { code, pressed, repeat } => {
                if self.processor.is_special(code) {
                    if matches!(code, winit::keyboard::KeyCode::ShiftLeft | winit::keyboard::KeyCode::ShiftRight) {
                        self.input.shift_held = pressed;
                    }
                    self.controller.set_boost(&mut self.camera, self.input.shift_held);
                }
                match self.processor.action(code) {
                    Some(KeyAction::Move(motion)) => {
                        if pressed {
                            self.controller.accelerate(&mut self.camera, motion.axis(), motion.sign());
                        } else {
                            self.controller.stop(&mut self.camera, motion.axis());
                        }
                    }
                    Some(KeyAction::Quit) if pressed && self.input.alt_held => {
                        tracing::info!("Alt+F4 pressed, exiting");
                        response.quit = true;
                    }
                    Some(KeyAction::ToggleFullscreen) if pressed && !repeat => {
                        response.toggle_fullscreen = true;
                    }
                    _ => {}
                }
            }
            InputEvent::Modifiers { shift, alt } => {
                self.input.shift_held = shift;
                self.input.alt_held = alt;
            }
            InputEvent::MouseButton { button, pressed } => {
                if pressed {
                    self.input.press_button(button);
                    response.cursor = Some(CursorMode::Look);
                    response.warp_cursor = Some(self.window_center());
                    if button == MouseButton::Middle {
                        self.controller.reset_zoom(&mut self.camera, &mut self.projection);
                    }
                } else {
                    self.input.release_button(button);
                    if !self.input.is_dragging() {
                        response.cursor = Some(CursorMode::Normal);
                    }
                }
            }
            InputEvent::RawMotion { dx, dy } => {
                if !self.input.raw_motion {
                    tracing::debug!("relative pointer motion available");
                    self.input.raw_motion = true;
                }
                if self.input.is_dragging() {
                    self.controller.apply_look(&mut self.view, dx, dy);
                }
            }
            InputEvent::CursorMoved { x, y } => {
                // warp-and-diff, only when the platform gives no relative motion
                if self.input.is_dragging() && !self.input.raw_motion {
                    let (cx, cy) = self.window_center();
                    let (dx, dy) = ((x - cx) as f32, (y - cy) as f32);
                    if dx != 0.0 || dy != 0.0 {
                        response.warp_cursor = Some((cx, cy));
                        self.controller.apply_look(&mut self.view, dx, dy);
                    }
                }
            }
            InputEvent::Wheel { dir } => {
                self.controller.zoom(&mut self.camera, &mut self.projection, dir);
            }
            InputEvent::PixelScroll { dy } => {
                let notches = self.input.scroll_notches(dy);
                for _ in 0..notches.unsigned_abs() {
                    self.controller.zoom(&mut self.camera, &mut self.projection, notches.signum() as f32);
                }
            }
            InputEvent::Resized { width, height } => {
                self.projection.resize(width, height);
            }
        }
        response
    }

    /// Drop held keys and buttons, e.g. after focus loss.
    pub fn release_all(&mut self) {
        self.input.clear();
        self.camera.acceleration = glam::Vec3::ZERO;
        self.camera.velocity = glam::Vec3::ZERO;
        self.controller.set_boost(&mut self.camera, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::time::Duration;
    use winit::keyboard::KeyCode;

    fn key(code: KeyCode, pressed: bool) -> InputEvent {
        InputEvent::Key { code, pressed, repeat: false }
    }

    fn frame(delta: f32) -> FrameTime {
        FrameTime { time: 0.0, delta }
    }

    #[test]
    fn first_frame_has_zero_delta() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let first = clock.tick_at(start + Duration::from_millis(500));
        assert_eq!(first.delta, 0.0);
        assert!((first.time - 0.5).abs() < 1e-6);

        let second = clock.tick_at(start + Duration::from_millis(750));
        assert!((second.delta - 0.25).abs() < 1e-6);
        assert!((second.time - 0.75).abs() < 1e-6);
    }

    #[test]
    fn delta_stays_precise_after_days() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let step = Duration::from_micros(16_667);
        let mut now = start + Duration::from_secs(72 * 3600);
        clock.tick_at(now);
        for _ in 0..4 {
            now += step;
            let frame = clock.tick_at(now);
            assert!((frame.delta - 0.016_667).abs() < 1e-6, "delta {}", frame.delta);
        }
    }

    #[test]
    fn releasing_w_stops_forward_motion() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(key(KeyCode::KeyW, true));
        assert_eq!(ctx.camera.acceleration.z, 4.0);
        ctx.update(frame(0.3));
        assert!(ctx.camera.velocity.z > 0.0);

        ctx.handle_input(key(KeyCode::KeyW, false));
        assert_eq!(ctx.camera.velocity.z, 0.0);
        assert_eq!(ctx.camera.acceleration.z, 0.0);
    }

    #[test]
    fn releasing_opposite_key_also_stops_axis() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(key(KeyCode::KeyA, true));
        ctx.update(frame(0.5));
        ctx.handle_input(key(KeyCode::ArrowRight, false));
        assert_eq!(ctx.camera.velocity.x, 0.0);
        assert_eq!(ctx.camera.acceleration.x, 0.0);
    }

    #[test]
    fn holding_w_for_one_second() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.view = Mat4::IDENTITY;
        ctx.handle_input(key(KeyCode::KeyW, true));
        ctx.update(frame(1.0));
        assert_eq!(ctx.camera.velocity.z, 4.0);
        let eye = camera::eye_position(&ctx.view);
        assert!((eye - Vec3::new(0.0, 0.0, -4.0)).length() < 1e-4);
    }

    #[test]
    fn shift_boost_on_special_keys_only() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(key(KeyCode::ShiftLeft, true));
        assert_eq!(ctx.camera.max_speed, 20.0);

        ctx.handle_input(key(KeyCode::ArrowUp, true));
        assert_eq!(ctx.camera.max_speed, 20.0);

        ctx.handle_input(key(KeyCode::ShiftLeft, false));
        assert_eq!(ctx.camera.max_speed, 4.0);

        // letters never touch max speed
        ctx.input.shift_held = true;
        ctx.handle_input(key(KeyCode::KeyW, true));
        assert_eq!(ctx.camera.max_speed, 4.0);
        ctx.handle_input(key(KeyCode::ArrowDown, false));
        assert_eq!(ctx.camera.max_speed, 20.0);
    }

    #[test]
    fn modifiers_event_updates_held_state() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(InputEvent::Modifiers { shift: true, alt: false });
        assert!(ctx.input.shift_held);
        // re-evaluated on the next special key
        assert_eq!(ctx.camera.max_speed, 4.0);
        ctx.handle_input(key(KeyCode::ArrowLeft, true));
        assert_eq!(ctx.camera.max_speed, 20.0);
    }

    #[test]
    fn alt_f4_quits() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        assert!(!ctx.handle_input(key(KeyCode::F4, true)).quit);
        ctx.handle_input(InputEvent::Modifiers { shift: false, alt: true });
        assert!(ctx.handle_input(key(KeyCode::F4, true)).quit);
    }

    #[test]
    fn f11_toggles_once_per_press() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        assert!(ctx.handle_input(key(KeyCode::F11, true)).toggle_fullscreen);
        let repeat = InputEvent::Key { code: KeyCode::F11, pressed: true, repeat: true };
        assert!(!ctx.handle_input(repeat).toggle_fullscreen);
        assert!(!ctx.handle_input(key(KeyCode::F11, false)).toggle_fullscreen);
    }

    #[test]
    fn ten_wheel_ups_then_clamp() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        for _ in 0..10 {
            ctx.handle_input(InputEvent::Wheel { dir: 1.0 });
        }
        assert_eq!(ctx.camera.fov_degrees, 10.0);
        ctx.handle_input(InputEvent::Wheel { dir: 1.0 });
        assert_eq!(ctx.camera.fov_degrees, 5.0);
        assert_eq!(ctx.projection.fov_degrees, 5.0);
    }

    #[test]
    fn touchpad_scroll_zooms_per_fifty_pixels() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        for _ in 0..4 {
            ctx.handle_input(InputEvent::PixelScroll { dy: 10.0 });
        }
        assert_eq!(ctx.camera.fov_degrees, 60.0);
        ctx.handle_input(InputEvent::PixelScroll { dy: 10.0 });
        assert_eq!(ctx.camera.fov_degrees, 55.0);

        // one large swipe spans several notches
        ctx.handle_input(InputEvent::PixelScroll { dy: -160.0 });
        assert_eq!(ctx.camera.fov_degrees, 70.0);
        assert_eq!(ctx.projection.fov_degrees, 70.0);
    }

    #[test]
    fn middle_click_resets_zoom() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(InputEvent::Wheel { dir: -1.0 });
        assert_eq!(ctx.camera.fov_degrees, 65.0);

        let response = ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Middle, pressed: true });
        assert_eq!(ctx.camera.fov_degrees, 60.0);
        assert_eq!(ctx.projection, Projection::new(1280, 720, 60.0).unwrap());
        assert_eq!(response.cursor, Some(CursorMode::Look));
        assert_eq!(response.warp_cursor, Some((640.0, 360.0)));

        let response = ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Middle, pressed: false });
        assert_eq!(response.cursor, Some(CursorMode::Normal));
    }

    #[test]
    fn cursor_released_only_after_last_button() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
        ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Right, pressed: true });

        let response = ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Left, pressed: false });
        assert_eq!(response.cursor, None);
        let response = ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Right, pressed: false });
        assert_eq!(response.cursor, Some(CursorMode::Normal));
    }

    #[test]
    fn raw_motion_looks_only_while_dragging() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        let before = ctx.view;
        ctx.handle_input(InputEvent::RawMotion { dx: 10.0, dy: 0.0 });
        assert_eq!(ctx.view, before);
        assert!(ctx.input.raw_motion);

        ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
        ctx.handle_input(InputEvent::RawMotion { dx: 10.0, dy: 0.0 });
        assert_ne!(ctx.view, before);

        // cursor positions are ignored once relative motion is known to work
        let after = ctx.view;
        let response = ctx.handle_input(InputEvent::CursorMoved { x: 700.0, y: 360.0 });
        assert_eq!(ctx.view, after);
        assert_eq!(response.warp_cursor, None);
    }

    #[test]
    fn warp_fallback_diffs_against_center() {
        let mut ctx = FrameLoopContext::new(800, 600);
        ctx.view = Mat4::IDENTITY;
        ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });

        let response = ctx.handle_input(InputEvent::CursorMoved { x: 400.0, y: 320.0 });
        assert_eq!(response.warp_cursor, Some((400.0, 300.0)));
        assert!((ctx.controller.pitch_degrees(&ctx.view) - 0.1f32.to_degrees()).abs() < 1e-3);

        // the warp itself lands on the center and changes nothing
        let view = ctx.view;
        let response = ctx.handle_input(InputEvent::CursorMoved { x: 400.0, y: 300.0 });
        assert_eq!(response.warp_cursor, None);
        assert_eq!(ctx.view, view);

        // a far jump is discarded but the cursor is still recentred
        let response = ctx.handle_input(InputEvent::CursorMoved { x: 10.0, y: 300.0 });
        assert_eq!(ctx.view, view);
        assert_eq!(response.warp_cursor, Some((400.0, 300.0)));
    }

    #[test]
    fn resize_updates_projection_but_ignores_zero() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(InputEvent::Resized { width: 800, height: 600 });
        assert_eq!((ctx.projection.width, ctx.projection.height), (800, 600));
        ctx.handle_input(InputEvent::Resized { width: 800, height: 0 });
        assert_eq!((ctx.projection.width, ctx.projection.height), (800, 600));
    }

    #[test]
    fn update_returns_scene_and_advances_animation() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        let list = ctx.update(frame(0.0));
        assert_eq!(list.len(), 13);
        assert_eq!(ctx.scene.angle, 0.0);
        ctx.update(frame(1.5));
        assert!((ctx.scene.angle - 30.0).abs() < 1e-4);
    }

    #[test]
    fn release_all_stops_everything() {
        let mut ctx = FrameLoopContext::new(1280, 720);
        ctx.handle_input(key(KeyCode::ShiftLeft, true));
        ctx.handle_input(key(KeyCode::KeyW, true));
        ctx.handle_input(InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
        ctx.update(frame(0.5));
        ctx.release_all();
        assert_eq!(ctx.camera.velocity, Vec3::ZERO);
        assert_eq!(ctx.camera.acceleration, Vec3::ZERO);
        assert_eq!(ctx.camera.max_speed, 4.0);
        assert!(!ctx.input.is_dragging());
    }

    #[test]
    fn driver_state_transitions() {
        let mut state: DriverState<u32> = DriverState::default();
        assert!(!state.is_running());
        assert!(state.running_mut().is_none());
        state = DriverState::Running(7);
        assert!(state.is_running());
        *state.running_mut().unwrap() += 1;
        assert!(matches!(state, DriverState::Running(8)));
    }

    #[test]
    fn object_uniform_layout() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 32);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
        let cmd = DrawCommand {
            mesh: crate::model::MeshRef::whole(crate::model::ModelId::Vase),
            model_view: Mat4::IDENTITY,
            material: Vec3::new(0.2, 0.2, 0.8),
        };
        let uniform = ObjectUniform::from(&cmd);
        assert_eq!(uniform.material, [0.2, 0.2, 0.8, 1.0]);
        assert_eq!(uniform.model_view, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn fps_is_averaged_per_second() {
        let mut stats = FrameStats::default();
        for _ in 0..15 {
            stats.record(0.0625);
        }
        assert_eq!(stats.fps, 0.0);
        stats.record(0.0625);
        assert_eq!(stats.fps, 16.0);
    }

    #[test]
    fn fps_rolls_over_at_fifty_hertz() {
        let mut stats = FrameStats::default();
        for _ in 0..51 {
            stats.record(0.02);
        }
        assert!((stats.fps - 50.0).abs() < 0.5, "fps {}", stats.fps);

        // counter restarts for the next window
        for _ in 0..10 {
            stats.record(0.1);
        }
        assert!((stats.fps - 10.0).abs() < 0.1, "fps {}", stats.fps);
    }
}
