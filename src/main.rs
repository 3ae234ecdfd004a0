use std::process::ExitCode;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{CursorGrabMode, CursorIcon, Fullscreen, Window, WindowId},
};

// Import from the library crate
use tablescape::{
    config::AppConfig,
    controller::{CursorMode, DriverState, FrameLoopContext, InputEvent, InputResponse},
    error::{InitError, SceneError},
    logging,
    model::SceneModels,
    ui,
    view::{EguiFrame, GpuContext, Renderer},
};

/// Everything that exists once startup has succeeded
struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    frame: FrameLoopContext,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
}

struct App {
    config: AppConfig,
    state: DriverState<Running>,
    startup_error: Option<SceneError>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self { config, state: DriverState::Uninitialized, startup_error: None }
    }
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, SceneError> {
        let attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_position(PhysicalPosition::new(config.position.0, config.position.1));
        let window = Arc::new(event_loop.create_window(attributes).map_err(InitError::from)?);
        let size = window.inner_size();

        let gpu = pollster::block_on(GpuContext::new_native(window.clone(), size.width, size.height))?;

        let models = SceneModels::load(&config.assets)?;
        for (id, model) in models.iter() {
            tracing::debug!(model = ?id, parts = model.parts.len(), triangles = model.triangle_count(), "model ready");
        }
        let renderer = Renderer::new(&gpu, config, &models)?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        let (width, height) = gpu.size();
        Ok(Self {
            window,
            gpu,
            renderer,
            frame: FrameLoopContext::new(width, height),
            egui_ctx,
            egui_state,
        })
    }

    fn apply(&self, response: InputResponse, event_loop: &ActiveEventLoop) {
        if response.quit {
            event_loop.exit();
            return;
        }
        if response.toggle_fullscreen {
            let fullscreen = match self.window.fullscreen() {
                Some(_) => None,
                None => Some(Fullscreen::Borderless(None)),
            };
            tracing::info!(fullscreen = fullscreen.is_some(), "toggling fullscreen");
            self.window.set_fullscreen(fullscreen);
        }
        match response.cursor {
            Some(CursorMode::Look) => {
                self.window.set_cursor(CursorIcon::Crosshair);
                if let Err(e) = self
                    .window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
                {
                    tracing::debug!("cursor grab unavailable: {e}");
                }
            }
            Some(CursorMode::Normal) => {
                self.window.set_cursor(CursorIcon::Default);
                if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
                    tracing::debug!("cursor release failed: {e}");
                }
            }
            None => {}
        }
        if let Some((x, y)) = response.warp_cursor {
            if let Err(e) = self.window.set_cursor_position(PhysicalPosition::new(x, y)) {
                tracing::trace!("cursor warp failed: {e}");
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if self.gpu.resize(size.width, size.height) {
            self.renderer.resize(&self.gpu.device, size.width, size.height);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let draw_list = self.frame.tick();

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let frame = &self.frame;
        let output = self.egui_ctx.run(raw_input, |ctx| ui::build_ui(ctx, frame));
        self.egui_state.handle_platform_output(&self.window, output.platform_output);
        let primitives = self.egui_ctx.tessellate(output.shapes, output.pixels_per_point);
        let (width, height) = self.gpu.size();
        let egui = EguiFrame {
            primitives,
            textures_delta: output.textures_delta,
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels: [width, height],
                pixels_per_point: output.pixels_per_point,
            },
        };

        match self.renderer.draw_frame(&self.gpu, &draw_list, &self.frame.projection, Some(egui)) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory, exiting");
                event_loop.exit();
                return;
            }
            Err(e) => tracing::warn!("frame skipped: {e:?}"),
        }

        self.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_running() {
            return;
        }
        match Running::start(event_loop, &self.config) {
            Ok(running) => {
                tracing::info!("startup complete, entering main loop");
                running.window.request_redraw();
                self.state = DriverState::Running(running);
            }
            Err(e) => {
                self.startup_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.state.running_mut() else {
            return;
        };

        match &event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => running.resize(*size),
            WindowEvent::Focused(false) => {
                running.frame.release_all();
                running.apply(InputResponse { cursor: Some(CursorMode::Normal), ..Default::default() }, event_loop);
            }
            WindowEvent::RedrawRequested => {
                running.redraw(event_loop);
                return;
            }
            _ => {}
        }

        // egui gets the event first; resizes always reach the camera
        let consumed = running.egui_state.on_window_event(&running.window, &event).consumed;
        if consumed && !matches!(event, WindowEvent::Resized(_)) {
            return;
        }

        if let Some(input) = InputEvent::from_window_event(&event) {
            let response = running.frame.handle_input(input);
            running.apply(response, event_loop);
        }
    }

    fn device_event(&mut self, event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        let Some(running) = self.state.running_mut() else {
            return;
        };
        if let Some(input) = InputEvent::from_device_event(&event) {
            let response = running.frame.handle_input(input);
            running.apply(response, event_loop);
        }
    }
}

fn run() -> Result<(), SceneError> {
    let event_loop = EventLoop::new().map_err(InitError::from)?;
    let mut app = App::new(AppConfig::default());
    event_loop.run_app(&mut app).map_err(InitError::from)?;
    match app.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn main() -> ExitCode {
    // Held until main returns so the file writer drains
    let _log_guard = logging::init();
    ui::log_controls();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            ExitCode::FAILURE
        }
    }
}
