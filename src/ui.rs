use egui::Context;
use glam::Vec3;

use crate::controller::FrameLoopContext;

/// Key and mouse bindings, as shown in the overlay and logged at startup.
pub const CONTROLS: &[(&str, &str)] = &[
    ("W/S, Up/Down", "Move forward/back"),
    ("A/D, Left/Right", "Strafe"),
    ("Q/E, PgUp/PgDn", "Move up/down"),
    ("Shift + arrows", "Speed boost"),
    ("Mouse drag", "Look around"),
    ("Wheel", "Zoom"),
    ("Middle click", "Reset zoom"),
    ("F11", "Fullscreen"),
    ("Alt+F4", "Quit"),
];

/// Snapshot of the numbers shown in the debug window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStats {
    pub fps: f32,
    pub fov_degrees: f32,
    pub pitch_degrees: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub eye: Vec3,
}

impl OverlayStats {
    pub fn from_context(ctx: &FrameLoopContext) -> Self {
        Self {
            fps: ctx.stats.fps,
            fov_degrees: ctx.camera.fov_degrees,
            pitch_degrees: ctx.controller.pitch_degrees(&ctx.view),
            speed: ctx.camera.velocity.length(),
            max_speed: ctx.camera.max_speed,
            eye: ctx.controller.eye(&ctx.view),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("FPS: {:.0}", self.fps),
            format!("Pos: {:.1}, {:.1}, {:.1}", self.eye.x, self.eye.y, self.eye.z),
            format!("Pitch: {:.1}", self.pitch_degrees),
            format!("FOV: {:.0}", self.fov_degrees),
            format!("Speed: {:.1} / {:.0}", self.speed, self.max_speed),
        ]
    }
}

pub fn controls_text() -> String {
    CONTROLS
        .iter()
        .map(|(keys, action)| format!("{keys} - {action}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn log_controls() {
    for (keys, action) in CONTROLS {
        tracing::info!("{keys:>16}  {action}");
    }
}

/// Draw the overlay for one frame
pub fn build_ui(egui_ctx: &Context, frame: &FrameLoopContext) {
    let stats = OverlayStats::from_context(frame);
    if frame.input.is_dragging() {
        draw_crosshair(egui_ctx);
    }
    draw_debug_window(egui_ctx, &stats);
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Foreground, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 10.0;
    let stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
    painter.line_segment([center - egui::vec2(size, 0.0), center + egui::vec2(size, 0.0)], stroke);
    painter.line_segment([center - egui::vec2(0.0, size), center + egui::vec2(0.0, size)], stroke);
}

fn draw_debug_window(ctx: &Context, stats: &OverlayStats) {
    egui::Window::new("Camera")
        .default_pos([8.0, 8.0])
        .default_size([180.0, 100.0])
        .show(ctx, |ui| {
            for line in stats.lines() {
                ui.label(egui::RichText::new(line).small());
            }
            ui.separator();
            ui.collapsing(egui::RichText::new("Controls").small(), |ui| {
                for (keys, action) in CONTROLS {
                    ui.label(egui::RichText::new(format!("{keys} - {action}")).small());
                }
            });
        });
}
