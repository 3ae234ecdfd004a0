use glam::{Mat4, Vec3};

pub const DEFAULT_FOV_DEGREES: f32 = 60.0;
pub const BASE_SPEED: f32 = 4.0;
pub const BOOST_SPEED: f32 = 20.0;
pub const ACCELERATION: f32 = 4.0;

pub const Z_NEAR: f32 = 0.02;
pub const Z_FAR: f32 = 1000.0;

/// Motion state of the free-flying camera.
///
/// `acceleration` and `velocity` are expressed in the camera's level (yaw-only)
/// frame, as a translation applied to the world: +Z moves the camera forward.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub acceleration: Vec3,
    pub velocity: Vec3,
    pub fov_degrees: f32,
    pub max_speed: f32,
    pub accel_magnitude: f32,
}

impl CameraState {
    pub fn new() -> Self {
        Self {
            acceleration: Vec3::ZERO,
            velocity: Vec3::ZERO,
            fov_degrees: DEFAULT_FOV_DEGREES,
            max_speed: BASE_SPEED,
            accel_magnitude: ACCELERATION,
        }
    }

    /// Integrate acceleration over `dt` seconds, keeping every component within max speed.
    pub fn integrate(&mut self, dt: f32) {
        let limit = Vec3::splat(self.max_speed);
        self.velocity = (self.velocity + self.acceleration * dt).clamp(-limit, limit);
    }

    /// Displacement for this frame, to be applied after `integrate`.
    pub fn displacement(&self, dt: f32) -> Vec3 {
        self.velocity * dt
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new()
    }
}

/// Starting camera: eye at (0, 5, 10) looking down -Z, tilted 12 degrees downwards.
pub fn initial_view() -> Mat4 {
    Mat4::from_rotation_x(12f32.to_radians())
        * Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::new(0.0, 5.0, 0.0), Vec3::Y)
}

/// Rotation about the camera-local X axis, recovered from the view matrix.
///
/// Assumes no roll: for `Rx(p) * Ry(y) * T` the Y basis column is `(0, cos p, sin p)`.
pub fn extract_pitch(view: &Mat4) -> f32 {
    view.y_axis.z.atan2(view.y_axis.y)
}

/// World-space position of the eye.
pub fn eye_position(view: &Mat4) -> Vec3 {
    view.inverse().w_axis.truncate()
}

/// Perspective projection for a window of the given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f32,
    pub matrix: Mat4,
}

impl Projection {
    /// Returns `None` for a degenerate (zero-sized) window.
    pub fn new(width: u32, height: u32, fov_degrees: f32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let aspect = width as f32 / height as f32;
        Some(Self {
            width,
            height,
            fov_degrees,
            matrix: Mat4::perspective_rh(fov_degrees.to_radians(), aspect, Z_NEAR, Z_FAR),
        })
    }

    /// Recompute for a new size, keeping the previous matrix if the size is degenerate.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.update(width, height, self.fov_degrees)
    }

    pub fn set_fov(&mut self, fov_degrees: f32) -> bool {
        self.update(self.width, self.height, fov_degrees)
    }

    fn update(&mut self, width: u32, height: u32, fov_degrees: f32) -> bool {
        match Self::new(width, height, fov_degrees) {
            Some(p) => {
                *self = p;
                true
            }
            None => {
                tracing::debug!(width, height, "ignoring degenerate projection size");
                false
            }
        }
    }
}
