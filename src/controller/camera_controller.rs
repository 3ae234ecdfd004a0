use glam::{Mat4, Vec3};
use crate::model::camera::{self, CameraState, Projection};

/// Handles camera movement, mouse look and zoom
pub struct CameraController {
    pub mouse_sensitivity: f32,
    /// Scaled deltas above this (radians) are dropped as pointer-warp artifacts.
    pub look_threshold: f32,
    pub max_pitch: f32,
    pub zoom_step: f32,
    pub min_fov: f32,
    pub max_fov: f32,
    pub default_fov: f32,
    pub base_speed: f32,
    pub boost_speed: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            mouse_sensitivity: 0.005,
            look_threshold: 0.3,
            max_pitch: 80f32.to_radians(),
            zoom_step: 5.0,
            min_fov: 5.0,
            max_fov: 175.0,
            default_fov: camera::DEFAULT_FOV_DEGREES,
            base_speed: camera::BASE_SPEED,
            boost_speed: camera::BOOST_SPEED,
        }
    }

    /// Advance the camera by one frame.
    ///
    /// The translation is applied with the pitch switched off, so moving forward
    /// stays level no matter how far up or down the camera looks.
    pub fn update_view(&self, state: &mut CameraState, view: &mut Mat4, dt: f32) {
        state.integrate(dt);
        let pitch = camera::extract_pitch(view);
        *view = Mat4::from_rotation_x(pitch)
            * Mat4::from_translation(state.displacement(dt))
            * Mat4::from_rotation_x(-pitch)
            * *view;
    }

    /// Apply a pointer delta in pixels. Returns false when the delta was discarded.
    pub fn apply_look(&self, view: &mut Mat4, dx: f32, dy: f32) -> bool {
        let delta_yaw = dx * self.mouse_sensitivity;
        let delta_pitch = dy * self.mouse_sensitivity;
        if delta_yaw.abs() > self.look_threshold || delta_pitch.abs() > self.look_threshold {
            tracing::trace!(dx, dy, "discarding oversized look delta");
            return false;
        }

        let pitch = camera::extract_pitch(view);
        let new_pitch = (pitch + delta_pitch).clamp(-self.max_pitch, self.max_pitch);
        *view = Mat4::from_rotation_x(new_pitch)
            * Mat4::from_rotation_y(delta_yaw)
            * Mat4::from_rotation_x(-pitch)
            * *view;
        true
    }

    /// Zoom by one wheel notch (`dir` > 0 zooms in) and rebuild the projection.
    pub fn zoom(&self, state: &mut CameraState, projection: &mut Projection, dir: f32) {
        state.fov_degrees = (state.fov_degrees - dir * self.zoom_step).clamp(self.min_fov, self.max_fov);
        projection.set_fov(state.fov_degrees);
    }

    pub fn reset_zoom(&self, state: &mut CameraState, projection: &mut Projection) {
        state.fov_degrees = self.default_fov;
        projection.set_fov(state.fov_degrees);
    }

    /// Max speed follows the shift key; called on every special key transition.
    pub fn set_boost(&self, state: &mut CameraState, boost: bool) {
        state.max_speed = if boost { self.boost_speed } else { self.base_speed };
    }

    /// Set or clear acceleration along one axis (0 = X, 1 = Y, 2 = Z).
    pub fn accelerate(&self, state: &mut CameraState, axis: usize, sign: f32) {
        state.acceleration[axis] = sign * state.accel_magnitude;
    }

    /// Stop dead along one axis.
    pub fn stop(&self, state: &mut CameraState, axis: usize) {
        state.acceleration[axis] = 0.0;
        state.velocity[axis] = 0.0;
    }

    pub fn pitch_degrees(&self, view: &Mat4) -> f32 {
        camera::extract_pitch(view).to_degrees()
    }

    pub fn eye(&self, view: &Mat4) -> Vec3 {
        camera::eye_position(view)
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    #[test]
    fn one_second_forward_moves_four_units() {
        let ctrl = CameraController::new();
        let mut state = CameraState::new();
        let mut view = Mat4::IDENTITY;
        ctrl.accelerate(&mut state, 2, 1.0);

        ctrl.update_view(&mut state, &mut view, 1.0);
        assert_eq!(state.velocity.z, 4.0);
        assert!(approx(ctrl.eye(&view), Vec3::new(0.0, 0.0, -4.0)));
    }

    #[test]
    fn forward_motion_follows_yaw() {
        let ctrl = CameraController::new();
        for yaw in [0.0f32, 0.7, -2.0, 3.0] {
            let mut state = CameraState::new();
            let mut view = Mat4::from_rotation_y(yaw);
            let forward = view.inverse().transform_vector3(Vec3::NEG_Z);
            ctrl.accelerate(&mut state, 2, 1.0);

            ctrl.update_view(&mut state, &mut view, 1.0);
            assert!(approx(ctrl.eye(&view), forward * 4.0), "yaw {yaw}");
        }
    }

    #[test]
    fn forward_motion_stays_level_when_pitched() {
        let ctrl = CameraController::new();
        let mut state = CameraState::new();
        let mut view = Mat4::from_rotation_x(0.6) * Mat4::from_rotation_y(0.3);
        ctrl.accelerate(&mut state, 2, 1.0);

        ctrl.update_view(&mut state, &mut view, 1.0);
        let eye = ctrl.eye(&view);
        assert!(eye.y.abs() < EPS);
        assert!((eye.length() - 4.0).abs() < EPS);
        // pitch untouched by translation
        assert!((camera::extract_pitch(&view) - 0.6).abs() < EPS);
    }

    #[test]
    fn velocity_builds_then_clamps() {
        let ctrl = CameraController::new();
        let mut state = CameraState::new();
        let mut view = Mat4::IDENTITY;
        ctrl.accelerate(&mut state, 0, -1.0);
        for _ in 0..10 {
            ctrl.update_view(&mut state, &mut view, 0.25);
            assert!(state.velocity.x >= -state.max_speed);
        }
        assert_eq!(state.velocity.x, -4.0);
    }

    #[test]
    fn stop_zeroes_axis() {
        let ctrl = CameraController::new();
        let mut state = CameraState::new();
        let mut view = Mat4::IDENTITY;
        ctrl.accelerate(&mut state, 2, 1.0);
        ctrl.accelerate(&mut state, 0, 1.0);
        ctrl.update_view(&mut state, &mut view, 0.3);
        assert!(state.velocity.z > 0.0);

        ctrl.stop(&mut state, 2);
        assert_eq!(state.velocity.z, 0.0);
        assert_eq!(state.acceleration.z, 0.0);
        assert!(state.velocity.x > 0.0);
    }

    #[test]
    fn oversized_look_is_discarded() {
        let ctrl = CameraController::new();
        let original = camera::initial_view();
        for (dx, dy) in [(61.0, 0.0), (0.0, -61.0), (500.0, 500.0)] {
            let mut view = original;
            assert!(!ctrl.apply_look(&mut view, dx, dy));
            assert_eq!(view, original);
        }
        let mut view = original;
        assert!(ctrl.apply_look(&mut view, 59.0, 0.0));
        assert_ne!(view, original);
    }

    #[test]
    fn pitch_is_clamped_to_eighty_degrees() {
        let ctrl = CameraController::new();
        let mut view = camera::initial_view();
        for _ in 0..100 {
            ctrl.apply_look(&mut view, 7.0, 50.0);
            assert!(ctrl.pitch_degrees(&view) <= 80.0 + EPS);
        }
        assert!((ctrl.pitch_degrees(&view) - 80.0).abs() < 0.01);

        for _ in 0..200 {
            ctrl.apply_look(&mut view, -3.0, -50.0);
            assert!(ctrl.pitch_degrees(&view) >= -80.0 - EPS);
        }
        assert!((ctrl.pitch_degrees(&view) + 80.0).abs() < 0.01);
    }

    #[test]
    fn yaw_does_not_disturb_pitch() {
        let ctrl = CameraController::new();
        let mut view = camera::initial_view();
        let pitch = ctrl.pitch_degrees(&view);
        let eye = ctrl.eye(&view);
        ctrl.apply_look(&mut view, 40.0, 0.0);
        assert!((ctrl.pitch_degrees(&view) - pitch).abs() < 0.01);
        // looking around rotates about the eye
        assert!(approx(ctrl.eye(&view), eye));
    }

    #[test]
    fn zoom_is_clamped() {
        let ctrl = CameraController::new();
        let mut state = CameraState::new();
        let mut projection = Projection::new(1280, 720, state.fov_degrees).unwrap();

        for _ in 0..10 {
            ctrl.zoom(&mut state, &mut projection, 1.0);
        }
        assert_eq!(state.fov_degrees, 10.0);
        ctrl.zoom(&mut state, &mut projection, 1.0);
        assert_eq!(state.fov_degrees, 5.0);
        assert_eq!(projection.fov_degrees, 5.0);

        for _ in 0..100 {
            ctrl.zoom(&mut state, &mut projection, -1.0);
            assert!(state.fov_degrees <= 175.0);
        }
        assert_eq!(state.fov_degrees, 175.0);

        ctrl.reset_zoom(&mut state, &mut projection);
        assert_eq!(state.fov_degrees, 60.0);
        assert_eq!(projection, Projection::new(1280, 720, 60.0).unwrap());
    }

    #[test]
    fn boost_switches_max_speed() {
        let ctrl = CameraController::new();
        let mut state = CameraState::new();
        ctrl.set_boost(&mut state, true);
        assert_eq!(state.max_speed, 20.0);
        ctrl.set_boost(&mut state, false);
        assert_eq!(state.max_speed, 4.0);
    }
}
