use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

use crate::config::{CameraConfig, ControlsConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective camera orbiting a target point (Y up)
///
/// The eye sits on a sphere around `target`: `yaw` turns around the Y axis
/// (0 looks down -Z from +Z), `pitch` lifts the eye above the XZ plane.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub projection: Matrix4<f32>,
    pub uniform: CameraUniform,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        self.projection * view
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(), // Will be auto-calculted in `update()` nevertheless.
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Deg(45.0).into(),
            znear: 0.1,
            zfar: 100.0,
            projection: Matrix4::identity(),
            uniform: CameraUniform::default(),
        };
        camera.update();
        camera.update_projection_matrix();
        camera
    }

    /// Places the camera at `position`, looking at `target`
    pub fn from_position(position: Vector3<f32>, target: Vector3<f32>, aspect: f32) -> Self {
        let offset = position - target;
        let distance = offset.magnitude().max(f32::EPSILON);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let yaw = offset.x.atan2(offset.z);
        Self::new(distance, pitch, yaw, target, aspect)
    }

    pub fn from_config(camera: &CameraConfig, controls: &ControlsConfig, aspect: f32) -> Self {
        let mut orbit = Self::from_position(camera.position.into(), camera.target.into(), aspect);
        orbit.fovy = Deg(camera.fov_degrees).into();
        orbit.znear = camera.near;
        orbit.zfar = camera.far;
        orbit.bounds.min_distance = Some(controls.min_distance);
        orbit.bounds.max_distance = Some(controls.max_distance);
        orbit.update_projection_matrix();
        orbit.update_view_proj();
        orbit
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    pub fn add_distance(&mut self, delta: f32) {
        let corrected_zoom = f32::log10(self.distance.max(1.1)) * delta;
        self.set_distance(self.distance + corrected_zoom);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.clamp(min_yaw, f32::MAX);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.clamp(f32::MIN, max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Pans the camera relative to the current view direction
    /// delta.0 = horizontal pan (left/right relative to camera view)
    /// delta.1 = vertical pan (up/down relative to camera view)
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        // Scale pan movement by distance for consistent feel at all zoom levels
        let pan_scale = self.distance * 0.1;

        let total_movement = right * delta.0 * pan_scale + up * delta.1 * pan_scale;

        self.target += total_movement;
        self.update();
    }

    /// Updates the camera after changing `distance`, `pitch` or `yaw`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    /// Sets the aspect ratio; call [`Self::update_projection_matrix`] afterwards
    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn update_view_proj(&mut self) {
        let view_proj = self.build_view_projection_matrix();
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(view_proj);
        self.uniform.inv_view_proj =
            convert_matrix4_to_array(view_proj.invert().unwrap_or_else(Matrix4::identity));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: None,
            max_distance: Some(50.0),
            min_pitch: -std::f32::consts::PI / 2.0 + 0.01,
            max_pitch: std::f32::consts::PI / 2.0 - 0.01,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    #[test]
    fn test_from_position_reproduces_eye() {
        let camera = OrbitCamera::from_position(
            Vector3::new(3.5, 2.8, 5.0),
            Vector3::zero(),
            16.0 / 9.0,
        );
        assert_close(camera.eye.x, 3.5);
        assert_close(camera.eye.y, 2.8);
        assert_close(camera.eye.z, 5.0);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.0, Vector3::zero(), 1.0);
        let before = camera.projection;
        camera.resize_projection(800, 600);
        camera.update_projection_matrix();
        assert_close(camera.aspect, 800.0 / 600.0);
        assert_ne!(before, camera.projection);
    }

    #[test]
    fn test_zero_height_keeps_aspect() {
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.0, Vector3::zero(), 1.5);
        camera.resize_projection(800, 0);
        assert_close(camera.aspect, 1.5);
    }

    #[test]
    fn test_distance_bounds() {
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.0, Vector3::zero(), 1.0);
        camera.bounds.min_distance = Some(1.0);
        camera.set_distance(0.1);
        assert_close(camera.distance, 1.0);
        camera.set_distance(500.0);
        assert_close(camera.distance, 50.0);
    }

    #[test]
    fn test_pitch_never_reaches_pole() {
        let mut camera = OrbitCamera::new(5.0, 0.0, 0.0, Vector3::zero(), 1.0);
        camera.add_pitch(10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
    }
}
