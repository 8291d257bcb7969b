use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;
use crate::config::ControlsConfig;

/// Pending orbit motion that has not yet been applied to the camera
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct OrbitDelta {
    yaw: f32,
    pitch: f32,
    zoom: f32,
    pan: (f32, f32),
}

impl OrbitDelta {
    fn scaled(&self, factor: f32) -> Self {
        Self {
            yaw: self.yaw * factor,
            pitch: self.pitch * factor,
            zoom: self.zoom * factor,
            pan: (self.pan.0 * factor, self.pan.1 * factor),
        }
    }

    fn is_negligible(&self) -> bool {
        const EPS: f32 = 1e-6;
        self.yaw.abs() < EPS
            && self.pitch.abs() < EPS
            && self.zoom.abs() < EPS
            && self.pan.0.abs() < EPS
            && self.pan.1.abs() < EPS
    }
}

/// Mouse-driven orbit controls with inertia and auto-rotation
///
/// Input only accumulates motion; [`CameraController::update`] applies it once
/// per frame. With damping enabled each update applies `damping_factor` of the
/// pending motion and keeps the rest, so the camera glides to a stop.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pending: OrbitDelta,
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            enable_damping: false,
            damping_factor: 0.05,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            pending: OrbitDelta::default(),
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    pub fn from_config(controls: &ControlsConfig) -> Self {
        Self {
            pan_speed: controls.pan_speed,
            enable_damping: controls.enable_damping,
            damping_factor: controls.damping_factor.clamp(0.0, 1.0),
            auto_rotate: controls.auto_rotate,
            auto_rotate_speed: controls.auto_rotate_speed,
            ..Self::new(controls.rotate_speed, controls.zoom_speed)
        }
    }

    /// Tracks the primary button; driven from window events so that clicks
    /// captured by the debug panel never start an orbit
    pub fn set_mouse_pressed(&mut self, pressed: bool) {
        self.is_mouse_pressed = pressed;
    }

    pub fn process_events(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::MouseWheel { delta } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 * 0.1
                    }
                };
                self.pending.zoom += scroll_amount * self.zoom_speed;
            }
            DeviceEvent::MouseMotion { delta } => {
                if !self.is_mouse_pressed {
                    return;
                }
                if self.is_shift_held {
                    // SHIFT + DRAG = PAN (move focus point)
                    self.pending.pan.0 -= delta.0 as f32 * self.pan_speed;
                    self.pending.pan.1 += delta.1 as f32 * self.pan_speed;
                } else {
                    self.pending.yaw -= delta.0 as f32 * self.rotate_speed;
                    self.pending.pitch += delta.1 as f32 * self.rotate_speed;
                }
            }
            _ => (),
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, _camera: &mut OrbitCamera) {
        if let KeyEvent {
            physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
            state,
            ..
        } = event
        {
            self.is_shift_held = *state == ElementState::Pressed;
        }
    }

    /// Radians of auto-rotation for a frame lasting `delta_seconds`
    ///
    /// A speed of 1.0 is one full turn per minute.
    pub fn auto_rotation_angle(&self, delta_seconds: f32) -> f32 {
        std::f32::consts::TAU / 60.0 * self.auto_rotate_speed * delta_seconds
    }

    /// Applies pending motion to `camera`; call once per rendered frame
    pub fn update(&mut self, camera: &mut OrbitCamera, delta_seconds: f32) {
        if self.auto_rotate && !self.is_mouse_pressed {
            self.pending.yaw -= self.auto_rotation_angle(delta_seconds);
        }

        let applied = if self.enable_damping {
            let step = self.pending.scaled(self.damping_factor);
            self.pending = self.pending.scaled(1.0 - self.damping_factor);
            if self.pending.is_negligible() {
                self.pending = OrbitDelta::default();
            }
            step
        } else {
            std::mem::take(&mut self.pending)
        };

        if applied.is_negligible() {
            return;
        }

        camera.add_yaw(applied.yaw);
        camera.add_pitch(applied.pitch);
        if applied.zoom != 0.0 {
            camera.add_distance(applied.zoom);
        }
        if applied.pan != (0.0, 0.0) {
            camera.pan(applied.pan);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector3, Zero};

    fn camera() -> OrbitCamera {
        OrbitCamera::new(5.0, 0.3, 0.0, Vector3::zero(), 1.0)
    }

    fn drag(controller: &mut CameraController, dx: f64) {
        controller.set_mouse_pressed(true);
        controller.process_events(&DeviceEvent::MouseMotion { delta: (dx, 0.0) });
        controller.set_mouse_pressed(false);
    }

    #[test]
    fn test_undamped_drag_applies_at_once() {
        let mut controller = CameraController::new(0.01, 0.1);
        let mut camera = camera();
        drag(&mut controller, 10.0);
        controller.update(&mut camera, 1.0 / 60.0);
        assert!((camera.yaw + 0.1).abs() < 1e-5);

        controller.update(&mut camera, 1.0 / 60.0);
        assert!((camera.yaw + 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_damping_keeps_moving_after_release() {
        let mut controller = CameraController::new(0.01, 0.1);
        controller.enable_damping = true;
        controller.damping_factor = 0.05;
        let mut camera = camera();
        drag(&mut controller, 10.0);

        controller.update(&mut camera, 1.0 / 60.0);
        let first = camera.yaw;
        assert!((first + 0.005).abs() < 1e-6);

        controller.update(&mut camera, 1.0 / 60.0);
        assert!(camera.yaw < first);

        for _ in 0..2000 {
            controller.update(&mut camera, 1.0 / 60.0);
        }
        assert!((camera.yaw + 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_auto_rotate_turns_without_input() {
        let mut controller = CameraController::new(0.01, 0.1);
        controller.auto_rotate = true;
        controller.auto_rotate_speed = 2.0;
        let mut camera = camera();

        controller.update(&mut camera, 1.0);
        let expected = std::f32::consts::TAU / 60.0 * 2.0;
        assert!((camera.yaw + expected).abs() < 1e-5);
    }

    #[test]
    fn test_auto_rotate_pauses_while_dragging() {
        let mut controller = CameraController::new(0.01, 0.1);
        controller.auto_rotate = true;
        controller.set_mouse_pressed(true);
        let mut camera = camera();
        controller.update(&mut camera, 1.0);
        assert_eq!(camera.yaw, 0.0);
    }

    #[test]
    fn test_motion_without_button_is_ignored() {
        let mut controller = CameraController::new(0.01, 0.1);
        let mut camera = camera();
        controller.process_events(&DeviceEvent::MouseMotion { delta: (50.0, 50.0) });
        controller.update(&mut camera, 1.0 / 60.0);
        assert_eq!(camera.yaw, 0.0);
    }
}
