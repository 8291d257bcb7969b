//! Window size tracking and resize propagation

use crate::gfx::camera::OrbitCamera;

/// Current drawable size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `width / height`, or 1.0 while either side is zero
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Anything that owns size-dependent GPU state
pub trait DrawSurface {
    fn resize(&mut self, width: u32, height: u32);
}

/// Propagates a window resize to the viewport, the draw surface and the camera.
///
/// A zero-sized event (minimised window) only records the new viewport.
pub fn handle_resize(
    viewport: &mut Viewport,
    camera: &mut OrbitCamera,
    surface: &mut impl DrawSurface,
    width: u32,
    height: u32,
) {
    *viewport = Viewport::new(width, height);
    if viewport.is_empty() {
        return;
    }

    surface.resize(width, height);
    camera.resize_projection(width, height);
    camera.update_projection_matrix();
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector3, Zero};

    #[derive(Default)]
    struct RecordingSurface {
        sizes: Vec<(u32, u32)>,
    }

    impl DrawSurface for RecordingSurface {
        fn resize(&mut self, width: u32, height: u32) {
            self.sizes.push((width, height));
        }
    }

    #[test]
    fn test_resize_to_800_by_600() {
        let mut viewport = Viewport::new(1280, 720);
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.0, Vector3::zero(), viewport.aspect());
        let mut surface = RecordingSurface::default();

        handle_resize(&mut viewport, &mut camera, &mut surface, 800, 600);

        assert_eq!(viewport, Viewport::new(800, 600));
        assert_eq!(surface.sizes, vec![(800, 600)]);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);

        let mut expected = camera;
        expected.update_projection_matrix();
        assert_eq!(camera.projection, expected.projection);
    }

    #[test]
    fn test_minimised_window_leaves_surface_alone() {
        let mut viewport = Viewport::new(1280, 720);
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.0, Vector3::zero(), viewport.aspect());
        let before = camera.projection;
        let mut surface = RecordingSurface::default();

        handle_resize(&mut viewport, &mut camera, &mut surface, 0, 0);

        assert!(viewport.is_empty());
        assert!(surface.sizes.is_empty());
        assert_eq!(camera.projection, before);
    }
}
