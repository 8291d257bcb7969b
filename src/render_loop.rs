//! Per-frame update and draw, stoppable from any thread

use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, error};

use crate::gfx::scene::Scene;

/// Shared stop flag; every clone observes the same state
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Wall-clock time since the loop started, plus per-frame deltas
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Returns `(elapsed, delta)` in seconds and starts a new frame
    pub fn tick(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        (now.duration_since(self.start).as_secs_f32(), delta)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Whatever presents the scene: the GPU renderer in the app, a recorder in tests
pub trait DrawTarget {
    type Error: Display;

    fn draw(&mut self, scene: &mut Scene) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The frame was drawn; the host should schedule another
    Continue,
    /// Cancelled; nothing was drawn
    Stopped,
}

pub struct RenderLoop {
    cancel: CancellationToken,
    clock: FrameClock,
    frames: u64,
}

impl RenderLoop {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            clock: FrameClock::new(),
            frames: 0,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Runs one frame against the real clock
    pub fn tick<T: DrawTarget>(&mut self, scene: &mut Scene, target: &mut T) -> TickOutcome {
        if self.cancel.is_cancelled() {
            return TickOutcome::Stopped;
        }
        let (elapsed, delta) = self.clock.tick();
        self.tick_at(elapsed, delta, scene, target)
    }

    /// Runs one frame at an explicit time
    ///
    /// Orbits the light, refreshes its helper, steps the camera controller
    /// and draws once. A failed draw is logged and the loop keeps going.
    pub fn tick_at<T: DrawTarget>(
        &mut self,
        elapsed_seconds: f32,
        delta_seconds: f32,
        scene: &mut Scene,
        target: &mut T,
    ) -> TickOutcome {
        if self.cancel.is_cancelled() {
            debug!("Render loop cancelled after {} frames", self.frames);
            return TickOutcome::Stopped;
        }

        scene.animate(elapsed_seconds);
        scene.camera_manager.update(delta_seconds);

        if let Err(e) = target.draw(scene) {
            error!("Frame {} failed to draw: {}", self.frames, e);
        }
        self.frames += 1;
        TickOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::viewport::Viewport;

    #[derive(Default)]
    struct Recorder {
        draws: Vec<[f32; 3]>,
        fail: bool,
    }

    impl DrawTarget for Recorder {
        type Error = &'static str;

        fn draw(&mut self, scene: &mut Scene) -> Result<(), Self::Error> {
            self.draws.push(scene.light().position.into());
            if self.fail {
                Err("device lost")
            } else {
                Ok(())
            }
        }
    }

    fn scene() -> Scene {
        Scene::new(&ViewerConfig::default(), Viewport::new(800, 600))
    }

    #[test]
    fn test_tick_orbits_light_then_draws() {
        let mut scene = scene();
        let mut target = Recorder::default();
        let mut render_loop = RenderLoop::new(CancellationToken::new());

        let outcome =
            render_loop.tick_at(std::f32::consts::FRAC_PI_2, 0.016, &mut scene, &mut target);

        assert_eq!(outcome, TickOutcome::Continue);
        assert_eq!(target.draws.len(), 1);
        let [x, y, z] = target.draws[0];
        assert!((x - 1.5).abs() < 1e-5);
        assert_eq!(y, 10.0);
        assert!(z.abs() < 1e-5);
    }

    #[test]
    fn test_cancelled_loop_stops_without_drawing() {
        let mut scene = scene();
        let mut target = Recorder::default();
        let token = CancellationToken::new();
        let mut render_loop = RenderLoop::new(token.clone());

        render_loop.tick(&mut scene, &mut target);
        token.cancel();

        assert_eq!(render_loop.tick(&mut scene, &mut target), TickOutcome::Stopped);
        assert_eq!(
            render_loop.tick_at(1.0, 0.016, &mut scene, &mut target),
            TickOutcome::Stopped
        );
        assert_eq!(target.draws.len(), 1);
        assert_eq!(render_loop.frame_count(), 1);
    }

    #[test]
    fn test_draw_failure_keeps_loop_running() {
        let mut scene = scene();
        let mut target = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut render_loop = RenderLoop::new(CancellationToken::new());

        assert_eq!(
            render_loop.tick_at(0.0, 0.016, &mut scene, &mut target),
            TickOutcome::Continue
        );
        assert_eq!(
            render_loop.tick_at(0.1, 0.016, &mut scene, &mut target),
            TickOutcome::Continue
        );
        assert_eq!(target.draws.len(), 2);
    }

    #[test]
    fn test_tick_applies_auto_rotate() {
        let mut scene = scene();
        let yaw_before = scene.camera_manager.camera.yaw;
        let mut render_loop = RenderLoop::new(CancellationToken::new());

        render_loop.tick_at(0.0, 0.5, &mut scene, &mut Recorder::default());

        assert!(scene.camera_manager.camera.yaw != yaw_before);
    }

    #[test]
    fn test_frame_clock_is_monotonic() {
        let mut clock = FrameClock::new();
        let (first, _) = clock.tick();
        let (second, delta) = clock.tick();
        assert!(second >= first);
        assert!(delta >= 0.0);
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
