//! Confetti engine: particle pool, frame loop lifecycle, and surface ownership.
//!
//! The engine is `Idle` (no particles, no frame scheduled) or `Running`
//! (particles alive, exactly one frame task queued). Bursts while running
//! merge into the same pool and loop.

use std::time::Duration;

use advent_platform::{RenderSurface, Scheduler, SurfaceHost, SurfaceRect, TaskHandle};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::ConfettiPreset;
use crate::error::SurfaceError;
use crate::particle::{spawn, Particle};
use crate::physics;
use crate::render;
use crate::schedule::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

pub struct ConfettiEngine {
    preset: ConfettiPreset,
    particles: Vec<Particle>,
    rng: StdRng,
    surface: Option<Box<dyn RenderSurface>>,
    bounds: SurfaceRect,
    frame: Option<TaskHandle>,
    last_frame: Option<Duration>,
    /// Simulated seconds since the current run started; drives the wind field.
    elapsed: f32,
}

impl ConfettiEngine {
    /// Creates the engine and asks `host` for a surface over `area`. Without a
    /// surface the engine still exists but every burst is a no-op.
    pub fn new(preset: ConfettiPreset, host: &mut dyn SurfaceHost, area: SurfaceRect) -> Self {
        let surface = match host.create_surface(area) {
            Ok(surface) => Some(surface),
            Err(err) => {
                let err = SurfaceError::Unavailable(err.to_string());
                warn!("confetti: {err}; bursts are disabled");
                None
            }
        };
        Self::with_surface(preset, surface, area)
    }

    pub fn with_surface(
        mut preset: ConfettiPreset,
        surface: Option<Box<dyn RenderSurface>>,
        area: SurfaceRect,
    ) -> Self {
        preset.sanitize();
        let rng = match preset.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            preset,
            particles: Vec::new(),
            rng,
            surface,
            bounds: area,
            frame: None,
            last_frame: None,
            elapsed: 0.0,
        }
    }

    pub fn state(&self) -> EngineState {
        if self.frame.is_some() {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn bounds(&self) -> SurfaceRect {
        self.bounds
    }

    pub fn preset(&self) -> &ConfettiPreset {
        &self.preset
    }

    /// Spawns up to `count` particles around `origin` and makes sure the frame
    /// loop is running. Returns how many particles were actually added.
    pub fn burst(
        &mut self,
        origin: Vec2,
        count: usize,
        scheduler: &mut dyn Scheduler<Task>,
    ) -> usize {
        if self.surface.is_none() {
            debug!("confetti: burst ignored, no surface");
            return 0;
        }
        let room = (self.preset.max_particles as usize).saturating_sub(self.particles.len());
        let spawned = count.min(self.preset.max_burst as usize).min(room);
        if spawned < count {
            debug!("confetti: burst of {count} clamped to {spawned}");
        }
        for _ in 0..spawned {
            let particle = spawn(&mut self.rng, origin, &self.preset);
            self.particles.push(particle);
        }
        if spawned > 0 && self.frame.is_none() {
            self.frame = Some(scheduler.schedule_frame(Task::ConfettiFrame));
            self.elapsed = 0.0;
            info!(
                "confetti: running ({} particles at {:.0},{:.0})",
                self.particles.len(),
                origin.x,
                origin.y
            );
        }
        spawned
    }

    /// Handles a [`Task::ConfettiFrame`]: steps physics, redraws, and either
    /// queues the next frame or goes idle.
    pub fn on_frame(&mut self, now: Duration, scheduler: &mut dyn Scheduler<Task>) {
        // The frame task is one-shot; it has fired.
        self.frame = None;
        let dt = match self.last_frame {
            Some(last) => now.saturating_sub(last).as_secs_f32(),
            None => 1.0 / 60.0,
        }
        .clamp(0.0, self.preset.max_frame_dt);
        self.last_frame = Some(now);
        self.advance(dt);

        if self.particles.is_empty() {
            self.last_frame = None;
            self.clear_surface();
            info!("confetti: idle after {:.2}s", self.elapsed);
        } else {
            self.redraw();
            self.frame = Some(scheduler.schedule_frame(Task::ConfettiFrame));
        }
    }

    /// Steps the simulation by `dt` seconds without touching the surface or scheduler.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        physics::step(&mut self.particles, dt, self.elapsed, &self.bounds, &self.preset);
    }

    /// Applies a new viewport. Particles in flight keep their state.
    pub fn resize(&mut self, rect: SurfaceRect) {
        self.bounds = rect;
        if let Some(surface) = self.surface.as_mut() {
            if let Err(err) = surface.resize(rect) {
                warn!("confetti: surface resize failed: {err}");
            }
        }
        debug!(
            "confetti: resized to {}x{} @ {}x",
            rect.width, rect.height, rect.scale_factor
        );
    }

    fn redraw(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let instances = render::instances(&self.particles, &self.preset);
        if let Err(err) = render::paint(&instances, surface.as_mut()) {
            warn!("confetti: paint failed: {err}");
        }
    }

    fn clear_surface(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            if let Err(err) = surface.clear() {
                warn!("confetti: clear failed: {err}");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use advent_platform::{RenderSurface, Result, SurfaceHost, SurfaceRect};

    /// What a [`RecordingSurface`] has seen, shared with the test.
    #[derive(Debug, Default)]
    pub struct Recording {
        pub clears: usize,
        pub polygons: usize,
        pub last_frame_polygons: usize,
        pub resizes: Vec<SurfaceRect>,
    }

    pub struct RecordingSurface(pub Rc<RefCell<Recording>>);

    impl RenderSurface for RecordingSurface {
        fn resize(&mut self, rect: SurfaceRect) -> Result<()> {
            self.0.borrow_mut().resizes.push(rect);
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            let mut rec = self.0.borrow_mut();
            rec.clears += 1;
            rec.last_frame_polygons = 0;
            Ok(())
        }

        fn fill_convex(&mut self, points: &[[f32; 2]], _rgba: [f32; 4]) -> Result<()> {
            assert!(points.len() >= 3);
            let mut rec = self.0.borrow_mut();
            rec.polygons += 1;
            rec.last_frame_polygons += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingHost(pub Rc<RefCell<Recording>>);

    impl SurfaceHost for RecordingHost {
        fn create_surface(&mut self, _area: SurfaceRect) -> Result<Box<dyn RenderSurface>> {
            Ok(Box::new(RecordingSurface(Rc::clone(&self.0))))
        }
    }

    pub struct NoSurfaceHost;

    impl SurfaceHost for NoSurfaceHost {
        fn create_surface(&mut self, _area: SurfaceRect) -> Result<Box<dyn RenderSurface>> {
            Err("no canvas support".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::testing::{NoSurfaceHost, RecordingHost};
    use super::*;
    use crate::schedule::CooperativeScheduler;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn engine(host: &mut dyn SurfaceHost) -> ConfettiEngine {
        let preset = ConfettiPreset {
            seed: Some(42),
            ..ConfettiPreset::default()
        };
        ConfettiEngine::new(preset, host, SurfaceRect::new(1280.0, 800.0, 2.0))
    }

    /// Runs frames until the engine idles; returns simulated seconds elapsed.
    fn run_to_idle(engine: &mut ConfettiEngine, scheduler: &mut CooperativeScheduler<Task>) -> f32 {
        let mut now = Duration::ZERO;
        let mut frames = 0;
        while engine.state() == EngineState::Running {
            assert!(frames < 10_000, "engine never went idle");
            for task in scheduler.take_frame() {
                assert_eq!(task, Task::ConfettiFrame);
                engine.on_frame(now, scheduler);
            }
            now += FRAME;
            frames += 1;
        }
        frames as f32 * FRAME.as_secs_f32()
    }

    #[test]
    fn burst_runs_then_returns_to_idle_within_max_lifetime() {
        let mut host = RecordingHost::default();
        let recording = Rc::clone(&host.0);
        let mut engine = engine(&mut host);
        let mut scheduler = CooperativeScheduler::<Task>::new();

        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.burst(Vec2::new(100.0, 100.0), 50, &mut scheduler), 50);
        assert_eq!(engine.state(), EngineState::Running);

        let seconds = run_to_idle(&mut engine, &mut scheduler);
        assert!(engine.particles().is_empty());
        assert!(!scheduler.has_frame_pending());
        assert!(seconds <= engine.preset().max_lifetime() + 0.1, "took {seconds}s");

        let rec = recording.borrow();
        assert!(rec.polygons > 0);
        assert_eq!(rec.last_frame_polygons, 0, "surface left dirty after idle");
    }

    #[test]
    fn concurrent_bursts_share_one_loop() {
        let mut host = RecordingHost::default();
        let mut engine = engine(&mut host);
        let mut scheduler = CooperativeScheduler::<Task>::new();

        engine.burst(Vec2::new(300.0, 700.0), 20, &mut scheduler);
        engine.burst(Vec2::new(900.0, 700.0), 20, &mut scheduler);
        assert_eq!(engine.particles().len(), 40);
        assert_eq!(scheduler.take_frame().len(), 1);
        engine.on_frame(Duration::ZERO, &mut scheduler);

        engine.burst(Vec2::new(600.0, 700.0), 5, &mut scheduler);
        assert_eq!(scheduler.take_frame().len(), 1);
    }

    #[test]
    fn idle_engine_restarts_on_next_burst() {
        let mut host = RecordingHost::default();
        let mut engine = engine(&mut host);
        let mut scheduler = CooperativeScheduler::<Task>::new();

        engine.burst(Vec2::new(640.0, 600.0), 10, &mut scheduler);
        run_to_idle(&mut engine, &mut scheduler);
        assert_eq!(engine.state(), EngineState::Idle);

        engine.burst(Vec2::new(640.0, 600.0), 10, &mut scheduler);
        assert_eq!(engine.state(), EngineState::Running);
        assert!(scheduler.has_frame_pending());
    }

    #[test]
    fn bursts_are_bounded() {
        let mut host = RecordingHost::default();
        let mut engine = engine(&mut host);
        let mut scheduler = CooperativeScheduler::<Task>::new();
        let preset = engine.preset().clone();

        assert_eq!(
            engine.burst(Vec2::ZERO, 10_000, &mut scheduler),
            preset.max_burst as usize
        );
        for _ in 0..10 {
            engine.burst(Vec2::ZERO, 10_000, &mut scheduler);
        }
        assert_eq!(engine.particles().len(), preset.max_particles as usize);
        assert_eq!(engine.burst(Vec2::ZERO, 0, &mut scheduler), 0);
    }

    #[test]
    fn missing_surface_turns_bursts_into_no_ops() {
        let mut engine = engine(&mut NoSurfaceHost);
        let mut scheduler = CooperativeScheduler::<Task>::new();
        assert!(!engine.has_surface());
        assert_eq!(engine.burst(Vec2::new(100.0, 100.0), 50, &mut scheduler), 0);
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(!scheduler.has_frame_pending());
    }

    #[test]
    fn resize_keeps_particles_in_flight() {
        let mut host = RecordingHost::default();
        let recording = Rc::clone(&host.0);
        let mut engine = engine(&mut host);
        let mut scheduler = CooperativeScheduler::<Task>::new();

        engine.burst(Vec2::new(640.0, 600.0), 30, &mut scheduler);
        scheduler.take_frame();
        engine.on_frame(Duration::ZERO, &mut scheduler);
        let before: Vec<_> = engine.particles().iter().map(|p| (p.pos, p.vel)).collect();

        let rect = SurfaceRect::new(1920.0, 1080.0, 1.5);
        engine.resize(rect);
        let after: Vec<_> = engine.particles().iter().map(|p| (p.pos, p.vel)).collect();
        assert_eq!(before, after);
        assert_eq!(engine.bounds(), rect);
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(recording.borrow().resizes, [rect]);
    }

    #[test]
    fn unusable_frame_step_still_reaches_idle() {
        for max_frame_dt in [0.0, -0.05, f32::NAN] {
            let preset = ConfettiPreset {
                seed: Some(9),
                max_frame_dt,
                ..ConfettiPreset::default()
            };
            let mut host = RecordingHost::default();
            let mut engine =
                ConfettiEngine::new(preset, &mut host, SurfaceRect::new(1280.0, 800.0, 1.0));
            let mut scheduler = CooperativeScheduler::<Task>::new();

            assert!(engine.preset().max_frame_dt > 0.0);
            engine.burst(Vec2::new(640.0, 600.0), 50, &mut scheduler);
            let seconds = run_to_idle(&mut engine, &mut scheduler);
            assert!(seconds <= engine.preset().max_lifetime() + 0.1, "took {seconds}s");
        }
    }

    #[test]
    fn long_frame_gaps_are_clamped() {
        let mut host = RecordingHost::default();
        let mut engine = engine(&mut host);
        let mut scheduler = CooperativeScheduler::<Task>::new();

        engine.burst(Vec2::new(640.0, 600.0), 5, &mut scheduler);
        scheduler.take_frame();
        engine.on_frame(Duration::ZERO, &mut scheduler);
        let age = engine.particles()[0].age;
        scheduler.take_frame();
        engine.on_frame(Duration::from_secs(30), &mut scheduler);
        if let Some(p) = engine.particles().first() {
            assert!(p.age - age <= engine.preset().max_frame_dt + 1e-6);
        }
    }
}
