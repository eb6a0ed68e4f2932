//! The simulation run loop
//!
//! `Simulation` owns everything a run mutates (bodies, compositor, running
//! statistics) apart from what it only reads (constants, schedule, color and
//! noise sources). Every simulated second runs
//!
//! 1. gravitation, unless adaptive mode says the last result is still good
//! 2. impulses into accelerations
//! 3. for every frame due in this second (at least one step):
//!    movement, sort, collisions, and if due projection, draw and emit
//!
//! Every phase is handed to the worker pool and fully finished before the
//! next one starts. Results do not depend on the number of workers.

use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use super::collision::resolve_contacts;
use super::ordered_set::OrderedBodySet;
use super::params::UniverseConstants;
use super::phases::{CollisionTask, DrawTask, GravitationTask, ImpulseTask, MovementTask, ProjectTask, SortTask};
use super::scenario::build_bodies;
use super::states::{Body, RunStats};
use super::timing::FrameSchedule;
use crate::configuration::config::SimulationConfig;
use crate::error::{Outcome, SimError};
use crate::persistence::store::SavedState;
use crate::scheduler::control::Control;
use crate::scheduler::pool::{PhaseTask, WorkerPool};
use crate::visualization::camera::CameraGeometry;
use crate::visualization::colormap::StellarColorMap;
use crate::visualization::compositor::{DepthCompositor, MIN_DUST_RANGE};
use crate::visualization::frame::FrameSink;
use crate::visualization::noise::GradientNoise;
use crate::visualization::projector::Projector;

pub struct Simulation {
    config: SimulationConfig,
    universe: UniverseConstants,
    camera: CameraGeometry,
    schedule: FrameSchedule,
    noise: GradientNoise,
    colors: StellarColorMap,
    bodies: OrderedBodySet,
    compositor: DepthCompositor,
    stats: Mutex<RunStats>,
    pool: WorkerPool,
    seconds_done: u64, // simulated seconds
    frame_in_cycle: usize, // next frame of the current cycle
    frames_done: u64, // frames emitted, including those of a loaded run
    gravitation_ready: bool, // impulses hold a gravitation result
}

impl Simulation {
    /// Fresh run with bodies from the configuration
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        let universe = universe_of(&config);
        let camera = camera_of(&config, &universe);
        let noise = GradientNoise::new(config.engine.seed);
        let bodies = build_bodies(&config, &universe, &camera, &noise);
        Self::assemble(config, universe, camera, noise, bodies)
    }

    /// Fresh run with the given bodies
    pub fn with_bodies(config: SimulationConfig, bodies: Vec<Body>) -> Result<Self, SimError> {
        let universe = universe_of(&config);
        let camera = camera_of(&config, &universe);
        let noise = GradientNoise::new(config.engine.seed);
        Self::assemble(config, universe, camera, noise, bodies)
    }

    /// Continue the run saved in the configured state file
    ///
    /// A missing or malformed state is not fatal: the run starts fresh.
    pub fn resume_or_new(config: SimulationConfig) -> Result<Self, SimError> {
        let Some(path) = config.output.state_file.clone() else {
            warn!("no state file configured, starting fresh");
            return Self::new(config);
        };

        match SavedState::load(&path) {
            Ok(state) => {
                info!(
                    "loaded {} bodies from {} (second {}, frame {})",
                    state.bodies.len(),
                    path.display(),
                    state.seconds_done,
                    state.frame
                );
                let (seconds_done, frame) = (state.seconds_done, state.frame);
                let mut sim = Self::with_bodies(config, state.into_bodies())?;
                sim.seconds_done = seconds_done;
                sim.frames_done = frame;
                sim.frame_in_cycle = (frame % sim.schedule.fps() as u64) as usize;
                Ok(sim)
            }
            Err(e) => {
                warn!("could not load {}: {}, starting fresh", path.display(), e);
                Self::new(config)
            }
        }
    }

    fn assemble(
        config: SimulationConfig,
        universe: UniverseConstants,
        camera: CameraGeometry,
        noise: GradientNoise,
        bodies: Vec<Body>,
    ) -> Result<Self, SimError> {
        let schedule = FrameSchedule::new(config.engine.fps, config.engine.seconds_per_cycle);
        let bodies = OrderedBodySet::from_bodies(bodies)?;
        let compositor = DepthCompositor::new(config.screen.width, config.screen.height, MIN_DUST_RANGE)?;
        let pool = WorkerPool::new(config.engine.workers)?;

        let stats = RunStats {
            min_z: camera.max_z,
            ..RunStats::default()
        };

        Ok(Self {
            config,
            universe,
            camera,
            schedule,
            noise,
            colors: StellarColorMap::new(),
            bodies,
            compositor,
            stats: Mutex::new(stats),
            pool,
            seconds_done: 0,
            frame_in_cycle: 0,
            frames_done: 0,
            gravitation_ready: false,
        })
    }

    /// Handle to pause or stop the run from another thread
    pub fn control(&self) -> Arc<Control> {
        self.pool.control()
    }

    pub fn bodies(&self) -> &OrderedBodySet {
        &self.bodies
    }

    pub fn universe(&self) -> &UniverseConstants {
        &self.universe
    }

    pub fn camera(&self) -> &CameraGeometry {
        &self.camera
    }

    pub fn stats(&self) -> RunStats {
        self.stats.lock().clone()
    }

    pub fn seconds_done(&self) -> u64 {
        self.seconds_done
    }

    pub fn frames_done(&self) -> u64 {
        self.frames_done
    }

    /// Run until the frame limit, a cancel request or a fatal error
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Outcome {
        let limit = self.config.engine.frames;
        let start_frames = self.frames_done;
        info!(
            "starting with {} bodies on {} workers, {} frames per {} s",
            self.bodies.len(),
            self.pool.size(),
            self.schedule.fps(),
            self.schedule.seconds_per_cycle()
        );

        let outcome = loop {
            if limit > 0 && self.frames_done - start_frames >= limit {
                break Outcome::Success;
            }
            if self.bodies.alive() < 2 {
                info!("less than two bodies left, nothing more to simulate");
                break Outcome::Success;
            }
            if let Err(outcome) = self.step_second(sink, limit, start_frames) {
                break outcome;
            }
        };

        match &outcome {
            Outcome::Success => info!("run finished after {} s, {} frames", self.seconds_done, self.frames_done),
            Outcome::Stopped => info!("run stopped after {} s, {} frames", self.seconds_done, self.frames_done),
            Outcome::Fatal(e) => error!("run failed: {}", e),
        }

        if !matches!(outcome, Outcome::Fatal(_)) {
            if let Err(e) = self.save() {
                return Outcome::Fatal(e);
            }
        }
        outcome
    }

    /// Simulate one second and draw every frame due in it
    pub fn step_second(&mut self, sink: &mut dyn FrameSink, limit: u64, start_frames: u64) -> Result<(), Outcome> {
        let engine = &self.config.engine;
        let adaptive = engine.adaptive_gravitation;
        let collisions = engine.collisions;

        // 1: gravitation
        if self.needs_gravitation(adaptive) {
            if !adaptive {
                for i in 0..self.bodies.len() {
                    self.bodies.get_mut(i).reset_impulse();
                }
            }
            let task = GravitationTask::new(&self.bodies, &self.universe);
            run_phase(&self.pool, &task)?;
            self.gravitation_ready = true;
        }

        // 2: impulses
        self.stats.lock().max_accel = 0.0;
        let task = ImpulseTask {
            bodies: &self.bodies,
            universe: &self.universe,
            step_fraction: self.schedule.step_fraction(),
            stats: &self.stats,
        };
        run_phase(&self.pool, &task)?;

        // 3: the second itself
        if self.frame_in_cycle >= self.schedule.fps() {
            self.frame_in_cycle = 0;
        }
        self.seconds_done += 1;
        let second = self.schedule.second_in_cycle(self.seconds_done);

        // bodies start unsettled, so the first second goes without collisions
        let first_second = self.seconds_done == 1;

        loop {
            self.move_and_sort()?;

            if collisions && !first_second {
                self.collide()?;
            }

            if !self.schedule.is_due(self.frame_in_cycle, second) {
                break;
            }

            self.draw_frame(sink)?;
            self.frame_in_cycle += 1;

            let removed = self.bodies.remove_gone(&self.universe);
            if removed > 0 {
                debug!("removed {} faded remnants", removed);
            }

            let every = self.config.engine.save_every;
            if every > 0 && self.frames_done % every == 0 {
                self.save().map_err(Outcome::Fatal)?;
            }

            if limit > 0 && self.frames_done - start_frames >= limit {
                return Ok(());
            }
            if !self.schedule.is_due(self.frame_in_cycle, second) {
                break;
            }
        }

        if collisions && first_second {
            self.collide()?;
        }

        let stats = self.stats.lock();
        debug!(
            "second {}: max accel {:.3e}, max move {:.3e}, accumulated move {:.3e}",
            self.seconds_done, stats.max_accel, stats.max_move, stats.curr_move
        );
        Ok(())
    }

    fn needs_gravitation(&mut self, adaptive: bool) -> bool {
        if !adaptive || !self.gravitation_ready {
            return true;
        }
        let mut stats = self.stats.lock();
        if stats.curr_move >= self.universe.regravitate_distance {
            stats.curr_move -= self.universe.regravitate_distance;
            true
        } else {
            false
        }
    }

    fn move_and_sort(&mut self) -> Result<(), Outcome> {
        {
            let mut stats = self.stats.lock();
            stats.max_move = 0.0;
            stats.min_z = self.camera.max_z;
        }
        let task = MovementTask {
            bodies: &self.bodies,
            universe: &self.universe,
            step_fraction: self.schedule.step_fraction(),
            stats: &self.stats,
        };
        run_phase(&self.pool, &task)?;

        {
            let mut stats = self.stats.lock();
            stats.curr_move += stats.max_move;
            self.camera.follow(stats.min_z);
        }

        let task = SortTask::new(&mut self.bodies);
        run_phase(&self.pool, &task)
    }

    fn collide(&self) -> Result<(), Outcome> {
        let task = CollisionTask::new(&self.bodies, &self.universe);
        run_phase(&self.pool, &task)?;
        let mut contacts = task.into_contacts();
        let merged = resolve_contacts(&self.bodies, &mut contacts, &self.universe);
        if merged > 0 {
            debug!("{} merges, {} bodies alive", merged, self.bodies.alive());
        }
        Ok(())
    }

    fn draw_frame(&mut self, sink: &mut dyn FrameSink) -> Result<(), Outcome> {
        let projector = Projector {
            universe: &self.universe,
            camera: &self.camera,
            colors: &self.colors,
            noise: &self.noise,
            cycles_per_frame: self.schedule.cycles_per_frame(),
        };
        let bodies = self.bodies.snapshot();
        let task = ProjectTask {
            bodies: &bodies,
            projector,
            out: &self.compositor,
        };
        run_phase(&self.pool, &task)?;

        // rings only grow once the frame they were drawn in is complete
        let projector = task.projector;
        for i in 0..self.bodies.len() {
            projector.advance_ring(self.bodies.get_mut(i));
        }

        let task = DrawTask::new(&self.compositor);
        run_phase(&self.pool, &task)?;
        let frame = task.into_frame();

        sink.emit(&frame).map_err(|e| Outcome::Fatal(SimError::from(e)))?;
        self.frames_done += 1;
        info!(
            "frame {} done at second {}, {} bodies alive",
            self.frames_done,
            self.seconds_done,
            self.bodies.alive()
        );
        Ok(())
    }

    /// Write the current state to the configured state file, if any
    pub fn save(&self) -> Result<(), SimError> {
        let Some(path) = &self.config.output.state_file else {
            return Ok(());
        };
        let state = SavedState::new(self.seconds_done, self.frames_done, self.bodies.records());
        state.save(path)?;
        info!("saved {} bodies to {}", state.bodies.len(), path.display());
        Ok(())
    }
}

/// Run one phase on the pool, turning anything but success into an early return
fn run_phase<T: PhaseTask>(pool: &WorkerPool, task: &T) -> Result<(), Outcome> {
    match pool.run(task) {
        Outcome::Success => Ok(()),
        other => Err(other),
    }
}

fn universe_of(config: &SimulationConfig) -> UniverseConstants {
    let u = &config.universe;
    UniverseConstants::from_reference(u.pixels_per_reference, u.reference_radius, u.reference_mass, u.unit_mass)
}

fn camera_of(config: &SimulationConfig, u: &UniverseConstants) -> CameraGeometry {
    let s = &config.screen;
    CameraGeometry::new(u, s.width, s.height, s.fov, s.half_x, s.half_y, s.dynamic_camera)
}
