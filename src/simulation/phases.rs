//! The seven phase tasks the worker pool runs
//!
//! Each task borrows the shared state it needs for exactly one phase. How a
//! phase splits its work:
//! - gravitation, impulse, movement: contiguous ranges of bodies
//! - collision: striped, pair checks get cheaper towards the end
//! - sort: worker 0 alone, the others return at once
//! - projection: contiguous bands of rows, every worker walks all bodies
//! - draw: striped rows of the frame
//!
//! No task lets the split change its result: every body and every pixel sees
//! the same sequence of updates for any number of workers.

use parking_lot::Mutex;

use super::collision::contacts_of;
use super::forces::{apply_impulses, total_pull, Attractor};
use super::integrator::apply_movement;
use super::ordered_set::{OrderedBodySet, SortPass};
use super::params::UniverseConstants;
use super::states::{Body, RunStats};
use crate::error::Outcome;
use crate::scheduler::control::Control;
use crate::scheduler::pool::{Phase, PhaseTask, WorkerSlot};
use crate::visualization::compositor::DepthCompositor;
use crate::visualization::frame::Frame;
use crate::visualization::projector::Projector;

/// Accumulate the pull of all other bodies into every body's impulse
pub struct GravitationTask<'a> {
    pub bodies: &'a OrderedBodySet,
    pub universe: &'a UniverseConstants,
    attractors: Vec<Attractor>,
}

impl<'a> GravitationTask<'a> {
    /// Snapshot the positions and masses the phase sums over
    pub fn new(bodies: &'a OrderedBodySet, universe: &'a UniverseConstants) -> Self {
        Self {
            bodies,
            universe,
            attractors: bodies.attractors(),
        }
    }
}

impl PhaseTask for GravitationTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Gravitation
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        for i in slot.contiguous(self.attractors.len()) {
            if !control.checkpoint() {
                return Outcome::Stopped;
            }
            let pull = total_pull(i, &self.attractors, self.universe);
            self.bodies.lock(i).imp += pull;
            control.tick(slot.index);
        }
        Outcome::Success
    }
}

/// Turn impulses into accelerations, recording the largest one
pub struct ImpulseTask<'a> {
    pub bodies: &'a OrderedBodySet,
    pub universe: &'a UniverseConstants,
    pub step_fraction: f64,
    pub stats: &'a Mutex<RunStats>,
}

impl PhaseTask for ImpulseTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Impulse
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        let mut max_accel: f64 = 0.0;
        let mut outcome = Outcome::Success;

        for i in slot.contiguous(self.bodies.len()) {
            if !control.checkpoint() {
                outcome = Outcome::Stopped;
                break;
            }
            let accel = apply_impulses(&mut self.bodies.lock(i), self.universe, self.step_fraction);
            max_accel = max_accel.max(accel);
            control.tick(slot.index);
        }

        let mut stats = self.stats.lock();
        stats.max_accel = stats.max_accel.max(max_accel);
        outcome
    }
}

/// Move every body one step, recording the fastest and the nearest one
pub struct MovementTask<'a> {
    pub bodies: &'a OrderedBodySet,
    pub universe: &'a UniverseConstants,
    pub step_fraction: f64,
    pub stats: &'a Mutex<RunStats>,
}

impl PhaseTask for MovementTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Movement
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        let mut max_move: f64 = 0.0;
        let mut min_z = f64::INFINITY;
        let mut outcome = Outcome::Success;

        for i in slot.contiguous(self.bodies.len()) {
            if !control.checkpoint() {
                outcome = Outcome::Stopped;
                break;
            }
            let mut body = self.bodies.lock(i);
            let speed = apply_movement(&mut body, self.universe, self.step_fraction);
            max_move = max_move.max(speed);
            if !body.is_destroyed() {
                min_z = min_z.min(body.pos.z);
            }
            control.tick(slot.index);
        }

        let mut stats = self.stats.lock();
        stats.max_move = stats.max_move.max(max_move);
        stats.min_z = stats.min_z.min(min_z);
        outcome
    }
}

/// Restore the distance order; only worker 0 sorts
pub struct SortTask<'a> {
    pub bodies: Mutex<&'a mut OrderedBodySet>,
}

impl<'a> SortTask<'a> {
    pub fn new(bodies: &'a mut OrderedBodySet) -> Self {
        Self { bodies: Mutex::new(bodies) }
    }
}

impl PhaseTask for SortTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Sort
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        if slot.index != 0 {
            return Outcome::Success;
        }
        let mut bodies = self.bodies.lock();
        match bodies.sort(control) {
            SortPass::Complete => {
                debug_assert!(bodies.is_sorted());
                Outcome::Success
            }
            SortPass::Interrupted | SortPass::Cancelled => Outcome::Stopped,
        }
    }
}

/// Find every touching pair; merging them is left to the caller
pub struct CollisionTask<'a> {
    pub bodies: &'a OrderedBodySet,
    pub universe: &'a UniverseConstants,
    pub contacts: Mutex<Vec<(usize, usize)>>,
}

impl<'a> CollisionTask<'a> {
    pub fn new(bodies: &'a OrderedBodySet, universe: &'a UniverseConstants) -> Self {
        Self {
            bodies,
            universe,
            contacts: Mutex::new(Vec::new()),
        }
    }

    pub fn into_contacts(self) -> Vec<(usize, usize)> {
        self.contacts.into_inner()
    }
}

impl PhaseTask for CollisionTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Collision
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        let mut found = Vec::new();
        let mut outcome = Outcome::Success;

        for i in slot.striped(self.bodies.len()) {
            if !control.checkpoint() {
                outcome = Outcome::Stopped;
                break;
            }
            found.extend(contacts_of(self.bodies, i, self.universe).into_iter().map(|j| (i, j)));
            control.tick(slot.index);
        }

        if !found.is_empty() {
            self.contacts.lock().append(&mut found);
        }
        outcome
    }
}

/// Project every body, in set order, into each worker's band of rows
pub struct ProjectTask<'a> {
    pub bodies: &'a [Body],
    pub projector: Projector<'a>,
    pub out: &'a DepthCompositor,
}

impl PhaseTask for ProjectTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Project
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        let rows = slot.contiguous(self.out.height());
        if rows.is_empty() {
            return Outcome::Success;
        }
        for body in self.bodies {
            if !control.checkpoint() {
                return Outcome::Stopped;
            }
            let outcome = self.projector.project(body, self.out, rows.clone(), control);
            if !outcome.is_success() {
                return outcome;
            }
            control.tick(slot.index);
        }
        Outcome::Success
    }
}

/// Resolve every pixel into the frame
pub struct DrawTask<'a> {
    pub out: &'a DepthCompositor,
    pub frame: Mutex<Frame>,
}

impl<'a> DrawTask<'a> {
    pub fn new(out: &'a DepthCompositor) -> Self {
        Self {
            out,
            frame: Mutex::new(Frame::new(out.width(), out.height())),
        }
    }

    pub fn into_frame(self) -> Frame {
        self.frame.into_inner()
    }
}

impl PhaseTask for DrawTask<'_> {
    fn phase(&self) -> Phase {
        Phase::Draw
    }

    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome {
        let width = self.out.width();
        let mut row = Frame::new(width, 1);

        for y in slot.striped(self.out.height()) {
            if !control.checkpoint() {
                return Outcome::Stopped;
            }
            for x in 0..width {
                row.set(x, 0, self.out.resolve_pixel(x, y));
            }
            self.frame.lock().copy_row(y, &row.pixels);
            control.tick(slot.index);
        }
        Outcome::Success
    }
}
