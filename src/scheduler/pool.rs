//! Fixed-size worker pool running one phase at a time
//!
//! Every phase is a [`PhaseTask`]. The pool keeps its rayon threads for the
//! whole run, broadcasts each phase to all of them with a [`WorkerSlot`]
//! describing the worker's partition of the index space, and only returns once
//! every worker is done, so two phases never overlap.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::control::Control;
use crate::error::{Outcome, SimError};

/// Minimum time between two progress log lines for one phase
const MONITOR_LOG: Duration = Duration::from_secs(2);

/// The simulation phases, in the order one simulated second runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Gravitation,
    Impulse,
    Movement,
    Sort,
    Collision,
    Project,
    Draw,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Gravitation => "gravitation",
            Phase::Impulse => "impulse",
            Phase::Movement => "movement",
            Phase::Sort => "sort",
            Phase::Collision => "collision",
            Phase::Project => "projection",
            Phase::Draw => "draw",
        };
        f.write_str(name)
    }
}

/// One worker's share of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSlot {
    pub index: usize, // this worker
    pub count: usize, // pool size
}

impl WorkerSlot {
    /// Contiguous block of `0..len`; the first `len % count` workers get one extra item
    pub fn contiguous(&self, len: usize) -> Range<usize> {
        let base = len / self.count;
        let extra = len % self.count;
        let start = self.index * base + self.index.min(extra);
        let size = base + usize::from(self.index < extra);
        start..(start + size)
    }

    /// Every `count`-th index of `0..len`, starting at this worker's index
    pub fn striped(&self, len: usize) -> impl Iterator<Item = usize> {
        (self.index..len).step_by(self.count)
    }
}

/// Work executed by every worker of the pool for one phase
pub trait PhaseTask: Sync {
    fn phase(&self) -> Phase;

    /// Run this worker's share. Implementations poll `control.checkpoint()`
    /// between atomic steps and return `Outcome::Stopped` when it says so.
    fn run(&self, slot: WorkerSlot, control: &Control) -> Outcome;
}

pub struct WorkerPool {
    size: usize,
    threads: ThreadPool,
    control: Arc<Control>,
}

impl WorkerPool {
    /// Start a pool of `size` worker threads (at least one)
    pub fn new(size: usize) -> Result<Self, SimError> {
        let size = size.max(1);
        let threads = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("starfield-worker-{}", i))
            .build()?;
        Ok(Self {
            size,
            threads,
            control: Arc::new(Control::new(size)),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn control(&self) -> Arc<Control> {
        Arc::clone(&self.control)
    }

    /// Run `task` on every worker and wait for all of them (the phase barrier)
    ///
    /// A worker returning `Fatal` cancels the run so the others stop at their
    /// next checkpoint. The most severe outcome of all workers is returned,
    /// the lowest worker index wins between two equally severe ones.
    pub fn run<T: PhaseTask>(&self, task: &T) -> Outcome {
        let control = &*self.control;
        if control.is_cancelled() {
            return Outcome::Stopped;
        }

        let phase = task.phase();
        let started = Instant::now();

        let outcomes: Mutex<Vec<(usize, Outcome)>> = Mutex::new(Vec::with_capacity(self.size));
        let pending = Mutex::new(self.size);
        let done = Condvar::new();

        self.threads.in_place_scope(|s| {
            s.spawn_broadcast(|_, ctx| {
                let index = ctx.index();
                let _leave = Leave { pending: &pending, done: &done };
                let slot = WorkerSlot { index, count: ctx.num_threads() };

                control.start_worker(index);
                let outcome = task.run(slot, control);
                if matches!(outcome, Outcome::Fatal(_)) {
                    control.cancel();
                }
                control.finish_worker(index);
                outcomes.lock().push((index, outcome));
            });

            // Report progress until every worker left the phase
            let mut left = pending.lock();
            while *left > 0 {
                if done.wait_for(&mut left, MONITOR_LOG).timed_out() {
                    debug!(
                        "{} phase: {} of {} workers running, {} items done",
                        phase,
                        control.running_count(),
                        self.size,
                        control.total_progress()
                    );
                }
            }
        });

        let mut outcomes = outcomes.into_inner();
        outcomes.sort_by_key(|(index, _)| *index);
        let outcome = outcomes
            .into_iter()
            .map(|(_, outcome)| outcome)
            .fold(Outcome::Success, Outcome::merge);

        debug!("{} phase finished in {:.3} ms", phase, started.elapsed().as_secs_f64() * 1000.0);

        outcome
    }
}

/// Counts a worker out of the phase, also when its task panics
struct Leave<'a> {
    pending: &'a Mutex<usize>,
    done: &'a Condvar,
}

impl Drop for Leave<'_> {
    fn drop(&mut self) {
        let mut left = self.pending.lock();
        *left -= 1;
        if *left == 0 {
            self.done.notify_all();
        }
    }
}
