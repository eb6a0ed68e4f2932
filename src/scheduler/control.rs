//! Shared run control for the worker pool
//!
//! One `Control` is shared by the coordinating thread, every worker and any
//! host thread that wants to pause or stop the run:
//! - `cancel` is polled by workers at their checkpoints and never reset by them
//! - `pause` makes workers wait at their next checkpoint without losing progress
//! - per-worker progress counters and running flags for status reporting

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// How long a paused worker sleeps between two looks at the flags
const PAUSE_POLL: Duration = Duration::from_millis(5);

#[derive(Debug)]
pub struct Control {
    cancel: AtomicBool,
    pause: AtomicBool,
    progress: Vec<AtomicUsize>, // items done per worker in the current phase
    running: Vec<AtomicBool>, // worker is inside a phase
}

impl Control {
    pub fn new(workers: usize) -> Self {
        Self {
            cancel: AtomicBool::new(false),
            pause: AtomicBool::new(false),
            progress: (0..workers).map(|_| AtomicUsize::new(0)).collect(),
            running: (0..workers).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn workers(&self) -> usize {
        self.progress.len()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    /// Called by workers between two atomic steps.
    /// Blocks while paused; returns false once the run is cancelled.
    pub fn checkpoint(&self) -> bool {
        loop {
            if self.is_cancelled() {
                return false;
            }
            if !self.is_paused() {
                return true;
            }
            thread::sleep(PAUSE_POLL);
        }
    }

    pub(crate) fn start_worker(&self, worker: usize) {
        self.progress[worker].store(0, Ordering::Relaxed);
        self.running[worker].store(true, Ordering::SeqCst);
    }

    pub(crate) fn finish_worker(&self, worker: usize) {
        self.running[worker].store(false, Ordering::SeqCst);
    }

    pub fn tick(&self, worker: usize) {
        self.progress[worker].fetch_add(1, Ordering::Relaxed);
    }

    pub fn progress(&self, worker: usize) -> usize {
        self.progress[worker].load(Ordering::Relaxed)
    }

    pub fn total_progress(&self) -> usize {
        self.progress.iter().map(|p| p.load(Ordering::Relaxed)).sum()
    }

    pub fn running_count(&self) -> usize {
        self.running.iter().filter(|r| r.load(Ordering::SeqCst)).count()
    }
}
