//! Distance ordered body container
//!
//! `OrderedBodySet` owns every body, each behind its own lock so workers can
//! touch different bodies at the same time. After a completed sort pass the
//! bodies are ascending by their distance to the center, which the collision
//! search relies on.

use parking_lot::{Mutex, MutexGuard};

use super::forces::Attractor;
use super::params::UniverseConstants;
use super::states::{Body, BodyRecord};
use crate::error::SimError;
use crate::scheduler::control::Control;

/// Result of one sort pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPass {
    Complete,
    Interrupted, // pause requested, run the pass again once resumed
    Cancelled,
}

#[derive(Debug, Default)]
pub struct OrderedBodySet {
    bodies: Vec<Mutex<Body>>,
}

impl OrderedBodySet {
    pub fn new() -> Self {
        Self { bodies: Vec::new() }
    }

    /// Take ownership of `bodies` and sort them by distance
    pub fn from_bodies(bodies: Vec<Body>) -> Result<Self, SimError> {
        let mut set = Self::new();
        set.bodies
            .try_reserve_exact(bodies.len())
            .map_err(|_| SimError::PoolExhausted(bodies.len()))?;
        set.bodies.extend(bodies.into_iter().map(Mutex::new));
        set.bodies.sort_by(|a, b| distance_of(a).total_cmp(&distance_of(b)));
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Lock body `i`
    pub fn lock(&self, i: usize) -> MutexGuard<'_, Body> {
        self.bodies[i].lock()
    }

    /// Lock bodies `i` and `j` (which must differ), always taking the lower index first
    pub fn lock_pair(&self, i: usize, j: usize) -> (MutexGuard<'_, Body>, MutexGuard<'_, Body>) {
        assert_ne!(i, j, "lock_pair needs two different bodies");
        if i < j {
            let a = self.bodies[i].lock();
            let b = self.bodies[j].lock();
            (a, b)
        } else {
            let b = self.bodies[j].lock();
            let a = self.bodies[i].lock();
            (a, b)
        }
    }

    /// Exclusive access without locking
    pub fn get_mut(&mut self, i: usize) -> &mut Body {
        self.bodies[i].get_mut()
    }

    /// Insert a body at its sorted position
    pub fn insert_sorted(&mut self, body: Body) -> Result<(), SimError> {
        self.bodies
            .try_reserve(1)
            .map_err(|_| SimError::PoolExhausted(self.bodies.len() + 1))?;
        let d = body.distance;
        let at = self.bodies.partition_point(|b| distance_of(b) <= d);
        self.bodies.insert(at, Mutex::new(body));
        Ok(())
    }

    /// True if the bodies are ascending by distance
    pub fn is_sorted(&self) -> bool {
        self.bodies
            .windows(2)
            .all(|w| distance_of(&w[0]) <= distance_of(&w[1]))
    }

    /// One insertion sort pass over the whole set
    ///
    /// The pass looks at the control flags after every body. On a pause it
    /// stops and reports `Interrupted`; the caller runs a fresh pass once
    /// resumed. Nothing about the partial order is assumed by the next pass,
    /// it simply re-verifies it, which is cheap on nearly sorted data.
    pub fn sort_pass(&mut self, control: &Control) -> SortPass {
        for i in 1..self.bodies.len() {
            let mut j = i;
            while j > 0 && distance_of(&self.bodies[j - 1]) > distance_of(&self.bodies[j]) {
                self.bodies.swap(j - 1, j);
                j -= 1;
            }

            if control.is_cancelled() {
                return SortPass::Cancelled;
            }
            if control.is_paused() {
                return SortPass::Interrupted;
            }
        }
        SortPass::Complete
    }

    /// Sort until a pass completes, waiting out pauses in between
    pub fn sort(&mut self, control: &Control) -> SortPass {
        loop {
            match self.sort_pass(control) {
                SortPass::Interrupted => {
                    if !control.checkpoint() {
                        return SortPass::Cancelled;
                    }
                }
                done => return done,
            }
        }
    }

    /// Drop every body whose remnant ring has fully expanded. Returns how many.
    pub fn remove_gone(&mut self, u: &UniverseConstants) -> usize {
        let before = self.bodies.len();
        self.bodies.retain_mut(|b| !b.get_mut().is_gone(u));
        before - self.bodies.len()
    }

    /// Number of bodies that are not destroyed
    pub fn alive(&self) -> usize {
        self.bodies.iter().filter(|b| !b.lock().is_destroyed()).count()
    }

    /// Sum of all alive masses, kg
    pub fn total_mass(&self) -> f64 {
        self.bodies
            .iter()
            .map(|b| b.lock())
            .filter(|b| !b.is_destroyed())
            .map(|b| b.mass)
            .sum()
    }

    /// Copy of every body, in set order
    pub fn snapshot(&self) -> Vec<Body> {
        self.bodies.iter().map(|b| b.lock().clone()).collect()
    }

    /// Positions and masses for one gravitation phase, in set order
    pub fn attractors(&self) -> Vec<Attractor> {
        self.bodies.iter().map(|b| Attractor::from(&*b.lock())).collect()
    }

    pub fn records(&self) -> Vec<BodyRecord> {
        self.bodies.iter().map(|b| b.lock().to_record()).collect()
    }
}

fn distance_of(body: &Mutex<Body>) -> f64 {
    body.lock().distance
}
