//! Force accumulation and impulse derivation
//!
//! Gravitation is accumulated into each body's impulse. Every body sums the
//! pull of all others in index order from a snapshot taken before the phase,
//! so the result does not depend on how bodies are split between workers.
//! Once that is done, every body turns its impulse into an acceleration for the
//! next simulated second.

use super::params::UniverseConstants;
use super::states::{Body, NVec3};

/// What gravitation needs to know about a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attractor {
    pub pos: NVec3,
    pub mass: f64, // zero for destroyed bodies
}

impl From<&Body> for Attractor {
    fn from(body: &Body) -> Self {
        let mass = if body.is_destroyed() { 0.0 } else { body.mass };
        Self { pos: body.pos, mass }
    }
}

/// Newtonian pull of `from` on `on`
/// - distance is clamped to at least one meter
/// - swapping the two gives exactly the negated force
/// Destroyed bodies take no part in gravitation.
pub fn pull(on: &Attractor, from: &Attractor, u: &UniverseConstants) -> NVec3 {
    if on.mass <= 0.0 || from.mass <= 0.0 {
        return NVec3::zeros();
    }

    // r points from `on` to `from`, converted from position units to meters
    let r = (from.pos - on.pos) * u.pos_to_m;

    // |r|, never below one meter
    let d = r.norm().max(1.0);

    // F = G * m1 * m2 / d^2, split as (m1 / d) * (m2 / d) to stay in range
    let force = u.G * (on.mass / d) * (from.mass / d);

    // r / d are the direction cosines, so no trigonometry is needed
    r * (force / d)
}

/// Summed pull of every attractor but `i` on attractor `i`, in index order
pub fn total_pull(i: usize, attractors: &[Attractor], u: &UniverseConstants) -> NVec3 {
    let on = &attractors[i];
    attractors
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .fold(NVec3::zeros(), |sum, (_, from)| sum + pull(on, from, u))
}

/// Accumulate the pull between `a` and `b` into both impulses:
/// `a` receives `+F`, `b` receives `-F` along the line between them
pub fn apply_gravitation(a: &mut Body, b: &mut Body, u: &UniverseConstants) {
    let f = pull(&Attractor::from(&*a), &Attractor::from(&*b), u);
    a.imp += f;
    b.imp -= f;
}

/// Derive the acceleration for the next second from the accumulated impulse
///
/// The target movement per axis follows three cases:
/// 1. impulse and movement point in opposite directions -> they are summed
/// 2. same direction, impulse is stronger -> the impulse becomes the target
/// 3. same direction, movement is stronger -> the movement is kept
///
/// Returns the magnitude of the (possibly clamped) acceleration before it is
/// scaled by `seconds_per_frame`, so the caller can record the maximum.
pub fn apply_impulses(body: &mut Body, u: &UniverseConstants, seconds_per_frame: f64) -> f64 {
    if body.is_destroyed() {
        body.acc = NVec3::zeros();
        return 0.0;
    }

    let target = body.mov.zip_map(&body.imp, |mov, imp| {
        if mov.signum() != imp.signum() {
            mov + imp // case 1
        } else if imp.abs() > mov.abs() {
            imp // case 2
        } else {
            mov // case 3
        }
    });

    // a = (target - current) / m
    let mut acc = (target - body.mov) / body.mass;

    // Never accelerate by more than c within one second
    let mut acc_len = acc.norm();
    if acc_len > u.c {
        acc *= (u.c - 1.0) / acc_len;
        acc_len = acc.norm();
    }

    body.acc = acc * seconds_per_frame;

    acc_len
}
