//! Collision detection and merging
//!
//! Two bodies collide once the gap between their surfaces drops below one
//! position unit. The heavier one absorbs the lighter one, which turns into
//! an expanding remnant ring.
//!
//! Touching pairs are searched in parallel without changing any body, then
//! merged one after the other in index order.

use smallvec::SmallVec;

use super::ordered_set::OrderedBodySet;
use super::params::UniverseConstants;
use super::states::{Body, NVec3};

/// Gap between the surfaces of `a` and `b` in position units
pub fn surface_gap(a: &Body, b: &Body, u: &UniverseConstants) -> f64 {
    (b.pos - a.pos).norm() - u.m_to_pos * (a.radius + b.radius)
}

/// Merge `a` and `b` if they touch. Returns true if a merge happened.
///
/// The survivor (heavier, `a` on a tie) takes the mass weighted average of both
/// impulses and movements and the summed mass. The loser keeps its position
/// and becomes a remnant ring.
pub fn apply_collision(a: &mut Body, b: &mut Body, u: &UniverseConstants) -> bool {
    if a.is_destroyed() || b.is_destroyed() {
        return false;
    }
    if surface_gap(a, b, u) >= 1.0 {
        return false;
    }

    let (survivor, loser) = if a.mass >= b.mass { (a, b) } else { (b, a) };

    let total = survivor.mass + loser.mass;
    let w_s = survivor.mass / total;
    let w_l = loser.mass / total;

    survivor.imp = survivor.imp * w_s + loser.imp * w_l;
    survivor.mov = survivor.mov * w_s + loser.mov * w_l;
    survivor.mass = total;
    survivor.radius = u.radius_for(total);

    loser.ring_mass = 1.0 + total / 2.0;
    loser.ring_radius = 0.0;
    loser.mass = 0.0;
    loser.imp = NVec3::zeros();
    loser.acc = NVec3::zeros();
    loser.mov = NVec3::zeros();

    true
}

/// Bodies after `i` in a distance sorted set that touch body `i`
///
/// Scans outward from `i` and stops once the difference in distance exceeds
/// the sum of radii plus one position unit. Every touching pair is found from
/// its inner body, so nothing scans inward.
pub fn contacts_of(set: &OrderedBodySet, i: usize, u: &UniverseConstants) -> SmallVec<[usize; 4]> {
    let mut found = SmallVec::new();

    for j in (i + 1)..set.len() {
        let (bi, bj) = set.lock_pair(i, j);
        if bi.is_destroyed() {
            break;
        }
        let reach = 1.0 + u.m_to_pos * (bi.radius + bj.radius);
        if bi.dist_diff(&bj) > reach {
            break;
        }
        if !bj.is_destroyed() && surface_gap(&bi, &bj, u) < 1.0 {
            found.push(j);
        }
    }

    found
}

/// Merge the touching pairs in ascending `(i, j)` order
///
/// A pair whose bodies no longer touch, or where one was absorbed by an
/// earlier merge, is skipped. Returns the number of merges performed.
pub fn resolve_contacts(set: &OrderedBodySet, pairs: &mut [(usize, usize)], u: &UniverseConstants) -> usize {
    pairs.sort_unstable();

    let mut merged = 0;
    for &(i, j) in pairs.iter() {
        let (mut a, mut b) = set.lock_pair(i, j);
        if apply_collision(&mut a, &mut b, u) {
            merged += 1;
        }
    }
    merged
}
