//! Fixed-step movement integration
//!
//! One step advances a body by the current seconds-per-frame fraction:
//! acceleration goes into movement, movement goes into position.

use super::params::UniverseConstants;
use super::states::Body;

/// Advance `body` by one step
/// - movement += acceleration, clamped so the speed stays below c
/// - position += movement (converted to position units) * seconds_per_frame
/// - cached distance is recomputed
///
/// Returns the speed after clamping, so the caller can record the maximum.
pub fn apply_movement(body: &mut Body, u: &UniverseConstants, seconds_per_frame: f64) -> f64 {
    if body.is_destroyed() {
        return 0.0;
    }

    // v_n+1 = v_n + a
    body.mov += body.acc;

    // |v| must never exceed c
    let mut speed = body.mov.norm();
    if speed > u.c {
        body.mov *= (u.c - 1.0) / speed;
        speed = body.mov.norm();
    }

    // x_n+1 = x_n + v * m_to_pos * dt
    body.pos += body.mov * (u.m_to_pos * seconds_per_frame);
    body.update_distance();

    speed
}
