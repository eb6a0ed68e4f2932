//! Core state types for the N-body simulation.
//!
//! - `Body`       one point mass: kinematics, mass/radius and remnant ring state
//! - `BodyRecord` the flat tuple a body is saved as and loaded from
//! - `RunStats`   scalar aggregates collected while phases run
//!
//! Positions are in abstract position units (see `UniverseConstants::m_to_pos`),
//! movement is in m/s, mass in kg and radius in meters.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::params::{UniverseConstants, MIN_ALIVE_MASS};

pub type NVec3 = Vector3<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub pos: NVec3, // position
    pub imp: NVec3, // impulse accumulated by gravitation
    pub acc: NVec3, // acceleration derived from the impulse
    pub mov: NVec3, // movement (velocity)
    pub mass: f64, // mass, kg
    pub radius: f64, // radius, m
    pub distance: f64, // cached |pos|
    pub ring_radius: f64, // remnant ring radius, only used once destroyed
    pub ring_mass: f64, // remnant ring mass, only used once destroyed
}

impl Body {
    /// Create a body at `pos` with the given mass
    ///
    /// `speed` is split over the three axes by the share each axis has of the
    /// manhattan distance to the center, so the body starts moving away from
    /// (or, when negative, towards) the center. Each axis is clamped to `c`.
    pub fn new(u: &UniverseConstants, pos: NVec3, mass: f64, speed: f64) -> Self {
        let manhattan = pos.x.abs() + pos.y.abs() + pos.z.abs();
        let mov = if manhattan > 0.0 && speed != 0.0 {
            pos.map(|p| (speed * p / manhattan).clamp(-u.c, u.c))
        } else {
            NVec3::zeros()
        };

        Self {
            pos,
            imp: NVec3::zeros(),
            acc: NVec3::zeros(),
            mov,
            mass,
            radius: u.radius_for(mass),
            distance: pos.norm(),
            ring_radius: 0.0,
            ring_mass: 0.0,
        }
    }

    /// Create a body with an explicit movement vector
    pub fn with_movement(u: &UniverseConstants, pos: NVec3, mov: NVec3, mass: f64) -> Self {
        let mut body = Self::new(u, pos, mass, 0.0);
        body.mov = mov.map(|m| m.clamp(-u.c, u.c));
        body
    }

    /// A body below one kg was annihilated in a collision
    pub fn is_destroyed(&self) -> bool {
        self.mass < MIN_ALIVE_MASS
    }

    /// The remnant ring has fully expanded and the body can be removed
    pub fn is_gone(&self, u: &UniverseConstants) -> bool {
        self.is_destroyed() && self.ring_radius >= u.ring_radius_max
    }

    /// Difference of the cached distances to the center
    pub fn dist_diff(&self, other: &Body) -> f64 {
        (self.distance - other.distance).abs()
    }

    pub fn reset_impulse(&mut self) {
        self.imp = NVec3::zeros();
    }

    pub fn update_distance(&mut self) {
        self.distance = self.pos.norm();
    }

    pub fn to_record(&self) -> BodyRecord {
        BodyRecord {
            mass: self.mass,
            radius: self.radius,
            pos: self.pos.into(),
            imp: self.imp.into(),
            acc: self.acc.into(),
            mov: self.mov.into(),
            ring_radius: self.ring_radius,
            ring_mass: self.ring_mass,
        }
    }

    pub fn from_record(r: &BodyRecord) -> Self {
        let pos = NVec3::from(r.pos);
        Self {
            pos,
            imp: r.imp.into(),
            acc: r.acc.into(),
            mov: r.mov.into(),
            mass: r.mass,
            radius: r.radius,
            distance: pos.norm(),
            ring_radius: r.ring_radius,
            ring_mass: r.ring_mass,
        }
    }
}

/// Flat state of one body in the order it is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub mass: f64,
    pub radius: f64,
    pub pos: [f64; 3],
    pub imp: [f64; 3],
    pub acc: [f64; 3],
    pub mov: [f64; 3],
    pub ring_radius: f64,
    pub ring_mass: f64,
}

impl BodyRecord {
    /// Reason this record cannot describe a body, if any
    pub fn defect(&self) -> Option<&'static str> {
        let finite = [self.mass, self.radius, self.ring_radius, self.ring_mass]
            .iter()
            .chain(self.pos.iter())
            .chain(self.imp.iter())
            .chain(self.acc.iter())
            .chain(self.mov.iter())
            .all(|v| v.is_finite());

        if !finite {
            Some("non-finite value")
        } else if self.mass < 0.0 {
            Some("negative mass")
        } else if self.radius < 0.0 {
            Some("negative radius")
        } else if self.ring_radius < 0.0 {
            Some("negative ring radius")
        } else {
            None
        }
    }
}

/// Scalar aggregates shared by all workers, guarded by a single global lock
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub max_accel: f64, // largest acceleration seen in the last impulse phase
    pub max_move: f64, // largest speed seen in the last movement phase
    pub curr_move: f64, // movement accumulated since gravitation was last computed
    pub min_z: f64, // nearest z seen in the last movement phase
}
