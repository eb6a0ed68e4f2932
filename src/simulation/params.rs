//! Physical scaling constants for the simulation
//!
//! `UniverseConstants` is derived once from a reference body (by default the sun):
//! - speed of light and gravitational constant,
//! - unit-mass to kg and meter <-> position-unit scaling,
//! - the density every body is assumed to have,
//! - remnant ring limits
//!
//! It is read-only after construction and shared by every phase.

use std::f64::consts::PI;

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0; // m/s
pub const GRAVITATION: f64 = 6.67384e-11; // m^3 kg^-1 s^-2
pub const METERS_PER_AU: f64 = 149_597_870_691.0;

pub const RING_RADIUS_MAX: f64 = 200.0;
pub const RING_RADIUS_HALF: f64 = 100.0;

/// Bodies with a mass below this (in kg) are destroyed
pub const MIN_ALIVE_MASS: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct UniverseConstants {
    pub c: f64, // speed of light
    pub G: f64, // gravitational constant
    pub mass_to_kg: f64, // kg per generated unit
    pub m_to_pos: f64, // position units per meter
    pub pos_to_m: f64, // meters per position unit
    pub density: f64, // kg/m^3 of every body
    pub regravitate_distance: f64, // meters of movement before gravitation is recomputed (adaptive mode)
    pub ring_radius_max: f64, // remnant rings are removed here
    pub ring_radius_half: f64, // rings lose their mass layer past this
    pub ring_growth_per_cycle: f64, // ring radius gained per animation cycle
}

impl UniverseConstants {
    /// Derive all constants from a reference body
    /// - `pixels_per_reference` is the projected radius of the reference body on the plane
    /// - `reference_radius` in meters, `reference_mass` in kg
    /// - `unit_mass` the kg of one generated body
    pub fn from_reference(pixels_per_reference: f64, reference_radius: f64, reference_mass: f64, unit_mass: f64) -> Self {
        let m_to_pos = pixels_per_reference / reference_radius;

        // density of the reference body: m / (4/3 pi r^3)
        let density = reference_mass / ((4.0 / 3.0) * PI * reference_radius.powi(3));

        // the reference body's radius recomputed through the density law, doubled
        let regravitate_distance = ((3.0 * reference_mass / density) / (4.0 * PI)).cbrt() * 2.0;

        Self {
            c: SPEED_OF_LIGHT,
            G: GRAVITATION,
            mass_to_kg: unit_mass,
            m_to_pos,
            pos_to_m: 1.0 / m_to_pos,
            density,
            regravitate_distance,
            ring_radius_max: RING_RADIUS_MAX,
            ring_radius_half: RING_RADIUS_HALF,
            ring_growth_per_cycle: RING_RADIUS_MAX / 5.0,
        }
    }

    /// Radius in meters of a body with `mass` kg
    /// radius = ((3 * mass / density) / (4 pi))^(1/3)
    pub fn radius_for(&self, mass: f64) -> f64 {
        if mass <= 0.0 {
            return 0.0;
        }
        ((3.0 * mass / self.density) / (4.0 * PI)).cbrt()
    }

    /// Position units per astronomical unit
    pub fn au_in_pos(&self) -> f64 {
        self.m_to_pos * METERS_PER_AU
    }
}

impl Default for UniverseConstants {
    /// The sun as reference body, 3.75 pixels radius, 15 Jupiter masses per unit
    fn default() -> Self {
        Self::from_reference(3.75, 6.96e8, 1.99e30, 2.85e28)
    }
}
