//! Build the initial bodies of a run from configuration
//!
//! Either the explicit `bodies` list of a [`SimulationConfig`] is used, or
//! bodies are generated from the screen: every (populated) pixel of the
//! projection plane becomes one body of `unit_mass`, projected back into
//! space and perturbed by seeded noise. Three shapes are available:
//! - spiral: from the outside in, z from noise, at rest
//! - explosion: a sphere around the center, moving outwards
//! - shockwave: a mirrored grid, z from the distance to the center, at rest
//!
//! Generation is sequential and only reads the noise field, so the same seed
//! always yields the same bodies in the same order.

use std::f64::consts::PI;

use log::debug;

use crate::configuration::config::{DistributionConfig, DistributionMode, SimulationConfig};
use crate::simulation::params::UniverseConstants;
use crate::simulation::states::{Body, NVec3};
use crate::visualization::camera::CameraGeometry;
use crate::visualization::noise::NoiseField;

/// Bodies from the explicit list of the configuration
pub fn bodies_from_config(cfg: &SimulationConfig, u: &UniverseConstants) -> Vec<Body> {
    cfg.bodies
        .iter()
        .map(|bc| Body::with_movement(u, NVec3::from(bc.position), NVec3::from(bc.movement), bc.mass))
        .collect()
}

/// Explicit bodies if configured, generated ones otherwise
pub fn build_bodies(cfg: &SimulationConfig, u: &UniverseConstants, camera: &CameraGeometry, noise: &dyn NoiseField) -> Vec<Body> {
    if !cfg.bodies.is_empty() {
        return bodies_from_config(cfg, u);
    }
    let bodies = Distribution::new(cfg, u, camera, noise).generate();
    debug!("generated {} bodies ({:?})", bodies.len(), cfg.distribution.mode);
    bodies
}

/// Generator state shared by the three modes
struct Distribution<'a> {
    u: &'a UniverseConstants,
    noise: &'a dyn NoiseField,
    d: &'a DistributionConfig,
    half_x: bool,
    half_y: bool,
    zero_div: f64, // plane -> z = 0 scale
    max_z: f64, // noise amplitude of z
    max_x_off: f64, // largest x jitter that keeps neighbours apart
    max_y_off: f64,
    max_dist: f64, // outermost distance from the center
    max_mov: f64, // escape velocity in explosion mode
    circle_mod: f64,
    max_x: i64, // larger screen side
    max_y: i64, // smaller screen side
}

impl<'a> Distribution<'a> {
    fn new(cfg: &'a SimulationConfig, u: &'a UniverseConstants, camera: &CameraGeometry, noise: &'a dyn NoiseField) -> Self {
        let half_x = cfg.screen.half_x;
        let half_y = cfg.screen.half_y;
        let mode = cfg.distribution.mode;

        let zero_div = camera.zero_div();

        // x is always the larger side
        let max_x = camera.width.max(camera.height) as i64;
        let max_y = camera.width.min(camera.height) as i64;
        let half_w = (max_x / 2) as f64;
        let half_h = (max_y / 2) as f64;

        // space one unit needs towards its neighbour: its radius plus one position unit
        let base_dist = u.radius_for(u.mass_to_kg) * u.m_to_pos + u.m_to_pos;
        let max_x_off = ((if half_x { 2.0 } else { 1.0 } / zero_div) - base_dist) / 2.0;
        let max_y_off = ((if half_y { 2.0 } else { 1.0 } / zero_div) - base_dist) / 2.0;

        // only 40% of the depth to start with
        let mut max_z = camera.max_z * 0.4;
        let mut max_dist = f64::hypot(half_w, half_h);
        let mut max_mov = 0.0;

        if mode == DistributionMode::Explosion {
            // total mass of all units, in kg
            let units = (max_x * max_y - 1) as f64
                * if half_x { 0.5 } else { 1.0 }
                * if half_y { 0.5 } else { 1.0 };
            let total = units * u.mass_to_kg;

            // a sphere of 5% of the plane, in position units
            max_dist = (max_x as f64 / 40.0) / zero_div;

            // v_e = sqrt(2 G M / R)
            max_mov = ((2.0 * u.G * total) / (max_dist * u.pos_to_m)).sqrt();
        } else {
            let stretch = |on: bool| if on { 1.0 } else { 1.5 };
            let wave = if mode == DistributionMode::Shockwave { 1.5 } else { 1.0 };
            max_z *= (stretch(half_x) + stretch(half_y) + wave) / 3.0;
        }

        let circle_mod = max_dist / ((max_x + 1) * (max_y + 1)) as f64;

        Self {
            u,
            noise,
            d: &cfg.distribution,
            half_x,
            half_y,
            zero_div,
            max_z,
            max_x_off,
            max_y_off,
            max_dist,
            max_mov,
            circle_mod,
            max_x,
            max_y,
        }
    }

    fn fractal(&self, x: f64, y: f64, z: f64) -> f64 {
        let d = self.d;
        self.noise.fractal3(x, y, z, d.zoom, d.smoothing, d.reduction, d.octaves)
    }

    fn generate(&self) -> Vec<Body> {
        let mode = self.d.mode;
        let shockwave = mode == DistributionMode::Shockwave;

        let x_start = self.max_x - i64::from(shockwave);
        let x_step = if self.half_x { 2 } else { 1 };
        let y_step = if self.half_y { 2 } else { 1 };
        let y_stop = if shockwave { self.max_y / 2 } else { 1 };

        let mut bodies = Vec::new();
        let mut x = x_start;
        while x > 0 {
            // with half_y every second column is shifted by one row
            let y_jump = if self.half_y { x % 2 } else { 0 };
            let mut y = self.max_y - i64::from(shockwave) - y_jump;
            while y > y_stop - y_jump {
                match mode {
                    DistributionMode::Shockwave => self.shockwave_pair(x, y, y_jump, &mut bodies),
                    _ => bodies.push(self.circling(x, y)),
                }
                y -= y_step;
            }
            x -= x_step;
        }
        bodies
    }

    /// Spiral and explosion share the walk from the outside in
    fn circling(&self, x: i64, y: i64) -> Body {
        let u = self.u;
        let [off_x, off_y, off_z] = self.d.offset;
        let explode = self.d.mode == DistributionMode::Explosion;
        let (xf, yf) = (x as f64, y as f64);

        // the pixel made linear
        let circle_pos = yf + (self.max_y as f64 * xf);
        let dist_mod = circle_pos * self.circle_mod;

        // sink slower the further out
        let dist_flow = 2.25 - 1.25 * (dist_mod / self.max_dist);
        let distance = self.max_dist - dist_mod / dist_flow + u.m_to_pos;

        // radius a circle needs for 360 units, squeezed when columns/rows are skipped
        let spiral_mod = (180.0 / PI)
            * if self.half_x { PI / 2.0 } else { PI / 4.0 }
            * if self.half_y { PI / 2.0 } else { PI / 4.0 };

        // further out circles need more steps
        let alpha_mod = if explode { 1.0 } else { distance / spiral_mod };
        let alpha = normalized_degree(circle_pos / alpha_mod + 90.0 * self.fractal(xf + off_x, yf + off_y, circle_pos + off_z));
        let (sin_a, cos_a) = alpha.to_radians().sin_cos();
        let x_pos = distance * cos_a;
        let y_pos = distance * sin_a;

        if explode {
            // three full turns, single octave noise clusters around zero
            let beta = normalized_degree(
                1080.0 * self.noise.noise3(x_pos + off_x, y_pos + off_y, circle_pos + off_z, self.d.zoom),
            );
            let (sin_b, cos_b) = beta.to_radians().sin_cos();
            let pos = NVec3::new(x_pos * sin_b, y_pos * sin_b, distance * cos_b);
            let speed = (self.max_mov + self.max_mov * (distance / self.max_dist)) / 2.0;
            Body::new(u, pos, u.mass_to_kg, speed)
        } else {
            let zoom = self.d.zoom;
            let z = self.noise.noise3(xf + off_x, yf + off_y, circle_pos, zoom) * self.max_z;
            let mod_x = self.max_x_off * self.noise.noise3(xf + off_x, self.circle_mod, z + off_z, zoom);
            let mod_y = self.max_y_off * self.noise.noise3(self.circle_mod, yf + off_y, z + off_z, zoom);
            let pos = NVec3::new((mod_x + x_pos) / self.zero_div, (mod_y + y_pos) / self.zero_div, z);
            Body::new(u, pos, u.mass_to_kg, 0.0)
        }
    }

    /// One body in the upper half and its mirror image in the lower half
    fn shockwave_pair(&self, x: i64, y: i64, y_jump: i64, bodies: &mut Vec<Body>) {
        let u = self.u;
        let zoom = self.d.zoom;
        let [off_x, off_y, off_z] = self.d.offset;
        let (xf, yf) = (x as f64, y as f64);
        let half_w = (self.max_x / 2) as f64;
        let half_h = (self.max_y / 2) as f64;
        let circle_pos = yf + (self.max_y as f64 * xf);

        // upper
        let x_pos = xf - half_w;
        let y_pos = yf - half_h;
        let xy = f64::hypot(x_pos, y_pos);
        let z = self.noise.noise2(xy, xy, zoom) * self.max_z;
        let mod_x = self.max_x_off * self.noise.noise3(xf + off_x, y_pos, z + off_z, zoom);
        let mod_y = self.max_y_off * self.noise.noise3(x_pos, yf + off_y, z + off_z, zoom);
        let pos = NVec3::new((mod_x + x_pos) / self.zero_div, (mod_y + y_pos) / self.zero_div, z);
        bodies.push(Body::new(u, pos, u.mass_to_kg, 0.0));

        // lower, mirrored
        let x_pos = half_w - xf - 1.0;
        let y_pos = half_h - yf - (2 - y_jump) as f64;
        let xy = f64::hypot(x_pos, y_pos);
        let z = self.noise.noise2(xy, xy, zoom) * self.max_z;
        let mod_x = self.max_x_off * self.fractal(xf + off_x, circle_pos, z + off_z);
        let mod_y = self.max_y_off * self.fractal(circle_pos, yf + off_y, z + off_z);
        let pos = NVec3::new((mod_x + x_pos) / self.zero_div, (mod_y + y_pos) / self.zero_div, z);
        bodies.push(Body::new(u, pos, u.mass_to_kg, 0.0));
    }
}

/// Map any angle in degrees into [0, 360)
fn normalized_degree(deg: f64) -> f64 {
    deg.rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualization::noise::GradientNoise;

    fn small_config(mode: DistributionMode) -> SimulationConfig {
        let mut cfg = SimulationConfig::default();
        cfg.screen.width = 24;
        cfg.screen.height = 16;
        cfg.distribution.mode = mode;
        cfg
    }

    fn generate(cfg: &SimulationConfig, seed: u64) -> Vec<Body> {
        let u = UniverseConstants::default();
        let s = &cfg.screen;
        let camera = CameraGeometry::new(&u, s.width, s.height, s.fov, s.half_x, s.half_y, false);
        build_bodies(cfg, &u, &camera, &GradientNoise::new(seed))
    }

    #[test]
    fn same_seed_same_bodies() {
        let cfg = small_config(DistributionMode::Spiral);
        assert_eq!(generate(&cfg, 9), generate(&cfg, 9));
    }

    #[test]
    fn spiral_starts_at_rest() {
        let bodies = generate(&small_config(DistributionMode::Spiral), 1);
        assert!(!bodies.is_empty());
        assert!(bodies.iter().all(|b| b.mov == NVec3::zeros()));
    }

    #[test]
    fn explosion_moves_outwards() {
        let bodies = generate(&small_config(DistributionMode::Explosion), 1);
        assert!(!bodies.is_empty());
        for b in bodies.iter().filter(|b| b.distance > 0.0) {
            assert!(b.mov.dot(&b.pos) >= 0.0);
        }
    }

    #[test]
    fn shockwave_mirrors_pairs() {
        let bodies = generate(&small_config(DistributionMode::Shockwave), 1);
        assert_eq!(bodies.len() % 2, 0);
    }

    #[test]
    fn explicit_bodies_replace_generation() {
        let mut cfg = small_config(DistributionMode::Spiral);
        cfg.bodies.push(crate::configuration::config::BodyConfig {
            position: [1.0, 2.0, 3.0],
            movement: [0.0; 3],
            mass: 2.0e30,
        });
        let bodies = generate(&cfg, 1);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].pos, NVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn degrees_wrap() {
        assert_eq!(normalized_degree(-90.0), 270.0);
        assert_eq!(normalized_degree(720.0), 0.0);
    }
}
