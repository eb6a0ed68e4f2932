//! Projection of bodies onto the depth compositor
//!
//! A body is drawn as a sphere: an opaque mass disk surrounded by a
//! translucent dust halo. A destroyed body is drawn as its remnant, a fading
//! dust core inside an expanding torus.
//!
//! The footprint is walked in rings of growing offset around the center. One
//! distance computation serves the four pixels that are mirror images of each
//! other, the region a pixel falls in decides what is written for it:
//! - inside the view radius: mass plus dust, or the remnant core
//! - inside the ring: inner or outer torus half
//! - inside the dust radius: dust only
//!
//! Only pixels inside the given row band are written. Projecting every body
//! in index order into each band gives every pixel the same sequence of writes
//! no matter how the rows are split between workers.

use std::ops::Range;

use super::camera::CameraGeometry;
use super::colormap::ColorSource;
use super::compositor::{Color, DepthCompositor, MIN_DUST_RANGE};
use super::noise::NoiseField;
use crate::error::{Outcome, SimError};
use crate::scheduler::control::Control;
use crate::simulation::params::UniverseConstants;
use crate::simulation::states::{Body, NVec3};

/// Bodies at or below this mass (kg) only leave a halo, no opaque disk
pub const HALO_ONLY_MASS: f64 = 0.1;

/// Default halo max range, in multiples of the halo radius
const DEFAULT_RANGE_MOD: f64 = 2.5;
/// Smallest halo radius of a body, covers the 8 pixels around the center
const MIN_HALO_RADIUS: f64 = 1.414214;

// noise amplitudes and feature sizes for the pixel perturbation
const MASS_COLOR_NOISE: (f64, f64) = (0.1, 17.337);
const RING_COLOR_NOISE: (f64, f64) = (0.25, 3.675);
const DUST_RANGE_NOISE: (f64, f64) = (0.2, 23.973);
const RING_RANGE_NOISE: (f64, f64) = (0.15, 3.375);

/// Everything the projection of one frame reads
pub struct Projector<'a> {
    pub universe: &'a UniverseConstants,
    pub camera: &'a CameraGeometry,
    pub colors: &'a dyn ColorSource,
    pub noise: &'a dyn NoiseField,
    pub cycles_per_frame: f64, // ring growth per projected frame, in cycles
}

/// Screen space footprint of one body
#[derive(Debug, Clone, Copy)]
struct Footprint {
    pos: NVec3, // body position
    x: i64,
    y: i64,
    z: f64, // view depth of the center
    view_rad: f64, // mass radius, or where the ring starts
    dust_rad: f64, // outer halo radius
    range_mod: f64, // halo max range in multiples of `dust_rad`
    color: Color,
}

/// Extra sizes of a remnant ring, all in pixels
#[derive(Debug, Clone, Copy)]
struct RingShape {
    cent_range: f64, // max range of the remnant core
    ring_range: f64, // max range of a fading ring
    stop: f64, // outer edge
    cent: f64, // torus center line
    has_mass: bool, // ring is still drawn opaque
}

/// What a footprint pixel turns into
#[derive(Debug, Clone, Copy)]
enum Region {
    Mass { mass_z: f64, dust_z: f64, range: f64, mod_z: f64 },
    Remnant { dust_z: f64, range: f64 },
    Ring { z: f64, range: f64, mod_z: f64, inner: bool },
    Dust { dust_z: f64, range: f64 },
}

/// The part of the screen one projection may write to
#[derive(Debug, Clone)]
struct Clip {
    width: i64,
    rows: Range<i64>,
}

impl Clip {
    fn new(out: &DepthCompositor, rows: Range<usize>) -> Self {
        let end = rows.end.min(out.height());
        Self {
            width: out.width() as i64,
            rows: rows.start as i64..end as i64,
        }
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        (0..self.width).contains(&x) && self.rows.contains(&y)
    }

    /// Largest offset along either axis that still lands inside from `(x, y)`
    fn reach(&self, x: i64, y: i64) -> i64 {
        let across = x.abs().max((self.width - 1 - x).abs());
        let down = (y - self.rows.start).abs().max((self.rows.end - 1 - y).abs());
        across.max(down)
    }
}

impl<'a> Projector<'a> {
    /// Project `body` into the rows `rows` of `out`
    ///
    /// Cancellation is checked once per offset ring of the footprint.
    pub fn project(&self, body: &Body, out: &DepthCompositor, rows: Range<usize>, control: &Control) -> Outcome {
        let clip = Clip::new(out, rows);
        if clip.rows.is_empty() {
            return Outcome::Success;
        }
        match self.footprint(body, &clip) {
            Some(fp) => self.project_footprint(body, &fp, out, &clip, control),
            None => Outcome::Success,
        }
    }

    /// Widen the remnant ring of a destroyed body by one frame's growth
    pub fn advance_ring(&self, body: &mut Body) {
        let u = self.universe;
        if body.is_destroyed() && body.ring_radius < u.ring_radius_max {
            body.ring_radius += self.cycles_per_frame * u.ring_growth_per_cycle;
        }
    }

    /// Screen position, radii and base color, or None if nothing can be seen
    fn footprint(&self, body: &Body, clip: &Clip) -> Option<Footprint> {
        let u = self.universe;
        let cam = self.camera;

        let view_z = cam.view_depth(body.pos.z);
        if view_z <= 0.0 || (body.is_destroyed() && body.ring_radius >= u.ring_radius_max) {
            return None;
        }

        // radius on the plane, then the divisor for the point nearest to the camera
        let mut view_rad = (cam.cam_dist / view_z) * u.m_to_pos * body.radius;
        if view_rad <= 0.0 {
            return None;
        }
        let view_div = cam.cam_dist / (view_z - view_rad);

        if body.is_destroyed() {
            view_rad += view_rad * body.ring_radius;
        }

        let x = (body.pos.x * view_div).round() as i64 + cam.half_width as i64;
        let y = (body.pos.y * view_div).round() as i64 + cam.half_height as i64;

        let distance = u.pos_to_m * view_z;
        let (color, dust_rad, range_mod) = if body.mass > HALO_ONLY_MASS {
            let sample = self.colors.color_for(body.mass, body.mov.z, distance, 1.0);
            let dust_rad = (view_rad + view_rad * sample.halo_radius_mod).max(MIN_HALO_RADIUS);
            (sample.color, dust_rad, sample.halo_range_mod)
        } else {
            let gamma = 1.5 - (u.ring_radius_max - body.ring_radius) / u.ring_radius_max;
            let sample = self.colors.color_for(body.ring_mass, 0.0, distance, gamma);
            (sample.color, view_rad * 2.0, DEFAULT_RANGE_MOD)
        };

        // bounding box test only, corners of the plane may still be missed
        let (xf, yf) = (x as f64, y as f64);
        let on_plane = xf + dust_rad > -1.0
            && xf - dust_rad < clip.width as f64
            && yf + dust_rad > clip.rows.start as f64 - 1.0
            && yf - dust_rad < clip.rows.end as f64;
        if !on_plane {
            return None;
        }

        Some(Footprint {
            pos: body.pos,
            x,
            y,
            z: view_z,
            view_rad,
            dust_rad,
            range_mod,
            color,
        })
    }

    fn ring_shape(&self, body: &Body, fp: &mut Footprint) -> RingShape {
        let full = self.universe.ring_radius_max;
        let half = self.universe.ring_radius_half;
        let v_r = fp.view_rad;

        // the core fades by widening its max range while the ring grows
        let cent_range = (full / (full - body.ring_radius)).max(1.0) * v_r * 2.0 * fp.range_mod;

        // the ring eats up the halo while it expands
        let mut stop = fp.dust_rad * (body.ring_radius / full);
        if stop < v_r {
            stop = v_r + 0.5;
        }
        if fp.dust_rad < stop {
            fp.dust_rad = stop + 0.1;
        }

        // torus center at two thirds, so the ring looks like it expands
        let cent = v_r / 3.0 + stop * 2.0 / 3.0;

        let (ring_range, has_mass) = if body.ring_radius > half {
            let fade = (half / (body.ring_radius - half)).max(1.0);
            (fade * (stop - v_r * fp.range_mod), false)
        } else {
            (0.0, true)
        };

        RingShape {
            cent_range,
            ring_range,
            stop,
            cent,
            has_mass,
        }
    }

    fn project_footprint(
        &self,
        body: &Body,
        fp: &Footprint,
        out: &DepthCompositor,
        clip: &Clip,
        control: &Control,
    ) -> Outcome {
        let mut fp = *fp;
        let is_mass = body.mass > HALO_ONLY_MASS;

        // the loop bound uses the halo radius before a ring could widen it,
        // and never walks past the last offset that can still hit the clip
        let stop = (1.1 + fp.dust_rad).min(clip.reach(fp.x, fp.y) as f64 + 1.0);
        let max_range = fp.dust_rad * 2.0 * fp.range_mod;
        let ring = (!is_mass).then(|| self.ring_shape(body, &mut fp));

        let dust_color = grayed(fp.color);

        if let Err(e) = self.project_center(&fp, ring.as_ref(), dust_color, max_range, out, clip) {
            return e;
        }

        let mut x_off = 1.0;
        while x_off < stop {
            if !control.checkpoint() {
                return Outcome::Stopped;
            }

            let mut y_off = 0.0;
            while y_off < stop {
                let targets = mirrored(fp.x, fp.y, x_off as i64, y_off as i64);
                if targets.iter().any(|&(x, y)| clip.contains(x, y)) {
                    let point_dist = f64::hypot(x_off, y_off);
                    if let Some(region) = region_of(&fp, ring.as_ref(), is_mass, point_dist) {
                        let result = self.write_region(
                            &fp,
                            ring.as_ref(),
                            region,
                            &targets,
                            (x_off, y_off, point_dist),
                            dust_color,
                            max_range,
                            out,
                            clip,
                        );
                        if let Err(e) = result {
                            return e;
                        }
                    }
                }
                y_off += 1.0;
            }
            x_off += 1.0;
        }

        Outcome::Success
    }

    /// The center pixel, drawn on its own so the offset loop can skip (0, 0)
    fn project_center(
        &self,
        fp: &Footprint,
        ring: Option<&RingShape>,
        dust_color: Color,
        max_range: f64,
        out: &DepthCompositor,
        clip: &Clip,
    ) -> Result<(), Outcome> {
        if !clip.contains(fp.x, fp.y) {
            return Ok(());
        }
        let (x, y) = (fp.x as usize, fp.y as usize);
        let v_r = fp.view_rad;
        let z = fp.z - v_r;

        match ring {
            None => {
                let color = self.color_noise(fp, fp.x, fp.y, z, true, fp.color);
                let mut dust_color = dust_color;

                if v_r > 0.5 {
                    out.write_mass(x, y, z, color);
                } else {
                    // below half a pixel the mass is outshone by what lies behind it
                    let range = v_r.max(0.001);
                    let halo_max = range + range * (1.0 - 2.0 * range);
                    dust_color *= range / halo_max;
                    write_dust(out, x, y, z, color, range, halo_max)?;
                }

                let (z, range) = self.range_noise(fp, fp.x, fp.y, fp.z - fp.dust_rad, true, 2.0 * fp.dust_rad);
                write_dust(out, x, y, z, dust_color, range, max_range)?;
            }
            Some(ring) => {
                let (z, range) = self.range_noise(fp, fp.x, fp.y, z, true, v_r * 2.0);
                write_dust(out, x, y, z, dust_color, range, ring.cent_range)?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_region(
        &self,
        fp: &Footprint,
        ring: Option<&RingShape>,
        region: Region,
        targets: &[(i64, i64); 4],
        offset: (f64, f64, f64),
        dust_color: Color,
        max_range: f64,
        out: &DepthCompositor,
        clip: &Clip,
    ) -> Result<(), Outcome> {
        let (x_off, y_off, point_dist) = offset;
        let v_r = fp.view_rad;

        // opaque part: color dimmed towards the silhouette
        let opaque = match region {
            Region::Mass { mass_z, mod_z, .. } => {
                let col_mod = 1.0 - (edge_dist(x_off, y_off) / v_r) / 4.0 + (v_r - point_dist) / 2.0;
                Some((mass_z, shade(col_mod, mod_z), true))
            }
            Region::Ring { z, mod_z, inner, .. } => match ring {
                Some(r) if r.has_mass => {
                    let edge = edge_dist(x_off, y_off);
                    let col_mod = if inner {
                        1.0 - (v_r / edge) / 4.0 + (point_dist - v_r) / 2.0
                    } else {
                        1.0 - (edge / r.stop) / 4.0 + (r.stop - point_dist) / 2.0
                    };
                    Some((z, shade(col_mod, mod_z), false))
                }
                _ => None,
            },
            _ => None,
        };

        // translucent part: depth, range, max range and noise flavor
        let translucent = match (region, ring) {
            (Region::Mass { dust_z, range, .. }, _) | (Region::Dust { dust_z, range }, _) => {
                Some((dust_z, range, max_range, true))
            }
            (Region::Remnant { dust_z, range }, Some(r)) => Some((dust_z, range, r.cent_range, true)),
            (Region::Ring { z, range, .. }, Some(r)) if !r.has_mass => Some((z, range, r.ring_range, false)),
            _ => None,
        };

        let base = opaque.map(|(_, col_mod, _)| fp.color * col_mod);

        for &(px, py) in targets {
            if !clip.contains(px, py) {
                continue;
            }
            let (x, y) = (px as usize, py as usize);

            if let (Some((mass_z, _, is_mass)), Some(color)) = (opaque, base) {
                let color = self.color_noise(fp, px, py, mass_z, is_mass, color);
                out.write_mass(x, y, mass_z, color);
            }

            if let Some((dust_z, range, max, is_dust)) = translucent {
                let (z, range) = self.range_noise(fp, px, py, dust_z, is_dust, range);
                if range > MIN_DUST_RANGE {
                    write_dust(out, x, y, z, dust_color, range, max)?;
                }
            }
        }

        Ok(())
    }

    // zoom grows for bodies in front of the plane, so near halos get coarser noise
    fn zoom_factor(&self, fp: &Footprint) -> f64 {
        let depth = self.camera.cam_dist + self.camera.dyn_max_z;
        (1.0 - fp.pos.z / depth).max(1.0)
    }

    /// Brighten or darken `color` by up to 10% (mass) or 25% (ring)
    fn color_noise(&self, fp: &Footprint, x: i64, y: i64, z: f64, is_mass: bool, color: Color) -> Color {
        let (max_offset, zoom) = if is_mass { MASS_COLOR_NOISE } else { RING_COLOR_NOISE };
        let zoom = zoom * self.zoom_factor(fp);
        let offset = self.noise.noise3(fp.pos.x + x as f64, fp.pos.y + y as f64, z, zoom) * max_offset;
        color.map(|c| (c + (c * offset).round()).clamp(0.0, 255.0))
    }

    /// Stretch or shrink `range`, moving `z` by half the change so the interval stays centered
    fn range_noise(&self, fp: &Footprint, x: i64, y: i64, z: f64, is_dust: bool, range: f64) -> (f64, f64) {
        let (max_offset, zoom) = if is_dust { DUST_RANGE_NOISE } else { RING_RANGE_NOISE };
        let zoom = zoom * self.zoom_factor(fp);
        let offset = self.noise.noise3(x as f64, y as f64, z, zoom) * max_offset * range;
        (z - offset / 2.0, range + offset)
    }
}

/// Which region the pixel `point_dist` away from the center falls in
fn region_of(fp: &Footprint, ring: Option<&RingShape>, is_mass: bool, point_dist: f64) -> Option<Region> {
    let (v_r, d_r, z) = (fp.view_rad, fp.dust_rad, fp.z);

    if point_dist < v_r {
        if is_mass {
            let dust_mod = depth_mod(point_dist / d_r);
            let mod_z = depth_mod(point_dist / v_r);
            return Some(Region::Mass {
                mass_z: z - v_r * mod_z,
                dust_z: z - d_r * dust_mod,
                range: 2.0 * d_r * dust_mod,
                mod_z,
            });
        }
        let mod_z = depth_mod(point_dist / v_r);
        return Some(Region::Remnant {
            dust_z: z - v_r * mod_z,
            range: 2.0 * v_r * mod_z,
        });
    }

    if let Some(r) = ring {
        if point_dist < r.stop {
            // two half tori meeting at the center line
            let inner = point_dist < r.cent;
            let (rad, mod_z) = if inner {
                let rad = r.cent - v_r;
                (rad, depth_mod(1.0 - (point_dist - v_r) / rad))
            } else {
                let rad = r.stop - r.cent;
                (rad, depth_mod((point_dist - r.cent) / rad))
            };
            return Some(Region::Ring {
                z: z - rad * mod_z,
                range: 2.0 * rad * mod_z,
                mod_z,
                inner,
            });
        }
    }

    if point_dist < d_r {
        let mod_z = depth_mod(point_dist / d_r);
        return Some(Region::Dust {
            dust_z: z - d_r * mod_z,
            range: 2.0 * d_r * mod_z,
        });
    }

    None
}

/// cos(asin(ratio)): depth of a sphere point relative to its radius
fn depth_mod(ratio: f64) -> f64 {
    ratio.clamp(-1.0, 1.0).asin().cos()
}

/// The four pixels mirrored around `(x, y)` for one offset pair
fn mirrored(x: i64, y: i64, x_off: i64, y_off: i64) -> [(i64, i64); 4] {
    [
        (x + x_off, y + y_off),
        (x - y_off, y + x_off),
        (x - x_off, y - y_off),
        (x + y_off, y - x_off),
    ]
}

/// Distance from the center to the pixel edge facing it
fn edge_dist(x_off: f64, y_off: f64) -> f64 {
    let dx = if (y_off as i64) > (x_off as i64) { x_off / y_off } else { 1.0 };
    let dy = if (x_off as i64) > (y_off as i64) { y_off / x_off } else { 1.0 };
    f64::hypot(x_off - 0.5 * dx, y_off - 0.5 * dy)
}

/// Color factor: halved at the silhouette, floor at a quarter
fn shade(col_mod: f64, mod_z: f64) -> f64 {
    (col_mod.min(1.0) * (1.0 - (0.5 - mod_z / 2.0))).max(0.25)
}

/// Halo color: two thirds of the color, one third its gray
fn grayed(color: Color) -> Color {
    let gray = color.sum() / 3.0;
    color.map(|c| (gray + 2.0 * c) / 3.0)
}

fn write_dust(out: &DepthCompositor, x: usize, y: usize, z: f64, color: Color, range: f64, max_range: f64) -> Result<(), Outcome> {
    out.write_dust(x, y, z, color, range, max_range)
        .map(|_| ())
        .map_err(|e| Outcome::Fatal(SimError::from(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_pixels_are_a_quarter_turn_apart() {
        let px = mirrored(10, 10, 2, 1);
        assert_eq!(px, [(12, 11), (9, 12), (8, 9), (11, 8)]);
    }

    #[test]
    fn shade_stays_between_a_quarter_and_one() {
        assert_eq!(shade(5.0, 1.0), 1.0);
        assert_eq!(shade(1.0, 0.0), 0.5);
        assert_eq!(shade(-3.0, 0.0), 0.25);
    }

    #[test]
    fn depth_mod_is_one_at_the_center_and_zero_at_the_rim() {
        assert_eq!(depth_mod(0.0), 1.0);
        assert!(depth_mod(1.0).abs() < 1e-12);
        assert!(!depth_mod(1.5).is_nan());
    }

    #[test]
    fn clip_reach_covers_the_farthest_pixel() {
        let out = DepthCompositor::new(10, 8, MIN_DUST_RANGE).unwrap();
        let clip = Clip::new(&out, 2..5);
        assert_eq!(clip.reach(3, 3), 6);
        assert_eq!(clip.reach(-20, 3), 29);
        assert!(clip.contains(9, 4));
        assert!(!clip.contains(9, 5));
        assert!(!clip.contains(3, 1));

        // bands past the screen are cut off
        assert!(Clip::new(&out, 6..20).contains(0, 7));
        assert!(Clip::new(&out, 9..20).rows.is_empty());
    }

    #[test]
    fn grayed_keeps_gray_colors() {
        let c = Color::new(90.0, 90.0, 90.0);
        assert_eq!(grayed(c), c);
    }
}
