//! Body colors from mass, z-movement and distance
//!
//! The lookup follows the main sequence of stars: light objects are dark red,
//! heavy ones white and then blue. Each entry also sizes the halo drawn around
//! the body: light bodies get wide, thin halos and heavy bodies small, dense ones.

use super::compositor::Color;
use crate::simulation::params::SPEED_OF_LIGHT;

const JUPITER_MASS: f64 = 1.90e27; // kg
const PARSEC: f64 = 30.857e15; // m

/// What the color lookup hands to the projector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub color: Color, // rgb, each channel in 0..=255
    pub halo_radius_mod: f64, // halo radius in multiples of the body radius
    pub halo_range_mod: f64, // halo max range in multiples of its radius
}

/// Pure color function used by the projector
pub trait ColorSource: Send + Sync {
    /// - `mass` in kg
    /// - `z_velocity` in m/s, negative is towards the camera
    /// - `distance` from the camera in meters
    /// - `gamma` applied on top of the distance falloff
    fn color_for(&self, mass: f64, z_velocity: f64, distance: f64, gamma: f64) -> ColorSample;
}

#[derive(Debug, Clone, Copy)]
struct ColorBand {
    low: f64, // lower border in Jupiter masses
    high: f64, // upper border in Jupiter masses
    low_radius: f64, // halo radius modifier at `low`
    high_radius: f64,
    low_range: f64, // halo max range modifier at `low`
    high_range: f64,
    low_rgb: [u8; 3],
    high_rgb: [u8; 3],
}

impl ColorBand {
    const fn new(low: f64, high: f64, radius: (f64, f64), range: (f64, f64), low_rgb: u32, high_rgb: u32) -> Self {
        Self {
            low,
            high,
            low_radius: radius.0,
            high_radius: radius.1,
            low_range: range.0,
            high_range: range.1,
            low_rgb: rgb(low_rgb),
            high_rgb: rgb(high_rgb),
        }
    }

    fn contains(&self, mj: f64) -> bool {
        mj >= self.low && mj <= self.high
    }

    fn sample(&self, mj: f64) -> (Color, f64, f64) {
        let t = ((mj - self.low) / (self.high - self.low)).clamp(0.0, 1.0);
        let lo = Color::new(self.low_rgb[0] as f64, self.low_rgb[1] as f64, self.low_rgb[2] as f64);
        let hi = Color::new(self.high_rgb[0] as f64, self.high_rgb[1] as f64, self.high_rgb[2] as f64);
        (
            lo.lerp(&hi, t),
            self.low_radius + (self.high_radius - self.low_radius) * t,
            self.low_range + (self.high_range - self.low_range) * t,
        )
    }
}

const fn rgb(hex: u32) -> [u8; 3] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8]
}

// Bands may overlap, the first matching one wins
const BANDS: [ColorBand; 13] = [
    // giant planets
    ColorBand::new(0.0, 13.0, (5.0, 3.0), (1.5, 2.0), 0x100201, 0x601010),
    // T: methane dwarfs
    ColorBand::new(13.0, 80.0, (3.0, 2.5), (2.0, 2.1), 0x601010, 0x803018),
    // L
    ColorBand::new(75.0, 135.0, (2.5, 2.3), (2.1, 2.2), 0x782820, 0x806030),
    // M: red dwarfs
    ColorBand::new(135.0, 418.95, (2.3, 2.1), (2.2, 2.3), 0x806030, 0xE02028),
    // gap between M and K
    ColorBand::new(418.95, 523.68, (2.1, 2.0), (2.3, 2.4), 0xE02028, 0xC09000),
    // K: orange dwarfs
    ColorBand::new(523.68, 837.89, (2.0, 1.2), (2.4, 2.5), 0xC09000, 0xFFD800),
    // G
    ColorBand::new(837.89, 1200.0, (1.2, 0.8), (2.5, 2.5), 0xFFD800, 0xFFFF60),
    // F
    ColorBand::new(1047.37, 1400.0, (0.8, 0.6), (2.5, 3.0), 0xFFF040, 0xFFFFFF),
    // A
    ColorBand::new(1400.0, 2199.47, (0.6, 0.4), (3.0, 4.0), 0xFFFFFF, 0xE8E8FF),
    // B, fast change to blue
    ColorBand::new(2094.74, 3000.0, (0.4, 0.1), (4.0, 6.0), 0xF4F4FF, 0xA0C8FF),
    // B, slow blue rise
    ColorBand::new(3000.0, 16000.0, (0.1, 0.0), (6.0, 20.0), 0xA0C8FF, 0x90A0FF),
    // O
    ColorBand::new(15710.53, 94263.16, (0.0, 0.0), (20.0, 20.0), 0x98A4FF, 0x0060FF),
    // collapsed super masses
    ColorBand::new(94263.16, 50.0e6, (0.0, 0.0), (20.0, 20.0), 0x0060FF, 0x401060),
];

/// The built-in stellar color table
#[derive(Debug, Clone, Copy, Default)]
pub struct StellarColorMap;

impl StellarColorMap {
    pub fn new() -> Self {
        Self
    }
}

impl ColorSource for StellarColorMap {
    fn color_for(&self, mass: f64, z_velocity: f64, distance: f64, gamma: f64) -> ColorSample {
        let mj = mass.max(0.0) / JUPITER_MASS;

        let (color, halo_radius_mod, halo_range_mod) = match BANDS.iter().find(|b| b.contains(mj)) {
            Some(band) => band.sample(mj),
            None => {
                // beyond the table: keep the last band's upper end
                let last = &BANDS[BANDS.len() - 1];
                last.sample(last.high)
            }
        };

        let color = doppler_tint(color, z_velocity);

        // dim everything further away than a parsec by its apparent magnitude
        let mut gamma = gamma;
        let parsecs = distance / PARSEC;
        if parsecs > 1.0 {
            let apparent = 5.0 * parsecs.log10() - 5.0;
            gamma *= 1.0 - apparent / 100.0;
        }

        ColorSample {
            color: apply_gamma(color, gamma),
            halo_radius_mod,
            halo_range_mod,
        }
    }
}

/// Approaching bodies shift towards blue, receding ones towards red
fn doppler_tint(color: Color, z_velocity: f64) -> Color {
    let shift = (-z_velocity / SPEED_OF_LIGHT).clamp(-1.0, 1.0);
    let mut c = color;
    if shift > 0.0 {
        c.x *= 1.0 - shift;
        c.z += (255.0 - c.z) * shift;
    } else if shift < 0.0 {
        c.z *= 1.0 + shift;
        c.x += (255.0 - c.x) * -shift;
    }
    c
}

fn apply_gamma(color: Color, gamma: f64) -> Color {
    if gamma <= 0.0 {
        return Color::zeros();
    }
    if gamma == 1.0 {
        return color.map(|ch| ch.clamp(0.0, 255.0));
    }
    color.map(|ch| 255.0 * (ch.clamp(0.0, 255.0) / 255.0).powf(1.0 / gamma))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_borders_use_their_own_colors() {
        let map = StellarColorMap::new();
        let s = map.color_for(0.0, 0.0, 1.0, 1.0);
        approx::assert_abs_diff_eq!(s.color, Color::new(16.0, 2.0, 1.0), epsilon = 1e-9);
        assert_eq!(s.halo_radius_mod, 5.0);
    }

    #[test]
    fn heavier_bodies_get_smaller_halos() {
        let map = StellarColorMap::new();
        let light = map.color_for(2.85e28, 0.0, 1.0, 1.0);
        let heavy = map.color_for(1.99e30, 0.0, 1.0, 1.0);
        assert!(heavy.halo_radius_mod < light.halo_radius_mod);
    }

    #[test]
    fn far_bodies_are_dimmer() {
        let map = StellarColorMap::new();
        let near = map.color_for(1.99e30, 0.0, 1.0, 1.0);
        let far = map.color_for(1.99e30, 0.0, PARSEC * 1.0e6, 1.0);
        assert!(far.color.sum() < near.color.sum());
    }
}
