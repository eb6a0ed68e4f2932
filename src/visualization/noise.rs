//! Seeded gradient noise
//!
//! Used for the initial body distribution and for the per-pixel perturbation
//! of halos. Values come from simdnoise, sampled one point at a time on a
//! 1x1x1 grid placed at the scaled coordinate, so the same seed always yields
//! the same field, regardless of which thread samples it.

use simdnoise::*;

/// A deterministic noise source with values in [-1, 1]
pub trait NoiseField: Send + Sync {
    /// Noise at `(x, y, z) / zoom`
    fn noise3(&self, x: f64, y: f64, z: f64, zoom: f64) -> f64;

    /// Noise at `(x, y) / zoom`
    fn noise2(&self, x: f64, y: f64, zoom: f64) -> f64 {
        self.noise3(x, y, 0.0, zoom)
    }

    /// Several octaves of `noise3` summed up
    /// - each further octave divides the zoom by `smoothing`
    /// - and its amplitude by `reduction`
    fn fractal3(&self, x: f64, y: f64, z: f64, zoom: f64, smoothing: f64, reduction: f64, octaves: u32) -> f64 {
        let mut sum = 0.0;
        let mut norm = 0.0;
        let mut amp = 1.0;
        let mut zoom = zoom;
        for _ in 0..octaves.max(1) {
            sum += self.noise3(x, y, z, zoom) * amp;
            norm += amp;
            amp /= reduction;
            zoom /= smoothing;
        }
        (sum / norm).clamp(-1.0, 1.0)
    }
}

/// Gradient noise from simdnoise with a fixed seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientNoise {
    seed: i32,
}

impl GradientNoise {
    pub fn new(seed: u64) -> Self {
        // fold the high half in, so seeds differing only there still differ
        let seed = (seed ^ (seed >> 32)) as u32 as i32;
        Self { seed }
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }
}

impl NoiseField for GradientNoise {
    fn noise3(&self, x: f64, y: f64, z: f64, zoom: f64) -> f64 {
        let zoom = non_zero(zoom);
        let (values, _, _) = NoiseBuilder::gradient_3d_offset(
            (x / zoom) as f32,
            1,
            (y / zoom) as f32,
            1,
            (z / zoom) as f32,
            1,
        )
        .with_freq(1.0)
        .with_seed(self.seed)
        .generate();

        values.first().map_or(0.0, |&v| (v as f64).clamp(-1.0, 1.0))
    }

    /// Octaves summed by simdnoise's fractal brownian motion
    ///
    /// Lacunarity is `smoothing` and gain is `1 / reduction`, the sum is
    /// normalized by the total amplitude.
    fn fractal3(&self, x: f64, y: f64, z: f64, zoom: f64, smoothing: f64, reduction: f64, octaves: u32) -> f64 {
        let zoom = non_zero(zoom);
        let octaves = octaves.clamp(1, u8::MAX as u32);
        let gain = 1.0 / non_zero(reduction);

        let (values, _, _) = NoiseBuilder::fbm_3d_offset(
            (x / zoom) as f32,
            1,
            (y / zoom) as f32,
            1,
            (z / zoom) as f32,
            1,
        )
        .with_freq(1.0)
        .with_octaves(octaves as u8)
        .with_lacunarity(smoothing as f32)
        .with_gain(gain as f32)
        .with_seed(self.seed)
        .generate();

        let norm: f64 = (0..octaves).map(|k| gain.powi(k as i32)).sum();
        values.first().map_or(0.0, |&v| (v as f64 / norm).clamp(-1.0, 1.0))
    }
}

fn non_zero(v: f64) -> f64 {
    if v.abs() < f64::EPSILON {
        1.0
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let a = GradientNoise::new(7);
        let b = GradientNoise::new(7);
        for i in 0..50 {
            let f = i as f64 * 0.731;
            assert_eq!(a.noise3(f, -f, f * 0.5, 3.0), b.noise3(f, -f, f * 0.5, 3.0));
            assert_eq!(
                a.fractal3(f, f, -f, 5.0, 1.337, 1.667, 4),
                b.fractal3(f, f, -f, 5.0, 1.337, 1.667, 4)
            );
        }
    }

    #[test]
    fn values_stay_in_range() {
        let n = GradientNoise::new(1);
        for i in 0..500 {
            let f = i as f64 * 0.137;
            let v = n.fractal3(f, f * 1.3, -f, 5.0, 1.337, 1.667, 5);
            assert!((-1.0..=1.0).contains(&v));
            let v = n.noise3(f, -f, f * 0.3, 0.0);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn field_is_not_flat() {
        let n = GradientNoise::new(11);
        let values: Vec<f64> = (0..64).map(|i| n.noise3(i as f64 * 0.37, i as f64 * 0.11, 0.5, 1.0)).collect();
        assert!(values.iter().any(|v| (v - values[0]).abs() > 1e-3));
    }

    #[test]
    fn high_seed_bits_matter() {
        assert_ne!(GradientNoise::new(5).seed(), GradientNoise::new(5 | 1 << 40).seed());
    }
}
