//! Configuration types for loading simulation runs from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation run. A run consists of:
//!
//! - [`EngineConfig`]       – worker pool, time scaling, collisions, seed
//! - [`ScreenConfig`]       – projection plane and camera
//! - [`UniverseConfig`]     – reference body the physical constants derive from
//! - [`DistributionConfig`] – how the initial bodies are generated
//! - [`OutputConfig`]       – frame files and the state file
//! - [`BodyConfig`]         – explicit initial bodies, replacing generation
//! - [`SimulationConfig`]   – top-level wrapper used to load a run from YAML
//!
//! Every section and every field is optional.
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   workers: 8
//!   fps: 50
//!   seconds_per_cycle: 604800   # one week per animation cycle
//!   collisions: true
//!   adaptive_gravitation: false
//!   seed: 42
//!   frames: 100                 # 0 runs until stopped
//!   save_every: 0
//!
//! screen:
//!   width: 400
//!   height: 400
//!   fov: 90.0
//!   dynamic_camera: false
//!
//! distribution:
//!   mode: spiral                # or explosion, shockwave
//!   zoom: 29.7633
//!
//! output:
//!   directory: frames
//!   prefix: frame
//!   state_file: state.yaml
//!
//! bodies:
//!   - position: [ -20.0, 0.0, 0.0 ]
//!     movement: [ 0.0, 1000.0, 0.0 ]
//!     mass: 1.99e30
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Worker pool, time scaling and physics switches
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub workers: usize, // worker pool size
    pub fps: usize, // frames per animation cycle
    pub seconds_per_cycle: u64, // simulated seconds per animation cycle
    pub collisions: bool, // merge touching bodies
    pub adaptive_gravitation: bool, // recompute gravitation only after enough movement
    pub seed: u64, // noise seed, makes runs reproducible
    pub frames: u64, // stop after this many frames, 0 = never
    pub save_every: u64, // frames between saves, 0 = never
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            fps: 50,
            seconds_per_cycle: 604_800,
            collisions: true,
            adaptive_gravitation: false,
            seed: 42,
            frames: 0,
            save_every: 0,
        }
    }
}

/// Projection plane and camera
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: usize,
    pub height: usize,
    pub fov: f64, // horizontal field of view, degrees
    pub dynamic_camera: bool, // move the plane towards the nearest body
    pub half_x: bool, // generate bodies on every second column only
    pub half_y: bool, // generate bodies on every second row only
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            fov: 90.0,
            dynamic_camera: false,
            half_x: false,
            half_y: false,
        }
    }
}

/// Reference body for the physical constants
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UniverseConfig {
    pub reference_mass: f64, // kg
    pub reference_radius: f64, // m
    pub unit_mass: f64, // kg of every generated body
    pub pixels_per_reference: f64, // projected radius of the reference body
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            reference_mass: 1.99e30,
            reference_radius: 6.96e8,
            unit_mass: 2.85e28,
            pixels_per_reference: 3.75,
        }
    }
}

/// Shape of the generated initial distribution
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionMode {
    #[serde(rename = "spiral")] // spiral from the outside in, z from noise
    #[default]
    Spiral,

    #[serde(rename = "explosion")] // sphere around the center, moving outwards
    Explosion,

    #[serde(rename = "shockwave")] // mirrored grid, z from the distance to the center
    Shockwave,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DistributionConfig {
    pub mode: DistributionMode,
    pub zoom: f64, // noise feature size
    pub smoothing: f64, // zoom divisor per octave
    pub reduction: f64, // amplitude divisor per octave
    pub octaves: u32,
    pub offset: [f64; 3], // noise offsets on x, y, z
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            mode: DistributionMode::Spiral,
            zoom: 29.7633,
            smoothing: 1.337,
            reduction: 1.667,
            octaves: 5,
            offset: [0.0; 3],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf, // frames are written here
    pub prefix: String, // frame file name prefix
    pub state_file: Option<PathBuf>, // saved and loaded body state
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("frames"),
            prefix: "frame".to_string(),
            state_file: None,
        }
    }
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub position: [f64; 3], // position units
    #[serde(default)]
    pub movement: [f64; 3], // m/s
    pub mass: f64, // kg
}

/// Top-level run configuration loaded from YAML.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub engine: EngineConfig,
    pub screen: ScreenConfig,
    pub universe: UniverseConfig,
    pub distribution: DistributionConfig,
    pub output: OutputConfig,
    pub bodies: Vec<BodyConfig>, // replaces the generated distribution when not empty
}

impl SimulationConfig {
    /// Read and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: SimulationConfig = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.engine.workers == 0 {
            return invalid("engine.workers must be at least 1");
        }
        if self.engine.fps == 0 {
            return invalid("engine.fps must be at least 1");
        }
        if self.engine.seconds_per_cycle == 0 {
            return invalid("engine.seconds_per_cycle must be at least 1");
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return invalid("screen.width and screen.height must not be zero");
        }
        if !(self.screen.fov > 0.0 && self.screen.fov < 180.0) {
            return invalid("screen.fov must be between 0 and 180 degrees");
        }

        let u = &self.universe;
        let positive = [u.reference_mass, u.reference_radius, u.unit_mass, u.pixels_per_reference];
        if !positive.iter().all(|v| v.is_finite() && *v > 0.0) {
            return invalid("universe values must be positive");
        }

        let d = &self.distribution;
        if d.zoom <= 0.0 || d.smoothing <= 0.0 || d.reduction <= 0.0 {
            return invalid("distribution.zoom, smoothing and reduction must be positive");
        }

        for (i, b) in self.bodies.iter().enumerate() {
            let finite = b.position.iter().chain(b.movement.iter()).all(|v| v.is_finite());
            if !finite || !(b.mass.is_finite() && b.mass >= 1.0) {
                return Err(ConfigError::Invalid(format!("bodies[{}] needs finite values and a mass of at least 1 kg", i)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_all_defaults() {
        let cfg = SimulationConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg, SimulationConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = SimulationConfig::from_yaml("engine:\n  fps: 25\ndistribution:\n  mode: shockwave\n").unwrap();
        assert_eq!(cfg.engine.fps, 25);
        assert_eq!(cfg.engine.workers, 8);
        assert_eq!(cfg.distribution.mode, DistributionMode::Shockwave);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(SimulationConfig::from_yaml("screen:\n  width: 0\n"), Err(ConfigError::Invalid(_))));
        assert!(matches!(SimulationConfig::from_yaml("screen:\n  fov: 180\n"), Err(ConfigError::Invalid(_))));
        assert!(matches!(SimulationConfig::from_yaml("engine:\n  workers: 0\n"), Err(ConfigError::Invalid(_))));
        assert!(matches!(SimulationConfig::from_yaml("engine: [1, 2]\n"), Err(ConfigError::Parse(_))));
    }
}
