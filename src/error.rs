//! Error types for the simulator.
//!
//! - [`ConfigError`]     – scenario file could not be read or holds invalid values
//! - [`PersistError`]    – saved body state could not be written or read back
//! - [`CompositorError`] – per-pixel dust storage could not grow
//! - [`FrameError`]      – a resolved frame could not be handed to its sink
//! - [`SimError`]        – everything that ends a run as a fatal [`Outcome`]

use std::fmt;

/// Errors that can occur while loading a scenario configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the scenario file.
    Io(std::io::Error),
    /// The YAML could not be deserialized.
    Parse(serde_yaml::Error),
    /// A value is outside its allowed range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read scenario file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse scenario file: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid scenario value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Errors that can occur while saving or loading body state.
#[derive(Debug)]
pub enum PersistError {
    /// Failed to read or write the state file.
    Io(std::io::Error),
    /// The state file is not valid YAML for a saved state.
    Parse(serde_yaml::Error),
    /// The state file was written by an incompatible version.
    Version { found: u32, expected: u32 },
    /// A body record holds values that cannot describe a body.
    Malformed { index: usize, reason: &'static str },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "Failed to access state file: {}", e),
            PersistError::Parse(e) => write!(f, "Failed to parse state file: {}", e),
            PersistError::Version { found, expected } => {
                write!(f, "State file version {} does not match expected version {}", found, expected)
            }
            PersistError::Malformed { index, reason } => {
                write!(f, "Body record {} is malformed: {}", index, reason)
            }
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<serde_yaml::Error> for PersistError {
    fn from(e: serde_yaml::Error) -> Self {
        PersistError::Parse(e)
    }
}

/// Errors raised by the depth compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorError {
    /// A dust chain needed a new slot and the allocation failed.
    Exhausted { x: usize, y: usize },
}

impl fmt::Display for CompositorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositorError::Exhausted { x, y } => {
                write!(f, "Out of memory growing dust chain at pixel {}x{}", x, y)
            }
        }
    }
}

impl std::error::Error for CompositorError {}

/// Errors that can occur while emitting a frame.
#[derive(Debug)]
pub enum FrameError {
    /// Failed to create the output directory.
    Io(std::io::Error),
    /// Failed to encode or write the image.
    Image(image::ImageError),
    /// The pixel buffer does not match the frame size.
    Size { expected: usize, found: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "Failed to prepare frame output: {}", e),
            FrameError::Image(e) => write!(f, "Failed to write frame image: {}", e),
            FrameError::Size { expected, found } => {
                write!(f, "Frame buffer holds {} bytes, expected {}", found, expected)
            }
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Io(e) => Some(e),
            FrameError::Image(e) => Some(e),
            FrameError::Size { .. } => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        FrameError::Io(e)
    }
}

impl From<image::ImageError> for FrameError {
    fn from(e: image::ImageError) -> Self {
        FrameError::Image(e)
    }
}

/// Fatal errors that end a simulation run.
#[derive(Debug)]
pub enum SimError {
    /// The body set could not grow.
    PoolExhausted(usize),
    /// The worker threads could not be started.
    Workers(rayon::ThreadPoolBuildError),
    /// The compositor could not grow.
    Compositor(CompositorError),
    /// A frame could not be emitted.
    Frame(FrameError),
    /// A periodic save failed.
    Persist(PersistError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::PoolExhausted(n) => write!(f, "Out of memory allocating {} bodies", n),
            SimError::Workers(e) => write!(f, "Cannot start worker threads: {}", e),
            SimError::Compositor(e) => write!(f, "{}", e),
            SimError::Frame(e) => write!(f, "{}", e),
            SimError::Persist(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::PoolExhausted(_) => None,
            SimError::Workers(e) => Some(e),
            SimError::Compositor(e) => Some(e),
            SimError::Frame(e) => Some(e),
            SimError::Persist(e) => Some(e),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for SimError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        SimError::Workers(e)
    }
}

impl From<CompositorError> for SimError {
    fn from(e: CompositorError) -> Self {
        SimError::Compositor(e)
    }
}

impl From<FrameError> for SimError {
    fn from(e: FrameError) -> Self {
        SimError::Frame(e)
    }
}

impl From<PersistError> for SimError {
    fn from(e: PersistError) -> Self {
        SimError::Persist(e)
    }
}

/// Result of one phase or of a whole run.
#[derive(Debug)]
pub enum Outcome {
    /// Everything ran to completion.
    Success,
    /// A cancel request stopped the work early; state is consistent.
    Stopped,
    /// Something failed that the run cannot recover from.
    Fatal(SimError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Keep the more severe of two outcomes: Fatal > Stopped > Success.
    pub fn merge(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Fatal(e), _) | (_, Outcome::Fatal(e)) => Outcome::Fatal(e),
            (Outcome::Stopped, _) | (_, Outcome::Stopped) => Outcome::Stopped,
            _ => Outcome::Success,
        }
    }
}

impl From<SimError> for Outcome {
    fn from(e: SimError) -> Self {
        Outcome::Fatal(e)
    }
}
