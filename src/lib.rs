pub mod benchmark;
pub mod configuration;
pub mod error;
pub mod persistence;
pub mod scheduler;
pub mod simulation;
pub mod visualization;

pub use simulation::states::{Body, BodyRecord, NVec3, RunStats};
pub use simulation::params::UniverseConstants;
pub use simulation::ordered_set::{OrderedBodySet, SortPass};
pub use simulation::engine::Simulation;
pub use simulation::timing::FrameSchedule;

pub use configuration::config::{
    BodyConfig, DistributionConfig, DistributionMode, EngineConfig, OutputConfig, ScreenConfig, SimulationConfig,
    UniverseConfig,
};

pub use error::{CompositorError, ConfigError, FrameError, Outcome, PersistError, SimError};

pub use persistence::store::SavedState;

pub use scheduler::control::Control;
pub use scheduler::pool::{Phase, PhaseTask, WorkerPool, WorkerSlot};

pub use visualization::camera::CameraGeometry;
pub use visualization::colormap::{ColorSample, ColorSource, StellarColorMap};
pub use visualization::compositor::{Color, DepthCompositor, DustPixel};
pub use visualization::frame::{Frame, FrameCollector, FrameSink, PngSequence};
pub use visualization::noise::{GradientNoise, NoiseField};
pub use visualization::projector::Projector;

pub use benchmark::benchmark::{bench_compositor, bench_gravitation, bench_sort, bench_step};
