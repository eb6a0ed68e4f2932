pub mod collision;
pub mod engine;
pub mod forces;
pub mod integrator;
pub mod ordered_set;
pub mod params;
pub mod phases;
pub mod scenario;
pub mod states;
pub mod timing;
