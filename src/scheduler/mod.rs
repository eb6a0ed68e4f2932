pub mod control;
pub mod pool;
