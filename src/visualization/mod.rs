pub mod camera;
pub mod colormap;
pub mod compositor;
pub mod frame;
pub mod noise;
pub mod projector;
