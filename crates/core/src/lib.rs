pub mod camera;
pub mod detection;
pub mod flow;
pub mod shared;
