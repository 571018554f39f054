pub mod camera_error;
pub mod frame_source;
