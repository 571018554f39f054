pub mod detection_error;
pub mod face_detector;
pub mod face_observation;
pub mod overlay_surface;
