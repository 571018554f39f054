use crate::flow::flow_error::FlowError;

/// Admits a capture only when exactly one face is in view.
pub fn check(face_count: usize) -> Result<(), FlowError> {
    match face_count {
        0 => Err(FlowError::NoFaces),
        1 => Ok(()),
        _ => Err(FlowError::TooManyFaces),
    }
}
