use thiserror::Error;

use crate::camera::domain::camera_error::CameraError;
use crate::flow::flow_state::FlowState;

/// Errors surfaced synchronously by the flow coordinator.
///
/// Every variant leaves the flow in a retriable state.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("No faces found, please try again")]
    NoFaces,
    #[error("Too many faces found, only one is allowed")]
    TooManyFaces,
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: FlowState,
    },
    #[error("The camera stopped, please try again")]
    SessionEnded,
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("failed to start face detection: {0}")]
    Detection(#[source] std::io::Error),
}

impl FlowError {
    /// Rejections from the single-face gate, as opposed to setup failures.
    pub fn is_gate_rejection(&self) -> bool {
        matches!(self, FlowError::NoFaces | FlowError::TooManyFaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_messages() {
        assert_eq!(FlowError::NoFaces.to_string(), "No faces found, please try again");
        assert_eq!(
            FlowError::TooManyFaces.to_string(),
            "Too many faces found, only one is allowed"
        );
    }

    #[test]
    fn test_camera_error_is_transparent() {
        let err: FlowError = CameraError::DeviceUnavailable("/dev/video0".into()).into();
        assert_eq!(err.to_string(), "Front camera is not available: /dev/video0");
        assert!(!err.is_gate_rejection());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = FlowError::InvalidState {
            operation: "capture a photo",
            state: FlowState::Reviewing,
        };
        assert_eq!(err.to_string(), "cannot capture a photo while reviewing");
    }
}
