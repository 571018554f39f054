use thiserror::Error;

/// Failures while configuring a camera session.
///
/// Both variants are fatal to the current start attempt; the caller must
/// start again explicitly.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Front camera is not available: {0}")]
    DeviceUnavailable(String),
    #[error("Error adding camera input: {0}")]
    InputAttachFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CameraError {
    pub fn input_attach_failed(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::InputAttachFailed(source.into())
    }
}
