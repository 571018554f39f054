use std::sync::Arc;

use crate::camera::domain::camera_error::CameraError;
use crate::shared::captured_image::CapturedImage;
use crate::shared::face_box::ViewSize;
use crate::shared::frame::Frame;

/// Receives the output of a running camera session.
///
/// `on_frame` is called from the session's delivery thread for every frame
/// and must not block. `on_still` is called once per honored
/// [`FrameSource::capture_still`] request.
pub trait FrameObserver: Send + Sync {
    fn on_frame(&self, frame: Frame);
    fn on_still(&self, image: CapturedImage);
}

/// Container view the live preview is drawn into.
pub trait PreviewSurface: Send + Sync {
    fn size(&self) -> ViewSize;
    fn present(&self, frame: &Frame);
}

/// Quality preset requested from the capture device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolutionTier {
    Low,
    Medium,
    #[default]
    High,
}

impl ResolutionTier {
    /// Requested capture size in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ResolutionTier::Low => (640, 480),
            ResolutionTier::Medium => (960, 540),
            ResolutionTier::High => (1280, 720),
        }
    }
}

impl std::str::FromStr for ResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(ResolutionTier::Low),
            "medium" => Ok(ResolutionTier::Medium),
            "high" => Ok(ResolutionTier::High),
            other => Err(format!(
                "Resolution must be one of: low, medium, high, got '{other}'"
            )),
        }
    }
}

/// A live front-facing camera pipeline.
///
/// One session exists between a successful `start` and the next `stop`.
/// Frames are produced on a background thread owned by the implementation.
pub trait FrameSource: Send {
    /// Configures input, preview, frame stream and still output, then starts
    /// streaming without blocking the caller.
    fn start(
        &mut self,
        preview: Arc<dyn PreviewSurface>,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CameraError>;

    /// Requests one still image, delivered through [`FrameObserver::on_still`].
    ///
    /// Ignored when no session is running.
    fn capture_still(&mut self);

    /// Halts the session. Calling it again is a no-op.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
