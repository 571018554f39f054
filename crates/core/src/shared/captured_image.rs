use std::time::SystemTime;

use crate::shared::frame::Frame;

/// A still image produced by an explicit capture request.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturedImage {
    frame: Frame,
    captured_at: SystemTime,
}

impl CapturedImage {
    pub fn new(frame: Frame, captured_at: SystemTime) -> Self {
        Self { frame, captured_at }
    }

    /// Wraps a frame, stamping it with the current wall-clock time.
    pub fn now(frame: Frame) -> Self {
        Self::new(frame, SystemTime::now())
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }
}
