use std::sync::Arc;

use crate::shared::captured_image::CapturedImage;
use crate::shared::constants::DEFAULT_STALE_AFTER_FAILURES;

/// Host application callback.
pub trait SelfieHost: Send + Sync {
    /// Called exactly once per completed flow with the approved image.
    /// Never called when the flow is discarded.
    fn did_capture_selfie(&self, image: CapturedImage);
}

/// Per-flow configuration, owned by whoever builds the screen.
#[derive(Clone)]
pub struct FlowConfig {
    pub host: Arc<dyn SelfieHost>,
    /// Consecutive detection failures after which the published face count
    /// is cleared to zero. `0` keeps the last count indefinitely.
    pub stale_after_failures: usize,
}

impl FlowConfig {
    pub fn new(host: Arc<dyn SelfieHost>) -> Self {
        Self {
            host,
            stale_after_failures: DEFAULT_STALE_AFTER_FAILURES,
        }
    }

    pub fn with_stale_after_failures(mut self, failures: usize) -> Self {
        self.stale_after_failures = failures;
        self
    }
}
