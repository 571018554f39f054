use std::sync::Arc;

use crate::camera::domain::frame_source::PreviewSurface;
use crate::detection::domain::overlay_surface::OverlaySurface;
use crate::flow::ui_executor::UiExecutor;
use crate::shared::captured_image::CapturedImage;

/// Screens of the embedding UI. Always called on the UI context.
pub trait FlowView: Send + Sync {
    /// Live preview with the capture button.
    fn show_preview(&self);
    /// Captured image with approve/recapture buttons.
    fn show_review(&self, image: &CapturedImage);
    /// Dismissable message (gate rejections, setup failures).
    fn show_message(&self, message: &str);
    /// Leave the flow entirely.
    fn dismiss(&self);
}

/// UI collaborators a coordinator needs before it can start.
#[derive(Clone)]
pub struct ViewBinding {
    pub ui: UiExecutor,
    pub preview: Arc<dyn PreviewSurface>,
    pub overlay: Arc<dyn OverlaySurface>,
    pub view: Arc<dyn FlowView>,
}
