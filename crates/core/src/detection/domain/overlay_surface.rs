use crate::shared::face_box::{ViewRect, ViewSize};

/// Container view that face boundaries are drawn over.
///
/// Only ever called from the UI context.
pub trait OverlaySurface: Send + Sync {
    fn size(&self) -> ViewSize;
    fn clear_boxes(&self);
    fn draw_box(&self, rect: ViewRect);

    /// Called after the boxes of one observation have all been drawn.
    fn boxes_drawn(&self, _count: usize) {}

    /// False once the hosting view hierarchy has been torn down; late
    /// detection results are then discarded.
    fn is_attached(&self) -> bool {
        true
    }
}
