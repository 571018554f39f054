use crate::shared::face_box::{FaceBox, ViewRect, ViewSize};

/// Faces found in a single frame.
///
/// Each successful detection pass produces a fresh observation that fully
/// replaces the previous one; boxes are never merged across frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceObservation {
    boxes: Vec<FaceBox>,
    frame_index: Option<usize>,
}

impl FaceObservation {
    pub fn new(frame_index: usize, boxes: Vec<FaceBox>) -> Self {
        Self {
            boxes,
            frame_index: Some(frame_index),
        }
    }

    /// No faces, not derived from any frame.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.boxes.len()
    }

    pub fn boxes(&self) -> &[FaceBox] {
        &self.boxes
    }

    /// Index of the frame this observation was detected in.
    pub fn frame_index(&self) -> Option<usize> {
        self.frame_index
    }

    pub fn view_rects(&self, size: ViewSize) -> Vec<ViewRect> {
        self.boxes.iter().map(|b| b.to_view_rect(size)).collect()
    }
}
