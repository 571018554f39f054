/// Size of an on-screen container in view points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewSize {
    pub width: f64,
    pub height: f64,
}

impl ViewSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Rectangle in view space: top-left origin, y grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Face bounding box in normalized vision space.
///
/// All components are in `0..=1` relative to the frame, with the origin at
/// the bottom-left corner and y growing upward. This is the convention face
/// detectors report in; [`FaceBox::to_view_rect`] flips it into view space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a normalized box from a top-left-origin pixel rectangle
    /// `[x1, y1, x2, y2]`, clamping it to the frame.
    pub fn from_pixel_corners(corners: [f64; 4], frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width.max(1) as f64;
        let fh = frame_height.max(1) as f64;
        let x1 = corners[0].clamp(0.0, fw);
        let y1 = corners[1].clamp(0.0, fh);
        let x2 = corners[2].clamp(x1, fw);
        let y2 = corners[3].clamp(y1, fh);

        let width = (x2 - x1) / fw;
        let height = (y2 - y1) / fh;
        Self {
            x: x1 / fw,
            y: 1.0 - y2 / fh,
            width,
            height,
        }
    }

    /// Maps the box into a container of the given size.
    ///
    /// `origin = (x·W, (1 − y − h)·H)`, `size = (w·W, h·H)`.
    pub fn to_view_rect(&self, size: ViewSize) -> ViewRect {
        ViewRect {
            x: self.x * size.width,
            y: (1.0 - self.y - self.height) * size.height,
            width: self.width * size.width,
            height: self.height * size.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn assert_rect(actual: ViewRect, expected: ViewRect) {
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(actual.width, expected.width, epsilon = 1e-9);
        assert_relative_eq!(actual.height, expected.height, epsilon = 1e-9);
    }

    fn rect(x: f64, y: f64, width: f64, height: f64) -> ViewRect {
        ViewRect {
            x,
            y,
            width,
            height,
        }
    }

    // ── View transform ───────────────────────────────────────────────

    #[test]
    fn test_centered_box_in_square_container() {
        let b = FaceBox::new(0.25, 0.25, 0.5, 0.5);
        let r = b.to_view_rect(ViewSize::new(200.0, 200.0));
        assert_rect(r, rect(50.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn test_bottom_left_box_flips_to_bottom_of_view() {
        // A box hugging the bottom edge in vision space stays at the bottom
        // of the view, so its top edge sits at H - h·H.
        let b = FaceBox::new(0.0, 0.0, 0.5, 0.25);
        let r = b.to_view_rect(ViewSize::new(200.0, 200.0));
        assert_rect(r, rect(0.0, 150.0, 100.0, 50.0));
    }

    #[rstest]
    #[case::top_right(FaceBox::new(0.5, 0.75, 0.5, 0.25), ViewSize::new(400.0, 100.0), rect(200.0, 0.0, 200.0, 25.0))]
    #[case::full_frame(FaceBox::new(0.0, 0.0, 1.0, 1.0), ViewSize::new(320.0, 480.0), rect(0.0, 0.0, 320.0, 480.0))]
    #[case::zero_container(FaceBox::new(0.1, 0.2, 0.3, 0.4), ViewSize::default(), rect(0.0, 0.0, 0.0, 0.0))]
    fn test_to_view_rect_cases(
        #[case] b: FaceBox,
        #[case] size: ViewSize,
        #[case] expected: ViewRect,
    ) {
        assert_rect(b.to_view_rect(size), expected);
    }

    // ── Pixel conversion ─────────────────────────────────────────────

    #[test]
    fn test_from_pixel_corners_flips_vertical_axis() {
        // Top-left pixel box [0,0]-[50,25] in a 100x100 frame is the top
        // quarter-strip, i.e. y = 0.75 from the bottom in vision space.
        let b = FaceBox::from_pixel_corners([0.0, 0.0, 50.0, 25.0], 100, 100);
        assert_relative_eq!(b.x, 0.0);
        assert_relative_eq!(b.y, 0.75);
        assert_relative_eq!(b.width, 0.5);
        assert_relative_eq!(b.height, 0.25);
    }

    #[test]
    fn test_from_pixel_corners_round_trips_through_view() {
        let b = FaceBox::from_pixel_corners([20.0, 30.0, 60.0, 90.0], 200, 100);
        let r = b.to_view_rect(ViewSize::new(200.0, 100.0));
        assert_rect(r, rect(20.0, 30.0, 40.0, 60.0));
    }

    #[test]
    fn test_from_pixel_corners_clamps_to_frame() {
        let b = FaceBox::from_pixel_corners([-10.0, -10.0, 150.0, 50.0], 100, 100);
        assert_relative_eq!(b.x, 0.0);
        assert_relative_eq!(b.width, 1.0);
        assert_relative_eq!(b.y, 0.5);
        assert_relative_eq!(b.height, 0.5);
    }
}
