//! Box overlap used by non-maximum suppression.

/// Intersection over union of two `[x1, y1, x2, y2]` boxes; 0 when they
/// only touch or do not overlap.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let [ax1, ay1, ax2, ay2] = *a;
    let [bx1, by1, bx2, by2] = *b;

    let overlap_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let overlap_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let intersection = overlap_w * overlap_h;
    if intersection <= 0.0 {
        return 0.0;
    }

    let union = (ax2 - ax1) * (ay2 - ay1) + (bx2 - bx1) * (by2 - by1) - intersection;
    intersection / union
}
