pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Consecutive detection failures after which the published face count is
/// cleared (~0.5 second at 30 fps).
pub const DEFAULT_STALE_AFTER_FAILURES: usize = 15;

/// Frame interval for replayed image sequences (~30 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
