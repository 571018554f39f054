use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use selfie_gate_core::camera::domain::frame_source::PreviewSurface;
use selfie_gate_core::detection::domain::overlay_surface::OverlaySurface;
use selfie_gate_core::flow::flow_config::SelfieHost;
use selfie_gate_core::flow::flow_view::FlowView;
use selfie_gate_core::shared::captured_image::CapturedImage;
use selfie_gate_core::shared::face_box::{ViewRect, ViewSize};
use selfie_gate_core::shared::frame::Frame;

/// A stdin command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Capture,
    Approve,
    Recapture,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "capture" => Ok(Command::Capture),
            "a" | "approve" => Ok(Command::Approve),
            "r" | "recapture" => Ok(Command::Recapture),
            "q" | "quit" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{other}' (c, a, r, q)")),
        }
    }
}

/// Preview, overlay and screens rendered as status lines on stderr.
///
/// The view is sized like the incoming frames, so overlay rectangles are
/// reported in frame pixels.
pub struct TerminalView {
    size: Mutex<ViewSize>,
    frames_seen: AtomicUsize,
    reported_count: Mutex<Option<usize>>,
    attached: AtomicBool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            size: Mutex::new(ViewSize::default()),
            frames_seen: AtomicUsize::new(0),
            reported_count: Mutex::new(None),
            attached: AtomicBool::new(true),
        }
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen.load(Ordering::Relaxed)
    }

    /// Returns `count` when it differs from the last reported one.
    fn note_face_count(&self, count: usize) -> Option<usize> {
        let mut reported = self
            .reported_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (reported.replace(count) != Some(count)).then_some(count)
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSurface for TerminalView {
    fn size(&self) -> ViewSize {
        *self.size.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn present(&self, frame: &Frame) {
        if self.frames_seen.fetch_add(1, Ordering::Relaxed) == 0 {
            log::info!("First frame: {}x{}", frame.width(), frame.height());
        }
        *self.size.lock().unwrap_or_else(PoisonError::into_inner) =
            ViewSize::new(frame.width() as f64, frame.height() as f64);
    }
}

impl OverlaySurface for TerminalView {
    fn size(&self) -> ViewSize {
        PreviewSurface::size(self)
    }

    fn clear_boxes(&self) {}

    fn draw_box(&self, rect: ViewRect) {
        log::debug!(
            "Face at ({:.0}, {:.0}) {:.0}x{:.0}",
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }

    fn boxes_drawn(&self, count: usize) {
        if let Some(count) = self.note_face_count(count) {
            eprintln!("Faces in view: {count}");
        }
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl FlowView for TerminalView {
    fn show_preview(&self) {
        eprintln!("Live preview running. Commands: c = capture, q = quit");
    }

    fn show_review(&self, image: &CapturedImage) {
        eprintln!(
            "Captured {}x{} image. Commands: a = approve, r = recapture, q = quit",
            image.width(),
            image.height()
        );
    }

    fn show_message(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn dismiss(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

/// Writes the approved selfie to disk.
pub struct ImageFileHost {
    output: PathBuf,
    outcome: Mutex<Option<Result<(), String>>>,
}

impl ImageFileHost {
    pub fn new(output: PathBuf) -> Self {
        Self {
            output,
            outcome: Mutex::new(None),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Result of the write, once an image was approved.
    pub fn take_outcome(&self) -> Option<Result<(), String>> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl SelfieHost for ImageFileHost {
    fn did_capture_selfie(&self, image: CapturedImage) {
        let result = save_image(&self.output, &image).map_err(|e| e.to_string());
        if let Err(e) = &result {
            log::error!("Failed to write {}: {e}", self.output.display());
        }
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }
}

fn save_image(path: &Path, image: &CapturedImage) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let frame = image.frame();
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn captured(width: u32, height: u32, value: u8) -> CapturedImage {
        let data = vec![value; (width * height * 3) as usize];
        CapturedImage::now(Frame::new(data, width, height, 3, 0, Duration::ZERO))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("c".parse::<Command>().unwrap(), Command::Capture);
        assert_eq!(" Approve\n".parse::<Command>().unwrap(), Command::Approve);
        assert_eq!("r".parse::<Command>().unwrap(), Command::Recapture);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
        assert!("x".parse::<Command>().is_err());
    }

    #[test]
    fn test_host_writes_approved_image() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested").join("selfie.png");
        let host = ImageFileHost::new(output.clone());

        host.did_capture_selfie(captured(6, 4, 77));

        assert_eq!(host.take_outcome(), Some(Ok(())));
        let written = image::open(&output).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (6, 4));
        assert!(written.as_raw().iter().all(|&b| b == 77));
    }

    #[test]
    fn test_host_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("selfie.unknownformat");
        let host = ImageFileHost::new(output);

        host.did_capture_selfie(captured(2, 2, 1));

        assert!(matches!(host.take_outcome(), Some(Err(_))));
    }

    #[test]
    fn test_view_tracks_frame_size() {
        let view = TerminalView::new();
        view.present(&Frame::new(vec![0; 8 * 6 * 3], 8, 6, 3, 0, Duration::ZERO));
        assert_eq!(PreviewSurface::size(&view), ViewSize::new(8.0, 6.0));
        assert_eq!(OverlaySurface::size(&view), ViewSize::new(8.0, 6.0));
        assert_eq!(view.frames_seen(), 1);
    }

    #[test]
    fn test_face_count_reported_for_current_pass_only_on_change() {
        let view = TerminalView::new();

        assert_eq!(view.note_face_count(1), Some(1));
        assert_eq!(view.note_face_count(1), None);
        assert_eq!(view.note_face_count(2), Some(2));
    }

    #[test]
    fn test_cleared_count_is_reported() {
        let view = TerminalView::new();
        view.clear_boxes();
        view.draw_box(ViewRect::default());
        view.boxes_drawn(1);

        view.clear_boxes();
        view.boxes_drawn(0);

        assert_eq!(*view.reported_count.lock().unwrap(), Some(0));
        assert_eq!(view.note_face_count(0), None);
    }

    #[test]
    fn test_dismiss_detaches_overlay() {
        let view = TerminalView::new();
        assert!(view.is_attached());
        view.dismiss();
        assert!(!view.is_attached());
    }
}
