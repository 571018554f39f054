//! Stub ports shared by the flow test suites.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::camera::domain::camera_error::CameraError;
use crate::camera::domain::frame_source::{FrameObserver, FrameSource, PreviewSurface};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::overlay_surface::OverlaySurface;
use crate::flow::flow_config::SelfieHost;
use crate::flow::flow_view::FlowView;
use crate::shared::captured_image::CapturedImage;
use crate::shared::face_box::{FaceBox, ViewRect, ViewSize};
use crate::shared::frame::Frame;

// --- Detector ---

pub(crate) type Script = Arc<Mutex<HashMap<usize, Result<Vec<FaceBox>, String>>>>;

/// Answers from a script keyed by frame index. Unscripted frames yield no
/// faces.
pub(crate) struct ScriptedDetector {
    script: Script,
}

impl ScriptedDetector {
    pub(crate) fn new() -> (Self, Script) {
        let script = Script::default();
        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        match self.script.lock().unwrap().get(&frame.index()) {
            Some(Ok(boxes)) => Ok(boxes.clone()),
            Some(Err(msg)) => Err(msg.clone().into()),
            None => Ok(Vec::new()),
        }
    }
}

// --- Surfaces ---

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OverlayEvent {
    Clear,
    Draw(ViewRect),
    Drawn(usize),
}

pub(crate) struct RecordingOverlay {
    pub(crate) events: Mutex<Vec<OverlayEvent>>,
    pub(crate) attached: AtomicBool,
}

impl RecordingOverlay {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            attached: AtomicBool::new(true),
        })
    }
}

impl OverlaySurface for RecordingOverlay {
    fn size(&self) -> ViewSize {
        ViewSize::new(200.0, 200.0)
    }
    fn clear_boxes(&self) {
        self.events.lock().unwrap().push(OverlayEvent::Clear);
    }
    fn draw_box(&self, rect: ViewRect) {
        self.events.lock().unwrap().push(OverlayEvent::Draw(rect));
    }
    fn boxes_drawn(&self, count: usize) {
        self.events.lock().unwrap().push(OverlayEvent::Drawn(count));
    }
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct RecordingPreview {
    pub(crate) presented: AtomicUsize,
}

impl PreviewSurface for RecordingPreview {
    fn size(&self) -> ViewSize {
        ViewSize::new(200.0, 200.0)
    }
    fn present(&self, _frame: &Frame) {
        self.presented.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ViewEvent {
    Preview,
    /// Frame index of the reviewed image.
    Review(usize),
    Message(String),
    Dismiss,
}

#[derive(Default)]
pub(crate) struct RecordingView {
    pub(crate) events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub(crate) fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FlowView for RecordingView {
    fn show_preview(&self) {
        self.events.lock().unwrap().push(ViewEvent::Preview);
    }
    fn show_review(&self, image: &CapturedImage) {
        self.events
            .lock()
            .unwrap()
            .push(ViewEvent::Review(image.frame().index()));
    }
    fn show_message(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ViewEvent::Message(message.to_string()));
    }
    fn dismiss(&self) {
        self.events.lock().unwrap().push(ViewEvent::Dismiss);
    }
}

#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) images: Mutex<Vec<CapturedImage>>,
}

impl SelfieHost for RecordingHost {
    fn did_capture_selfie(&self, image: CapturedImage) {
        self.images.lock().unwrap().push(image);
    }
}

// --- Camera ---

#[derive(Default)]
struct CameraState {
    preview: Option<Arc<dyn PreviewSurface>>,
    observer: Option<Arc<dyn FrameObserver>>,
    running: bool,
    starts: usize,
    stops: usize,
    still_requests: usize,
    unavailable: bool,
}

/// Frame source driven by hand from the test body.
pub(crate) struct StubSource {
    state: Arc<Mutex<CameraState>>,
}

/// Test-side handle onto a [`StubSource`].
#[derive(Clone)]
pub(crate) struct StubCamera {
    state: Arc<Mutex<CameraState>>,
}

impl StubSource {
    pub(crate) fn new() -> (Self, StubCamera) {
        let state = Arc::new(Mutex::new(CameraState::default()));
        (
            Self {
                state: state.clone(),
            },
            StubCamera { state },
        )
    }

    /// A source whose device is missing.
    pub(crate) fn unavailable() -> (Self, StubCamera) {
        let (source, camera) = Self::new();
        camera.state.lock().unwrap().unavailable = true;
        (source, camera)
    }
}

impl FrameSource for StubSource {
    fn start(
        &mut self,
        preview: Arc<dyn PreviewSurface>,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CameraError> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(CameraError::DeviceUnavailable("no front camera".into()));
        }
        state.preview = Some(preview);
        state.observer = Some(observer);
        state.running = true;
        state.starts += 1;
        Ok(())
    }

    fn capture_still(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.running {
            state.still_requests += 1;
        }
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.running {
            state.running = false;
            state.stops += 1;
        }
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }
}

impl StubCamera {
    /// Presents and delivers a frame the way a running session would.
    pub(crate) fn emit(&self, frame: Frame) {
        let (preview, observer) = {
            let state = self.state.lock().unwrap();
            (state.preview.clone(), state.observer.clone())
        };
        if let (Some(preview), Some(observer)) = (preview, observer) {
            preview.present(&frame);
            observer.on_frame(frame);
        }
    }

    /// Answers a pending still request with `frame`.
    pub(crate) fn deliver_still(&self, frame: Frame) {
        let observer = self.state.lock().unwrap().observer.clone();
        if let Some(observer) = observer {
            observer.on_still(CapturedImage::now(frame));
        }
    }

    /// Simulates the session ending on its own.
    pub(crate) fn drop_session(&self) {
        self.state.lock().unwrap().running = false;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    /// Makes later `start` calls fail as if the device went away.
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub(crate) fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub(crate) fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub(crate) fn still_requests(&self) -> usize {
        self.state.lock().unwrap().still_requests
    }
}

// --- Helpers ---

pub(crate) fn frame(index: usize) -> Frame {
    filled_frame(index, 0)
}

/// A 4×4 frame whose every byte is `value`.
pub(crate) fn filled_frame(index: usize, value: u8) -> Frame {
    Frame::new(vec![value; 4 * 4 * 3], 4, 4, 3, index, Duration::ZERO)
}

pub(crate) fn faces(n: usize) -> Vec<FaceBox> {
    (0..n)
        .map(|i| FaceBox::new(0.1 * i as f64, 0.1, 0.1, 0.1))
        .collect()
}

pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        std::thread::sleep(Duration::from_millis(2));
    }
}
