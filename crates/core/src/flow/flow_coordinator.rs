use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::camera::domain::frame_source::{FrameObserver, FrameSource};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_observation::FaceObservation;
use crate::flow::capture_gate;
use crate::flow::face_counter::FaceCounter;
use crate::flow::flow_config::FlowConfig;
use crate::flow::flow_error::FlowError;
use crate::flow::flow_state::FlowState;
use crate::flow::flow_view::{FlowView, ViewBinding};
use crate::flow::ui_executor::UiExecutor;
use crate::shared::captured_image::CapturedImage;
use crate::shared::frame::Frame;

/// State touched both by the caller and by the UI context.
#[derive(Default)]
struct FlowShared {
    state: FlowState,
    image: Option<CapturedImage>,
}

type Shared = Arc<Mutex<FlowShared>>;

/// Mediator between the frame source, the face counter and the host.
///
/// Enforces the single-face capture gate and owns the
/// preview → review → approve state machine. The camera session stays live
/// while an image is under review; it is stopped on approval or close.
pub struct FlowCoordinator {
    source: Box<dyn FrameSource>,
    detector: Option<Box<dyn FaceDetector>>,
    config: FlowConfig,
    binding: Option<ViewBinding>,
    counter: Option<Arc<FaceCounter>>,
    shared: Shared,
}

/// Routes session output: frames to the counter, stills to the UI context.
struct SessionObserver {
    counter: Arc<FaceCounter>,
    ui: UiExecutor,
    view: Arc<dyn FlowView>,
    shared: Shared,
}

impl FrameObserver for SessionObserver {
    fn on_frame(&self, frame: Frame) {
        self.counter.process(frame);
    }

    fn on_still(&self, image: CapturedImage) {
        let view = self.view.clone();
        let shared = self.shared.clone();
        self.ui.post(move || accept_still(&shared, view.as_ref(), image));
    }
}

impl FlowCoordinator {
    pub fn new(
        config: FlowConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
    ) -> Self {
        Self {
            source,
            detector: Some(detector),
            config,
            binding: None,
            counter: None,
            shared: Shared::default(),
        }
    }

    /// Supplies the view collaborators. Must be called before [`start`](Self::start).
    pub fn bind(&mut self, binding: ViewBinding) {
        self.binding = Some(binding);
    }

    /// Starts the camera session and face counting.
    ///
    /// Camera setup errors are returned unchanged and leave the flow idle.
    ///
    /// # Panics
    ///
    /// Panics if no [`ViewBinding`] was supplied.
    pub fn start(&mut self) -> Result<(), FlowError> {
        let binding = self
            .binding
            .clone()
            .expect("view binding must be set before start");
        let state = self.state();
        if state != FlowState::Idle {
            return Err(FlowError::InvalidState {
                operation: "start",
                state,
            });
        }

        self.start_session(&binding)?;
        transition(&mut lock(&self.shared), FlowState::Previewing);
        let view = binding.view.clone();
        binding.ui.post(move || view.show_preview());
        Ok(())
    }

    /// Requests a photo if exactly one face is in view.
    ///
    /// The flow moves to reviewing once the still image arrives, not here.
    /// A session that ended on its own is restarted instead and the caller
    /// is asked to try again.
    pub fn capture_photo(&mut self) -> Result<(), FlowError> {
        let state = self.state();
        if state != FlowState::Previewing {
            return Err(FlowError::InvalidState {
                operation: "capture a photo",
                state,
            });
        }

        if !self.source.is_running() {
            log::warn!("Camera session ended during preview, restarting");
            if let Some(binding) = self.binding.clone() {
                self.start_session(&binding)?;
            }
            return Err(FlowError::SessionEnded);
        }

        let count = self.face_count();
        if let Err(e) = capture_gate::check(count) {
            log::info!("Capture rejected with {count} face(s) in view");
            return Err(e);
        }
        log::debug!("Requesting still image");
        self.source.capture_still();
        Ok(())
    }

    /// Ends the session and hands the cached image to the host.
    ///
    /// Does nothing when no image is cached.
    pub fn approve_photo(&mut self) {
        let image = {
            let mut shared = lock(&self.shared);
            if shared.state != FlowState::Reviewing {
                log::debug!("Approve ignored while {}", shared.state);
                return;
            }
            let Some(image) = shared.image.take() else {
                return;
            };
            transition(&mut shared, FlowState::Approved);
            image
        };

        self.stop_session();
        self.config.host.did_capture_selfie(image);
    }

    /// Discards the cached image and returns to the live preview.
    pub fn recapture(&mut self) -> Result<(), FlowError> {
        let binding = self
            .binding
            .clone()
            .expect("view binding must be set before recapture");
        {
            let mut shared = lock(&self.shared);
            if shared.state != FlowState::Reviewing {
                return Err(FlowError::InvalidState {
                    operation: "recapture",
                    state: shared.state,
                });
            }
            shared.image = None;
            transition(&mut shared, FlowState::Previewing);
        }

        if !self.source.is_running() {
            log::info!("Camera session ended during review, restarting");
            if let Err(e) = self.start_session(&binding) {
                transition(&mut lock(&self.shared), FlowState::Idle);
                return Err(e);
            }
        }
        let view = binding.view.clone();
        binding.ui.post(move || view.show_preview());
        Ok(())
    }

    /// Leaves the flow without notifying the host.
    pub fn close(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if shared.state.is_terminal() {
                return;
            }
            shared.image = None;
            transition(&mut shared, FlowState::Closed);
        }
        self.stop_session();
    }

    pub fn state(&self) -> FlowState {
        lock(&self.shared).state
    }

    /// Faces in the latest published observation; 0 before the first frame.
    pub fn face_count(&self) -> usize {
        self.counter.as_ref().map_or(0, |c| c.face_count())
    }

    pub fn observation(&self) -> Arc<FaceObservation> {
        self.counter
            .as_ref()
            .map_or_else(|| Arc::new(FaceObservation::empty()), |c| c.observation())
    }

    /// The image under review, if any.
    pub fn captured_image(&self) -> Option<CapturedImage> {
        lock(&self.shared).image.clone()
    }

    fn start_session(&mut self, binding: &ViewBinding) -> Result<(), FlowError> {
        let counter = match &self.counter {
            Some(counter) => counter.clone(),
            None => {
                let detector = self.detector.take().ok_or_else(|| {
                    FlowError::Detection(std::io::Error::other("face detector unavailable"))
                })?;
                let counter = Arc::new(
                    FaceCounter::spawn(
                        detector,
                        binding.ui.clone(),
                        binding.overlay.clone(),
                        self.config.stale_after_failures,
                    )
                    .map_err(FlowError::Detection)?,
                );
                self.counter = Some(counter.clone());
                counter
            }
        };

        let observer = Arc::new(SessionObserver {
            counter,
            ui: binding.ui.clone(),
            view: binding.view.clone(),
            shared: self.shared.clone(),
        });
        if let Err(e) = self.source.start(binding.preview.clone(), observer) {
            log::warn!("Camera session failed to start: {e}");
            return Err(e.into());
        }
        Ok(())
    }

    fn stop_session(&mut self) {
        self.source.stop();
        if let Some(counter) = self.counter.take() {
            counter.shutdown();
        }
    }
}

impl Drop for FlowCoordinator {
    fn drop(&mut self) {
        self.stop_session();
    }
}

fn lock(shared: &Mutex<FlowShared>) -> MutexGuard<'_, FlowShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transition(shared: &mut FlowShared, to: FlowState) {
    if shared.state != to {
        log::info!("Flow state: {} -> {to}", shared.state);
        shared.state = to;
    }
}

/// Caches a freshly captured still and enters review. Runs on the UI context.
fn accept_still(shared: &Mutex<FlowShared>, view: &dyn FlowView, image: CapturedImage) {
    {
        let mut shared = lock(shared);
        if shared.state != FlowState::Previewing {
            log::debug!("Still image dropped while {}", shared.state);
            return;
        }
        shared.image = Some(image.clone());
        transition(&mut shared, FlowState::Reviewing);
    }
    view.show_review(&image);
}
