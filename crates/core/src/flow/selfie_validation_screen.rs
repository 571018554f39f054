use crate::camera::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::flow::flow_config::FlowConfig;
use crate::flow::flow_coordinator::FlowCoordinator;
use crate::flow::flow_error::FlowError;
use crate::flow::flow_state::FlowState;
use crate::flow::flow_view::ViewBinding;

/// Builds a ready-to-present screen running the whole
/// preview → review → approve flow.
pub fn selfie_validation_screen(
    config: FlowConfig,
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    binding: ViewBinding,
) -> SelfieValidationScreen {
    let mut coordinator = FlowCoordinator::new(config, source, detector);
    coordinator.bind(binding.clone());
    SelfieValidationScreen {
        coordinator,
        binding,
    }
}

/// Button handlers for the camera and review screens.
///
/// Errors never escape: they are shown to the user as a message and the
/// flow stays where it was.
pub struct SelfieValidationScreen {
    coordinator: FlowCoordinator,
    binding: ViewBinding,
}

impl SelfieValidationScreen {
    pub fn appear(&mut self) {
        let result = self.coordinator.start();
        self.report(result);
    }

    pub fn capture_pressed(&mut self) {
        let result = self.coordinator.capture_photo();
        self.report(result);
    }

    pub fn approve_pressed(&mut self) {
        self.coordinator.approve_photo();
        if self.coordinator.state() == FlowState::Approved {
            self.dismiss();
        }
    }

    pub fn recapture_pressed(&mut self) {
        let result = self.coordinator.recapture();
        self.report(result);
    }

    pub fn close_pressed(&mut self) {
        self.coordinator.close();
        self.dismiss();
    }

    pub fn coordinator(&self) -> &FlowCoordinator {
        &self.coordinator
    }

    /// True once the flow has been approved or closed.
    pub fn is_finished(&self) -> bool {
        self.coordinator.state().is_terminal()
    }

    fn report(&self, result: Result<(), FlowError>) {
        let Err(e) = result else {
            return;
        };
        if e.is_gate_rejection() {
            log::info!("{e}");
        } else {
            log::warn!("{e}");
        }
        let view = self.binding.view.clone();
        let message = e.to_string();
        self.binding.ui.post(move || view.show_message(&message));
    }

    fn dismiss(&self) {
        let view = self.binding.view.clone();
        self.binding.ui.post(move || view.dismiss());
    }
}
