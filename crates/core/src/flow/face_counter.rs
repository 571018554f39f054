use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_observation::FaceObservation;
use crate::detection::domain::overlay_surface::OverlaySurface;
use crate::flow::ui_executor::UiExecutor;
use crate::shared::frame::Frame;

type Published = Arc<RwLock<Arc<FaceObservation>>>;

/// Runs face detection over live frames and publishes the latest result.
///
/// Detection happens on one worker thread. Frames are handed over through a
/// single slot: a frame arriving while the worker is busy replaces whatever
/// frame is still waiting, so detection always works on the newest frame and
/// never falls behind. Overlay redraws and publication are posted to the UI
/// context.
pub struct FaceCounter {
    frames: Sender<Frame>,
    /// Receiving end of the slot, kept to evict a stale frame.
    pending: Receiver<Frame>,
    stop_tx: Sender<()>,
    published: Published,
    torn_down: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct Worker {
    detector: Box<dyn FaceDetector>,
    ui: UiExecutor,
    overlay: Arc<dyn OverlaySurface>,
    published: Published,
    torn_down: Arc<AtomicBool>,
    stale_after_failures: usize,
    consecutive_failures: usize,
}

impl FaceCounter {
    pub fn spawn(
        detector: Box<dyn FaceDetector>,
        ui: UiExecutor,
        overlay: Arc<dyn OverlaySurface>,
        stale_after_failures: usize,
    ) -> std::io::Result<Self> {
        let (frames, pending) = crossbeam_channel::bounded::<Frame>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let published: Published = Arc::new(RwLock::new(Arc::new(FaceObservation::empty())));
        let torn_down = Arc::new(AtomicBool::new(false));

        let mut worker = Worker {
            detector,
            ui,
            overlay,
            published: published.clone(),
            torn_down: torn_down.clone(),
            stale_after_failures,
            consecutive_failures: 0,
        };
        let frames_rx = pending.clone();
        let handle = std::thread::Builder::new()
            .name("face-counter".into())
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(stop_rx) -> _ => break,
                    recv(frames_rx) -> msg => match msg {
                        Ok(frame) => worker.handle(frame),
                        Err(_) => break,
                    },
                }
            })?;

        Ok(Self {
            frames,
            pending,
            stop_tx,
            published,
            torn_down,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Hands `frame` to the detection worker without blocking.
    pub fn process(&self, frame: Frame) {
        if self.torn_down.load(Ordering::Acquire) {
            return;
        }
        let mut frame = frame;
        loop {
            match self.frames.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(stale) = self.pending.try_recv() {
                        log::debug!("Frame {} superseded before detection", stale.index());
                    }
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Latest published observation.
    pub fn observation(&self) -> Arc<FaceObservation> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn face_count(&self) -> usize {
        self.observation().count()
    }

    /// Stops the worker. Results still in flight are dropped without touching
    /// the overlay.
    pub fn shutdown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.stop_tx.try_send(());
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!("Face counter thread panicked");
            }
        }
        log::debug!("Face counter stopped");
    }
}

impl Drop for FaceCounter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Worker {
    fn handle(&mut self, frame: Frame) {
        if self.torn_down.load(Ordering::Acquire) {
            return;
        }
        match self.detector.detect(&frame) {
            Ok(boxes) => {
                self.consecutive_failures = 0;
                self.publish(FaceObservation::new(frame.index(), boxes));
            }
            Err(e) => {
                let err = DetectionError::Failed(e.to_string());
                log::warn!("Frame {}: {err}", frame.index());
                self.consecutive_failures += 1;
                if self.stale_after_failures > 0
                    && self.consecutive_failures == self.stale_after_failures
                {
                    log::warn!(
                        "{} consecutive detection failures, clearing face count",
                        self.consecutive_failures
                    );
                    self.publish(FaceObservation::empty());
                }
            }
        }
    }

    fn publish(&self, observation: FaceObservation) {
        let overlay = self.overlay.clone();
        let published = self.published.clone();
        let torn_down = self.torn_down.clone();
        self.ui.post(move || {
            if torn_down.load(Ordering::Acquire) {
                return;
            }
            if overlay.is_attached() {
                overlay.clear_boxes();
                for rect in observation.view_rects(overlay.size()) {
                    overlay.draw_box(rect);
                }
                overlay.boxes_drawn(observation.count());
            }
            *published.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(observation);
        });
    }
}
