use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::camera::domain::camera_error::CameraError;
use crate::camera::domain::frame_source::{FrameObserver, FrameSource, PreviewSurface};
use crate::shared::captured_image::CapturedImage;
use crate::shared::constants::{DEFAULT_FRAME_INTERVAL_MS, IMAGE_EXTENSIONS};
use crate::shared::frame::Frame;

/// Replays a fixed list of image files as a live camera stream.
///
/// Images are decoded once at `start` and looped at a fixed interval on a
/// background thread. A still request is honored with the next frame
/// emitted, the same way a real device delivers its next exposure.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    frame_interval: Duration,
    session: Option<Session>,
}

struct Session {
    stop_tx: Sender<()>,
    still_requested: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Session {
    /// False once the capture thread has returned on its own.
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            session: None,
        }
    }

    /// Collects every image in `dir`, ordered by file name.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        paths.sort();
        Ok(Self::new(paths))
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn decode_all(&self) -> Result<Vec<Frame>, CameraError> {
        self.paths
            .iter()
            .map(|path| {
                let img = image::open(path)
                    .map_err(|e| {
                        CameraError::input_attach_failed(format!("{}: {e}", path.display()))
                    })?
                    .to_rgb8();
                let (width, height) = img.dimensions();
                Ok(Frame::new(img.into_raw(), width, height, 3, 0, Duration::ZERO))
            })
            .collect()
    }
}

impl FrameSource for ImageSequenceSource {
    fn start(
        &mut self,
        preview: Arc<dyn PreviewSurface>,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CameraError> {
        self.stop();

        if self.paths.is_empty() {
            return Err(CameraError::DeviceUnavailable(
                "image sequence is empty".into(),
            ));
        }
        let images = self.decode_all()?;

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let still_requested = Arc::new(AtomicBool::new(false));
        let still_flag = still_requested.clone();
        let interval = self.frame_interval;

        let handle = std::thread::Builder::new()
            .name("image-sequence".into())
            .spawn(move || {
                let started = Instant::now();
                for (index, source) in images.iter().cycle().enumerate() {
                    let frame = Frame::new(
                        source.data().to_vec(),
                        source.width(),
                        source.height(),
                        source.channels(),
                        index,
                        started.elapsed(),
                    );
                    preview.present(&frame);
                    if still_flag.swap(false, Ordering::AcqRel) {
                        observer.on_still(CapturedImage::now(frame.clone()));
                    }
                    observer.on_frame(frame);

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
            })
            .map_err(CameraError::input_attach_failed)?;

        log::info!(
            "Image sequence started: {} images every {:?}",
            self.paths.len(),
            interval
        );
        self.session = Some(Session {
            stop_tx,
            still_requested,
            handle,
        });
        Ok(())
    }

    fn capture_still(&mut self) {
        match self.session.as_ref().filter(|s| s.is_alive()) {
            Some(session) => session.still_requested.store(true, Ordering::Release),
            None => log::debug!("Still capture ignored: image sequence not running"),
        }
    }

    fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let _ = session.stop_tx.try_send(());
        if session.handle.join().is_err() {
            log::warn!("Image sequence thread panicked");
        }
        log::info!("Image sequence stopped");
    }

    fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_alive)
    }
}

impl Drop for ImageSequenceSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
