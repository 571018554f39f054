use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::camera::domain::camera_error::CameraError;
use crate::camera::domain::frame_source::{
    FrameObserver, FrameSource, PreviewSurface, ResolutionTier,
};
use crate::shared::captured_image::CapturedImage;
use crate::shared::frame::Frame;

/// Capture device selection for [`FfmpegCameraSource`].
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// libavdevice input format, e.g. `v4l2`, `avfoundation`, `dshow`.
    pub input_format: String,
    /// Device identifier understood by the input format.
    pub device: String,
    pub resolution: ResolutionTier,
    pub framerate: u32,
}

impl Default for CameraConfig {
    /// The built-in user-facing camera of the current platform.
    fn default() -> Self {
        #[cfg(target_os = "macos")]
        let (input_format, device) = ("avfoundation", "0");
        #[cfg(target_os = "windows")]
        let (input_format, device) = ("dshow", "video=Integrated Camera");
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let (input_format, device) = ("v4l2", "/dev/video0");

        Self {
            input_format: input_format.to_string(),
            device: device.to_string(),
            resolution: ResolutionTier::default(),
            framerate: 30,
        }
    }
}

/// Live camera capture via libavdevice.
///
/// The device is opened and its decoder configured synchronously in
/// [`FrameSource::start`] so setup errors reach the caller; decoding then
/// runs on a dedicated thread until [`FrameSource::stop`]. A still request is
/// served with the next fully decoded frame.
pub struct FfmpegCameraSource {
    config: CameraConfig,
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

impl FfmpegCameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    fn open(&self) -> Result<CaptureStream, CameraError> {
        ffmpeg_next::init().map_err(CameraError::input_attach_failed)?;

        if self.config.device.starts_with("/dev/") && !Path::new(&self.config.device).exists() {
            return Err(CameraError::DeviceUnavailable(self.config.device.clone()));
        }

        let format = find_input_format(&self.config.input_format).ok_or_else(|| {
            CameraError::DeviceUnavailable(format!(
                "input format '{}' is not supported by this ffmpeg build",
                self.config.input_format
            ))
        })?;

        let (width, height) = self.config.resolution.dimensions();
        let mut options = ffmpeg_next::Dictionary::new();
        options.set("video_size", &format!("{width}x{height}"));
        options.set("framerate", &self.config.framerate.to_string());

        let format = ffmpeg_next::format::format::Format::Input(format);
        let ictx = ffmpeg_next::format::open_with(&self.config.device, &format, options)
            .map_err(CameraError::input_attach_failed)?
            .input();

        CaptureStream::new(ictx)
    }
}

impl Default for FfmpegCameraSource {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl FrameSource for FfmpegCameraSource {
    fn start(
        &mut self,
        preview: Arc<dyn PreviewSurface>,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CameraError> {
        self.stop();

        let stream = self.open()?;
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let still_requested = Arc::new(AtomicBool::new(false));
        let still_flag = still_requested.clone();

        let handle = std::thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || stream.run(&stop_rx, &still_flag, &*preview, &*observer))
            .map_err(CameraError::input_attach_failed)?;

        log::info!(
            "Camera session started: {} {} ({:?})",
            self.config.input_format,
            self.config.device,
            self.config.resolution
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
            None => log::debug!("Still capture ignored: camera session not running"),
        }
    }

    fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let _ = session.stop_tx.try_send(());
        if session.handle.join().is_err() {
            log::warn!("Camera capture thread panicked");
        }
        log::info!("Camera session stopped");
    }

    fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_alive)
    }
}

impl Drop for FfmpegCameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn find_input_format(name: &str) -> Option<ffmpeg_next::format::Input> {
    ffmpeg_next::device::input::video().find(|format| {
        format
            .name()
            .split(',')
            .any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

/// An opened capture device with its decoder and RGB converter.
struct CaptureStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
}

// Safety: a CaptureStream is moved into the capture thread once and only
// ever used from that thread afterwards.
unsafe impl Send for CaptureStream {}

impl CaptureStream {
    fn new(ictx: ffmpeg_next::format::context::Input) -> Result<Self, CameraError> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CameraError::input_attach_failed("device exposes no video stream"))?;
        let video_stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(CameraError::input_attach_failed)?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(CameraError::input_attach_failed)?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(CameraError::input_attach_failed)?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
        })
    }

    fn run(
        mut self,
        stop_rx: &Receiver<()>,
        still_requested: &AtomicBool,
        preview: &dyn PreviewSurface,
        observer: &dyn FrameObserver,
    ) {
        let started = Instant::now();
        let mut index = 0usize;

        while matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                log::warn!("Camera stream ended");
                break;
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable camera packet: {e}");
                continue;
            }

            while let Some(pixels) = self.receive_rgb() {
                let frame = Frame::new(
                    pixels,
                    self.width,
                    self.height,
                    3,
                    index,
                    started.elapsed(),
                );
                index += 1;

                preview.present(&frame);
                if still_requested.swap(false, Ordering::AcqRel) {
                    observer.on_still(CapturedImage::now(frame.clone()));
                }
                observer.on_frame(frame);
            }
        }
    }

    fn receive_rgb(&mut self) -> Option<Vec<u8>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            log::debug!("Dropping camera frame that failed conversion: {e}");
            return None;
        }
        Some(extract_rgb_pixels(&rgb_frame, self.width, self.height))
    }
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
