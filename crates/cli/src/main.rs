mod settings;
mod terminal;

use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use selfie_gate_core::camera::domain::frame_source::FrameSource;
use selfie_gate_core::camera::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use selfie_gate_core::camera::infrastructure::image_sequence_source::ImageSequenceSource;
use selfie_gate_core::detection::domain::face_detector::FaceDetector;
use selfie_gate_core::detection::infrastructure::model_resolver::{
    self, ModelResolveError, ModelSource, ProgressFn,
};
use selfie_gate_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use selfie_gate_core::flow::flow_config::FlowConfig;
use selfie_gate_core::flow::flow_state::FlowState;
use selfie_gate_core::flow::flow_view::ViewBinding;
use selfie_gate_core::flow::selfie_validation_screen::selfie_validation_screen;
use selfie_gate_core::flow::ui_executor::UiExecutor;
use selfie_gate_core::shared::constants::BLAZEFACE_MODEL_NAME;

use settings::{CliSettings, Options};
use terminal::{Command, ImageFileHost, TerminalView};

/// Capture a selfie only when exactly one face is in view.
#[derive(Parser)]
#[command(name = "selfie-gate")]
struct Cli {
    /// Replay the images in this directory instead of opening a camera.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Capture device (e.g. /dev/video0, 0, "video=Integrated Camera").
    #[arg(long)]
    device: Option<String>,

    /// libavdevice input format: v4l2, avfoundation, dshow.
    #[arg(long)]
    input_format: Option<String>,

    /// Capture resolution: low, medium or high.
    #[arg(long)]
    resolution: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Delay between replayed frames, with --frames-dir.
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Clear the face count after this many failed detections in a row (0 = never).
    #[arg(long)]
    stale_after_failures: Option<usize>,

    /// BlazeFace ONNX model file (skips model resolution).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory holding a bundled copy of the model.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Where to download the model from when it is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// JSON settings file; command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the approved selfie (default: selfie.png).
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn into_settings(self) -> (CliSettings, Option<PathBuf>) {
        let settings = CliSettings {
            frames_dir: self.frames_dir,
            device: self.device,
            input_format: self.input_format,
            resolution: self.resolution,
            confidence: self.confidence,
            frame_interval_ms: self.frame_interval_ms,
            stale_after_failures: self.stale_after_failures,
            model: self.model,
            model_dir: self.model_dir,
            model_url: self.model_url,
            output: self.output,
        };
        (settings, self.config)
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (flags, config_path) = Cli::parse().into_settings();
    let file = match config_path {
        Some(path) => CliSettings::load(&path)?,
        None => CliSettings::default(),
    };
    let options = Options::try_from(flags.over(file))?;

    let detector = build_detector(&options)?;
    let source = build_source(&options)?;

    let ui = UiExecutor::spawn("selfie-gate-ui")?;
    let view = Arc::new(TerminalView::new());
    let host = Arc::new(ImageFileHost::new(options.output.clone()));
    let config = FlowConfig::new(host.clone())
        .with_stale_after_failures(options.stale_after_failures);
    let binding = ViewBinding {
        ui: ui.clone(),
        preview: view.clone(),
        overlay: view.clone(),
        view: view.clone(),
    };

    let mut screen = selfie_validation_screen(config, source, detector, binding);
    screen.appear();
    ui.flush();
    if screen.coordinator().state() != FlowState::Previewing {
        return Err("Camera session could not be started".into());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Capture) => screen.capture_pressed(),
            Ok(Command::Approve) => screen.approve_pressed(),
            Ok(Command::Recapture) => screen.recapture_pressed(),
            Ok(Command::Quit) => screen.close_pressed(),
            Err(e) => eprintln!("{e}"),
        }
        ui.flush();
        if screen.is_finished() {
            break;
        }
    }
    if !screen.is_finished() {
        screen.close_pressed();
    }
    let state = screen.coordinator().state();
    drop(screen);
    ui.shutdown();

    match (state, host.take_outcome()) {
        (FlowState::Approved, Some(Ok(()))) => {
            log::info!(
                "Selfie written to {} after {} frames",
                host.output().display(),
                view.frames_seen()
            );
            Ok(())
        }
        (FlowState::Approved, Some(Err(e))) => Err(e.into()),
        _ => {
            log::info!("Closed without a selfie");
            Ok(())
        }
    }
}

fn build_detector(options: &Options) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match &options.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
            let progress = ProgressLine::default();
            let resolved = model_resolver::resolve(
                &ModelSource {
                    name: BLAZEFACE_MODEL_NAME,
                    url: options.model_url.as_deref(),
                    bundled_dir: options.model_dir.as_deref(),
                },
                Some(progress.callback()),
            );
            progress.finish();
            resolved.map_err(with_model_hint)?
        }
    };

    Ok(Box::new(OnnxBlazefaceDetector::new(
        &model_path,
        options.confidence,
    )?))
}

fn build_source(options: &Options) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    match &options.frames_dir {
        Some(dir) => {
            let source =
                ImageSequenceSource::from_dir(dir)?.with_frame_interval(options.frame_interval);
            log::info!("Replaying {} images from {}", source.len(), dir.display());
            Ok(Box::new(source))
        }
        None => Ok(Box::new(FfmpegCameraSource::new(options.camera.clone()))),
    }
}

/// Single-line download progress on stderr.
#[derive(Default)]
struct ProgressLine {
    printed: Arc<AtomicBool>,
}

impl ProgressLine {
    fn callback(&self) -> ProgressFn {
        let printed = self.printed.clone();
        Box::new(move |downloaded, total| {
            printed.store(true, Ordering::Relaxed);
            eprint!("\r{}", progress_text(downloaded, total));
        })
    }

    /// Ends the progress line if anything was printed; returns whether it was.
    fn finish(&self) -> bool {
        let printed = self.printed.load(Ordering::Relaxed);
        if printed {
            eprintln!();
        }
        printed
    }
}

fn progress_text(downloaded: u64, total: u64) -> String {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        format!("Downloading face detection model... {pct}%")
    } else {
        format!("Downloading face detection model... {downloaded} bytes")
    }
}

fn with_model_hint(e: ModelResolveError) -> Box<dyn std::error::Error> {
    match e {
        ModelResolveError::NotFound { .. } => {
            format!("{e}; pass --model, --model-dir or --model-url").into()
        }
        other => other.into(),
    }
}
