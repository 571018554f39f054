use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use selfie_gate_core::camera::domain::frame_source::ResolutionTier;
use selfie_gate_core::camera::infrastructure::ffmpeg_camera_source::CameraConfig;
use selfie_gate_core::detection::infrastructure::onnx_blazeface_detector::DEFAULT_CONFIDENCE;
use selfie_gate_core::shared::constants::{DEFAULT_FRAME_INTERVAL_MS, DEFAULT_STALE_AFTER_FAILURES};

const DEFAULT_OUTPUT: &str = "selfie.png";

/// Settings shared by the JSON config file and the command line.
///
/// Every field is optional; command-line values win over file values, and
/// anything left unset falls back to the built-in default.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliSettings {
    pub frames_dir: Option<PathBuf>,
    pub device: Option<String>,
    pub input_format: Option<String>,
    pub resolution: Option<String>,
    pub confidence: Option<f64>,
    pub frame_interval_ms: Option<u64>,
    pub stale_after_failures: Option<usize>,
    pub model: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub model_url: Option<String>,
    pub output: Option<PathBuf>,
}

impl CliSettings {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
        Ok(settings)
    }

    /// Field-wise `self.or(base)`.
    pub fn over(self, base: CliSettings) -> CliSettings {
        CliSettings {
            frames_dir: self.frames_dir.or(base.frames_dir),
            device: self.device.or(base.device),
            input_format: self.input_format.or(base.input_format),
            resolution: self.resolution.or(base.resolution),
            confidence: self.confidence.or(base.confidence),
            frame_interval_ms: self.frame_interval_ms.or(base.frame_interval_ms),
            stale_after_failures: self.stale_after_failures.or(base.stale_after_failures),
            model: self.model.or(base.model),
            model_dir: self.model_dir.or(base.model_dir),
            model_url: self.model_url.or(base.model_url),
            output: self.output.or(base.output),
        }
    }
}

/// Fully resolved, validated run options.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub frames_dir: Option<PathBuf>,
    pub camera: CameraConfig,
    pub confidence: f64,
    pub frame_interval: Duration,
    pub stale_after_failures: usize,
    pub model: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub model_url: Option<String>,
    pub output: PathBuf,
}

impl TryFrom<CliSettings> for Options {
    type Error = Box<dyn std::error::Error>;

    fn try_from(settings: CliSettings) -> Result<Self, Self::Error> {
        let confidence = settings.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
        }

        let frame_interval_ms = settings
            .frame_interval_ms
            .unwrap_or(DEFAULT_FRAME_INTERVAL_MS);
        if frame_interval_ms == 0 {
            return Err("Frame interval must be at least 1 ms".into());
        }

        if let Some(dir) = &settings.frames_dir {
            if !dir.is_dir() {
                return Err(format!("Frames directory not found: {}", dir.display()).into());
            }
        }
        if let Some(model) = &settings.model {
            if !model.is_file() {
                return Err(format!("Model file not found: {}", model.display()).into());
            }
        }

        let mut camera = CameraConfig::default();
        if let Some(device) = settings.device {
            camera.device = device;
        }
        if let Some(input_format) = settings.input_format {
            camera.input_format = input_format;
        }
        if let Some(resolution) = settings.resolution {
            camera.resolution = resolution.parse::<ResolutionTier>()?;
        }

        Ok(Options {
            frames_dir: settings.frames_dir,
            camera,
            confidence,
            frame_interval: Duration::from_millis(frame_interval_ms),
            stale_after_failures: settings
                .stale_after_failures
                .unwrap_or(DEFAULT_STALE_AFTER_FAILURES),
            model: settings.model,
            model_dir: settings.model_dir,
            model_url: settings.model_url,
            output: settings
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = Options::try_from(CliSettings::default()).unwrap();
        assert_eq!(options.output, PathBuf::from("selfie.png"));
        assert_eq!(options.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(options.stale_after_failures, DEFAULT_STALE_AFTER_FAILURES);
        assert_eq!(options.camera, CameraConfig::default());
        assert!(options.frames_dir.is_none());
    }

    #[test]
    fn test_command_line_wins_over_file() {
        let file = CliSettings {
            device: Some("/dev/video2".into()),
            confidence: Some(0.7),
            output: Some("from-file.png".into()),
            ..CliSettings::default()
        };
        let flags = CliSettings {
            confidence: Some(0.9),
            ..CliSettings::default()
        };

        let options = Options::try_from(flags.over(file)).unwrap();

        assert_eq!(options.confidence, 0.9);
        assert_eq!(options.camera.device, "/dev/video2");
        assert_eq!(options.output, PathBuf::from("from-file.png"));
    }

    #[test]
    fn test_load_reads_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("selfie-gate.json");
        std::fs::write(
            &path,
            r#"{ "resolution": "low", "stale_after_failures": 0, "model_url": "http://localhost/m.onnx" }"#,
        )
        .unwrap();

        let settings = CliSettings::load(&path).unwrap();
        let options = Options::try_from(settings).unwrap();

        assert_eq!(options.camera.resolution, ResolutionTier::Low);
        assert_eq!(options.stale_after_failures, 0);
        assert_eq!(options.model_url.as_deref(), Some("http://localhost/m.onnx"));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "mirror_preview": true }"#).unwrap();

        let err = CliSettings::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config"));
    }

    #[test]
    fn test_confidence_out_of_range_is_rejected() {
        let settings = CliSettings {
            confidence: Some(1.5),
            ..CliSettings::default()
        };
        let err = Options::try_from(settings).unwrap_err();
        assert_eq!(err.to_string(), "Confidence must be between 0.0 and 1.0, got 1.5");
    }

    #[test]
    fn test_unknown_resolution_is_rejected() {
        let settings = CliSettings {
            resolution: Some("ultra".into()),
            ..CliSettings::default()
        };
        assert!(Options::try_from(settings).is_err());
    }

    #[test]
    fn test_missing_frames_dir_is_rejected() {
        let settings = CliSettings {
            frames_dir: Some("/no/such/selfie-gate/frames".into()),
            ..CliSettings::default()
        };
        let err = Options::try_from(settings).unwrap_err();
        assert!(err.to_string().starts_with("Frames directory not found"));
    }
}
