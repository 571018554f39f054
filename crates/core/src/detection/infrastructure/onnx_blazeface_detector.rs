//! BlazeFace (short-range) face detector on ONNX Runtime via `ort`.
//!
//! A small front-camera model: boxes only, no landmarks or tracking. Boxes
//! are decoded and suppressed in normalized image space and handed out as
//! [`FaceBox`]es.
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::detection::infrastructure::math::bbox_iou;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Side of the square model input.
const INPUT_SIZE: usize = 128;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.3;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

/// `(stride, anchors per cell)` for the two feature maps.
const FEATURE_MAPS: [(usize, usize); 2] = [(8, 2), (16, 6)];

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<Anchor>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!("Loaded face detector from {}", model_path.display());
        Ok(Self {
            session,
            confidence,
            anchors: anchors(),
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let input = ort::value::Tensor::from_array(preprocess(frame))?;
        let outputs = self.session.run(ort::inputs![input])?;
        if outputs.len() < 2 {
            return Err(format!(
                "expected regressor and score outputs, got {}",
                outputs.len()
            )
            .into());
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let candidates = decode(
            &self.anchors,
            regressors.as_slice().ok_or("regressor tensor is not contiguous")?,
            scores.as_slice().ok_or("score tensor is not contiguous")?,
            self.confidence,
        );

        let (fw, fh) = (frame.width(), frame.height());
        Ok(suppress(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| {
                let [x1, y1, x2, y2] = c.corners;
                let (w, h) = (fw as f64, fh as f64);
                FaceBox::from_pixel_corners([x1 * w, y1 * h, x2 * w, y2 * h], fw, fh)
            })
            .collect())
    }
}

/// Nearest-neighbour resize to the model input, scaled to `[0, 1]`, NCHW.
fn preprocess(frame: &Frame) -> Array4<f32> {
    let src = frame.as_ndarray();
    let (h, w) = (frame.height() as usize, frame.width() as usize);
    let sample =
        |dst: usize, extent: usize| ((2 * dst + 1) * extent / (2 * INPUT_SIZE)).min(extent - 1);

    Array4::from_shape_fn((1, 3, INPUT_SIZE, INPUT_SIZE), |(_, c, y, x)| {
        src[[sample(y, h), sample(x, w), c]] as f32 / 255.0
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Anchor {
    cx: f32,
    cy: f32,
}

/// Anchor centers in normalized input space, one run per feature map.
fn anchors() -> Vec<Anchor> {
    FEATURE_MAPS
        .iter()
        .flat_map(|&(stride, per_cell)| {
            let grid = INPUT_SIZE / stride;
            (0..grid * grid).flat_map(move |cell| {
                let anchor = Anchor {
                    cx: ((cell % grid) as f32 + 0.5) / grid as f32,
                    cy: ((cell / grid) as f32 + 0.5) / grid as f32,
                };
                std::iter::repeat(anchor).take(per_cell)
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    /// `[x1, y1, x2, y2]` in `0..=1`, top-left origin.
    corners: [f64; 4],
    score: f64,
}

fn decode(
    anchors: &[Anchor],
    regressors: &[f32],
    scores: &[f32],
    confidence: f64,
) -> Vec<Candidate> {
    let scale = INPUT_SIZE as f32;
    anchors
        .iter()
        .zip(scores)
        .zip(regressors.chunks_exact(REGRESSOR_STRIDE))
        .filter_map(|((anchor, &logit), reg)| {
            let score = sigmoid(logit) as f64;
            if score < confidence {
                return None;
            }
            let cx = anchor.cx + reg[0] / scale;
            let cy = anchor.cy + reg[1] / scale;
            let (half_w, half_h) = (reg[2] / scale / 2.0, reg[3] / scale / 2.0);
            Some(Candidate {
                corners: [
                    (cx - half_w).clamp(0.0, 1.0) as f64,
                    (cy - half_h).clamp(0.0, 1.0) as f64,
                    (cx + half_w).clamp(0.0, 1.0) as f64,
                    (cy + half_h).clamp(0.0, 1.0) as f64,
                ],
                score,
            })
        })
        .collect()
}

/// Greedy non-maximum suppression, best score first.
fn suppress(mut candidates: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| bbox_iou(&k.corners, &candidate.corners) <= iou_thresh)
        {
            kept.push(candidate);
        }
    }
    kept
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
