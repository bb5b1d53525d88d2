use tracing::debug;

use std::env;
use std::path::PathBuf;

pub const DETECT_MODEL_ENV: &str = "ANPR_DETECT_MODEL";
pub const OCR_MODEL_ENV: &str = "ANPR_OCR_MODEL";
pub const FONT_ENV: &str = "ANPR_FONT";
pub const OUTPUT_ENV: &str = "ANPR_OUTPUT";

/// Tensor names of a frozen object-detection graph.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorTensors {
    pub input: String,
    pub boxes: String,
    pub scores: String,
    pub classes: String,
    pub num_detections: String,
}

impl Default for DetectorTensors {
    fn default() -> Self {
        Self {
            input: "image_tensor".to_string(),
            boxes: "detection_boxes".to_string(),
            scores: "detection_scores".to_string(),
            classes: "detection_classes".to_string(),
            num_detections: "num_detections".to_string(),
        }
    }
}

/// Everything the pipeline reads from disk or tunes, with the defaults the
/// binary runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct LprConfig {
    pub detect_model: PathBuf,
    pub ocr_model: PathBuf,
    /// label font; the bundled one when unset
    pub font: Option<PathBuf>,
    pub output: PathBuf,
    pub detector_tensors: DetectorTensors,
    /// candidates scoring below this are padding, not detections
    pub min_score: f32,
    /// recognizer input: f32 NHWC `[1, height, width, 3]`, gray replicated
    /// over the channels, values in [0, 1]
    pub ocr_input: String,
    /// recognizer output: `[1, steps, CHARS.len() + 1]` probabilities, the
    /// last class being the CTC blank
    pub ocr_output: String,
    /// (width, height) of the recognizer input
    pub ocr_input_size: (u32, u32),
}

impl Default for LprConfig {
    fn default() -> Self {
        Self {
            detect_model: PathBuf::from("models/detect.pb"),
            ocr_model: PathBuf::from("models/ocr.pb"),
            font: None,
            output: PathBuf::from("result.png"),
            detector_tensors: DetectorTensors::default(),
            min_score: 0.25,
            ocr_input: "ocr_input".to_string(),
            ocr_output: "ocr_probs".to_string(),
            ocr_input_size: (164, 48),
        }
    }
}

impl LprConfig {

    /// Defaults with file locations overridden from the environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var_os(key))
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where F: Fn(&str) -> Option<std::ffi::OsString>
    {
        let lookup = |key: &str| {
            let value = lookup(key).filter(|v| !v.is_empty())?;
            debug!(key, value = ?value, "config override");
            Some(PathBuf::from(value))
        };
        if let Some(path) = lookup(DETECT_MODEL_ENV) {
            self.detect_model = path;
        }
        if let Some(path) = lookup(OCR_MODEL_ENV) {
            self.ocr_model = path;
        }
        if let Some(path) = lookup(OUTPUT_ENV) {
            self.output = path;
        }
        self.font = lookup(FONT_ENV).or(self.font);
        self
    }
}
