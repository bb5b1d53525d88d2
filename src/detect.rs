use image::RgbImage;

use crate::bbox::BoundingBox;
use crate::error::LprError;

/// One candidate returned by a plate detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub confidence: f32,
}

/// Finds license plates in a full image. Results come back in the
/// detector's own order; callers do not re-rank them.
pub trait PlateDetector {
    fn detect(&self, img: &RgbImage) -> Result<Vec<Detection>, LprError>;
}

/// Pair up the flat boxes/scores/classes outputs of a detection graph,
/// dropping candidates under `min_score`.
pub fn collect_detections(boxes: &[f32], scores: &[f32], classes: &[f32], count: usize,
                          (width, height): (u32, u32), min_score: f32) -> Vec<Detection> {
    boxes.chunks_exact(4)
        .zip(scores.iter())
        .zip(classes.iter().map(Some).chain(std::iter::repeat(None)))
        .take(count)
        .filter(|((_, score), _)| **score >= min_score)
        .map(|((v, score), class)| Detection {
            bbox: BoundingBox::from_normalized(v, width, height),
            class_id: class.map(|c| *c as u32).unwrap_or(0),
            confidence: *score,
        })
        .collect()
}

#[cfg(feature = "tensorflow")]
pub use self::tf::TfPlateDetector;

#[cfg(feature = "tensorflow")]
mod tf {

    use image::RgbImage;
    use tensorflow::Tensor;
    use tracing::debug;

    use crate::config::{ DetectorTensors, LprConfig };
    use crate::error::LprError;
    use crate::graph::FrozenGraph;
    use super::{ collect_detections, Detection, PlateDetector };

    /// Detector backed by a frozen object-detection graph.
    pub struct TfPlateDetector {
        graph: FrozenGraph,
        tensors: DetectorTensors,
        min_score: f32,
    }

    impl TfPlateDetector {

        pub fn new(config: &LprConfig) -> Result<Self, LprError> {
            let graph = FrozenGraph::load(&config.detect_model)?;
            let tensors = config.detector_tensors.clone();
            graph.require_operations(&config.detect_model,
                &[tensors.input.as_str(), tensors.boxes.as_str(), tensors.scores.as_str(),
                  tensors.classes.as_str(), tensors.num_detections.as_str()])?;
            Ok(Self { graph, tensors, min_score: config.min_score })
        }
    }

    impl PlateDetector for TfPlateDetector {

        fn detect(&self, img: &RgbImage) -> Result<Vec<Detection>, LprError> {
            let (width, height) = img.dimensions();
            let img_tensor = Tensor::<u8>::new(&[1, height as u64, width as u64, 3])
                .with_values(img.as_raw().as_slice())?;

            let t = &self.tensors;
            let outputs = self.graph.run(&t.input, &img_tensor,
                &[t.boxes.as_str(), t.scores.as_str(), t.classes.as_str(), t.num_detections.as_str()])?;
            let (boxes, scores, classes, num) = (&outputs[0], &outputs[1], &outputs[2], &outputs[3]);
            let count = num.first().map(|n| *n as usize).unwrap_or(scores.len());
            let detections = collect_detections(boxes, scores, classes, count, (width, height), self.min_score);
            debug!(candidates = count, kept = detections.len(), "plate detection finished");
            Ok(detections)
        }
    }
}
