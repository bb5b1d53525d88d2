use image::RgbImage;

use crate::bbox::BoundingBox;
use crate::error::{ LprError, LprErrorKind };
use crate::utils;

// CHARS the line recognizer was trained on; any index past the end is the CTC blank
pub const CHARS: [char; 64] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    ' ', '-',
];

/// A piece of text read from a plate crop. `bbox` is relative to the crop.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub bbox: BoundingBox,
    pub text: String,
    pub confidence: f32,
}

/// Reads text from an image region, returning fragments in reading order.
pub trait TextRecognizer {
    fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, LprError>;
}

struct Pending {
    text: String,
    confidence: f32,
    first_step: usize,
    last_step: usize,
}

/// Greedy CTC decode of a `[steps, classes]` probability matrix.
/// Repeats collapse, blanks drop, and a space closes the current fragment.
/// Fragment boxes cover the columns of the `width`x`height` crop their steps map to.
pub fn decode_fragments(probs: &[f32], shape: [usize; 2], (width, height): (u32, u32)) -> Vec<TextFragment> {
    let [steps, classes] = shape;
    if steps == 0 || classes == 0 {
        return Vec::new();
    }
    let argmax = utils::argmax_in_axis0(probs, &shape);
    let column = |step: usize| (step*width as usize/steps) as i32;
    let close = |p: Pending| {
        let len = p.text.chars().count() as f32;
        TextFragment {
            bbox: BoundingBox::new(column(p.first_step), 0,
                                   (column(p.last_step + 1) - 1).max(column(p.first_step)), height as i32 - 1),
            text: p.text,
            confidence: p.confidence/len,
        }
    };

    let mut fragments = Vec::new();
    let mut current: Option<Pending> = None;
    let mut prev = None;
    for (step, &index) in argmax.iter().enumerate() {
        let ch = CHARS.get(index).copied();
        if prev == Some(index) {
            if let (Some(p), Some(c)) = (current.as_mut(), ch) {
                if c != ' ' {
                    p.last_step = step;
                }
            }
            continue;
        }
        prev = Some(index);
        match ch {
            None => {}
            Some(' ') => fragments.extend(current.take().map(&close)),
            Some(c) => {
                let p = current.get_or_insert_with(|| Pending {
                    text: String::new(),
                    confidence: 0.0,
                    first_step: step,
                    last_step: step,
                });
                p.text.push(c);
                p.confidence += probs[step*classes + index];
                p.last_step = step;
            }
        }
    }
    fragments.extend(current.take().map(&close));
    fragments
}

/// NHWC dims of the recognizer input for a `(width, height)` model size.
pub fn input_dims((width, height): (u32, u32)) -> [u64; 4] {
    [1, height as u64, width as u64, 3]
}

/// `[steps, classes]` of a recognizer output, which must score every CHARS
/// entry plus the blank.
pub fn output_shape(dims: &[u64]) -> Result<[usize; 2], LprError> {
    let shape = match dims {
        [.., steps, classes] => [*steps as usize, *classes as usize],
        _ => return Err(LprErrorKind::Inference(format!("unexpected recognizer output shape {:?}", dims)).into()),
    };
    if shape[1] != CHARS.len() + 1 {
        return Err(LprErrorKind::Inference(
            format!("recognizer scores {} classes, expected {}", shape[1], CHARS.len() + 1)).into());
    }
    Ok(shape)
}

#[cfg(feature = "tensorflow")]
pub use self::tf::TfTextRecognizer;

#[cfg(feature = "tensorflow")]
mod tf {

    use image::RgbImage;
    use tensorflow::Tensor;
    use tracing::debug;

    use crate::config::LprConfig;
    use crate::error::{ LprError, LprErrorKind };
    use crate::graph::FrozenGraph;
    use crate::utils;
    use super::{ decode_fragments, input_dims, output_shape, TextFragment, TextRecognizer };

    /// CTC line recognizer backed by a frozen graph.
    pub struct TfTextRecognizer {
        graph: FrozenGraph,
        input_name: String,
        output_name: String,
        input_size: (u32, u32),
    }

    impl TfTextRecognizer {

        pub fn new(config: &LprConfig) -> Result<Self, LprError> {
            let graph = FrozenGraph::load(&config.ocr_model)?;
            graph.require_operations(&config.ocr_model, &[config.ocr_input.as_str(), config.ocr_output.as_str()])?;
            Ok(Self {
                graph,
                input_name: config.ocr_input.clone(),
                output_name: config.ocr_output.clone(),
                input_size: config.ocr_input_size,
            })
        }
    }

    impl TextRecognizer for TfTextRecognizer {

        fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, LprError> {
            let input = utils::ocr_input(region, self.input_size);
            let tensor_img = Tensor::<f32>::new(&input_dims(self.input_size))
                .with_values(&input)?;

            let mut outputs = self.graph.run(&self.input_name, &tensor_img, &[self.output_name.as_str()])?;
            let probs = outputs.pop()
                .ok_or_else(|| LprErrorKind::Inference("recognizer returned no output".to_string()))?;
            let shape = output_shape(probs.dims())?;
            let fragments = decode_fragments(&probs, shape, region.dimensions());
            debug!(steps = shape[0], fragments = fragments.len(), "text recognition finished");
            Ok(fragments)
        }
    }
}
