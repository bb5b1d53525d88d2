use image::{ imageops, RgbImage };
use tracing::{ info, warn };

use std::path::{ Path, PathBuf };

use error::LprError;

pub mod annotate;
pub mod bbox;
pub mod config;
pub mod detect;
pub mod error;
#[cfg(feature = "tensorflow")]
pub mod graph;
pub mod ocr;
pub mod utils;

pub use annotate::Annotator;
pub use bbox::BoundingBox;
pub use config::LprConfig;
pub use detect::{ Detection, PlateDetector };
pub use ocr::{ TextFragment, TextRecognizer };

pub const NOT_DETECTED: &str = "NOT DETECTED";
pub const NO_TEXT_FOUND: &str = "NO TEXT FOUND";

/// Outcome of one run over one image.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// source image, with the plate box and label drawn when a plate was found
    pub image: RgbImage,
    pub text: String,
    pub plate: Option<BoundingBox>,
    pub fragments: Vec<TextFragment>,
}

/// Recognized fragments as one upper-case plate string.
pub fn plate_text(fragments: &[TextFragment]) -> String {
    if fragments.is_empty() {
        return NO_TEXT_FOUND.to_string();
    }
    let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    texts.join(" ").to_uppercase()
}

pub struct Lpr {
    detector: Box<dyn PlateDetector>,
    recognizer: Box<dyn TextRecognizer>,
    annotator: Annotator,
    output: PathBuf,
}

impl Lpr {

    pub fn new(detector: Box<dyn PlateDetector>, recognizer: Box<dyn TextRecognizer>,
               annotator: Annotator, output: impl Into<PathBuf>) -> Self {
        Lpr { detector, recognizer, annotator, output: output.into() }
    }

    /// Load the detection and recognition graphs. A configured label font
    /// that can't be used falls back to the bundled one.
    #[cfg(feature = "tensorflow")]
    pub fn from_config(config: &LprConfig) -> Result<Self, LprError> {
        let detector = detect::TfPlateDetector::new(config)?;
        let recognizer = ocr::TfTextRecognizer::new(config)?;
        let annotator = match &config.font {
            Some(font) => Annotator::with_font_file(font),
            None => Annotator::new(),
        };
        Ok(Self::new(Box::new(detector), Box::new(recognizer), annotator, config.output.clone()))
    }

    #[cfg(not(feature = "tensorflow"))]
    pub fn from_config(config: &LprConfig) -> Result<Self, LprError> {
        Err(LprError::model_load(&config.detect_model, "built without the `tensorflow` feature"))
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Detect, read and annotate the first plate of `img`. The image is
    /// handed back, annotated, in the returned `Recognition`.
    pub fn recognize(&self, mut img: RgbImage) -> Result<Recognition, LprError> {
        let detections = self.detector.detect(&img)?;
        let plate = match detections.first() {
            Some(detection) => detection.bbox,
            None => {
                info!("no plate detected");
                return Ok(Recognition { image: img, text: NOT_DETECTED.to_string(), plate: None, fragments: Vec::new() });
            }
        };

        let (width, height) = img.dimensions();
        let fragments = match plate.clamp_to(width, height) {
            Some([x, y, w, h]) => {
                let cropped = imageops::crop_imm(&img, x, y, w, h).to_image();
                info!(?plate, candidates = detections.len(), "plate detected and cropped");
                self.recognizer.recognize(&cropped)?
            }
            None => {
                warn!(?plate, width, height, "plate box lies outside the image, skipping recognition");
                Vec::new()
            }
        };
        let text = plate_text(&fragments);
        if !fragments.is_empty() {
            info!(text = %text, "plate text recognized");
        }

        self.annotator.draw(&mut img, &plate, &text);
        Ok(Recognition { image: img, text, plate: Some(plate), fragments })
    }

    /// Read `image_path`, recognize it and write the result to the output path.
    pub fn recognize_file(&self, image_path: impl AsRef<Path>) -> Result<Recognition, LprError> {
        let path = image_path.as_ref();
        let img = image::open(path).map_err(|e| LprError::image_read(path, e))?.to_rgb8();

        let recognition = self.recognize(img)?;
        recognition.image.save(&self.output).map_err(|e| LprError::image_write(&self.output, e))?;
        info!(output = %self.output.display(), "result saved");
        Ok(recognition)
    }
}

/// Whole pipeline: load the models, recognize one image, save and optionally show it.
pub fn recognize_plate(config: &LprConfig, image_path: impl AsRef<Path>, show: bool) -> Result<Recognition, LprError> {
    let lpr = Lpr::from_config(config)?;
    info!("models loaded");
    let recognition = lpr.recognize_file(image_path)?;
    if show {
        utils::display_image(&recognition.image, &format!("Final Prediction: {}", recognition.text));
    }
    Ok(recognition)
}


#[cfg(test)]
mod test {

    use image::{ Rgb, RgbImage };

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::error::Error;
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::error::LprErrorKind;

    struct FixedDetector(Vec<BoundingBox>);

    impl PlateDetector for FixedDetector {
        fn detect(&self, _img: &RgbImage) -> Result<Vec<Detection>, LprError> {
            Ok(self.0.iter().map(|b| Detection { bbox: *b, class_id: 0, confidence: 0.8 }).collect())
        }
    }

    #[derive(Default)]
    struct FixedRecognizer {
        texts: Vec<&'static str>,
        seen: RefCell<Vec<(u32, u32)>>,
    }

    impl FixedRecognizer {
        fn reading(texts: &[&'static str]) -> Self {
            Self { texts: texts.to_vec(), ..Default::default() }
        }
    }

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, LprError> {
            self.seen.borrow_mut().push(region.dimensions());
            Ok(self.texts.iter().map(|t| TextFragment {
                bbox: BoundingBox::new(0, 0, region.width() as i32 - 1, region.height() as i32 - 1),
                text: t.to_string(),
                confidence: 0.9,
            }).collect())
        }
    }

    // shared with the test so it can inspect the crops afterwards
    impl TextRecognizer for Rc<FixedRecognizer> {
        fn recognize(&self, region: &RgbImage) -> Result<Vec<TextFragment>, LprError> {
            self.as_ref().recognize(region)
        }
    }

    fn source_image() -> RgbImage {
        RgbImage::from_fn(200, 100, |x, y| Rgb([(x % 200) as u8, (y*2) as u8, 90]))
    }

    fn lpr(boxes: Vec<BoundingBox>, texts: &[&'static str], output: PathBuf) -> Lpr {
        Lpr::new(Box::new(FixedDetector(boxes)), Box::new(FixedRecognizer::reading(texts)),
                 Annotator::without_labels(), output)
    }

    #[test]
    fn fragments_join_upper_case_in_order() {
        let fragments: Vec<TextFragment> = ["ab12", "cd"].iter().map(|t| TextFragment {
            bbox: BoundingBox::new(0, 0, 1, 1),
            text: t.to_string(),
            confidence: 0.5,
        }).collect();
        assert_eq!(plate_text(&fragments), "AB12 CD");
        assert_eq!(plate_text(&[]), NO_TEXT_FOUND);
    }

    #[test]
    fn unreadable_image_writes_nothing() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("result.png");
        let lpr = lpr(vec![BoundingBox::new(10, 10, 110, 40)], &["XY"], output.clone());

        let missing = lpr.recognize_file(dir.path().join("missing.png")).unwrap_err();
        assert!(missing.is_image_read());

        let junk = dir.path().join("junk.png");
        fs::write(&junk, b"not an image")?;
        let undecodable = lpr.recognize_file(&junk).unwrap_err();
        assert!(matches!(undecodable.kind(), LprErrorKind::ImageRead { .. }));

        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn no_detection_saves_the_image_untouched() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("car.png");
        let output = dir.path().join("result.png");
        source_image().save(&input)?;

        let res = lpr(vec![], &["XY"], output.clone()).recognize_file(&input)?;
        assert_eq!(res.text, NOT_DETECTED);
        assert_eq!(res.plate, None);
        assert_eq!(image::open(&output)?.to_rgb8(), source_image());
        Ok(())
    }

    #[test]
    fn empty_reading_still_draws_one_box() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("car.png");
        let output = dir.path().join("result.png");
        source_image().save(&input)?;
        let plate = BoundingBox::new(10, 10, 110, 40);

        let res = lpr(vec![plate, BoundingBox::new(0, 0, 20, 20)], &[], output.clone()).recognize_file(&input)?;
        assert_eq!(res.text, NO_TEXT_FOUND);
        assert_eq!(res.plate, Some(plate));

        let mut expected = source_image();
        Annotator::without_labels().draw(&mut expected, &plate, NO_TEXT_FOUND);
        assert_eq!(image::open(&output)?.to_rgb8(), expected);
        Ok(())
    }

    #[test]
    fn first_box_is_cropped_and_read() -> Result<(), Box<dyn Error>> {
        let recognizer = Rc::new(FixedRecognizer::reading(&["XY 1234"]));
        let lpr = Lpr::new(Box::new(FixedDetector(vec![BoundingBox::new(10, 10, 110, 40)])),
                           Box::new(Rc::clone(&recognizer)), Annotator::without_labels(), "unused.png");

        let res = lpr.recognize(source_image())?;
        assert_eq!(res.text, "XY 1234");
        assert_eq!(res.plate, Some(BoundingBox::new(10, 10, 110, 40)));
        assert_eq!(*recognizer.seen.borrow(), vec![(100, 30)]);
        assert_eq!(res.image.get_pixel(10, 10), &annotate::HIGHLIGHT);
        assert_eq!(res.image.get_pixel(110, 40), &annotate::HIGHLIGHT);
        assert_eq!(res.image.get_pixel(60, 25), source_image().get_pixel(60, 25));
        Ok(())
    }

    #[test]
    fn label_is_drawn_above_the_plate() -> Result<(), Box<dyn Error>> {
        let plate = BoundingBox::new(10, 50, 110, 80);
        let lpr = Lpr::new(Box::new(FixedDetector(vec![plate])), Box::new(FixedRecognizer::reading(&["xy", "17"])),
                           Annotator::new(), "unused.png");

        let res = lpr.recognize(source_image())?;
        assert_eq!(res.text, "XY 17");
        let mut boxed = source_image();
        Annotator::without_labels().draw(&mut boxed, &plate, &res.text);
        let label_rows: Vec<u32> = res.image.enumerate_pixels()
            .filter(|(x, y, p)| *p != boxed.get_pixel(*x, *y))
            .map(|(_, y, _)| y)
            .collect();
        assert!(!label_rows.is_empty());
        let baseline = (plate.y_min - annotate::LABEL_MARGIN) as u32;
        assert!(label_rows.iter().all(|y| *y < baseline));
        Ok(())
    }

    #[test]
    fn box_outside_the_image_is_not_read() -> Result<(), Box<dyn Error>> {
        let recognizer = Rc::new(FixedRecognizer::reading(&["XY"]));
        let lpr = Lpr::new(Box::new(FixedDetector(vec![BoundingBox::new(250, 10, 300, 40)])),
                           Box::new(Rc::clone(&recognizer)), Annotator::without_labels(), "unused.png");

        let res = lpr.recognize(source_image())?;
        assert_eq!(res.text, NO_TEXT_FOUND);
        assert!(recognizer.seen.borrow().is_empty());
        assert_eq!(res.image, source_image());
        Ok(())
    }

    #[test]
    fn overhanging_box_is_clamped_before_cropping() -> Result<(), Box<dyn Error>> {
        let recognizer = Rc::new(FixedRecognizer::reading(&["ab"]));
        let lpr = Lpr::new(Box::new(FixedDetector(vec![BoundingBox::new(150, 80, 260, 130)])),
                           Box::new(Rc::clone(&recognizer)), Annotator::without_labels(), "unused.png");

        let res = lpr.recognize(source_image())?;
        assert_eq!(res.text, "AB");
        assert_eq!(*recognizer.seen.borrow(), vec![(50, 20)]);
        Ok(())
    }

    #[test]
    fn reruns_overwrite_the_output() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("car.png");
        let output = dir.path().join("result.png");
        source_image().save(&input)?;
        fs::write(&output, b"stale")?;

        lpr(vec![BoundingBox::new(10, 10, 110, 40)], &["XY"], output.clone()).recognize_file(&input)?;
        assert_ne!(image::open(&output)?.to_rgb8(), source_image());

        lpr(vec![], &[], output.clone()).recognize_file(&input)?;
        assert_eq!(image::open(&output)?.to_rgb8(), source_image());
        Ok(())
    }

    #[test]
    fn missing_models_abort_before_reading_the_image() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let config = LprConfig {
            detect_model: dir.path().join("detect.pb"),
            ocr_model: dir.path().join("ocr.pb"),
            font: Some(dir.path().join("plate.ttf")),
            output: dir.path().join("result.png"),
            ..LprConfig::default()
        };
        let err = recognize_plate(&config, dir.path().join("car.png"), false).unwrap_err();
        assert!(err.is_model_load());
        assert!(!config.output.exists());
        Ok(())
    }
}
