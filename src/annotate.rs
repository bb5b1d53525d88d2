use image::{ GrayImage, Luma, Rgb, RgbImage };
use imageproc::{ drawing, pixelops };
use rusttype::{ Font, Scale };
use tracing::{ debug, warn };

use std::fs;
use std::path::Path;

use crate::bbox::BoundingBox;

pub const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const TEXT_STROKE: u32 = 3;
const TEXT_SCALE: f32 = 28.0;
// gap between the label baseline and the top edge of the box
pub const LABEL_MARGIN: i32 = 10;
const FONT_DATA: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

/// Draws the plate box and its label onto the source image.
pub struct Annotator {
    font: Option<Font<'static>>,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator {

    /// Labels with the bundled font.
    pub fn new() -> Self {
        let font = Font::try_from_bytes(FONT_DATA);
        if font.is_none() {
            warn!("bundled label font did not parse, drawing boxes only");
        }
        Self { font }
    }

    /// Labels with the font in `font_file`, or the bundled one when that
    /// file can't be used.
    pub fn with_font_file(font_file: impl AsRef<Path>) -> Self {
        let path = font_file.as_ref();
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read label font, using the bundled one");
                return Self::new();
            }
        };
        match Font::try_from_vec(data) {
            Some(font) => {
                debug!(path = %path.display(), "label font loaded");
                Self { font: Some(font) }
            }
            None => {
                warn!(path = %path.display(), "not a TrueType font, using the bundled one");
                Self::new()
            }
        }
    }

    /// Annotator that only draws boxes.
    pub fn without_labels() -> Self {
        Self { font: None }
    }

    pub fn draw(&self, img: &mut RgbImage, plate: &BoundingBox, text: &str) {
        for inset in 0..BOX_THICKNESS {
            if let Some(rect) = plate.outline(inset) {
                drawing::draw_hollow_rect_mut(img, rect, HIGHLIGHT);
            }
        }
        if let Some(font) = &self.font {
            draw_label(img, font, plate, text);
        }
    }
}

// The label is rendered into a coverage mask first so that text above the
// image clips off the top instead of being pushed down over the plate.
fn draw_label(img: &mut RgbImage, font: &Font<'static>, plate: &BoundingBox, text: &str) {
    let scale = Scale::uniform(TEXT_SCALE);
    let v_metrics = font.v_metrics(scale);
    let ascent = v_metrics.ascent.ceil() as i32;
    let height = (v_metrics.ascent - v_metrics.descent).ceil() as u32 + 1;
    let width = img.width() + TEXT_STROKE + (-plate.x_min).max(0) as u32;
    let mut mask = GrayImage::new(width, height);
    for dx in 0..TEXT_STROKE {
        drawing::draw_text_mut(&mut mask, Luma([255]), dx, 0, scale, font, text);
    }

    // mask row `ascent` is the baseline
    let top = plate.y_min - LABEL_MARGIN - ascent;
    let (img_width, img_height) = (img.width() as i32, img.height() as i32);
    for (mx, my, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let (x, y) = (plate.x_min + mx as i32, top + my as i32);
        if x < 0 || y < 0 || x >= img_width || y >= img_height {
            continue;
        }
        let alpha = coverage[0] as f32/255.0;
        let pixel = img.get_pixel_mut(x as u32, y as u32);
        *pixel = pixelops::weighted_sum(*pixel, HIGHLIGHT, 1.0 - alpha, alpha);
    }
}
