use image::{ imageops, imageops::FilterType, RgbImage };
use imageproc::contrast;

// tensor 的展开机制是先 y 再 x，每一行是一个时间步
pub fn argmax_in_axis0(input: &[f32], shape: &[usize]) -> Vec<usize> {
    input.chunks(shape[1]).map(|v: &[f32]| {
        let mut max = v[0];
        let mut index = 0;
        v.iter().enumerate().for_each(|(i, v_in_v)| {
            if *v_in_v > max {
                max = *v_in_v;
                index = i;
            }
        });
        index
    }).collect()
}

/// Recognizer input, row-major `[height][width][3]`: gray, histogram
/// equalized, resized to `width`x`height`, spread over three channels and
/// scaled to [0, 1].
pub fn ocr_input(img: &RgbImage, (width, height): (u32, u32)) -> Vec<f32> {
    let gray = imageops::grayscale(img);
    let gray = contrast::equalize_histogram(&gray);
    let gray = imageops::resize(&gray, width, height, FilterType::Triangle);
    gray.into_raw().into_iter()
        .flat_map(|v| std::iter::repeat(v as f32/255.0).take(3))
        .collect()
}

#[cfg(feature = "display")]
pub fn display_image(img: &RgbImage, title: &str) {
    let rgba = image::DynamicImage::ImageRgb8(img.clone()).to_rgba8();
    imageproc::window::display_image(title, &rgba, img.width(), img.height());
}

#[cfg(not(feature = "display"))]
pub fn display_image(_img: &RgbImage, title: &str) {
    tracing::warn!(title, "built without the `display` feature, not showing the result");
}
