use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};

use crate::config::PreprocessConfig;

/// Cleans up a screenshot before text detection.
///
/// Steps: grayscale → contrast boost → upscale to `min_width` → median filter
/// → back to RGB (detectors expect three channels).
///
/// Upscaling changes pixel coordinates uniformly, so the association
/// tolerances still hold on small screenshots.
pub fn prepare_for_ocr(img: &RgbImage, config: &PreprocessConfig) -> RgbImage {
    if !config.enabled {
        return img.clone();
    }

    let gray = DynamicImage::ImageRgb8(img.clone()).to_luma8();
    let gray = image::imageops::contrast(&gray, config.contrast);
    let gray = upscale_to_width(&gray, config.min_width);
    let gray = if config.median_radius > 0 {
        imageproc::filter::median_filter(&gray, config.median_radius, config.median_radius)
    } else {
        gray
    };

    DynamicImage::ImageLuma8(gray).to_rgb8()
}

/// Upscales proportionally so the width is at least `min_width`.
pub fn upscale_to_width(img: &GrayImage, min_width: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || w >= min_width {
        return img.clone();
    }

    let factor = min_width as f32 / w as f32;
    let new_h = ((h as f32 * factor) as u32).max(1);
    image::imageops::resize(img, min_width, new_h, FilterType::Lanczos3)
}
