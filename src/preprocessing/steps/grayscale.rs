use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

const WEIGHT_R: f32 = 0.299;
const WEIGHT_G: f32 = 0.587;
const WEIGHT_B: f32 = 0.114;

/// Convert a 3-channel color image to luma
/// Uses the BT.601 weighting rather than a channel average
pub fn apply(image: &DynamicImage) -> Result<GrayImage, OcrError> {
    let channels = image.color().channel_count();
    if channels != 3 {
        return Err(OcrError::InvalidInput(format!(
            "expected a 3-channel color image, got {} channel(s)",
            channels
        )));
    }
    super::ensure_not_empty(image.width(), image.height())?;

    let rgb = image.to_rgb8();
    Ok(GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = WEIGHT_B * b as f32 + WEIGHT_G * g as f32 + WEIGHT_R * r as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    }))
}
