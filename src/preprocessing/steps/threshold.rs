use crate::error::OcrError;
use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

/// Apply Otsu global thresholding
///
/// Pixels strictly above the chosen level become white (255), all others
/// black (0). Ties in between-class variance resolve to the lowest level, so
/// a uniform image yields level 0.
pub fn apply(image: &GrayImage) -> Result<(GrayImage, u8), OcrError> {
    super::ensure_not_empty(image.width(), image.height())?;

    let level = otsu_level(image);
    tracing::debug!("Otsu threshold level: {}", level);

    Ok((threshold(image, level, ThresholdType::Binary), level))
}
