use crate::config::PipelineConfig;
use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Binarized image, values are only 0 or 255 (not serialized)
    #[serde(skip)]
    pub image: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Detected skew in degrees (positive when text descends to the right)
    pub skew_angle_deg: f64,
    /// Number of line candidates the skew estimate was based on
    pub line_candidates: usize,
    /// Global threshold chosen by the binarizer
    pub threshold: u8,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline: grayscale, deskew, contrast, sharpen, threshold.
///
/// Holds only configuration, so one pipeline can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, OcrError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Process a decoded color image into a binarized one
    pub fn process(&self, image: &DynamicImage) -> Result<PreprocessingResult, OcrError> {
        let start = Instant::now();
        let mut timings = Vec::new();

        let gray = run_step("grayscale", &mut timings, || steps::grayscale::apply(image))?;

        let (deskewed, skew) = run_step("deskew", &mut timings, || {
            steps::skew::apply(&gray, &self.config.skew)
        })?;
        drop(gray);

        let enhanced = run_step("contrast", &mut timings, || {
            steps::contrast::apply(&deskewed, &self.config.contrast)
        })?;
        drop(deskewed);

        let sharpened = run_step("sharpen", &mut timings, || steps::sharpen::apply(&enhanced))?;
        drop(enhanced);

        let (binarized, threshold) =
            run_step("threshold", &mut timings, || steps::threshold::apply(&sharpened))?;

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Preprocessed {}x{} image in {}ms (skew {:.2} deg, threshold {})",
            binarized.width(),
            binarized.height(),
            total_time_ms,
            skew.angle_deg,
            threshold
        );

        Ok(PreprocessingResult {
            image: binarized,
            total_time_ms,
            skew_angle_deg: skew.angle_deg,
            line_candidates: skew.candidates,
            threshold,
            steps: timings,
        })
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> Result<T, OcrError>
where
    F: FnOnce() -> Result<T, OcrError>,
{
    let step_start = Instant::now();
    let result = step_fn()?;
    let time_ms = step_start.elapsed().as_millis() as u64;
    tracing::debug!("Step {} finished in {}ms", name, time_ms);
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_records_every_step_in_order() {
        let img = RgbImage::from_fn(64, 32, |x, _| {
            if x % 16 < 4 {
                Rgb([30, 30, 30])
            } else {
                Rgb([220, 220, 220])
            }
        });
        let result = Pipeline::default()
            .process(&DynamicImage::ImageRgb8(img))
            .unwrap();

        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["grayscale", "deskew", "contrast", "sharpen", "threshold"]);
        assert!(result.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_blank_image_is_deterministic() {
        let img = RgbImage::from_pixel(50, 40, Rgb([200, 200, 200]));
        let result = Pipeline::default()
            .process(&DynamicImage::ImageRgb8(img))
            .unwrap();

        assert_eq!(result.skew_angle_deg, 0.0);
        assert_eq!(result.threshold, 0);
        assert_eq!(result.image.dimensions(), (50, 40));
        assert!(result.image.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_rejects_grayscale_input() {
        let img = GrayImage::new(10, 10);
        let err = Pipeline::default()
            .process(&DynamicImage::ImageLuma8(img))
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.contrast.clip_limit = 0.0;
        assert!(Pipeline::new(config).is_err());
    }
}
