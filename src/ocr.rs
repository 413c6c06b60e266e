use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::preprocessing::{Pipeline, PreprocessingResult};
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Recognition outcome together with the preprocessing report
#[derive(Debug, Clone, Serialize)]
pub struct OcrOutcome {
    /// Recognized text, `None` when the engine found nothing
    pub text: Option<String>,
    pub found: bool,
    pub engine: String,
    pub recognition_time_ms: u64,
    pub preprocessing: PreprocessingResult,
}

/// Preprocesses images and hands the result to an OCR engine
pub struct OcrProcessor {
    pipeline: Pipeline,
    engine: Arc<dyn OcrEngine>,
}

impl OcrProcessor {
    pub fn new(pipeline: Pipeline, engine: Arc<dyn OcrEngine>) -> Self {
        tracing::info!("Using {} engine: {}", engine.name(), engine.description());
        Self { pipeline, engine }
    }

    pub fn process(&self, image: &DynamicImage) -> Result<OcrOutcome, OcrError> {
        let preprocessing = self.pipeline.process(image)?;

        let start = Instant::now();
        let text = self.engine.recognize(&preprocessing.image)?;
        let recognition_time_ms = start.elapsed().as_millis() as u64;

        match &text {
            Some(text) => tracing::info!(
                "OCR completed in {}ms with {}, text length: {}",
                recognition_time_ms,
                self.engine.name(),
                text.len()
            ),
            None => tracing::info!(
                "OCR completed in {}ms with {}, no text found",
                recognition_time_ms,
                self.engine.name()
            ),
        }

        Ok(OcrOutcome {
            found: text.is_some(),
            text,
            engine: self.engine.name().to_string(),
            recognition_time_ms,
            preprocessing,
        })
    }
}
