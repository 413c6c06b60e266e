//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use crate::engine::OcrEngine;
use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Local OCR engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create the engine, downloading models into `model_dir` if needed
    pub fn new(model_dir: Option<&Path>) -> Result<Self, OcrError> {
        tracing::info!("Initializing ocrs OCR engine...");

        let cache_dir = match model_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("weighbridge-ocr"),
        };

        let detection_model_path =
            ensure_model_downloaded(&cache_dir, DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(&cache_dir, RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - runs locally, no network after model download"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Option<String>, OcrError> {
        // ocrs expects HWC color bytes
        let rgb = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
        let dimensions = rgb.dimensions();

        let img_source = ImageSource::from_bytes(rgb.as_raw(), dimensions).map_err(|e| {
            OcrError::ProcessingError(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        let lines = line_texts.iter().flatten().map(|line| {
            line.words()
                .map(|word| word.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        });
        Ok(join_lines(lines))
    }
}

/// Join recognized lines; `None` when nothing but whitespace was read
fn join_lines(lines: impl Iterator<Item = String>) -> Option<String> {
    let text = lines.collect::<Vec<_>>().join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(
    cache_dir: &Path,
    url: &str,
    filename: &str,
) -> Result<PathBuf, OcrError> {
    std::fs::create_dir_all(cache_dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a model with ureq and store it under `path`
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download model: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    store_model(&buffer, path)
}

/// Write to a `.partial` sibling and rename, so an interrupted write is never cached
fn store_model(bytes: &[u8], path: &Path) -> Result<(), OcrError> {
    let partial = path.with_extension("partial");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(bytes)
        .map_err(|e| OcrError::InitializationError(format!("Failed to write model file: {}", e)))?;
    std::fs::rename(&partial, path)
        .map_err(|e| OcrError::InitializationError(format!("Failed to store model file: {}", e)))?;

    Ok(())
}
