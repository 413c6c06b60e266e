//! Preprocessing and OCR for photographed weighbridge tickets and license plates.
//!
//! A decoded color image goes through five pure stages (grayscale, skew
//! correction, tiled contrast enhancement, sharpening, Otsu binarization) and
//! the binarized result is handed to an [`engine::OcrEngine`].

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod ocr;
pub mod preprocessing;

pub use config::PipelineConfig;
pub use error::OcrError;
pub use ocr::{OcrOutcome, OcrProcessor};
pub use preprocessing::{Pipeline, PreprocessingResult};
