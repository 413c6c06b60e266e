//! Image preprocessing module for OCR enhancement
//!
//! Conditions a photographed ticket or plate for text recognition:
//! grayscale, skew correction, local contrast, sharpening, binarization.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PreprocessingResult, StepTiming};
