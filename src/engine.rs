use crate::error::OcrError;
use image::GrayImage;

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "vision", "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the full text of a single-channel image.
    ///
    /// `Ok(None)` means the engine found no text. Transport and service
    /// failures are errors, never `Ok(None)`.
    fn recognize(&self, image: &GrayImage) -> Result<Option<String>, OcrError>;
}
