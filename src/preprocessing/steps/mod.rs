//! Individual preprocessing steps

pub mod contrast;
pub mod grayscale;
pub mod sharpen;
pub mod skew;
pub mod threshold;

use crate::error::OcrError;

fn ensure_not_empty(width: u32, height: u32) -> Result<(), OcrError> {
    if width == 0 || height == 0 {
        return Err(OcrError::InvalidInput(format!(
            "image must not be empty, got {}x{}",
            width, height
        )));
    }
    Ok(())
}
