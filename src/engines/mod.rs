//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. The local engine is conditionally compiled behind a feature flag.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

pub mod vision;

use crate::engine::OcrEngine;
use crate::error::OcrError;
use std::path::PathBuf;
use std::sync::Arc;

pub use vision::{VisionConfig, VisionEngine};

/// Settings needed to construct any of the available engines
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    /// Cloud engine connection; required for "vision"
    pub vision: Option<VisionConfig>,
    /// Model cache directory for "ocrs"
    pub model_dir: Option<PathBuf>,
}

/// Names of the engines compiled into this build
pub fn available() -> Vec<&'static str> {
    let mut names = vec!["vision"];
    if cfg!(feature = "engine-ocrs") {
        names.push("ocrs");
    }
    names
}

/// Construct an engine by name
pub fn build(name: &str, settings: &EngineSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    match name {
        "vision" => {
            let config = settings.vision.as_ref().ok_or_else(|| {
                OcrError::InitializationError(
                    "vision engine requires a credentials file".to_string(),
                )
            })?;
            Ok(Arc::new(VisionEngine::new(config)?))
        }
        #[cfg(feature = "engine-ocrs")]
        "ocrs" => Ok(Arc::new(ocrs::OcrsEngine::new(
            settings.model_dir.as_deref(),
        )?)),
        other => Err(OcrError::InitializationError(format!(
            "Unknown OCR engine '{}'; available: {}",
            other,
            available().join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_is_always_available() {
        assert!(available().contains(&"vision"));
    }

    #[test]
    fn test_vision_requires_credentials() {
        let err = build("vision", &EngineSettings::default()).err().unwrap();
        assert!(matches!(err, OcrError::InitializationError(_)));
    }

    #[test]
    fn test_unknown_engine() {
        let err = build("tesseract", &EngineSettings::default()).err().unwrap();
        assert!(err.to_string().contains("tesseract"));
    }
}
