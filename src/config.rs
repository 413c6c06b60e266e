use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning for the skew estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Lower hysteresis threshold of the edge detector
    pub canny_low: f32,
    /// Upper hysteresis threshold of the edge detector
    pub canny_high: f32,
    /// Minimum accumulator votes a line candidate must exceed
    pub vote_threshold: u32,
    /// Angular step of the line accumulator, in degrees
    pub angle_resolution_deg: f64,
    /// Distance step of the line accumulator, in pixels
    pub rho_resolution: f64,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            vote_threshold: 200,
            angle_resolution_deg: 1.0,
            rho_resolution: 1.0,
        }
    }
}

/// Tuning for tiled, clip-limited histogram equalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    pub tile_rows: u32,
    pub tile_cols: u32,
    /// Bin ceiling as a multiple of the mean bin height of a tile
    pub clip_limit: f64,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            tile_rows: 8,
            tile_cols: 8,
            clip_limit: 2.0,
        }
    }
}

/// Preprocessing pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub skew: SkewConfig,
    pub contrast: ContrastConfig,
}

impl PipelineConfig {
    /// Load a (possibly partial) configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, OcrError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OcrError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            OcrError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OcrError> {
        let skew = &self.skew;
        if !(skew.canny_low > 0.0 && skew.canny_high > 0.0) {
            return Err(OcrError::InvalidConfig(
                "edge thresholds must be positive".to_string(),
            ));
        }
        if skew.canny_low > skew.canny_high {
            return Err(OcrError::InvalidConfig(format!(
                "edge low threshold {} exceeds high threshold {}",
                skew.canny_low, skew.canny_high
            )));
        }
        if !(skew.angle_resolution_deg > 0.0 && skew.angle_resolution_deg <= 180.0) {
            return Err(OcrError::InvalidConfig(format!(
                "angle resolution must be in (0, 180] degrees, got {}",
                skew.angle_resolution_deg
            )));
        }
        if !(skew.rho_resolution > 0.0 && skew.rho_resolution.is_finite()) {
            return Err(OcrError::InvalidConfig(format!(
                "distance resolution must be positive, got {}",
                skew.rho_resolution
            )));
        }

        let contrast = &self.contrast;
        if contrast.tile_rows == 0 || contrast.tile_cols == 0 {
            return Err(OcrError::InvalidConfig(format!(
                "tile grid must be at least 1x1, got {}x{}",
                contrast.tile_rows, contrast.tile_cols
            )));
        }
        if !(contrast.clip_limit > 0.0 && contrast.clip_limit.is_finite()) {
            return Err(OcrError::InvalidConfig(format!(
                "clip limit must be positive, got {}",
                contrast.clip_limit
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.skew.vote_threshold, 200);
        assert_eq!(config.contrast.tile_rows, 8);
        assert_eq!(config.contrast.clip_limit, 2.0);
    }

    #[test]
    fn test_rejects_inverted_edge_thresholds() {
        let mut config = PipelineConfig::default();
        config.skew.canny_low = 200.0;
        assert!(matches!(config.validate(), Err(OcrError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_tile_grid() {
        let mut config = PipelineConfig::default();
        config.contrast.tile_cols = 0;
        assert!(matches!(config.validate(), Err(OcrError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"contrast": {{"clip_limit": 3.5}}}}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.contrast.clip_limit, 3.5);
        assert_eq!(config.contrast.tile_rows, 8);
        assert_eq!(config.skew, SkewConfig::default());
    }
}
