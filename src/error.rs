use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid input image: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Could not reach OCR service: {0}")]
    TransportError(String),

    #[error("OCR service returned an error: {0}")]
    ServiceError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Stable machine-readable code for reports
    pub fn code(&self) -> &'static str {
        match self {
            OcrError::InvalidInput(_) => "INVALID_INPUT",
            OcrError::InvalidConfig(_) => "INVALID_CONFIG",
            OcrError::InitializationError(_) => "INIT_ERROR",
            OcrError::ProcessingError(_) => "PROCESSING_ERROR",
            OcrError::TransportError(_) => "TRANSPORT_ERROR",
            OcrError::ServiceError(_) => "SERVICE_ERROR",
            OcrError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<&OcrError> for ErrorResponse {
    fn from(err: &OcrError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_code() {
        let err = OcrError::TransportError("connection refused".to_string());
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "TRANSPORT_ERROR");
        assert!(response.error.contains("connection refused"));
    }
}
