//! Cloud Vision engine implementation
//!
//! Sends the preprocessed image to the Google Cloud Vision `images:annotate`
//! REST endpoint with `TEXT_DETECTION` and returns the full-text annotation.

use crate::engine::OcrEngine;
use crate::error::OcrError;
use base64::Engine as _;
use image::{GrayImage, ImageFormat};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// The key travels in this header, never in the URL
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for the cloud OCR service
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    /// File holding the API key, either as plain text or as `{"api_key": "..."}`
    pub credentials_path: PathBuf,
    pub timeout: Duration,
}

impl VisionConfig {
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials_path: credentials_path.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// OCR engine backed by the Cloud Vision REST API
pub struct VisionEngine {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

impl VisionEngine {
    pub fn new(config: &VisionConfig) -> Result<Self, OcrError> {
        let api_key = load_api_key(&config.credentials_path)?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        tracing::info!("Cloud Vision engine initialized for {}", config.endpoint);

        Ok(Self {
            agent,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

impl OcrEngine for VisionEngine {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn description(&self) -> &'static str {
        "Google Cloud Vision text detection over HTTPS"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Option<String>, OcrError> {
        let body = build_request_body(image)?;
        let response = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .send(&body[..])
            .map_err(|e| OcrError::TransportError(e.to_string()))?;

        let status = response.status();
        let payload = response
            .into_body()
            .read_to_string()
            .map_err(|e| OcrError::TransportError(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(OcrError::ServiceError(error_message(status.as_u16(), &payload)));
        }

        let text = parse_response(&payload)?;
        tracing::info!(
            "Cloud Vision returned {} chars of text",
            text.as_deref().map_or(0, str::len)
        );
        Ok(text)
    }
}

/// Read the API key; the process environment is never consulted
fn load_api_key(path: &Path) -> Result<String, OcrError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        OcrError::InitializationError(format!(
            "Failed to read credentials {}: {}",
            path.display(),
            e
        ))
    })?;
    let raw = raw.trim();

    let key = if raw.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
            OcrError::InitializationError(format!("Invalid credentials file: {}", e))
        })?;
        if value.get("private_key").is_some() {
            return Err(OcrError::InitializationError(
                "service-account credentials are not supported, provide an API key".to_string(),
            ));
        }
        value
            .get("api_key")
            .and_then(|k| k.as_str())
            .unwrap_or_default()
            .trim()
            .to_string()
    } else {
        raw.to_string()
    };

    if key.is_empty() {
        return Err(OcrError::InitializationError(format!(
            "No API key found in {}",
            path.display()
        )));
    }
    Ok(key)
}

/// Encode the image losslessly and wrap it in an annotate request
fn build_request_body(image: &GrayImage) -> Result<Vec<u8>, OcrError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrError::ProcessingError(format!("Failed to encode image: {}", e)))?;

    let content = base64::engine::general_purpose::STANDARD.encode(&png);
    let request = json!({
        "requests": [{
            "image": { "content": content },
            "features": [{ "type": "TEXT_DETECTION" }]
        }]
    });

    serde_json::to_vec(&request)
        .map_err(|e| OcrError::Internal(format!("Failed to serialize request: {}", e)))
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiStatus,
}

/// The first annotation holds the full text; the rest are single words
fn parse_response(payload: &str) -> Result<Option<String>, OcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(payload)
        .map_err(|e| OcrError::ServiceError(format!("Malformed response: {}", e)))?;

    let Some(first) = parsed.responses.into_iter().next() else {
        return Ok(None);
    };

    if let Some(status) = first.error {
        if !status.message.is_empty() {
            return Err(OcrError::ServiceError(format!(
                "{} (code {})",
                status.message, status.code
            )));
        }
    }

    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description)
        .filter(|text| !text.is_empty()))
}

fn error_message(status: u16, payload: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(payload) {
        Ok(envelope) => format!("HTTP {}: {}", status, envelope.error.message),
        Err(_) => format!("HTTP {}", status),
    }
}
