//! HTTP client for the transcription backend.
//!
//! The backend exposes two endpoints: `POST /api/transcribe` taking a
//! multipart upload of the recorded audio, and `GET /api/health`. Errors
//! distinguish "the request never got an HTTP response" from "the backend
//! answered with a failure", because the UI maps those to different
//! categories.

use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;

pub const TRANSCRIBE_PATH: &str = "/api/transcribe";
pub const HEALTH_PATH: &str = "/api/health";

/// Multipart field name the backend expects.
const UPLOAD_FIELD: &str = "file";
/// Filename advertised in the multipart part; the backend keys format
/// detection off the payload, not this name.
const UPLOAD_FILENAME: &str = "recording.webm";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A completed transcription as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptResult {
    pub text: String,
    pub language: String,
    pub duration_sec: f64,
    /// Per-segment timing, present when the model emits it
    #[serde(default)]
    pub segments: Option<Vec<TranscriptSegment>>,
    pub model: String,
    pub device: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed before an HTTP response existed (connection
    /// refused, DNS, TLS, interrupted body)
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// The backend responded with a non-success status
    #[error("Transcription failed: {status} - {body}")]
    Status { status: u16, body: String },
    /// The backend claimed success but the body did not parse
    #[error("invalid transcription response: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct TranscribeClient {
    base_url: String,
    http: reqwest::Client,
}

impl TranscribeClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// Uploads deliberately have no timeout: transcription time scales
    /// with recording length and the model in use.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload one recording and wait for its transcript.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
    ) -> Result<TranscriptResult, ApiError> {
        crate::verbose!(
            "uploading {} bytes ({mime_type}) to {}{TRANSCRIBE_PATH}",
            audio.len(),
            self.base_url
        );
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(UPLOAD_FILENAME)
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(format!("{}{TRANSCRIBE_PATH}", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Ask the backend whether it is alive.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let response = self
            .http
            .get(format!("{}{HEALTH_PATH}", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status { status, body });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Validate and normalize the backend base URL.
fn validate_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        anyhow::bail!(
            "Backend URL not configured.\n\
             Set VOCALIZE_BACKEND_URL or pass --backend-url http://localhost:8000"
        );
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!(
            "Invalid backend URL: must start with http:// or https://\n\
             Got: {trimmed}"
        );
    }
    let after_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or("");
    if after_scheme.is_empty() || after_scheme.starts_with('/') {
        anyhow::bail!(
            "Invalid backend URL: missing host\n\
             Got: {trimmed}"
        );
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
