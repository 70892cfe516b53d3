//! Error taxonomy surfaced to the user interface.
//!
//! Every failure the recorder can hit is folded into one of four categories
//! so the front-end can decide how to present it (and whether a retry makes
//! sense). The conversions below are the single place where lower-level
//! errors get classified.

use thiserror::Error;

use crate::api::ApiError;
use crate::capture::CaptureError;

/// Category of a [`RecorderError`], stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecorderErrorKind {
    /// Access to the microphone was denied
    MicPermission,
    /// No usable input device is present
    MicNotFound,
    /// The upload never reached the backend (connection, DNS, TLS)
    UploadFailed,
    /// The backend answered but could not transcribe (HTTP error, bad body)
    /// or local capture/encoding failed after the microphone was acquired
    BackendError,
}

/// User-facing recorder failure with a displayable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("{0}")]
    MicPermission(String),
    #[error("{0}")]
    MicNotFound(String),
    #[error("{0}")]
    UploadFailed(String),
    #[error("{0}")]
    BackendError(String),
}

impl RecorderError {
    pub fn kind(&self) -> RecorderErrorKind {
        match self {
            RecorderError::MicPermission(_) => RecorderErrorKind::MicPermission,
            RecorderError::MicNotFound(_) => RecorderErrorKind::MicNotFound,
            RecorderError::UploadFailed(_) => RecorderErrorKind::UploadFailed,
            RecorderError::BackendError(_) => RecorderErrorKind::BackendError,
        }
    }

    /// The message without the enum wrapper, for rendering.
    pub fn message(&self) -> &str {
        match self {
            RecorderError::MicPermission(msg)
            | RecorderError::MicNotFound(msg)
            | RecorderError::UploadFailed(msg)
            | RecorderError::BackendError(msg) => msg,
        }
    }
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(_) => {
                RecorderError::MicPermission("Microphone permission denied".to_string())
            }
            CaptureError::DeviceNotFound => {
                RecorderError::MicNotFound("No microphone found".to_string())
            }
            CaptureError::Encoder(msg) | CaptureError::Backend(msg) => {
                RecorderError::BackendError(msg)
            }
        }
    }
}

impl From<ApiError> for RecorderError {
    fn from(err: ApiError) -> Self {
        match err {
            // The request died before an HTTP response existed
            ApiError::Transport(e) => RecorderError::UploadFailed(e.to_string()),
            // The backend responded, so the failure is on its side
            ApiError::Status { .. } | ApiError::InvalidBody(_) => {
                RecorderError::BackendError(err.to_string())
            }
        }
    }
}
