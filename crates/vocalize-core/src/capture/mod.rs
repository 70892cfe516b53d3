//! Microphone capture behind a swappable backend trait.
//!
//! The recorder controller only talks to [`CaptureBackend`]; the production
//! implementation ([`MicrophoneBackend`]) wires a cpal input stream into an
//! FFmpeg child process so chunks arrive already containerized. Tests swap
//! in a scripted backend instead.

pub mod devices;
mod encoding;
mod ffmpeg;
mod microphone;

pub use encoding::{AudioEncoding, negotiate};
pub use microphone::MicrophoneBackend;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// One increment of encoded audio produced during capture.
///
/// Chunks are opaque byte runs; concatenating every chunk of a session in
/// arrival order yields a valid audio file in the negotiated encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub bytes: Vec<u8>,
}

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform refused microphone access
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),
    /// No input device is present (or the preferred one vanished)
    #[error("no audio input device available")]
    DeviceNotFound,
    /// The encoder process could not be started or failed mid-session
    #[error("{0}")]
    Encoder(String),
    /// Anything else the audio layer reports
    #[error("{0}")]
    Backend(String),
}

/// Source of encoded audio chunks.
///
/// Call order per session: [`request_input`](CaptureBackend::request_input),
/// then [`start`](CaptureBackend::start) with a negotiated encoding, then
/// [`stop`](CaptureBackend::stop). `stop` must release the input device
/// before finalizing, and must close the chunk channel once the final
/// chunks (container trailer included) have been delivered.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    /// Acquire the input device, surfacing permission/presence problems
    /// before any encoding work happens.
    async fn request_input(&mut self) -> Result<(), CaptureError>;

    /// Whether this backend can produce chunks in `encoding`.
    fn is_encoding_supported(&self, encoding: AudioEncoding) -> bool;

    /// Begin capturing. The receiver yields encoded chunks until the
    /// session is stopped and the stream is drained.
    async fn start(
        &mut self,
        encoding: AudioEncoding,
    ) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing: release the device, flush the encoder, close the
    /// chunk channel. Safe to call when no session is active.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    fn is_capturing(&self) -> bool;
}
