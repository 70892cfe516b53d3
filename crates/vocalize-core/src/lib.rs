pub mod api;
pub mod capture;
pub mod clip;
#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod config;
pub mod error;
pub mod recorder;
pub mod verbose;

pub use api::{ApiError, HealthStatus, TranscribeClient, TranscriptResult, TranscriptSegment};
pub use capture::{AudioChunk, AudioEncoding, CaptureBackend, CaptureError, MicrophoneBackend};
pub use clip::AudioClip;
#[cfg(feature = "clipboard")]
pub use clipboard::copy_to_clipboard;
pub use config::{AppMode, Config};
pub use error::{RecorderError, RecorderErrorKind};
pub use recorder::{ClipInfo, Recorder, RecorderSnapshot, RecorderState};
pub use verbose::set_verbose;
