//! Recorder lifecycle states.

use std::fmt;

/// Where one recording interaction currently stands.
///
/// The cycle is `Idle → Recording → Processing → Done`, with `Error`
/// reachable from anywhere a failure can occur. `Done` and `Error` are
/// both valid launch points for a fresh recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    /// Nothing in flight; ready to record
    #[default]
    Idle,
    /// Microphone open, chunks accumulating
    Recording,
    /// Capture finished, upload in flight
    Processing,
    /// Transcript available
    Done,
    /// A failure was recorded; see the error on the snapshot
    Error,
}

impl RecorderState {
    /// Whether a start request is accepted in this state.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            RecorderState::Idle | RecorderState::Done | RecorderState::Error
        )
    }

    /// Whether a stop request does anything in this state.
    pub fn can_stop(&self) -> bool {
        matches!(self, RecorderState::Recording)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Recording => "recording",
            RecorderState::Processing => "processing",
            RecorderState::Done => "done",
            RecorderState::Error => "error",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
