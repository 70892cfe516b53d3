//! Recorder state machine and its driving controller.

mod controller;
mod state;

pub use controller::{ClipInfo, Recorder, RecorderSnapshot};
pub use state::RecorderState;
