//! The recorder controller: one instance drives capture, assembly and
//! upload for the lifetime of the UI.
//!
//! All UI-visible data lives behind one mutex ([`Shared`]) so the upload
//! task can complete into it from another task. A generation counter
//! decides whether a finishing upload still owns the result slot: reset
//! and start both bump it, so a stale upload finds itself outvoted and
//! drops its result instead of resurrecting a cleared session.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::api::{TranscribeClient, TranscriptResult};
use crate::capture::{AudioEncoding, CaptureBackend, negotiate};
use crate::clip::AudioClip;
use crate::error::RecorderError;

use super::state::RecorderState;

/// Message shown when no candidate encoding is supported.
const NO_ENCODING_MSG: &str = "No supported audio format found";

/// Point-in-time view of the recorder for rendering.
#[derive(Debug, Clone)]
pub struct RecorderSnapshot {
    pub state: RecorderState,
    pub error: Option<RecorderError>,
    pub transcript: Option<TranscriptResult>,
    pub clip: Option<ClipInfo>,
}

/// Playable-clip facts exposed to the UI without handing out the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipInfo {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub size_bytes: u64,
}

struct Shared {
    state: RecorderState,
    error: Option<RecorderError>,
    transcript: Option<TranscriptResult>,
    clip: Option<AudioClip>,
    /// Bumped by start and reset; an upload only commits if it still
    /// matches
    generation: u64,
}

/// Byte accumulator fed by the chunk pump while recording.
#[derive(Default)]
struct Sink {
    data: Vec<u8>,
    chunks: usize,
}

struct ActiveSession {
    encoding: AudioEncoding,
    sink: Arc<Mutex<Sink>>,
    pump: JoinHandle<()>,
}

pub struct Recorder<B: CaptureBackend> {
    backend: B,
    client: TranscribeClient,
    shared: Arc<Mutex<Shared>>,
    session: Option<ActiveSession>,
}

impl<B: CaptureBackend> Recorder<B> {
    pub fn new(backend: B, client: TranscribeClient) -> Self {
        Self {
            backend,
            client,
            shared: Arc::new(Mutex::new(Shared {
                state: RecorderState::default(),
                error: None,
                transcript: None,
                clip: None,
                generation: 0,
            })),
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.shared.lock().unwrap().state
    }

    pub fn snapshot(&self) -> RecorderSnapshot {
        let shared = self.shared.lock().unwrap();
        RecorderSnapshot {
            state: shared.state,
            error: shared.error.clone(),
            transcript: shared.transcript.clone(),
            clip: shared.clip.as_ref().map(|clip| ClipInfo {
                path: clip.path().to_path_buf(),
                mime_type: clip.mime_type(),
                size_bytes: clip.size_bytes(),
            }),
        }
    }

    /// Begin a new recording. No-op unless idle, done or errored.
    ///
    /// Previous results are cleared (and the previous clip's file removed)
    /// before the microphone is requested, so a failed start still leaves
    /// a clean slate behind the error.
    pub async fn start(&mut self) {
        if !self.state().can_start() {
            return;
        }
        let stale_clip = {
            let mut shared = self.shared.lock().unwrap();
            shared.error = None;
            shared.transcript = None;
            shared.generation += 1;
            shared.clip.take()
        };
        if let Some(clip) = stale_clip {
            clip.release();
        }

        match self.begin_capture().await {
            Ok(()) => self.set_state(RecorderState::Recording),
            Err(err) => self.fail(err),
        }
    }

    async fn begin_capture(&mut self) -> Result<(), RecorderError> {
        self.backend.request_input().await?;
        let encoding = negotiate(|candidate| self.backend.is_encoding_supported(candidate))
            .ok_or_else(|| RecorderError::BackendError(NO_ENCODING_MSG.to_string()))?;
        crate::verbose!(
            "starting {} capture with encoding {encoding}",
            self.backend.name()
        );
        let mut chunk_rx = self.backend.start(encoding).await?;

        let sink = Arc::new(Mutex::new(Sink::default()));
        let accumulator = Arc::clone(&sink);
        let pump = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                // Empty chunks carry no audio and produce no append
                if chunk.is_empty() {
                    continue;
                }
                let mut sink = accumulator.lock().unwrap();
                sink.data.extend_from_slice(&chunk.bytes);
                sink.chunks += 1;
            }
        });

        self.session = Some(ActiveSession {
            encoding,
            sink,
            pump,
        });
        Ok(())
    }

    /// End the current recording and hand the audio to the backend.
    /// No-op unless recording.
    ///
    /// By the time this returns the state is `Processing` (with a playable
    /// clip available) or `Error`; the upload itself continues in a
    /// spawned task and completes into the shared slot.
    pub async fn stop(&mut self) {
        if !self.state().can_stop() {
            return;
        }
        let Some(session) = self.session.take() else {
            return;
        };

        // Release the device and flush the encoder, then wait for the
        // pump so every in-flight chunk is appended before assembly.
        let stop_result = self.backend.stop().await;
        if let Err(e) = session.pump.await {
            crate::verbose!("chunk pump task failed: {e}");
        }
        if let Err(err) = stop_result {
            self.fail(err.into());
            return;
        }

        let (audio, chunk_count) = {
            let mut sink = session.sink.lock().unwrap();
            (std::mem::take(&mut sink.data), sink.chunks)
        };
        crate::verbose!(
            "assembled {} bytes from {chunk_count} chunk(s) as {}",
            audio.len(),
            session.encoding
        );

        let clip = match AudioClip::write(&audio, session.encoding) {
            Ok(clip) => clip,
            Err(e) => {
                self.fail(RecorderError::BackendError(format!(
                    "Failed to persist recording: {e:#}"
                )));
                return;
            }
        };

        let generation = {
            let mut shared = self.shared.lock().unwrap();
            shared.clip = Some(clip);
            shared.state = RecorderState::Processing;
            shared.generation
        };

        let client = self.client.clone();
        let shared = Arc::clone(&self.shared);
        let mime_type = session.encoding.mime_type();
        tokio::spawn(async move {
            let outcome = client.transcribe(audio, mime_type).await;
            let mut shared = shared.lock().unwrap();
            if shared.generation != generation {
                crate::verbose!("discarding superseded transcription result");
                return;
            }
            match outcome {
                Ok(result) => {
                    shared.transcript = Some(result);
                    shared.state = RecorderState::Done;
                }
                Err(err) => {
                    shared.error = Some(err.into());
                    shared.state = RecorderState::Error;
                }
            }
        });
    }

    /// Drop everything and return to idle, from any state.
    ///
    /// A live capture session is torn down without uploading; an in-flight
    /// upload keeps running but its result is superseded and discarded.
    pub async fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = self.backend.stop().await {
                crate::verbose!("capture teardown on reset failed: {e}");
            }
            // Chunks are being discarded, no need to let the pump drain
            session.pump.abort();
        }
        let stale_clip = {
            let mut shared = self.shared.lock().unwrap();
            shared.generation += 1;
            shared.error = None;
            shared.transcript = None;
            shared.state = RecorderState::Idle;
            shared.clip.take()
        };
        if let Some(clip) = stale_clip {
            clip.release();
        }
    }

    fn set_state(&self, state: RecorderState) {
        self.shared.lock().unwrap().state = state;
    }

    fn fail(&self, err: RecorderError) {
        let mut shared = self.shared.lock().unwrap();
        shared.error = Some(err);
        shared.state = RecorderState::Error;
    }
}
