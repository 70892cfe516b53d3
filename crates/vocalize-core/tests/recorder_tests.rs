//! End-to-end recorder behavior against a scripted capture backend and an
//! in-process transcription backend.

mod common;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use common::{Reply, TestBackend, transcript_json};
use vocalize_core::{
    AudioChunk, AudioEncoding, CaptureBackend, CaptureError, Recorder, RecorderErrorKind,
    RecorderState, TranscribeClient,
};

/// Capture backend that plays back scripted chunks instead of recording.
struct MockCaptureBackend {
    supported: Vec<AudioEncoding>,
    scripted: Vec<Vec<u8>>,
    input_error: Option<CaptureError>,
    live_tx: Option<mpsc::Sender<AudioChunk>>,
    capturing: bool,
}

impl MockCaptureBackend {
    fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            supported: AudioEncoding::PREFERRED.to_vec(),
            scripted: chunks,
            input_error: None,
            live_tx: None,
            capturing: false,
        }
    }

    fn supporting(mut self, supported: Vec<AudioEncoding>) -> Self {
        self.supported = supported;
        self
    }

    fn failing_input(mut self, err: CaptureError) -> Self {
        self.input_error = Some(err);
        self
    }
}

#[async_trait]
impl CaptureBackend for MockCaptureBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request_input(&mut self) -> Result<(), CaptureError> {
        match self.input_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_encoding_supported(&self, encoding: AudioEncoding) -> bool {
        self.supported.contains(&encoding)
    }

    async fn start(
        &mut self,
        _encoding: AudioEncoding,
    ) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        let (tx, rx) = mpsc::channel(self.scripted.len().max(1) + 1);
        for bytes in self.scripted.clone() {
            tx.send(AudioChunk::new(bytes)).await.expect("scripted chunk");
        }
        // Keep the sender alive until stop so the stream stays open
        self.live_tx = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.live_tx = None;
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }
}

fn recorder_against(
    backend: MockCaptureBackend,
    url: &str,
) -> Recorder<MockCaptureBackend> {
    let client = TranscribeClient::new(url).expect("client");
    Recorder::new(backend, client)
}

async fn wait_for_state(recorder: &Recorder<MockCaptureBackend>, want: RecorderState) {
    for _ in 0..200 {
        if recorder.state() == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("recorder never reached {want}, stuck in {}", recorder.state());
}

#[tokio::test]
async fn full_cycle_assembles_chunks_in_arrival_order() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("hello"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![
        b"RIFF".to_vec(),
        Vec::new(), // empty chunks must contribute nothing
        b"midsection".to_vec(),
        b"tail".to_vec(),
    ]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;

    let snapshot = recorder.snapshot();
    let clip = snapshot.clip.expect("clip after stop");
    let on_disk = std::fs::read(&clip.path).expect("clip readable");
    assert_eq!(on_disk, b"RIFFmidsectiontail");

    let upload = backend.last_upload().expect("backend saw the upload");
    assert_eq!(upload.field, "file");
    assert_eq!(upload.file_name, "recording.webm");
    assert_eq!(upload.content_type, "audio/webm;codecs=opus");
    assert_eq!(upload.bytes, b"RIFFmidsectiontail");
}

#[tokio::test]
async fn transcript_text_is_stored_verbatim() {
    let text = "  exactly what came back, spaces included  ";
    let backend = TestBackend::spawn(Reply::Json(transcript_json(text))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;

    let snapshot = recorder.snapshot();
    let transcript = snapshot.transcript.expect("transcript");
    assert_eq!(transcript.text, text);
    assert_eq!(transcript.language, "en");
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn stop_when_idle_is_a_noop() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("unused"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.stop().await;

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Idle);
    assert!(snapshot.error.is_none());
    assert!(snapshot.transcript.is_none());
    assert!(snapshot.clip.is_none());
    assert!(backend.uploads().is_empty());
}

#[tokio::test]
async fn start_while_recording_is_a_noop() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("once"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"only-once".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    assert_eq!(recorder.state(), RecorderState::Recording);
    recorder.start().await;
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;

    assert_eq!(backend.uploads().len(), 1);
    assert_eq!(backend.last_upload().unwrap().bytes, b"only-once");
}

#[tokio::test]
async fn backend_failure_surfaces_status_and_body() {
    let backend = TestBackend::spawn(Reply::Status(500, "model overloaded".to_string())).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Error).await;

    let snapshot = recorder.snapshot();
    let error = snapshot.error.expect("error recorded");
    assert_eq!(error.kind(), RecorderErrorKind::BackendError);
    assert!(error.message().contains("500"), "got: {}", error.message());
    assert!(
        error.message().contains("model overloaded"),
        "got: {}",
        error.message()
    );
    assert!(snapshot.transcript.is_none());
}

#[tokio::test]
async fn unreachable_backend_maps_to_upload_failed() {
    // Grab a port that nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &format!("http://{addr}"));

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Error).await;

    let error = recorder.snapshot().error.expect("error recorded");
    assert_eq!(error.kind(), RecorderErrorKind::UploadFailed);
}

#[tokio::test]
async fn permission_denial_stops_start_cold() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("unused"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()])
        .failing_input(CaptureError::PermissionDenied("portal refused".to_string()));
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Error);
    let error = snapshot.error.expect("error recorded");
    assert_eq!(error.kind(), RecorderErrorKind::MicPermission);
    assert_eq!(error.message(), "Microphone permission denied");
    assert!(backend.uploads().is_empty());
}

#[tokio::test]
async fn missing_microphone_maps_to_mic_not_found() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("unused"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()])
        .failing_input(CaptureError::DeviceNotFound);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;

    let error = recorder.snapshot().error.expect("error recorded");
    assert_eq!(error.kind(), RecorderErrorKind::MicNotFound);
    assert_eq!(error.message(), "No microphone found");
}

#[tokio::test]
async fn no_supported_encoding_fails_before_capture() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("unused"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]).supporting(Vec::new());
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Error);
    let error = snapshot.error.expect("error recorded");
    assert_eq!(error.kind(), RecorderErrorKind::BackendError);
    assert_eq!(error.message(), "No supported audio format found");
    assert!(backend.uploads().is_empty());
}

#[tokio::test]
async fn negotiation_walks_the_preference_list_in_order() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("ogg this time"))).await;
    // Only the two least-preferred candidates are available; the earlier
    // of them in the preference list must win
    let mock = MockCaptureBackend::with_chunks(vec![b"OggS".to_vec()])
        .supporting(vec![AudioEncoding::Mp4, AudioEncoding::OggOpus]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;

    let clip = recorder.snapshot().clip.expect("clip");
    assert_eq!(clip.mime_type, "audio/ogg;codecs=opus");
    assert!(clip.path.extension().is_some_and(|ext| ext == "ogg"));
    assert_eq!(
        backend.last_upload().unwrap().content_type,
        "audio/ogg;codecs=opus"
    );
}

#[tokio::test]
async fn reset_clears_results_and_removes_the_clip() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("to be cleared"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;
    let clip_path = recorder.snapshot().clip.expect("clip").path;
    assert!(clip_path.exists());

    recorder.reset().await;

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Idle);
    assert!(snapshot.error.is_none());
    assert!(snapshot.transcript.is_none());
    assert!(snapshot.clip.is_none());
    assert!(!clip_path.exists(), "clip file must be removed on reset");
}

#[tokio::test]
async fn reset_during_processing_discards_the_late_result() {
    let backend = TestBackend::spawn(Reply::DelayedJson(
        Duration::from_millis(300),
        transcript_json("too late"),
    ))
    .await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    recorder.stop().await;

    // Upload still in flight: processing, with a playable clip already out
    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Processing);
    assert!(snapshot.clip.is_some());

    recorder.reset().await;
    assert_eq!(recorder.state(), RecorderState::Idle);

    // Give the delayed response ample time to land
    tokio::time::sleep(Duration::from_millis(600)).await;
    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Idle);
    assert!(snapshot.transcript.is_none());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn reset_during_recording_discards_without_uploading() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("never sent"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    assert_eq!(recorder.state(), RecorderState::Recording);

    recorder.reset().await;

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Idle);
    assert!(snapshot.clip.is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(backend.uploads().is_empty(), "reset must not upload");
}

#[tokio::test]
async fn starting_again_supersedes_the_previous_clip() {
    let backend = TestBackend::spawn(Reply::Json(transcript_json("take two"))).await;
    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &backend.url);

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;
    let first_clip = recorder.snapshot().clip.expect("first clip").path;
    assert!(first_clip.exists());

    recorder.start().await;
    assert_eq!(recorder.state(), RecorderState::Recording);
    assert!(
        !first_clip.exists(),
        "previous clip must be removed when a new recording starts"
    );
    assert!(recorder.snapshot().clip.is_none());

    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Done).await;
    let second_clip = recorder.snapshot().clip.expect("second clip").path;
    assert_ne!(second_clip, first_clip);
    assert!(second_clip.exists());
}

#[tokio::test]
async fn starting_after_an_error_clears_it() {
    // Point at a dead port to force an upload failure first
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mock = MockCaptureBackend::with_chunks(vec![b"audio".to_vec()]);
    let mut recorder = recorder_against(mock, &format!("http://{addr}"));

    recorder.start().await;
    recorder.stop().await;
    wait_for_state(&recorder, RecorderState::Error).await;

    recorder.start().await;

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.state, RecorderState::Recording);
    assert!(snapshot.error.is_none(), "starting anew must clear the error");
    assert!(snapshot.transcript.is_none());
}
