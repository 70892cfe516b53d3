//! Live microphone capture via cpal, encoded in-flight by FFmpeg.
//!
//! The cpal stream is built and owned by a dedicated thread because streams
//! must stay on the thread that created them on some platforms. Raw f32
//! samples flow over a channel to a feed thread that pipes them into
//! `ffmpeg`'s stdin; a pump thread reads encoded bytes off stdout and
//! forwards them as [`AudioChunk`]s. Stopping tears the pipeline down in
//! dependency order: stream first (this releases the device), then stdin,
//! then the child.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio::sync::mpsc;

use super::devices;
use super::ffmpeg;
use super::{AudioChunk, AudioEncoding, CaptureBackend, CaptureError};

const CHUNK_CHANNEL_CAPACITY: usize = 32;
const STREAM_START_TIMEOUT: Duration = Duration::from_secs(5);
const STDERR_TAIL_LINES: usize = 8;

/// Counter for input stream errors, reset per capture session.
/// ALSA in particular reports transient overruns that are non-fatal.
static STREAM_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

pub struct MicrophoneBackend {
    preferred_device: Option<String>,
    active: Option<ActiveCapture>,
}

/// Handles for one running capture pipeline.
///
/// Dropping this without [`teardown`] leaves the child unreaped until
/// process exit, but still shuts the pipeline down: the stop sender
/// disconnects (stream thread exits, device released), the sample channel
/// disconnects (feed thread closes stdin), and ffmpeg exits on EOF.
struct ActiveCapture {
    stop_tx: Sender<()>,
    stream_thread: JoinHandle<()>,
    feed_thread: JoinHandle<Result<(), String>>,
    pump_thread: JoinHandle<()>,
    stderr_thread: JoinHandle<()>,
    stderr_tail: Arc<Mutex<Vec<String>>>,
    child: Child,
}

#[derive(Debug, Clone, Copy)]
struct SampleSpec {
    sample_rate: u32,
    channels: u16,
}

impl MicrophoneBackend {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self {
            preferred_device,
            active: None,
        }
    }
}

#[async_trait]
impl CaptureBackend for MicrophoneBackend {
    fn name(&self) -> &str {
        "microphone"
    }

    async fn request_input(&mut self) -> Result<(), CaptureError> {
        let preferred = self.preferred_device.clone();
        let description = tokio::task::spawn_blocking(move || probe_input(preferred.as_deref()))
            .await
            .map_err(|e| CaptureError::Backend(format!("device probe task failed: {e}")))??;
        crate::verbose!("capturing from input device: {description}");
        Ok(())
    }

    fn is_encoding_supported(&self, encoding: AudioEncoding) -> bool {
        ffmpeg::encoding_supported(encoding)
    }

    async fn start(
        &mut self,
        encoding: AudioEncoding,
    ) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::Backend("capture already active".to_string()));
        }
        let preferred = self.preferred_device.clone();
        let (capture, chunks) =
            tokio::task::spawn_blocking(move || begin_capture(preferred, encoding))
                .await
                .map_err(|e| CaptureError::Backend(format!("capture startup task failed: {e}")))??;
        self.active = Some(capture);
        Ok(chunks)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || teardown(active))
            .await
            .map_err(|e| CaptureError::Backend(format!("capture teardown task failed: {e}")))?
    }

    fn is_capturing(&self) -> bool {
        self.active.is_some()
    }
}

/// Resolve the input device and make sure it has a usable default config.
/// This is the getUserMedia moment: permission and presence failures
/// surface here, before any encoder work.
fn probe_input(preferred: Option<&str>) -> Result<String, CaptureError> {
    if !ffmpeg::is_available() {
        crate::verbose!("ffmpeg not found on PATH; no encoding will be available");
    }
    let device = devices::resolve_input_device(preferred)?;
    device
        .default_input_config()
        .map_err(classify_config_error)?;
    Ok(device
        .description()
        .map(|d| d.to_string())
        .unwrap_or_else(|_| "unknown".to_string()))
}

fn begin_capture(
    preferred: Option<String>,
    encoding: AudioEncoding,
) -> Result<(ActiveCapture, mpsc::Receiver<AudioChunk>), CaptureError> {
    STREAM_ERROR_COUNT.store(0, Ordering::Relaxed);

    let (samples_tx, samples_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
    let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

    let stream_thread = thread::spawn(move || run_stream(preferred, samples_tx, ready_tx, stop_rx));

    let spec = match ready_rx.recv_timeout(STREAM_START_TIMEOUT) {
        Ok(Ok(spec)) => spec,
        Ok(Err(e)) => {
            let _ = stream_thread.join();
            return Err(e);
        }
        Err(RecvTimeoutError::Disconnected) => {
            let _ = stream_thread.join();
            return Err(CaptureError::Backend(
                "capture thread terminated unexpectedly".to_string(),
            ));
        }
        Err(RecvTimeoutError::Timeout) => {
            // The thread is stuck inside the audio host; leave it behind
            // rather than block here forever
            return Err(CaptureError::Backend(
                "input stream did not start in time".to_string(),
            ));
        }
    };
    crate::verbose!(
        "input stream running at {} Hz, {} channel(s), encoding {encoding}",
        spec.sample_rate,
        spec.channels
    );

    let mut child = match ffmpeg::spawn_encoder(encoding, spec.sample_rate, spec.channels) {
        Ok(child) => child,
        Err(e) => {
            let _ = stop_tx.send(());
            let _ = stream_thread.join();
            return Err(e);
        }
    };
    let (Some(stdin), Some(stdout), Some(stderr)) = (
        child.stdin.take(),
        child.stdout.take(),
        child.stderr.take(),
    ) else {
        let _ = child.kill();
        let _ = child.wait();
        let _ = stop_tx.send(());
        let _ = stream_thread.join();
        return Err(CaptureError::Encoder("ffmpeg pipes unavailable".to_string()));
    };

    let feed_thread = thread::spawn(move || feed_encoder(samples_rx, stdin));

    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
    let pump_thread = thread::spawn(move || pump_encoded(stdout, chunk_tx));

    let stderr_tail = Arc::new(Mutex::new(Vec::new()));
    let tail = Arc::clone(&stderr_tail);
    let stderr_thread = thread::spawn(move || collect_stderr(stderr, tail));

    Ok((
        ActiveCapture {
            stop_tx,
            stream_thread,
            feed_thread,
            pump_thread,
            stderr_thread,
            stderr_tail,
            child,
        },
        chunk_rx,
    ))
}

/// Shut the pipeline down in dependency order and reap the child.
fn teardown(active: ActiveCapture) -> Result<(), CaptureError> {
    let ActiveCapture {
        stop_tx,
        stream_thread,
        feed_thread,
        pump_thread,
        stderr_thread,
        stderr_tail,
        mut child,
    } = active;

    // Stop the stream first so the device is released immediately; the
    // sample channel disconnects with it, which ends the feed thread and
    // closes ffmpeg's stdin.
    let _ = stop_tx.send(());
    if stream_thread.join().is_err() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(CaptureError::Backend("capture thread panicked".to_string()));
    }
    let feed_result = match feed_thread.join() {
        Ok(result) => result,
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CaptureError::Encoder(
                "encoder feed thread panicked".to_string(),
            ));
        }
    };

    // stdin is closed; ffmpeg flushes, writes the container trailer and
    // exits. The pump thread keeps draining stdout until EOF, so waiting
    // here cannot deadlock.
    let status = child
        .wait()
        .map_err(|e| CaptureError::Encoder(format!("failed to wait for ffmpeg: {e}")))?;
    let _ = pump_thread.join();
    let _ = stderr_thread.join();

    if !status.success() {
        let tail = stderr_tail.lock().unwrap().join("; ");
        return Err(CaptureError::Encoder(if tail.is_empty() {
            format!("ffmpeg exited with {status}")
        } else {
            format!("ffmpeg exited with {status}: {tail}")
        }));
    }
    if let Err(msg) = feed_result {
        // ffmpeg exited cleanly despite the broken feed; keep what we got
        crate::verbose!("encoder feed ended early: {msg}");
    }
    let errors = STREAM_ERROR_COUNT.load(Ordering::Relaxed);
    if errors > 0 {
        crate::verbose!("input stream reported {errors} non-fatal error(s) this session");
    }
    Ok(())
}

/// Body of the stream-owning thread. Builds and plays the input stream,
/// reports readiness, then parks until told to stop. Dropping the stream
/// is what releases the microphone.
fn run_stream(
    preferred: Option<String>,
    samples_tx: Sender<Vec<f32>>,
    ready_tx: Sender<Result<SampleSpec, CaptureError>>,
    stop_rx: Receiver<()>,
) {
    let setup = (|| {
        let device = devices::resolve_input_device(preferred.as_deref())?;
        let supported = device
            .default_input_config()
            .map_err(classify_config_error)?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let spec = SampleSpec {
            sample_rate: config.sample_rate,
            channels: config.channels,
        };
        let stream = match sample_format {
            SampleFormat::F32 => build_input_stream::<f32>(&device, &config, samples_tx.clone()),
            SampleFormat::I16 => build_input_stream::<i16>(&device, &config, samples_tx.clone()),
            SampleFormat::U16 => build_input_stream::<u16>(&device, &config, samples_tx.clone()),
            other => {
                return Err(CaptureError::Backend(format!(
                    "unsupported sample format {other:?}"
                )));
            }
        }
        .map_err(classify_build_error)?;
        stream
            .play()
            .map_err(|e| CaptureError::Backend(format!("failed to start input stream: {e}")))?;
        Ok((stream, spec))
    })();

    match setup {
        Ok((stream, spec)) => {
            let _ = ready_tx.send(Ok(spec));
            // Runs until stop is signalled or the backend is dropped
            let _ = stop_rx.recv();
            drop(stream);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

fn build_input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    tx: Sender<Vec<f32>>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    // Rate-limited handler: ALSA overruns are common and non-fatal
    let err_fn = |err| {
        let count = STREAM_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
        if count == 0 {
            crate::verbose!("audio stream error (non-fatal): {err}");
        }
    };

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<f32> = data.iter().map(|&s| cpal::Sample::from_sample(s)).collect();
            if !samples.is_empty() {
                // Unbounded channel: never blocks the audio thread
                let _ = tx.send(samples);
            }
        },
        err_fn,
        None,
    )
}

/// Feed raw samples into ffmpeg as little-endian f32 PCM. Returns once the
/// sample channel disconnects; dropping stdin at the end signals EOF.
fn feed_encoder(samples_rx: Receiver<Vec<f32>>, mut stdin: ChildStdin) -> Result<(), String> {
    let mut buf = Vec::new();
    while let Ok(samples) = samples_rx.recv() {
        buf.clear();
        buf.reserve(samples.len() * 4);
        for sample in &samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        if let Err(e) = stdin.write_all(&buf) {
            return Err(format!("failed to feed encoder: {e}"));
        }
    }
    stdin
        .flush()
        .map_err(|e| format!("failed to flush encoder input: {e}"))
}

/// Forward encoded bytes from ffmpeg's stdout as chunks. Keeps draining
/// after the receiver goes away so ffmpeg never blocks on a full pipe.
fn pump_encoded(mut stdout: ChildStdout, tx: mpsc::Sender<AudioChunk>) {
    let mut buf = [0u8; 4096];
    let mut forwarding = true;
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if forwarding && tx.blocking_send(AudioChunk::new(buf[..n].to_vec())).is_err() {
                    forwarding = false;
                }
            }
            Err(e) => {
                crate::verbose!("encoder output read error: {e}");
                break;
            }
        }
    }
}

fn collect_stderr(stderr: ChildStderr, tail: Arc<Mutex<Vec<String>>>) {
    let reader = BufReader::new(stderr);
    for line in reader.lines().map_while(Result::ok) {
        crate::verbose!("ffmpeg: {line}");
        let mut tail = tail.lock().unwrap();
        if tail.len() == STDERR_TAIL_LINES {
            tail.remove(0);
        }
        tail.push(line);
    }
}

fn classify_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        other => classify_message(other.to_string()),
    }
}

fn classify_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        other => classify_message(other.to_string()),
    }
}

/// cpal has no portable permission error, so fall back to matching the
/// host's message text.
fn classify_message(msg: String) -> CaptureError {
    let lowered = msg.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not permitted")
    {
        CaptureError::PermissionDenied(msg)
    } else {
        CaptureError::Backend(msg)
    }
}
