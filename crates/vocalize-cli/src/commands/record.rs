//! The interactive record-and-transcribe loop.
//!
//! One keypress interface: Enter toggles between starting and stopping,
//! `c` copies the finished transcript, `x` clears the result, `q` quits.
//! The loop polls the recorder snapshot and prints a fresh status block on
//! every state change, so the transcript history stays in the scrollback.

use std::time::Duration;

use anyhow::Result;
use console::style;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use vocalize_core::config::Config;
use vocalize_core::{
    MicrophoneBackend, Recorder, RecorderSnapshot, RecorderState, TranscribeClient,
    TranscriptResult,
};

use crate::app::{self, say};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run(config: &Config, auto_copy: bool) -> Result<()> {
    app::ensure_ffmpeg_installed();

    let client = TranscribeClient::new(&config.backend_url)?;
    let backend = MicrophoneBackend::new(config.input_device.clone());
    let mut recorder = Recorder::new(backend, client);

    println!(
        "{} {}",
        style("Vocalize").bold(),
        style(format!("· local mode · backend {}", config.backend_url)).dim()
    );
    println!();

    let _raw = app::RawMode::enter()?;
    let mut last_state: Option<RecorderState> = None;

    loop {
        let snapshot = recorder.snapshot();
        if last_state != Some(snapshot.state) {
            render_transition(&snapshot);
            if snapshot.state == RecorderState::Done && auto_copy {
                copy_transcript(&snapshot);
            }
            last_state = Some(snapshot.state);
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => {
                let state = recorder.state();
                if state.can_stop() {
                    recorder.stop().await;
                } else if state.can_start() {
                    recorder.start().await;
                }
            }
            KeyCode::Char('c') => copy_transcript(&recorder.snapshot()),
            KeyCode::Char('x') => {
                if matches!(
                    recorder.state(),
                    RecorderState::Done | RecorderState::Error
                ) {
                    recorder.reset().await;
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => break,
            _ => {}
        }
    }

    // Releases the device if still recording and removes the temp clip
    recorder.reset().await;
    Ok(())
}

fn render_transition(snapshot: &RecorderSnapshot) {
    match snapshot.state {
        RecorderState::Idle => {
            say(format!(
                "{}  {}",
                style("●").dim(),
                style("Ready to record").bold()
            ));
            say(style("   Enter to start · q to quit").dim().to_string());
        }
        RecorderState::Recording => {
            say(format!(
                "{}  {}",
                style("●").red(),
                style("Recording...").bold()
            ));
            say(style("   Enter to stop · q to quit").dim().to_string());
        }
        RecorderState::Processing => {
            say(format!("{}  Transcribing...", style("●").cyan()));
            render_clip_line(snapshot);
        }
        RecorderState::Done => {
            say(format!(
                "{}  {}",
                style("●").green(),
                style("Transcription complete").bold()
            ));
            render_clip_line(snapshot);
            if let Some(transcript) = &snapshot.transcript {
                render_transcript(transcript);
            }
            say(style("   Enter to record again · c to copy · x to clear · q to quit")
                .dim()
                .to_string());
        }
        RecorderState::Error => {
            let message = snapshot
                .error
                .as_ref()
                .map(|e| e.message().to_string())
                .unwrap_or_else(|| "An error occurred".to_string());
            say(format!("{}  {}", style("●").red(), style(message).red()));
            say(style("   Enter to try again · q to quit").dim().to_string());
        }
    }
}

/// Where the finished recording can be played back from.
fn render_clip_line(snapshot: &RecorderSnapshot) {
    if let Some(clip) = &snapshot.clip {
        say(style(format!(
            "   clip: {} ({})",
            clip.path.display(),
            clip.mime_type
        ))
        .dim()
        .to_string());
    }
}

fn render_transcript(transcript: &TranscriptResult) {
    say("");
    if transcript.text.is_empty() {
        say(style("   (empty transcript)").dim().to_string());
    } else {
        for line in transcript.text.lines() {
            say(format!("   {line}"));
        }
    }
    say(style(format!(
        "   language {} · {:.1}s · {} on {}",
        transcript.language, transcript.duration_sec, transcript.model, transcript.device
    ))
    .dim()
    .to_string());
    say("");
}

/// Copy the finished transcript, if there is one worth copying.
fn copy_transcript(snapshot: &RecorderSnapshot) {
    if snapshot.state != RecorderState::Done {
        return;
    }
    let Some(transcript) = &snapshot.transcript else {
        return;
    };
    if transcript.text.is_empty() {
        say(style("Nothing to copy: transcript is empty").dim().to_string());
        return;
    }
    match vocalize_core::copy_to_clipboard(&transcript.text) {
        Ok(()) => say(style("Copied to clipboard").green().to_string()),
        Err(e) => say(style(format!("Copy failed: {e:#}")).red().to_string()),
    }
}
