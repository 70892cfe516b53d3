//! Terminal plumbing for the interactive recorder.

use std::io::Write;

use anyhow::Result;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Raw-mode guard: restores the terminal on drop, early return included.
pub struct RawMode;

impl RawMode {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Print one line while the terminal is in raw mode. Raw mode turns off
/// the usual `\n` to `\r\n` translation, so it is done by hand here.
pub fn say(line: impl AsRef<str>) {
    print!("{}\r\n", line.as_ref());
    let _ = std::io::stdout().flush();
}

pub fn ensure_ffmpeg_installed() {
    if std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .is_err()
    {
        eprintln!("Error: FFmpeg is not installed or not in PATH.");
        eprintln!("\nvocalize encodes microphone audio with FFmpeg.");
        eprintln!("Please install it:");
        eprintln!("  - Ubuntu/Debian: sudo apt install ffmpeg");
        eprintln!("  - macOS: brew install ffmpeg");
        eprintln!("  - Or visit: https://ffmpeg.org/download.html\n");
        std::process::exit(1);
    }
}
