//! Static demo panel shown when recording is disabled.
//!
//! Preview builds never construct a recorder or touch the microphone;
//! this is the whole mode.

use anyhow::Result;
use console::style;

/// Transcript sample shown in preview mode.
const EXAMPLE_TRANSCRIPT: &str = "This is an example of transcribed text. When running locally, Vocalize uses OpenAI's Whisper model to transcribe your audio entirely on your machine. No data is sent to any external servers.";

pub fn run() -> Result<()> {
    println!(
        "{} {}",
        style("Vocalize").bold(),
        style("· preview mode").yellow()
    );
    println!();
    println!("{}", style("Preview mode: recording disabled").yellow());
    println!("{}", style("Recording requires local setup.").bold());
    println!();
    println!("{}", style("Example output").dim());
    println!("{EXAMPLE_TRANSCRIPT}");
    println!();
    println!(
        "{}",
        style(
            "Run with --mode local (or VOCALIZE_MODE=local) next to a running backend to record for real."
        )
        .dim()
    );
    Ok(())
}
