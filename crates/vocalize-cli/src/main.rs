//! Vocalize: record a voice note in the terminal, get a transcript back.

mod app;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use vocalize_core::config::{AppMode, Config};

#[derive(Parser)]
#[command(
    name = "vocalize",
    version,
    about = "Record your voice and transcribe it with a local Whisper backend"
)]
struct Cli {
    /// Transcription backend base URL (default: $VOCALIZE_BACKEND_URL or http://localhost:8000)
    #[arg(long)]
    backend_url: Option<String>,

    /// Run mode: "local" records for real, "preview" renders the static demo
    #[arg(long, value_parser = AppMode::parse)]
    mode: Option<AppMode>,

    /// Capture from this input device instead of the system default
    #[arg(long)]
    device: Option<String>,

    /// Copy the transcript to the clipboard as soon as it arrives
    #[arg(long)]
    copy: bool,

    /// Print capture and upload diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List audio input devices
    Devices,
    /// Check that the transcription backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    vocalize_core::set_verbose(cli.verbose);

    let mut config = Config::from_env();
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(device) = cli.device {
        config.input_device = Some(device);
    }

    match cli.command {
        Some(Command::Devices) => commands::devices::run(),
        Some(Command::Health) => commands::health::run(&config).await,
        None => match config.mode {
            AppMode::Preview => commands::preview::run(),
            AppMode::Local => commands::record::run(&config, cli.copy).await,
        },
    }
}
