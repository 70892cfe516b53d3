//! Backend health check.

use anyhow::Result;
use vocalize_core::config::Config;
use vocalize_core::{ApiError, TranscribeClient};

pub async fn run(config: &Config) -> Result<()> {
    let client = TranscribeClient::new(&config.backend_url)?;
    match client.health().await {
        Ok(health) => {
            println!("backend {}: {}", client.base_url(), health.status);
            Ok(())
        }
        Err(ApiError::Status { status, body }) => {
            eprintln!(
                "Error: backend {} returned HTTP {status}: {body}",
                client.base_url()
            );
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: backend {} is unreachable: {err}", client.base_url());
            eprintln!("\nStart the Vocalize backend and try again.");
            std::process::exit(1);
        }
    }
}
