//! Startup configuration read from the environment.
//!
//! Vocalize runs in one of two modes: `preview` renders a static demo panel
//! and never touches the microphone, `local` records for real against a
//! locally running transcription backend.

use std::env;
use std::fmt;
use std::str::FromStr;

/// Backend base URL used when `VOCALIZE_BACKEND_URL` is unset.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

pub const MODE_ENV: &str = "VOCALIZE_MODE";
pub const BACKEND_URL_ENV: &str = "VOCALIZE_BACKEND_URL";
pub const INPUT_DEVICE_ENV: &str = "VOCALIZE_INPUT_DEVICE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Static demo: recording controls disabled, example transcript shown
    Preview,
    /// Live recording against a local backend
    #[default]
    Local,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Preview => "preview",
            AppMode::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "preview" => Ok(AppMode::Preview),
            "local" => Ok(AppMode::Local),
            _ => Err(format!("Unknown mode: {s}. Available: preview, local")),
        }
    }
}

impl FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppMode::parse(s)
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: AppMode,
    pub backend_url: String,
    /// Preferred input device description; `None` means system default
    pub input_device: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: AppMode::default(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            input_device: None,
        }
    }
}

impl Config {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// An unrecognized `VOCALIZE_MODE` falls back to `local` rather than
    /// failing startup; the bad value is reported in verbose output.
    pub fn from_env() -> Self {
        let mode = match env::var(MODE_ENV) {
            Ok(raw) => AppMode::parse(&raw).unwrap_or_else(|err| {
                crate::verbose!("{MODE_ENV}: {err}");
                AppMode::default()
            }),
            Err(_) => AppMode::default(),
        };
        let backend_url =
            env::var(BACKEND_URL_ENV).unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        let input_device = env::var(INPUT_DEVICE_ENV).ok().filter(|v| !v.is_empty());

        Self {
            mode,
            backend_url,
            input_device,
        }
    }

    pub fn is_preview(&self) -> bool {
        self.mode == AppMode::Preview
    }
}
