//! Playable clip handle backed by a temp file.
//!
//! The assembled recording is written to a named temp file so any local
//! player can open it. The handle owns the file: dropping it (or calling
//! [`AudioClip::release`]) removes the file from disk, mirroring how an
//! object URL is revoked once nothing references it.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::capture::AudioEncoding;

pub struct AudioClip {
    file: NamedTempFile,
    mime_type: &'static str,
    size_bytes: u64,
}

impl AudioClip {
    /// Persist `bytes` as a playable file in the given encoding.
    pub(crate) fn write(bytes: &[u8], encoding: AudioEncoding) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("vocalize-")
            .suffix(&format!(".{}", encoding.extension()))
            .tempfile()
            .context("Failed to create clip file")?;
        file.write_all(bytes).context("Failed to write clip file")?;
        file.flush().context("Failed to flush clip file")?;
        Ok(Self {
            file,
            mime_type: encoding.mime_type(),
            size_bytes: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Remove the backing file now instead of waiting for drop.
    pub fn release(self) {
        if let Err(e) = self.file.close() {
            crate::verbose!("failed to remove clip file: {e}");
        }
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("path", &self.file.path())
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}
