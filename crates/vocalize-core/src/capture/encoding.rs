//! Audio encodings the recorder can negotiate with a capture backend.
//!
//! Each variant pairs a container with a codec. The preference order is
//! fixed: Opus-in-WebM first because the transcription backend handles it
//! best, MP4/AAC last as the compatibility fallback.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    /// `audio/webm;codecs=opus`
    OpusWebm,
    /// `audio/webm` with the container's default codec
    Webm,
    /// `audio/ogg;codecs=opus`
    OggOpus,
    /// `audio/mp4` (AAC)
    Mp4,
}

impl AudioEncoding {
    /// Candidate encodings in negotiation order, most preferred first.
    pub const PREFERRED: [AudioEncoding; 4] = [
        AudioEncoding::OpusWebm,
        AudioEncoding::Webm,
        AudioEncoding::OggOpus,
        AudioEncoding::Mp4,
    ];

    /// MIME type sent with the upload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm => "audio/webm;codecs=opus",
            AudioEncoding::Webm => "audio/webm",
            AudioEncoding::OggOpus => "audio/ogg;codecs=opus",
            AudioEncoding::Mp4 => "audio/mp4",
        }
    }

    /// Container format name, as FFmpeg muxers call it.
    pub fn container(&self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::Webm => "webm",
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::Mp4 => "mp4",
        }
    }

    /// Audio codec name, as FFmpeg encoders call it.
    pub fn codec(&self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::OggOpus => "libopus",
            AudioEncoding::Webm => "libvorbis",
            AudioEncoding::Mp4 => "aac",
        }
    }

    /// File extension for clip files.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::Webm => "webm",
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// Pick the first encoding in [`AudioEncoding::PREFERRED`] the backend
/// supports. `None` means no candidate works and recording cannot start.
pub fn negotiate<F>(is_supported: F) -> Option<AudioEncoding>
where
    F: Fn(AudioEncoding) -> bool,
{
    AudioEncoding::PREFERRED
        .into_iter()
        .find(|&encoding| is_supported(encoding))
}
