//! FFmpeg integration: capability probing and encoder process setup.
//!
//! Capture produces raw f32 PCM; an `ffmpeg` child turns that into the
//! negotiated container in real time, reading PCM on stdin and emitting
//! encoded bytes on stdout. Which encodings are available depends on how
//! the installed FFmpeg was built, so support is probed once per process
//! from `ffmpeg -encoders` / `ffmpeg -muxers`.

use std::process::{Child, Command, Stdio};

use once_cell::sync::Lazy;

use super::AudioEncoding;
use super::CaptureError;

struct FfmpegCaps {
    encoders: String,
    muxers: String,
}

static FFMPEG_CAPS: Lazy<Option<FfmpegCaps>> = Lazy::new(probe_caps);

fn probe_caps() -> Option<FfmpegCaps> {
    let encoders = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .ok()?;
    let muxers = Command::new("ffmpeg")
        .args(["-hide_banner", "-muxers"])
        .output()
        .ok()?;
    if !encoders.status.success() || !muxers.status.success() {
        return None;
    }
    Some(FfmpegCaps {
        encoders: String::from_utf8_lossy(&encoders.stdout).into_owned(),
        muxers: String::from_utf8_lossy(&muxers.stdout).into_owned(),
    })
}

/// Whether FFmpeg is present at all.
pub(crate) fn is_available() -> bool {
    FFMPEG_CAPS.is_some()
}

/// Whether the installed FFmpeg can produce `encoding`.
pub(crate) fn encoding_supported(encoding: AudioEncoding) -> bool {
    match FFMPEG_CAPS.as_ref() {
        Some(caps) => {
            lists_component(&caps.encoders, encoding.codec())
                && lists_component(&caps.muxers, encoding.container())
        }
        None => false,
    }
}

/// Parse an `ffmpeg -encoders` / `-muxers` table: each entry line has a
/// flags column followed by the component name (comma-separated aliases
/// for some muxers).
fn lists_component(table: &str, name: &str) -> bool {
    table.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|entry| entry.split(',').any(|alias| alias == name))
    })
}

/// Spawn an FFmpeg child encoding raw f32le PCM from stdin into the given
/// container on stdout.
pub(crate) fn spawn_encoder(
    encoding: AudioEncoding,
    sample_rate: u32,
    channels: u16,
) -> Result<Child, CaptureError> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error"])
        .args(["-f", "f32le"])
        .args(["-ar", &sample_rate.to_string()])
        .args(["-ac", &channels.to_string()])
        .args(["-i", "pipe:0"])
        .args(["-c:a", encoding.codec()]);

    match encoding {
        // libopus only accepts 48k/24k/16k/12k/8k input, so resample on
        // the way out
        AudioEncoding::OpusWebm | AudioEncoding::OggOpus => {
            cmd.args(["-ar", "48000"]);
        }
        // mp4 normally writes its index at the end of a seekable file,
        // which a pipe is not; fragmented output keeps it streamable
        AudioEncoding::Mp4 => {
            cmd.args(["-movflags", "frag_keyframe+empty_moov"]);
        }
        AudioEncoding::Webm => {}
    }

    cmd.args(["-f", encoding.container(), "pipe:1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    cmd.spawn()
        .map_err(|e| CaptureError::Encoder(format!("failed to spawn ffmpeg: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODERS_TABLE: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D a64multi             Multicolor charset for Commodore 64
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus (codec opus)
 A....D libvorbis            libvorbis (codec vorbis)
";

    const MUXERS_TABLE: &str = "\
Muxers:
 E = Muxing supported
 ---
  E 3g2             3GP2 (3GPP2 file format)
  E matroska,webm   Matroska / WebM
  E mp4             MP4 (MPEG-4 Part 14)
  E ogg             Ogg
";

    #[test]
    fn finds_components_in_tables() {
        assert!(lists_component(ENCODERS_TABLE, "aac"));
        assert!(lists_component(ENCODERS_TABLE, "libopus"));
        assert!(!lists_component(ENCODERS_TABLE, "flac"));
    }

    #[test]
    fn resolves_comma_separated_muxer_aliases() {
        assert!(lists_component(MUXERS_TABLE, "webm"));
        assert!(lists_component(MUXERS_TABLE, "matroska"));
        assert!(lists_component(MUXERS_TABLE, "ogg"));
        assert!(!lists_component(MUXERS_TABLE, "wav"));
    }

    #[test]
    fn description_words_do_not_count_as_components() {
        // "opus" appears in the libopus description but is not an entry name
        assert!(!lists_component(ENCODERS_TABLE, "opus"));
        assert!(!lists_component(MUXERS_TABLE, "Matroska"));
    }
}
