//! Decoding through an external `ffmpeg` process.
//!
//! `ffmpeg` converts any input to raw signed 16-bit little-endian PCM on
//! stdout (`-f s16le`), already panned to one channel and resampled, so no
//! container parsing is needed on our side.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::frontend::{AudioError, AudioFrontend, PcmSignal};

/// Frontend backed by the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegFrontend {
    program: PathBuf,
    sample_rate: u32,
    channel: usize,
}

impl FfmpegFrontend {
    /// Find `ffmpeg` on `PATH`.
    ///
    /// # Errors
    ///
    /// [`AudioError::FrontendUnavailable`] when no executable is found.
    pub fn locate(sample_rate: u32, channel: usize) -> Result<Self, AudioError> {
        let program = which::which("ffmpeg").map_err(|e| {
            AudioError::FrontendUnavailable(format!(
                "ffmpeg is required to convert audio ({e})"
            ))
        })?;
        Ok(Self::with_program(program, sample_rate, channel))
    }

    /// Use an explicit executable path.
    pub fn with_program(program: impl Into<PathBuf>, sample_rate: u32, channel: usize) -> Self {
        Self {
            program: program.into(),
            sample_rate,
            channel,
        }
    }

    fn args(&self, input: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-i"]
            .into_iter()
            .map(std::ffi::OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        for a in [
            "-af".to_string(),
            format!("pan=mono|c0=c{}", self.channel),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-".to_string(),
        ] {
            args.push(a.into());
        }
        args
    }
}

/// Interpret raw `s16le` bytes as samples.  A trailing odd byte is dropped.
pub(crate) fn parse_s16le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32)
        .collect()
}

impl AudioFrontend for FfmpegFrontend {
    fn decode(&self, path: &Path) -> Result<PcmSignal, AudioError> {
        if !path.exists() {
            return Err(AudioError::NotFound(path.to_path_buf()));
        }

        let output = Command::new(&self.program)
            .args(self.args(path))
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AudioError::FrontendUnavailable(format!(
                    "{} could not be started",
                    self.program.display()
                )),
                _ => AudioError::Io {
                    path: path.to_path_buf(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            return Err(AudioError::Decode {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let samples = parse_s16le(&output.stdout);
        if samples.is_empty() {
            return Err(AudioError::Empty(path.to_path_buf()));
        }

        log::debug!(
            "ffmpeg: {} → {} samples @ {} Hz",
            path.display(),
            samples.len(),
            self.sample_rate
        );

        Ok(PcmSignal::new(self.sample_rate, samples))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
