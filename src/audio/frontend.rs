//! Audio front-end trait and shared types.
//!
//! # Overview
//!
//! [`AudioFrontend`] turns a file path into a [`PcmSignal`]: one channel,
//! fixed sample rate, samples on the signed 16-bit scale.  It is object-safe
//! and `Send + Sync` so it can be held behind an `Arc<dyn AudioFrontend>`
//! and shared by every batch worker.
//!
//! Two implementations exist:
//!
//! * [`SymphoniaFrontend`](super::SymphoniaFrontend) decodes in-process.
//! * [`FfmpegFrontend`](super::FfmpegFrontend) shells out to `ffmpeg`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{FfmpegFrontend, SymphoniaFrontend};

/// Sample rate every signal is normalised to before feature extraction.
pub const TARGET_SAMPLE_RATE: u32 = 8_000;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// All errors that can arise while decoding a target or golden file.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The input file does not exist.
    #[error("no such file: {}", .0.display())]
    NotFound(PathBuf),

    /// The decoding collaborator (e.g. the `ffmpeg` executable) is missing.
    #[error("audio decoder unavailable: {0}")]
    FrontendUnavailable(String),

    /// The container or codec could not be decoded.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The requested channel does not exist in the source.
    #[error("channel {requested} requested but {} has only {available}", path.display())]
    MissingChannel {
        path: PathBuf,
        requested: usize,
        available: usize,
    },

    /// Decoding succeeded but produced no samples.
    #[error("{} contains no audio samples", .0.display())]
    Empty(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AudioError {
    /// `true` when the failure is the missing collaborator rather than the
    /// input file itself.
    pub fn is_frontend_unavailable(&self) -> bool {
        matches!(self, AudioError::FrontendUnavailable(_))
    }
}

// ---------------------------------------------------------------------------
// PcmSignal
// ---------------------------------------------------------------------------

/// Mono PCM samples at a known rate, on the signed 16-bit scale
/// (`-32768.0 ..= 32767.0`).
#[derive(Debug, Clone, PartialEq)]
pub struct PcmSignal {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl PcmSignal {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// AudioFrontend trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for audio decoders.
///
/// # Contract
///
/// - The returned signal is mono at the frontend's configured rate.
/// - A missing file is [`AudioError::NotFound`]; a missing decoder is
///   [`AudioError::FrontendUnavailable`].
pub trait AudioFrontend: Send + Sync {
    fn decode(&self, path: &Path) -> Result<PcmSignal, AudioError>;
}

// Compile-time assertion: Box<dyn AudioFrontend> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioFrontend>) {}
};

/// Selects which [`AudioFrontend`] implementation decodes files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderBackend {
    /// In-process decoding with symphonia.
    #[default]
    Symphonia,
    /// External `ffmpeg` executable found on `PATH`.
    Ffmpeg,
}

impl std::str::FromStr for DecoderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "symphonia" => Ok(Self::Symphonia),
            "ffmpeg" => Ok(Self::Ffmpeg),
            other => Err(format!("unknown decoder '{other}' (expected symphonia or ffmpeg)")),
        }
    }
}

/// Build the frontend selected by `backend`.
///
/// # Errors
///
/// [`AudioError::FrontendUnavailable`] when `backend` is
/// [`DecoderBackend::Ffmpeg`] and no `ffmpeg` executable can be found.
pub fn frontend_for(
    backend: DecoderBackend,
    sample_rate: u32,
    channel: usize,
) -> Result<Arc<dyn AudioFrontend>, AudioError> {
    Ok(match backend {
        DecoderBackend::Symphonia => Arc::new(SymphoniaFrontend::new(sample_rate, channel)),
        DecoderBackend::Ffmpeg => Arc::new(FfmpegFrontend::locate(sample_rate, channel)?),
    })
}

// ---------------------------------------------------------------------------
// MockFrontend  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a fixed signal for any existing path.
#[cfg(test)]
pub struct MockFrontend {
    pub signal: PcmSignal,
}

#[cfg(test)]
impl AudioFrontend for MockFrontend {
    fn decode(&self, path: &Path) -> Result<PcmSignal, AudioError> {
        if !path.exists() {
            return Err(AudioError::NotFound(path.to_path_buf()));
        }
        Ok(self.signal.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_one_second() {
        let signal = PcmSignal::new(8_000, vec![0.0; 8_000]);
        assert!((signal.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        assert_eq!(PcmSignal::new(0, vec![1.0; 10]).duration_secs(), 0.0);
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("FFmpeg".parse::<DecoderBackend>(), Ok(DecoderBackend::Ffmpeg));
        assert_eq!(
            "symphonia".parse::<DecoderBackend>(),
            Ok(DecoderBackend::Symphonia)
        );
        assert!("sox".parse::<DecoderBackend>().is_err());
    }

    #[test]
    fn unavailable_is_flagged() {
        assert!(AudioError::FrontendUnavailable("ffmpeg".into()).is_frontend_unavailable());
        assert!(!AudioError::NotFound(PathBuf::from("x.wav")).is_frontend_unavailable());
    }

    #[test]
    fn error_display_names_the_file() {
        let e = AudioError::NotFound(PathBuf::from("/tmp/in_busy.mp3"));
        assert!(e.to_string().contains("in_busy.mp3"));
    }

    #[test]
    fn mock_frontend_rejects_missing_path() {
        let mock = MockFrontend {
            signal: PcmSignal::new(8_000, vec![0.0; 80]),
        };
        let err = mock.decode(Path::new("/nonexistent/clip.wav")).unwrap_err();
        assert!(matches!(err, AudioError::NotFound(_)));
    }
}
