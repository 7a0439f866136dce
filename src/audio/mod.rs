//! Audio front-end — file → mono 8 kHz PCM on the 16-bit scale.
//!
//! # Pipeline
//!
//! ```text
//! file ─▶ SymphoniaFrontend ─▶ select channel 0 ─▶ resample ─▶ to_i16_scale ─▶ PcmSignal
//!      └▶ FfmpegFrontend (ffmpeg -af pan=mono|c0=c0 -ar 8000 -f s16le) ───────▶ PcmSignal
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use televoice::audio::{frontend_for, DecoderBackend, TARGET_SAMPLE_RATE};
//!
//! let frontend = frontend_for(DecoderBackend::Symphonia, TARGET_SAMPLE_RATE, 0).unwrap();
//! let signal = frontend.decode(Path::new("in_busy.mp3")).unwrap();
//! println!("{} samples @ {}Hz", signal.samples.len(), signal.sample_rate);
//! ```

pub mod decode;
pub mod ffmpeg;
pub mod frontend;
pub mod resample;

pub use decode::SymphoniaFrontend;
pub use ffmpeg::FfmpegFrontend;
pub use frontend::{
    frontend_for, AudioError, AudioFrontend, DecoderBackend, PcmSignal, TARGET_SAMPLE_RATE,
};
pub use resample::{resample, select_channel, to_i16_scale};

#[cfg(test)]
pub use frontend::MockFrontend;
