//! Acoustic features — PCM → MFCC [`FeatureSequence`].
//!
//! # Architecture
//!
//! ```text
//! PcmSignal ──▶ FeatureExtractor (trait) ──▶ FeatureSequence
//!                    │
//!                    └─ MfccExtractor (MfccParams)
//! ```

pub mod extractor;
pub mod mfcc;
pub mod sequence;

pub use extractor::{ExtractError, FeatureExtractor};
pub use mfcc::{MfccExtractor, MfccParams};
pub use sequence::{FeatureError, FeatureSequence};

#[cfg(test)]
pub use extractor::MockExtractor;
