//! Feature extractor trait.
//!
//! [`FeatureExtractor`] is the seam between decoded audio and the matcher.
//! [`MfccExtractor`](super::MfccExtractor) is the production implementation;
//! [`MockExtractor`] (test-only) returns a canned sequence.

use thiserror::Error;

use super::sequence::{FeatureError, FeatureSequence};
use crate::audio::PcmSignal;

/// Errors raised while turning PCM into features.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// The signal contains no samples.
    #[error("signal is empty")]
    EmptySignal,

    /// The extractor parameters cannot produce frames for this signal.
    #[error("invalid extractor parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Shape(#[from] FeatureError),
}

/// Object-safe, thread-safe interface for feature extractors.
///
/// # Contract
///
/// - Deterministic: identical signals produce identical sequences.
/// - Every frame of the returned sequence has the same dimension.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, signal: &PcmSignal) -> Result<FeatureSequence, ExtractError>;
}

/// Test double returning a fixed sequence regardless of input.
#[cfg(test)]
pub struct MockExtractor {
    pub sequence: FeatureSequence,
}

#[cfg(test)]
impl FeatureExtractor for MockExtractor {
    fn extract(&self, signal: &PcmSignal) -> Result<FeatureSequence, ExtractError> {
        if signal.samples.is_empty() {
            return Err(ExtractError::EmptySignal);
        }
        Ok(self.sequence.clone())
    }
}
