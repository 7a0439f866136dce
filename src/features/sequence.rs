//! Feature frames and feature sequences.
//!
//! A [`FeatureSequence`] is an ordered run of fixed-dimension frames stored
//! row-major in one contiguous buffer, so a window of `W` consecutive frames
//! is a single `&[f64]` slice of length `W * dim`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// FeatureError
// ---------------------------------------------------------------------------

/// Shape errors raised while building sequences or reference libraries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// A frame dimension of zero cannot describe anything.
    #[error("feature dimension must be > 0")]
    ZeroDimension,

    /// Two frames (or two sequences) disagree on their dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The flat buffer length is not a multiple of the frame dimension.
    #[error("buffer of {len} values is not a whole number of {dim}-dimension frames")]
    Ragged { len: usize, dim: usize },

    /// A reference name was inserted twice into the same library.
    #[error("duplicate reference name: {0}")]
    DuplicateReference(String),

    /// A reference pattern without frames has no window to compare.
    #[error("reference {0} has no frames")]
    EmptyReference(String),
}

// ---------------------------------------------------------------------------
// FeatureSequence
// ---------------------------------------------------------------------------

/// Ordered sequence of `len()` frames, each `dim()` values wide.
///
/// Immutable once built; every constructor validates the shape.
///
/// ```
/// use televoice::features::FeatureSequence;
///
/// let seq = FeatureSequence::from_frames(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// assert_eq!(seq.len(), 2);
/// assert_eq!(seq.dim(), 2);
/// assert_eq!(seq.frame(1), &[3.0, 4.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSequence", into = "RawSequence")]
pub struct FeatureSequence {
    dim: usize,
    data: Vec<f64>,
}

impl FeatureSequence {
    /// Build from a row-major buffer of `dim`-wide frames.
    pub fn new(dim: usize, data: Vec<f64>) -> Result<Self, FeatureError> {
        if dim == 0 {
            return Err(FeatureError::ZeroDimension);
        }
        if data.len() % dim != 0 {
            return Err(FeatureError::Ragged {
                len: data.len(),
                dim,
            });
        }
        Ok(Self { dim, data })
    }

    /// A sequence with no frames.
    pub fn empty(dim: usize) -> Result<Self, FeatureError> {
        Self::new(dim, Vec::new())
    }

    /// Build from individual frames.  All frames must share one dimension;
    /// an empty frame list cannot infer a dimension and is rejected.
    pub fn from_frames(frames: Vec<Vec<f64>>) -> Result<Self, FeatureError> {
        let dim = frames.first().map(Vec::len).ok_or(FeatureError::ZeroDimension)?;
        if dim == 0 {
            return Err(FeatureError::ZeroDimension);
        }
        let mut data = Vec::with_capacity(dim * frames.len());
        for frame in frames {
            if frame.len() != dim {
                return Err(FeatureError::DimensionMismatch {
                    expected: dim,
                    found: frame.len(),
                });
            }
            data.extend(frame);
        }
        Ok(Self { dim, data })
    }

    /// Frame dimension `D`.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of frames `N`.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `index`-th frame.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len()`.
    pub fn frame(&self, index: usize) -> &[f64] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Iterate over frames in order.
    pub fn frames(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.dim)
    }

    /// `len` consecutive frames starting at frame `start`, flattened.
    ///
    /// # Panics
    ///
    /// Panics when the window runs past the end of the sequence.
    pub fn window(&self, start: usize, len: usize) -> &[f64] {
        &self.data[start * self.dim..(start + len) * self.dim]
    }

    /// Whole sequence, flattened row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

// Serialized form; deserialization goes back through `FeatureSequence::new`
// so a corrupted cache cannot produce a ragged sequence.
#[derive(Serialize, Deserialize)]
struct RawSequence {
    dim: usize,
    data: Vec<f64>,
}

impl TryFrom<RawSequence> for FeatureSequence {
    type Error = FeatureError;

    fn try_from(raw: RawSequence) -> Result<Self, Self::Error> {
        FeatureSequence::new(raw.dim, raw.data)
    }
}

impl From<FeatureSequence> for RawSequence {
    fn from(seq: FeatureSequence) -> Self {
        RawSequence {
            dim: seq.dim,
            data: seq.data,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_dimension() {
        assert_eq!(
            FeatureSequence::new(0, vec![]),
            Err(FeatureError::ZeroDimension)
        );
    }

    #[test]
    fn new_rejects_ragged_buffer() {
        let err = FeatureSequence::new(3, vec![1.0; 7]).unwrap_err();
        assert_eq!(err, FeatureError::Ragged { len: 7, dim: 3 });
    }

    #[test]
    fn from_frames_rejects_mixed_dimensions() {
        let err = FeatureSequence::from_frames(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            FeatureError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn empty_sequence_has_no_frames() {
        let seq = FeatureSequence::empty(13).unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.len(), 0);
        assert_eq!(seq.dim(), 13);
        assert_eq!(seq.frames().count(), 0);
    }

    #[test]
    fn window_is_contiguous_frames() {
        let seq = FeatureSequence::new(2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(seq.window(1, 2), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(seq.frames().nth(2), Some(&[4.0, 5.0][..]));
    }

    #[test]
    fn deserialize_validates_shape() {
        let bad = r#"{"dim":2,"data":[1.0,2.0,3.0]}"#;
        assert!(serde_json::from_str::<FeatureSequence>(bad).is_err());

        let good = r#"{"dim":2,"data":[1.0,2.0,3.0,4.0]}"#;
        let seq: FeatureSequence = serde_json::from_str(good).unwrap();
        assert_eq!(seq.len(), 2);
    }
}
