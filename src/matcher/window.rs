//! Single-pattern sliding-window matcher.
//!
//! ## Algorithm
//!
//! For a reference of `W` frames and a target of `T ≥ W` frames, every
//! offset `i = 0, k, 2k, … ≤ T − W` (with `k` the scan step) is scored by the
//! sum of squared element-wise differences between `target[i..i+W]` and the
//! reference.  The running minimum divided by `W` is the result, so patterns
//! of different lengths stay comparable.  `T < W` yields
//! [`Distance::Unbounded`].
//!
//! With a threshold the scan stops as soon as `min / W < threshold`.  With a
//! [`StopSignal`] the scan is abandoned (result `Unbounded`) when the signal
//! is found set before a window, and the signal is set when this scan meets
//! the threshold.

use thiserror::Error;

use super::distance::Distance;
use super::signal::StopSignal;
use crate::features::FeatureSequence;

/// Input errors that make a comparison meaningless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Target and reference frames have different dimensions.
    #[error("dimension mismatch: target frames have {target} values, reference {reference}")]
    DimensionMismatch { target: usize, reference: usize },

    /// A scan step of zero would never advance.
    #[error("scan step must be >= 1")]
    ZeroScanStep,

    /// A reference without frames has no window to score.
    #[error("reference pattern has no frames")]
    EmptyReference,

    /// A comparison worker panicked.
    #[error("comparison worker for {0} panicked")]
    WorkerPanicked(String),
}

/// Best normalised window distance of `reference` inside `target`.
///
/// ```
/// use televoice::features::FeatureSequence;
/// use televoice::matcher::{match_pattern, Distance};
///
/// let target = FeatureSequence::new(1, vec![5.0, 1.0, 2.0, 9.0]).unwrap();
/// let reference = FeatureSequence::new(1, vec![1.0, 2.0]).unwrap();
/// assert_eq!(match_pattern(&target, &reference, 1, None), Ok(Distance::Finite(0.0)));
///
/// // Reference longer than target → unbounded
/// assert_eq!(match_pattern(&reference, &target, 1, None), Ok(Distance::Unbounded));
/// ```
pub fn match_pattern(
    target: &FeatureSequence,
    reference: &FeatureSequence,
    scan_step: usize,
    threshold: Option<f64>,
) -> Result<Distance, MatchError> {
    scan(target, reference, scan_step, threshold, None)
}

/// [`match_pattern`] with an optional shared stop signal.
pub(crate) fn scan(
    target: &FeatureSequence,
    reference: &FeatureSequence,
    scan_step: usize,
    threshold: Option<f64>,
    signal: Option<&StopSignal>,
) -> Result<Distance, MatchError> {
    if scan_step == 0 {
        return Err(MatchError::ZeroScanStep);
    }
    if target.dim() != reference.dim() {
        return Err(MatchError::DimensionMismatch {
            target: target.dim(),
            reference: reference.dim(),
        });
    }
    if reference.is_empty() {
        return Err(MatchError::EmptyReference);
    }

    let window = reference.len();
    if target.len() < window {
        return Ok(Distance::Unbounded);
    }

    let pattern = reference.as_slice();
    let norm = window as f64;
    let mut running_min = f64::INFINITY;
    let mut evaluated = false;

    for start in (0..=target.len() - window).step_by(scan_step) {
        if signal.is_some_and(StopSignal::is_triggered) {
            return Ok(Distance::Unbounded);
        }

        let d = window_distance(target.window(start, window), pattern);
        running_min = running_min.min(d);
        evaluated = true;

        if threshold.is_some_and(|t| running_min / norm < t) {
            if let Some(signal) = signal {
                signal.trigger();
            }
            break;
        }
    }

    if !evaluated {
        return Ok(Distance::Unbounded);
    }
    Ok(Distance::Finite(running_min / norm))
}

/// Sum of squared element-wise differences of two equal-length slices.
#[inline]
fn window_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
