//! Multi-pattern search over a whole reference library.
//!
//! # Modes
//!
//! ```text
//! Sequential              ref₀ ─▶ ref₁ ─▶ ref₂        each ref: own threshold
//! SequentialShortCircuit  ref₀ ─▶ ref₁ ─▶ ref₂        one StopSignal, in order
//! Parallel                ┌ ref₀ ┐
//!                         ├ ref₁ ┤  scoped threads, one StopSignal, join all
//!                         └ ref₂ ┘
//! ```
//!
//! With a threshold the short-circuit and parallel modes abort every
//! not-yet-finished reference to [`Distance::Unbounded`] once any reference
//! meets it.  In parallel mode *which* references are aborted depends on
//! scheduling; sequential mode is the reproducible alternative.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::distance::{Distance, DistanceMap};
use super::signal::StopSignal;
use super::window::{scan, MatchError};
use crate::features::FeatureSequence;
use crate::library::ReferenceLibrary;

// ---------------------------------------------------------------------------
// SearchMode
// ---------------------------------------------------------------------------

/// How the references of one library are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// One reference after another; a threshold only stops its own scan.
    #[default]
    Sequential,
    /// One reference after another; the first reference meeting the
    /// threshold aborts all later ones.
    #[serde(rename = "short-circuit")]
    SequentialShortCircuit,
    /// One worker thread per reference sharing a stop signal.
    Parallel,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "short-circuit" | "shortcircuit" => Ok(Self::SequentialShortCircuit),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!(
                "unknown search mode '{other}' (expected sequential, short-circuit or parallel)"
            )),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::SequentialShortCircuit => "short-circuit",
            Self::Parallel => "parallel",
        })
    }
}

// ---------------------------------------------------------------------------
// SearchParams
// ---------------------------------------------------------------------------

/// Parameters of one [`identify`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Stride between candidate offsets, in frames.  Must be ≥ 1.
    pub scan_step: usize,
    /// Stop once a normalised distance falls below this value.
    pub threshold: Option<f64>,
    pub mode: SearchMode,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            scan_step: 1,
            threshold: None,
            mode: SearchMode::Sequential,
        }
    }
}

// ---------------------------------------------------------------------------
// identify
// ---------------------------------------------------------------------------

/// Compare `target` against every pattern in `library`.
///
/// The returned map lists every reference in library order.  An empty
/// library yields an empty map.
///
/// # Errors
///
/// Input errors from the matcher (dimension mismatch, zero scan step) and
/// [`MatchError::WorkerPanicked`] in parallel mode.
pub fn identify(
    target: &FeatureSequence,
    library: &ReferenceLibrary,
    params: &SearchParams,
) -> Result<DistanceMap, MatchError> {
    if params.scan_step == 0 {
        return Err(MatchError::ZeroScanStep);
    }
    if library.is_empty() {
        return Ok(DistanceMap::new());
    }

    let map = match params.mode {
        SearchMode::Sequential => run_sequential(target, library, params, None)?,
        SearchMode::SequentialShortCircuit => {
            let signal = StopSignal::new();
            run_sequential(target, library, params, Some(&signal))?
        }
        SearchMode::Parallel => run_parallel(target, library, params)?,
    };

    debug!(
        "matcher: {} references compared ({} mode, step {}, threshold {:?})",
        map.len(),
        params.mode,
        params.scan_step,
        params.threshold
    );
    Ok(map)
}

fn run_sequential(
    target: &FeatureSequence,
    library: &ReferenceLibrary,
    params: &SearchParams,
    signal: Option<&StopSignal>,
) -> Result<DistanceMap, MatchError> {
    let mut map = DistanceMap::new();
    for pattern in library {
        let d = compare_one(target, &pattern.name, &pattern.features, params, signal)?;
        map.insert(pattern.name.as_str(), d);
    }
    Ok(map)
}

fn run_parallel(
    target: &FeatureSequence,
    library: &ReferenceLibrary,
    params: &SearchParams,
) -> Result<DistanceMap, MatchError> {
    let signal = StopSignal::new();

    let results: Vec<(&str, Result<Distance, MatchError>)> = std::thread::scope(|s| {
        let handles: Vec<_> = library
            .iter()
            .map(|pattern| {
                let signal = &signal;
                let handle = s.spawn(move || {
                    compare_one(target, &pattern.name, &pattern.features, params, Some(signal))
                });
                (pattern.name.as_str(), handle)
            })
            .collect();

        // Every handle is joined, even after an error, so no worker outlives
        // the call.
        handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(MatchError::WorkerPanicked(name.to_string())));
                (name, result)
            })
            .collect()
    });

    let mut map = DistanceMap::new();
    for (name, result) in results {
        map.insert(name, result?);
    }
    Ok(map)
}

fn compare_one(
    target: &FeatureSequence,
    name: &str,
    reference: &FeatureSequence,
    params: &SearchParams,
    signal: Option<&StopSignal>,
) -> Result<Distance, MatchError> {
    if target.len() < reference.len() {
        warn!(
            "matcher: {name} ({} frames) is longer than the target ({} frames), skipped",
            reference.len(),
            target.len()
        );
    }
    let d = scan(target, reference, params.scan_step, params.threshold, signal)?;
    debug!("matcher: {name} → {d:.2}");
    Ok(d)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(data: &[f64]) -> FeatureSequence {
        FeatureSequence::new(1, data.to_vec()).unwrap()
    }

    /// Target plus three references: an exact match, a near miss and one
    /// longer than the target.
    fn fixture() -> (FeatureSequence, ReferenceLibrary) {
        let target = seq(&[0.0, 3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0]);
        let mut library = ReferenceLibrary::new();
        library.insert("busy_a", seq(&[8.0, 8.0, 8.0])).unwrap();
        library.insert("voice_mail_c", seq(&[1.0, 4.0, 1.0])).unwrap();
        library.insert("no_answer_b", seq(&[1.0, 5.0, 8.0])).unwrap();
        library.insert("long_tone", seq(&[0.0; 12])).unwrap();
        (target, library)
    }

    fn params(mode: SearchMode, threshold: Option<f64>) -> SearchParams {
        SearchParams {
            scan_step: 1,
            threshold,
            mode,
        }
    }

    #[test]
    fn empty_library_gives_empty_map() {
        let map = identify(&seq(&[1.0, 2.0]), &ReferenceLibrary::new(), &SearchParams::default())
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn all_modes_agree_without_threshold() {
        let (target, library) = fixture();
        let seq_map = identify(&target, &library, &params(SearchMode::Sequential, None)).unwrap();
        let sc_map = identify(
            &target,
            &library,
            &params(SearchMode::SequentialShortCircuit, None),
        )
        .unwrap();
        let par_map = identify(&target, &library, &params(SearchMode::Parallel, None)).unwrap();

        assert_eq!(seq_map, sc_map);
        assert_eq!(seq_map, par_map);
        assert_eq!(seq_map.get("voice_mail_c"), Some(Distance::Finite(0.0)));
        assert_eq!(seq_map.get("long_tone"), Some(Distance::Unbounded));
    }

    #[test]
    fn map_follows_library_order() {
        let (target, library) = fixture();
        let map = identify(&target, &library, &params(SearchMode::Parallel, None)).unwrap();
        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, library.names().collect::<Vec<_>>());
    }

    #[test]
    fn identify_is_idempotent() {
        let (target, library) = fixture();
        for mode in [SearchMode::Sequential, SearchMode::Parallel] {
            let a = identify(&target, &library, &params(mode, None)).unwrap();
            let b = identify(&target, &library, &params(mode, None)).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn sequential_threshold_does_not_stop_other_references() {
        let (target, library) = fixture();
        let map = identify(&target, &library, &params(SearchMode::Sequential, Some(0.5))).unwrap();
        // Every reference that fits gets a finite value.
        assert!(map.get("busy_a").unwrap().finite().is_some());
        assert!(map.get("no_answer_b").unwrap().finite().is_some());
        assert_eq!(map.get("voice_mail_c"), Some(Distance::Finite(0.0)));
    }

    #[test]
    fn short_circuit_aborts_later_references() {
        let (target, library) = fixture();
        let map = identify(
            &target,
            &library,
            &params(SearchMode::SequentialShortCircuit, Some(0.5)),
        )
        .unwrap();
        assert!(map.get("busy_a").unwrap().finite().is_some());
        assert_eq!(map.get("voice_mail_c"), Some(Distance::Finite(0.0)));
        assert_eq!(map.get("no_answer_b"), Some(Distance::Unbounded));
        assert_eq!(map.get("long_tone"), Some(Distance::Unbounded));
    }

    #[test]
    fn parallel_threshold_results_are_sound() {
        let (target, library) = fixture();
        let threshold = 0.5;
        let exhaustive = identify(&target, &library, &params(SearchMode::Sequential, None)).unwrap();

        for _ in 0..20 {
            let map = identify(
                &target,
                &library,
                &params(SearchMode::Parallel, Some(threshold)),
            )
            .unwrap();
            assert_eq!(map.len(), library.len());
            for (name, d) in map.iter() {
                if let Distance::Finite(v) = d {
                    let full = exhaustive.get(name).unwrap().as_f64();
                    assert!(v < threshold || v == full, "{name}: {v} vs {full}");
                }
            }
        }
    }

    #[test]
    fn dimension_mismatch_propagates_in_every_mode() {
        let target = FeatureSequence::new(2, vec![0.0; 10]).unwrap();
        let mut library = ReferenceLibrary::new();
        library.insert("busy_a", seq(&[0.0, 0.0])).unwrap();

        for mode in [
            SearchMode::Sequential,
            SearchMode::SequentialShortCircuit,
            SearchMode::Parallel,
        ] {
            let err = identify(&target, &library, &params(mode, None)).unwrap_err();
            assert!(matches!(err, MatchError::DimensionMismatch { .. }), "{mode}");
        }
    }

    #[test]
    fn zero_scan_step_is_rejected() {
        let (target, library) = fixture();
        let p = SearchParams {
            scan_step: 0,
            ..SearchParams::default()
        };
        assert_eq!(identify(&target, &library, &p), Err(MatchError::ZeroScanStep));
    }

    #[test]
    fn mode_parses_and_displays() {
        for mode in [
            SearchMode::Sequential,
            SearchMode::SequentialShortCircuit,
            SearchMode::Parallel,
        ] {
            assert_eq!(mode.to_string().parse::<SearchMode>(), Ok(mode));
        }
        assert!("random".parse::<SearchMode>().is_err());
    }

    #[test]
    fn params_deserialise_with_defaults() {
        let p: SearchParams = toml::from_str("mode = \"parallel\"").unwrap();
        assert_eq!(p.mode, SearchMode::Parallel);
        assert_eq!(p.scan_step, 1);
        assert_eq!(p.threshold, None);

        let p: SearchParams = toml::from_str("mode = \"short-circuit\"\nthreshold = 1500.0").unwrap();
        assert_eq!(p.mode, SearchMode::SequentialShortCircuit);
        assert_eq!(p.threshold, Some(1500.0));
    }
}
