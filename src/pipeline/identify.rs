//! Single-file identification — decode → extract → search → classify.
//!
//! ```text
//! path ─▶ AudioFrontend::decode ─▶ FeatureExtractor::extract ─▶ matcher::identify ─▶ classify
//!           (AudioError)             (ExtractError)               (MatchError)       (ClassifyError)
//! ```
//!
//! Every collaborator failure is wrapped in a [`PipelineError`] naming the
//! file, so a batch can log it and carry on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::audio::{AudioError, AudioFrontend};
use crate::classify::{classify, Classification, ClassifierConfig, ClassifyError};
use crate::features::{ExtractError, FeatureExtractor, FeatureSequence};
use crate::library::ReferenceLibrary;
use crate::matcher::{self, DistanceMap, MatchError, SearchParams};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that abort the identification of one file.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{}: {source}", path.display())]
    Audio {
        path: PathBuf,
        #[source]
        source: AudioError,
    },

    #[error("{}: feature extraction failed: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("{}: comparison failed: {source}", path.display())]
    Match {
        path: PathBuf,
        #[source]
        source: MatchError,
    },

    #[error("{}: cannot classify: {source}", path.display())]
    Classify {
        path: PathBuf,
        #[source]
        source: ClassifyError,
    },

    /// The blocking worker running the identification died.
    #[error("{}: worker failed: {reason}", path.display())]
    Worker { path: PathBuf, reason: String },
}

impl PipelineError {
    /// `true` when the audio decoding collaborator is missing.
    pub fn is_frontend_unavailable(&self) -> bool {
        matches!(self, PipelineError::Audio { source, .. } if source.is_frontend_unavailable())
    }

    /// `true` when the file was processed but no verdict could be derived.
    pub fn is_classification_failure(&self) -> bool {
        matches!(self, PipelineError::Classify { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            PipelineError::Audio { path, .. }
            | PipelineError::Extract { path, .. }
            | PipelineError::Match { path, .. }
            | PipelineError::Classify { path, .. }
            | PipelineError::Worker { path, .. } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Identification
// ---------------------------------------------------------------------------

/// Result of identifying one target file.
#[derive(Debug, Clone)]
pub struct Identification {
    pub path: PathBuf,
    pub distances: DistanceMap,
    /// `Err` when no reference produced a finite distance.
    pub classification: Result<Classification, ClassifyError>,
    /// Wall time from decode start to verdict.
    pub elapsed: Duration,
}

impl Identification {
    /// Final path component, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// The verdict, or a [`PipelineError::Classify`] naming this file.
    pub fn verdict(&self) -> Result<&Classification, PipelineError> {
        self.classification
            .as_ref()
            .map_err(|e| PipelineError::Classify {
                path: self.path.clone(),
                source: e.clone(),
            })
    }

    /// Category prefix against the file name prefix.  Test corpora name
    /// their files after the expected category (`bu_…`, `no_…`, `vo_…`).
    pub fn is_correct(&self) -> bool {
        self.classification
            .as_ref()
            .is_ok_and(|c| c.is_correct(&self.file_name()))
    }

    /// One console line: name, match, value, MRD, category, correctness,
    /// elapsed seconds.
    pub fn display_line(&self) -> String {
        match &self.classification {
            Ok(c) => format!(
                "{:30}{:27}({:8.2})\tMRD={:8.2}{:^17}{:^7}{:9.5}(s)",
                self.file_name(),
                c.best_match,
                c.best_value,
                c.mrd,
                c.category,
                self.is_correct(),
                self.elapsed.as_secs_f64()
            ),
            Err(e) => format!(
                "{:30}{:27}{:9.5}(s)",
                self.file_name(),
                e.to_string(),
                self.elapsed.as_secs_f64()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Everything needed to identify files against one reference library.
///
/// Cheap to share: wrap in an `Arc` and hand to as many workers as needed.
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use televoice::audio::SymphoniaFrontend;
/// use televoice::classify::ClassifierConfig;
/// use televoice::features::MfccExtractor;
/// use televoice::library::{load_library, RetryPolicy};
/// use televoice::matcher::SearchParams;
/// use televoice::pipeline::Identifier;
///
/// let library = load_library(Path::new("golden/golden_patterns.json"), RetryPolicy::default()).unwrap();
/// let identifier = Identifier::new(
///     Arc::new(SymphoniaFrontend::new(8_000, 0)),
///     Arc::new(MfccExtractor::default()),
///     Arc::new(library),
///     SearchParams::default(),
///     ClassifierConfig::default(),
/// );
/// let result = identifier.identify_file(Path::new("bu_0001.mp3")).unwrap();
/// println!("{}", result.display_line());
/// ```
pub struct Identifier {
    frontend: Arc<dyn AudioFrontend>,
    extractor: Arc<dyn FeatureExtractor>,
    library: Arc<ReferenceLibrary>,
    search: SearchParams,
    classifier: ClassifierConfig,
}

impl Identifier {
    pub fn new(
        frontend: Arc<dyn AudioFrontend>,
        extractor: Arc<dyn FeatureExtractor>,
        library: Arc<ReferenceLibrary>,
        search: SearchParams,
        classifier: ClassifierConfig,
    ) -> Self {
        Self {
            frontend,
            extractor,
            library,
            search,
            classifier,
        }
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    pub fn search_params(&self) -> &SearchParams {
        &self.search
    }

    /// Decode, extract, compare and classify `path`.
    ///
    /// Blocking; call through `spawn_blocking` from async code.
    pub fn identify_file(&self, path: &Path) -> Result<Identification, PipelineError> {
        let start = Instant::now();

        let signal = self
            .frontend
            .decode(path)
            .map_err(|source| PipelineError::Audio {
                path: path.to_path_buf(),
                source,
            })?;
        let target = self
            .extractor
            .extract(&signal)
            .map_err(|source| PipelineError::Extract {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            "pipeline: {} → {} frames ({:.2}s of audio)",
            path.display(),
            target.len(),
            signal.duration_secs()
        );

        let (distances, classification) =
            self.identify_features(&target)
                .map_err(|source| PipelineError::Match {
                    path: path.to_path_buf(),
                    source,
                })?;

        Ok(Identification {
            path: path.to_path_buf(),
            distances,
            classification,
            elapsed: start.elapsed(),
        })
    }

    /// Compare an already-extracted target and classify the result.
    pub fn identify_features(
        &self,
        target: &FeatureSequence,
    ) -> Result<(DistanceMap, Result<Classification, ClassifyError>), MatchError> {
        let distances = matcher::identify(target, &self.library, &self.search)?;
        let classification = classify(&distances, &self.classifier);
        Ok((distances, classification))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockFrontend, PcmSignal};
    use crate::features::MockExtractor;
    use crate::matcher::{Distance, SearchMode};
    use tempfile::tempdir;

    fn seq(data: &[f64]) -> FeatureSequence {
        FeatureSequence::new(1, data.to_vec()).unwrap()
    }

    fn library() -> ReferenceLibrary {
        let mut library = ReferenceLibrary::new();
        library.insert("busy_a", seq(&[90.0, 90.0])).unwrap();
        library.insert("voice_mail_c", seq(&[1.0, 4.0, 1.0])).unwrap();
        library.insert("no_answer_b", seq(&[-70.0, -70.0])).unwrap();
        library
    }

    fn identifier(target: &[f64], mode: SearchMode, threshold: Option<f64>) -> Identifier {
        Identifier::new(
            Arc::new(MockFrontend {
                signal: PcmSignal::new(8_000, vec![0.0; 80]),
            }),
            Arc::new(MockExtractor {
                sequence: seq(target),
            }),
            Arc::new(library()),
            SearchParams {
                scan_step: 1,
                threshold,
                mode,
            },
            ClassifierConfig::default(),
        )
    }

    #[test]
    fn identifies_exact_voicemail() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("vo_0001.wav");
        std::fs::write(&path, b"x").unwrap();

        let id = identifier(&[3.0, 1.0, 4.0, 1.0, 5.0], SearchMode::Sequential, None);
        let result = id.identify_file(&path).unwrap();

        assert_eq!(result.distances.get("voice_mail_c"), Some(Distance::Finite(0.0)));
        let verdict = result.verdict().unwrap();
        assert_eq!(verdict.best_match, "voice_mail_c");
        assert_eq!(verdict.category, "voicemail");
        assert!(result.is_correct());
        assert_eq!(result.file_name(), "vo_0001.wav");
        assert!(result.display_line().starts_with("vo_0001.wav"));
    }

    #[test]
    fn threshold_in_parallel_still_finds_exact_match() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("vo_0002.wav");
        std::fs::write(&path, b"x").unwrap();

        let target = [3.0, 1.0, 4.0, 1.0, 5.0];
        let exhaustive = identifier(&target, SearchMode::Sequential, None)
            .identify_file(&path)
            .unwrap();
        let threshold = 1500.0;
        let result = identifier(&target, SearchMode::Parallel, Some(threshold))
            .identify_file(&path)
            .unwrap();

        assert_eq!(result.distances.len(), 3);
        for (name, d) in result.distances.iter() {
            if let Distance::Finite(v) = d {
                let full = exhaustive.distances.get(name).unwrap().as_f64();
                assert!(v < threshold || v == full, "{name}: {v}");
            }
        }
    }

    #[test]
    fn missing_file_is_an_audio_error() {
        let id = identifier(&[1.0, 2.0, 3.0], SearchMode::Sequential, None);
        let err = id
            .identify_file(Path::new("/nonexistent/bu_0001.wav"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Audio { .. }));
        assert!(!err.is_frontend_unavailable());
        assert!(err.to_string().contains("bu_0001.wav"));
    }

    #[test]
    fn short_target_cannot_be_classified() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bu_0003.wav");
        std::fs::write(&path, b"x").unwrap();

        // One frame: every reference is longer → all unbounded.
        let id = identifier(&[1.0], SearchMode::Sequential, None);
        let result = id.identify_file(&path).unwrap();
        assert!(result.distances.iter().all(|(_, d)| d.is_unbounded()));
        let err = result.verdict().unwrap_err();
        assert!(err.is_classification_failure());
        assert!(!result.is_correct());
    }

    #[test]
    fn frontend_unavailable_is_detected() {
        let err = PipelineError::Audio {
            path: PathBuf::from("a.wav"),
            source: AudioError::FrontendUnavailable("ffmpeg not found".into()),
        };
        assert!(err.is_frontend_unavailable());
        assert_eq!(err.path(), Path::new("a.wav"));
    }
}
