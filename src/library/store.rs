//! Pattern store: builds the reference library from golden audio files and
//! caches it as JSON next to them.
//!
//! ```text
//! golden/                       load_or_build(golden/, golden_patterns.json)
//! ├── busy_a.wav          ┐        │
//! ├── no_answer_b.wav     ├─ build_library ─▶ ReferenceLibrary ─▶ save_library
//! ├── voice_mail_c.wav    ┘        │
//! └── golden_patterns.json ◀───────┴─ load_library (retries while empty/corrupt)
//! ```
//!
//! The cache is written to a temp file in the same directory and renamed into
//! place, so readers either see the old file, no file, or the complete new
//! one.  A reader that still catches an empty or half-written file (e.g. a
//! writer without atomic rename on the same share) retries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::reference::ReferenceLibrary;
use crate::audio::{AudioError, AudioFrontend};
use crate::features::{ExtractError, FeatureError, FeatureExtractor};

/// Bumped whenever the cached layout changes.
const CACHE_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache file does not exist.
    #[error("pattern cache not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The cache stayed empty or unparsable through every retry.
    #[error("pattern cache {} unreadable after {attempts} attempts: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        attempts: u32,
        reason: String,
    },

    /// The cache was written by an incompatible version.
    #[error("pattern cache {} has version {found}, expected {expected}", path.display())]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// The golden directory holds no `*.wav` files.
    #[error("no golden .wav files in {}", .0.display())]
    NoGoldenFiles(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise pattern cache: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("feature extraction failed for {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How often, and how patiently, to re-read a cache that looks mid-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total read attempts, at least one is always made.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            delay: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache file format
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    patterns: ReferenceLibrary,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    patterns: &'a ReferenceLibrary,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Decode and extract every `*.wav` in `dir`, sorted by file name.  Each
/// reference is named after its file stem.
pub fn build_library(
    dir: &Path,
    frontend: &dyn AudioFrontend,
    extractor: &dyn FeatureExtractor,
) -> Result<ReferenceLibrary, StoreError> {
    let files = golden_files(dir)?;
    if files.is_empty() {
        return Err(StoreError::NoGoldenFiles(dir.to_path_buf()));
    }

    let mut library = ReferenceLibrary::new();
    for path in files {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("store: skipping non-UTF-8 file name {}", path.display());
            continue;
        };
        let signal = frontend.decode(&path)?;
        let features = extractor
            .extract(&signal)
            .map_err(|source| StoreError::Extract {
                path: path.clone(),
                source,
            })?;
        debug!(
            "store: {name}: {} frames × {}",
            features.len(),
            features.dim()
        );
        library.insert(name, features)?;
    }

    info!(
        "store: built {} reference patterns from {}",
        library.len(),
        dir.display()
    );
    Ok(library)
}

fn golden_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if is_wav && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Write `library` to `path` through a sibling temp file and an atomic rename.
pub fn save_library(path: &Path, library: &ReferenceLibrary) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_vec(&CacheFileRef {
        version: CACHE_VERSION,
        patterns: library,
    })?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, json).map_err(io_err)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    debug!("store: saved {} patterns to {}", library.len(), path.display());
    Ok(())
}

/// Read the cache at `path`, retrying while it is empty or unparsable.
pub fn load_library(path: &Path, retry: RetryPolicy) -> Result<ReferenceLibrary, StoreError> {
    let attempts = retry.attempts.max(1);
    let mut last_reason = String::new();

    for attempt in 1..=attempts {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let reason = if bytes.is_empty() {
            "file is empty".to_string()
        } else {
            match serde_json::from_slice::<CacheFile>(&bytes) {
                Ok(cache) if cache.version == CACHE_VERSION => {
                    debug!(
                        "store: loaded {} patterns from {}",
                        cache.patterns.len(),
                        path.display()
                    );
                    return Ok(cache.patterns);
                }
                Ok(cache) => {
                    return Err(StoreError::Version {
                        path: path.to_path_buf(),
                        found: cache.version,
                        expected: CACHE_VERSION,
                    })
                }
                Err(e) => e.to_string(),
            }
        };

        warn!(
            "store: {} unreadable ({reason}), retrying ({attempt}/{attempts})",
            path.display()
        );
        last_reason = reason;
        if attempt < attempts {
            std::thread::sleep(retry.delay);
        }
    }

    Err(StoreError::Corrupt {
        path: path.to_path_buf(),
        attempts,
        reason: last_reason,
    })
}

/// Load `cache` if it exists, otherwise build from `dir` and save the cache.
pub fn load_or_build(
    dir: &Path,
    cache: &Path,
    retry: RetryPolicy,
    frontend: &dyn AudioFrontend,
    extractor: &dyn FeatureExtractor,
) -> Result<ReferenceLibrary, StoreError> {
    match load_library(cache, retry) {
        Ok(library) => Ok(library),
        Err(StoreError::NotFound(_)) => {
            info!("store: no cache at {}, building", cache.display());
            let library = build_library(dir, frontend, extractor)?;
            save_library(cache, &library)?;
            Ok(library)
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockFrontend, PcmSignal};
    use crate::features::{FeatureSequence, MockExtractor};
    use tempfile::tempdir;

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    fn sample_library() -> ReferenceLibrary {
        let mut library = ReferenceLibrary::new();
        library
            .insert("busy_a", FeatureSequence::new(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap())
            .unwrap();
        library
            .insert("voice_mail_c", FeatureSequence::new(2, vec![0.5, 0.25]).unwrap())
            .unwrap();
        library
    }

    fn mocks() -> (MockFrontend, MockExtractor) {
        (
            MockFrontend {
                signal: PcmSignal::new(8_000, vec![0.0; 160]),
            },
            MockExtractor {
                sequence: FeatureSequence::new(1, vec![1.0, 2.0, 3.0]).unwrap(),
            },
        )
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("golden_patterns.json");
        let library = sample_library();

        save_library(&path, &library).unwrap();
        let loaded = load_library(&path, fast_retry(1)).unwrap();
        assert_eq!(loaded, library);

        // No temp file left behind.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_cache_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let err = load_library(&dir.path().join("absent.json"), fast_retry(3)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn empty_cache_exhausts_retries() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("golden_patterns.json");
        std::fs::write(&path, b"").unwrap();

        let err = load_library(&path, fast_retry(3)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { attempts: 3, .. }), "{err}");
    }

    #[test]
    fn corrupt_cache_recovers_once_writer_finishes() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("golden_patterns.json");
        std::fs::write(&path, b"{\"version\":1,\"patt").unwrap();

        let library = sample_library();
        let writer_path = path.clone();
        let writer_library = library.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            save_library(&writer_path, &writer_library).unwrap();
        });

        let loaded = load_library(
            &path,
            RetryPolicy {
                attempts: 200,
                delay: Duration::from_millis(5),
            },
        )
        .unwrap();
        writer.join().unwrap();
        assert_eq!(loaded, library);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("golden_patterns.json");
        std::fs::write(&path, br#"{"version":99,"patterns":[]}"#).unwrap();
        let err = load_library(&path, fast_retry(1)).unwrap_err();
        assert!(matches!(err, StoreError::Version { found: 99, .. }));
    }

    #[test]
    fn build_uses_sorted_wav_stems() {
        let dir = tempdir().expect("temp dir");
        for name in ["voice_mail_c.wav", "busy_a.WAV", "no_answer_b.wav", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let (frontend, extractor) = mocks();

        let library = build_library(dir.path(), &frontend, &extractor).unwrap();
        let names: Vec<&str> = library.names().collect();
        assert_eq!(names, vec!["busy_a", "no_answer_b", "voice_mail_c"]);
    }

    #[test]
    fn build_without_wavs_fails() {
        let dir = tempdir().expect("temp dir");
        let (frontend, extractor) = mocks();
        let err = build_library(dir.path(), &frontend, &extractor).unwrap_err();
        assert!(matches!(err, StoreError::NoGoldenFiles(_)));
    }

    #[test]
    fn load_or_build_writes_then_reuses_cache() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("busy_a.wav"), b"x").unwrap();
        let cache = dir.path().join("golden_patterns.json");
        let (frontend, extractor) = mocks();

        let built = load_or_build(dir.path(), &cache, fast_retry(1), &frontend, &extractor).unwrap();
        assert!(cache.exists());

        // Golden file removed: the cache alone must satisfy the second call.
        std::fs::remove_file(dir.path().join("busy_a.wav")).unwrap();
        let cached = load_or_build(dir.path(), &cache, fast_retry(1), &frontend, &extractor).unwrap();
        assert_eq!(built, cached);
    }
}
