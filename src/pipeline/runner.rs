//! Batch runner — identifies every audio file under a directory.
//!
//! [`BatchRunner`] discovers target files with `async-walkdir`, then pushes
//! each identification onto tokio's blocking pool, never more than
//! `workers` at a time.
//!
//! # Flow
//!
//! ```text
//! discover(root) ──▶ [a.mp3, b.wav, …]  (sorted, extension-filtered)
//!                          │
//!        workers <= 1 ─────┼───── workers = N
//!   one file after another │   Semaphore(N) + JoinSet<spawn_blocking>
//!                          ▼
//!                  Identifier::identify_file
//!                          │
//!            ┌─────────────┴─────────────┐
//!            ▼                           ▼
//!     identifications              failures (logged, batch continues)
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_walkdir::WalkDir;
use futures::{StreamExt, TryStreamExt};
use log::{info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::identify::{Identification, Identifier, PipelineError};

// ---------------------------------------------------------------------------
// BatchOutcome
// ---------------------------------------------------------------------------

/// Everything one batch produced.  Both lists are sorted by path.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Files identified and classified.
    pub identifications: Vec<Identification>,
    /// Files that failed at any stage, including classification.
    pub failures: Vec<PipelineError>,
    /// Wall time of the whole batch.
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.identifications.len() + self.failures.len()
    }

    pub fn correct(&self) -> usize {
        self.identifications.iter().filter(|i| i.is_correct()).count()
    }

    /// Share of classified files whose category matches their name prefix.
    pub fn accuracy(&self) -> Option<f64> {
        if self.identifications.is_empty() {
            return None;
        }
        Some(self.correct() as f64 / self.identifications.len() as f64)
    }

    /// `true` when at least one failure was the missing decode collaborator.
    pub fn frontend_unavailable(&self) -> bool {
        self.failures.iter().any(PipelineError::is_frontend_unavailable)
    }
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs one [`Identifier`] over many files.
pub struct BatchRunner {
    identifier: Arc<Identifier>,
    workers: usize,
    display: bool,
}

impl BatchRunner {
    /// `workers <= 1` runs strictly sequentially.
    pub fn new(identifier: Arc<Identifier>, workers: usize) -> Self {
        Self {
            identifier,
            workers,
            display: false,
        }
    }

    /// Print one line per file as results arrive.
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Discover under `root` and identify everything found.
    pub async fn run_dir(
        &self,
        root: &Path,
        extensions: &[String],
    ) -> std::io::Result<BatchOutcome> {
        let files = discover(root, extensions).await?;
        Ok(self.run(files).await)
    }

    /// Identify `files`, isolating each file's failure from the rest.
    pub async fn run(&self, files: Vec<PathBuf>) -> BatchOutcome {
        let start = Instant::now();
        let mut identifications = Vec::with_capacity(files.len());
        let mut failures = Vec::new();

        info!(
            "batch: {} files, {} worker(s)",
            files.len(),
            self.workers.max(1)
        );

        if self.workers <= 1 {
            for path in files {
                let result = identify_blocking(Arc::clone(&self.identifier), path).await;
                self.record(result, &mut identifications, &mut failures);
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(self.workers));
            let mut tasks = JoinSet::new();

            for path in files {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let identifier = Arc::clone(&self.identifier);
                tasks.spawn(async move {
                    let result = identify_blocking(identifier, path).await;
                    drop(permit);
                    result
                });

                // Drain whatever already finished so display stays live.
                while let Some(joined) = tasks.try_join_next() {
                    self.record_joined(joined, &mut identifications, &mut failures);
                }
            }

            while let Some(joined) = tasks.join_next().await {
                self.record_joined(joined, &mut identifications, &mut failures);
            }
        }

        identifications.sort_by(|a, b| a.path.cmp(&b.path));
        failures.sort_by(|a, b| a.path().cmp(b.path()));

        let outcome = BatchOutcome {
            identifications,
            failures,
            elapsed: start.elapsed(),
        };
        info!(
            "batch: {} identified, {} failed, {} correct in {:.2}s",
            outcome.identifications.len(),
            outcome.failures.len(),
            outcome.correct(),
            outcome.elapsed.as_secs_f64()
        );
        outcome
    }

    fn record_joined(
        &self,
        joined: Result<Result<Identification, PipelineError>, tokio::task::JoinError>,
        identifications: &mut Vec<Identification>,
        failures: &mut Vec<PipelineError>,
    ) {
        match joined {
            Ok(result) => self.record(result, identifications, failures),
            // identify_blocking never panics itself; a cancelled task only
            // happens on runtime shutdown.
            Err(e) => warn!("batch: task lost: {e}"),
        }
    }

    fn record(
        &self,
        result: Result<Identification, PipelineError>,
        identifications: &mut Vec<Identification>,
        failures: &mut Vec<PipelineError>,
    ) {
        let failure = match result {
            Ok(identification) => match identification.verdict() {
                Ok(_) => {
                    if self.display {
                        println!("{}", identification.display_line());
                    }
                    identifications.push(identification);
                    return;
                }
                Err(e) => e,
            },
            Err(e) => e,
        };
        warn!("batch: {failure}");
        failures.push(failure);
    }
}

async fn identify_blocking(
    identifier: Arc<Identifier>,
    path: PathBuf,
) -> Result<Identification, PipelineError> {
    let worker_path = path.clone();
    match tokio::task::spawn_blocking(move || identifier.identify_file(&worker_path)).await {
        Ok(result) => result,
        Err(e) => Err(PipelineError::Worker {
            path,
            reason: e.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Every file under `root` (recursively) whose extension is in `extensions`,
/// compared case-insensitively.  Sorted by path.
pub async fn discover(root: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    // Surface a missing root instead of silently finding nothing.
    tokio::fs::metadata(root).await?;

    let mut walker = WalkDir::new(root).into_stream();
    let mut found = Vec::new();

    while let Some(next) = walker.next().await {
        match next {
            Ok(entry) => {
                let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
                let path = entry.path();
                if is_file && has_extension(&path, extensions) {
                    found.push(path);
                }
            }
            Err(e) => warn!("batch: walkdir error: {e}"),
        }
    }

    found.sort();
    Ok(found)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
