//! Identification pipeline — single files and whole directories.
//!
//! # Architecture
//!
//! ```text
//!                      Identifier (Arc)
//!   ┌───────────────────────────────────────────────────┐
//!   │ AudioFrontend → FeatureExtractor → matcher → classify │
//!   └───────────────────────────────────────────────────┘
//!          ▲                                   │
//!          │ identify_file(path)               ▼
//!   BatchRunner ── spawn_blocking × workers ─▶ Identification / PipelineError
//!          ▲
//!          └─ discover(root, extensions)   (async-walkdir)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use televoice::audio::SymphoniaFrontend;
//! use televoice::classify::ClassifierConfig;
//! use televoice::features::MfccExtractor;
//! use televoice::library::{load_library, RetryPolicy};
//! use televoice::matcher::SearchParams;
//! use televoice::pipeline::{BatchRunner, Identifier};
//!
//! #[tokio::main]
//! async fn main() {
//!     let library = load_library(Path::new("golden/golden_patterns.json"), RetryPolicy::default())
//!         .unwrap();
//!     let identifier = Arc::new(Identifier::new(
//!         Arc::new(SymphoniaFrontend::new(8_000, 0)),
//!         Arc::new(MfccExtractor::default()),
//!         Arc::new(library),
//!         SearchParams::default(),
//!         ClassifierConfig::default(),
//!     ));
//!
//!     let outcome = BatchRunner::new(identifier, 8)
//!         .with_display(true)
//!         .run_dir(Path::new("test_audio"), &["wav".into(), "mp3".into()])
//!         .await
//!         .unwrap();
//!     println!("{} / {} correct", outcome.correct(), outcome.total());
//! }
//! ```

pub mod identify;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use identify::{Identification, Identifier, PipelineError};
pub use runner::{discover, BatchOutcome, BatchRunner};
