//! Reference library — named golden patterns and their on-disk cache.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use televoice::audio::SymphoniaFrontend;
//! use televoice::features::MfccExtractor;
//! use televoice::library::{load_or_build, RetryPolicy};
//!
//! let golden = Path::new("golden");
//! let library = load_or_build(
//!     golden,
//!     &golden.join("golden_patterns.json"),
//!     RetryPolicy::default(),
//!     &SymphoniaFrontend::new(8_000, 0),
//!     &MfccExtractor::default(),
//! )
//! .unwrap();
//! println!("{} references", library.len());
//! ```

pub mod reference;
pub mod store;

pub use reference::{ReferenceLibrary, ReferencePattern};
pub use store::{build_library, load_library, load_or_build, save_library, RetryPolicy, StoreError};
