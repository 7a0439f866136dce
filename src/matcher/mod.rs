//! Sliding-window matching — target features vs. every golden pattern.
//!
//! # Architecture
//!
//! ```text
//!  target FeatureSequence ─┐
//!                          ├─▶ identify (SearchParams) ─▶ DistanceMap
//!  ReferenceLibrary ───────┘        │
//!                                   ├─ match_pattern / scan  (one reference)
//!                                   └─ StopSignal            (shared early stop)
//! ```

pub mod distance;
pub mod search;
pub mod signal;
pub mod window;

pub use distance::{Distance, DistanceMap};
pub use search::{identify, SearchMode, SearchParams};
pub use signal::StopSignal;
pub use window::{match_pattern, MatchError};
