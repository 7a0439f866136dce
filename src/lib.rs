//! Telephone-call audio classification by golden-pattern matching.
//!
//! A target clip is decoded to 8 kHz mono PCM, turned into an MFCC
//! [`FeatureSequence`](features::FeatureSequence) and compared against a
//! library of named reference sequences with a sliding-window squared
//! distance.  The resulting [`DistanceMap`](matcher::DistanceMap) is then
//! classified into a category label ("inbusy", "voicemail", "typical", …).
//!
//! ```text
//! AudioFrontend → FeatureExtractor → matcher::identify ──▶ DistanceMap
//!                                        ▲                    │
//!                               ReferenceLibrary       classify::classify
//!                                                             ▼
//!                                                       Classification
//! ```

pub mod audio;
pub mod classify;
pub mod config;
pub mod features;
pub mod library;
pub mod matcher;
pub mod pipeline;
pub mod report;
