//! # vietcat
//!
//! Vietnamese transaction text classification.
//!
//! ## Features
//!
//! - Diacritic-folding text analysis pipeline for Vietnamese
//! - TF-IDF feature extraction with a bounded, deterministic vocabulary
//! - One-vs-rest linear SVM trained with Pegasos-style sub-gradient descent
//! - Confidence calibration with human-review flags
//! - Versioned, checksummed binary model artifacts over pluggable storage

pub mod analysis;
pub mod cli;
pub mod error;
pub mod ml;
pub mod storage;
pub mod util;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
