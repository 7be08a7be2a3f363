//! Machine learning components for vietcat.
//!
//! The only model family shipped today is the transaction categorizer: a
//! TF-IDF vectorizer feeding a one-vs-rest linear SVM, followed by a
//! confidence calibrator.

pub mod categorizer;
