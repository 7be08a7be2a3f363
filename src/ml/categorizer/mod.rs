//! Vietnamese transaction categorizer: TF-IDF features, a one-vs-rest
//! linear SVM and confidence calibration.
//!
//! # Architecture
//!
//! - `TransactionClassifier` trait: common interface for categorizers
//! - `SvmCategorizer`: inference over a loaded model
//! - `TfIdfVectorizer`: feature extraction on top of the Vietnamese analyzer
//! - `LinearSvm`: one-vs-rest linear SVM trained by sub-gradient descent
//! - `ConfidenceCalibrator`: softmax calibration and human-review flags
//! - `ModelTrainer`: stratified split, training and evaluation
//! - `ModelStore`: versioned, checksummed artifacts over any `Storage`
//!
//! # Example
//!
//! ```rust,no_run
//! use vietcat::ml::categorizer::{
//!     self, CalibrationConfig, ModelStore, ModelTrainer, TrainingConfig, TransactionClassifier,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let samples = categorizer::load_corpus("corpus.json")?;
//! let model = ModelTrainer::new(TrainingConfig::default())?.train(&samples)?;
//! ModelStore::create_dir("model")?.save_trained(&model)?;
//!
//! let classifier = categorizer::new_svm_based("model", CalibrationConfig::default())?;
//! let result = classifier.categorize("Đổ xăng Petrolimex", Some(80000.0))?;
//! println!("{} ({:.0}%)", result.category_name, result.confidence * 100.0);
//! # Ok(())
//! # }
//! ```

mod calibration;
mod categorizer;
mod classifier;
mod config;
mod core;
mod serializer;
mod store;
mod svm;
mod tfidf;
mod trainer;
mod types;

// Public exports
pub use calibration::{
    CalibratedPrediction, CalibrationConfig, ConfidenceCalibrator, normalized_entropy, softmax,
};
pub use categorizer::SvmCategorizer;
pub use classifier::TransactionClassifier;
pub use config::{CategorizerConfig, TrainingConfig};
pub use self::core::{load_corpus, new_svm_based, parse_corpus, validate_corpus};
pub use serializer::{
    ArtifactInfo, ArtifactKind, ClassifierArtifact, FORMAT_VERSION, inspect_artifact,
    read_classifier, read_vectorizer, write_classifier, write_vectorizer,
};
pub use store::{
    CATALOG_FILE, CLASSIFIER_FILE, LoadedModel, METADATA_FILE, ModelInspection, ModelStore,
    VECTORIZER_FILE,
};
pub use svm::{LinearSvm, SvmParams};
pub use tfidf::{DEFAULT_MAX_FEATURES, TfIdfVectorizer, l2_normalize};
pub use trainer::{
    ArtifactChecksums, CategoryAccuracy, EvaluationReport, EvaluationSplit, ModelMetadata,
    ModelTrainer, TrainedModel, stratified_split,
};
pub use types::{
    Alternative, Categorization, Category, CategoryCatalog, CategoryId, CategoryType, Prediction,
    TransactionSample,
};
