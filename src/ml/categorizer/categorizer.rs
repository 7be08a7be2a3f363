//! Inference-side categorizer built on the TF-IDF vectorizer and linear SVM.

use crate::error::{Result, VietcatError};
use crate::ml::categorizer::calibration::{
    CalibratedPrediction, CalibrationConfig, ConfidenceCalibrator,
};
use crate::ml::categorizer::classifier::TransactionClassifier;
use crate::ml::categorizer::store::{LoadedModel, ModelStore};
use crate::ml::categorizer::svm::LinearSvm;
use crate::ml::categorizer::tfidf::TfIdfVectorizer;
use crate::ml::categorizer::types::{Categorization, CategoryCatalog, Prediction};

/// Categorizes transactions with a loaded model.
///
/// All state is read-only after construction; `categorize` takes `&self`
/// and can be called from many threads at once.
#[derive(Debug)]
pub struct SvmCategorizer {
    vectorizer: TfIdfVectorizer,
    classifier: LinearSvm,
    catalog: CategoryCatalog,
    calibrator: ConfidenceCalibrator,
}

impl SvmCategorizer {
    /// Assemble a categorizer from its parts.
    pub fn new(
        vectorizer: TfIdfVectorizer,
        classifier: LinearSvm,
        catalog: CategoryCatalog,
        calibration: CalibrationConfig,
    ) -> Self {
        SvmCategorizer {
            vectorizer,
            classifier,
            catalog,
            calibrator: ConfidenceCalibrator::new(calibration),
        }
    }

    /// Build from a model loaded through [`ModelStore::load`].
    pub fn from_loaded(model: LoadedModel, calibration: CalibrationConfig) -> Self {
        Self::new(model.vectorizer, model.classifier, model.catalog, calibration)
    }

    /// Load the model held by `store`.
    pub fn load(store: &ModelStore, calibration: CalibrationConfig) -> Result<Self> {
        Ok(Self::from_loaded(store.load()?, calibration))
    }

    /// Replace the category catalog, e.g. with the application's live one.
    pub fn with_catalog(mut self, catalog: CategoryCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn vectorizer(&self) -> &TfIdfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &LinearSvm {
        &self.classifier
    }

    /// Raw classifier output for a description.
    pub fn predict(&self, description: &str) -> Result<Prediction> {
        let features = self.vectorizer.transform(description)?;
        self.classifier.predict_with_confidence(&features)
    }

    /// Calibrated prediction for a description.
    pub fn calibrated(&self, description: &str) -> Result<CalibratedPrediction> {
        let prediction = self.predict(description)?;
        self.calibrator.calibrate(
            prediction.label,
            self.classifier.classes(),
            &prediction.scores,
            &self.catalog,
        )
    }
}

impl TransactionClassifier for SvmCategorizer {
    fn categorize(&self, description: &str, amount: Option<f64>) -> Result<Categorization> {
        if let Some(amount) = amount {
            if !amount.is_finite() {
                return Err(VietcatError::invalid_argument(format!(
                    "Amount must be a finite number, got {amount}"
                )));
            }
        }

        let calibrated = self.calibrated(description)?;
        log::debug!(
            "Categorized {description:?} as {} ({:.3})",
            calibrated.category_id,
            calibrated.confidence
        );

        let mut reasoning = calibrated.explanation;
        if let Some(amount) = amount {
            reasoning.push_str(&format!(" Amount: {amount}."));
        }

        Ok(Categorization {
            category_id: calibrated.category_id,
            category_name: self.catalog.display_name(calibrated.category_id),
            confidence: calibrated.confidence,
            alternatives: calibrated.alternatives,
            requires_human_review: calibrated.requires_human_review,
            reasoning,
        })
    }

    fn name(&self) -> &str {
        "svm_based"
    }
}
