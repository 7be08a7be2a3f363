//! Offline training and evaluation pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::language::vietnamese::VietnameseAnalyzer;
use crate::error::{Result, VietcatError};
use crate::ml::categorizer::calibration::CalibrationConfig;
use crate::ml::categorizer::categorizer::SvmCategorizer;
use crate::ml::categorizer::config::TrainingConfig;
use crate::ml::categorizer::core::validate_corpus;
use crate::ml::categorizer::serializer::FORMAT_VERSION;
use crate::ml::categorizer::svm::LinearSvm;
use crate::ml::categorizer::tfidf::TfIdfVectorizer;
use crate::ml::categorizer::types::{CategoryCatalog, CategoryId, TransactionSample};

/// Which split the reported accuracy was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationSplit {
    /// The held-out test split.
    Test,
    /// The training split, used when the corpus is too small to hold out data.
    Train,
}

/// CRC-32 of each artifact a saved model was written with.
///
/// Zero until the model is saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactChecksums {
    pub vectorizer: u32,
    pub classifier: u32,
    pub catalog: u32,
}

/// Description of a trained model, persisted as `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub feature_extractor: String,
    pub accuracy: f64,
    pub training_samples: usize,
    pub test_samples: usize,
    pub vocabulary_size: usize,
    /// Number of categories.
    pub categories: usize,
    pub trained_date: DateTime<Utc>,
    pub language: String,
    /// Crate version that produced the model.
    pub version: String,
    pub format_version: u16,
    pub evaluation_split: EvaluationSplit,
    pub seed: u64,
    pub artifacts: ArtifactChecksums,
}

/// Accuracy for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub samples: usize,
    pub correct: usize,
    pub accuracy: f64,
}

/// Result of evaluating a model on a labelled sample set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub samples: usize,
    pub correct: usize,
    pub per_category: BTreeMap<CategoryId, CategoryAccuracy>,
}

/// Output of a training run.
#[derive(Debug)]
pub struct TrainedModel {
    pub vectorizer: TfIdfVectorizer,
    pub classifier: LinearSvm,
    pub catalog: CategoryCatalog,
    pub metadata: ModelMetadata,
    pub evaluation: EvaluationReport,
}

impl TrainedModel {
    /// Turn the freshly trained model into a ready-to-use categorizer.
    pub fn into_categorizer(self, calibration: CalibrationConfig) -> SvmCategorizer {
        SvmCategorizer::new(self.vectorizer, self.classifier, self.catalog, calibration)
    }
}

/// Trains a TF-IDF + linear SVM model from a labelled corpus.
pub struct ModelTrainer {
    config: TrainingConfig,
    analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for ModelTrainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelTrainer")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl ModelTrainer {
    /// Create a trainer using the built-in Vietnamese analyzer.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        Ok(Self::with_analyzer(
            config,
            Arc::new(VietnameseAnalyzer::new()?),
        ))
    }

    /// Create a trainer with a custom analyzer.
    pub fn with_analyzer(config: TrainingConfig, analyzer: Arc<dyn Analyzer>) -> Self {
        ModelTrainer { config, analyzer }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the full training pipeline.
    pub fn train(&self, samples: &[TransactionSample]) -> Result<TrainedModel> {
        let never = AtomicBool::new(false);
        self.train_with_cancel(samples, &never)
    }

    /// Run the full training pipeline, stopping early once `cancel` is set.
    ///
    /// Steps: validate the corpus, split it per category, fit the vectorizer
    /// on the training texts only, train the classifier, then evaluate on
    /// the held-out texts.
    pub fn train_with_cancel(
        &self,
        samples: &[TransactionSample],
        cancel: &AtomicBool,
    ) -> Result<TrainedModel> {
        self.config.validate()?;
        validate_corpus(samples)?;
        let catalog = CategoryCatalog::from_samples(samples)?;

        log::info!(
            "Training on {} samples across {} categories",
            samples.len(),
            catalog.len()
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (train, test) = stratified_split(samples, self.config.test_ratio, &mut rng)?;
        log::info!("Split: {} training, {} test samples", train.len(), test.len());

        let texts: Vec<String> = train.iter().map(|s| s.description.clone()).collect();
        let labels: Vec<CategoryId> = train.iter().map(|s| s.category_id).collect();

        let mut vectorizer = TfIdfVectorizer::new(self.analyzer.clone(), self.config.max_features);
        let x_train = vectorizer.fit_transform(&texts)?;
        log::info!("Vocabulary size: {}", vectorizer.vocabulary_size());

        let mut classifier = LinearSvm::new(self.config.svm);
        classifier.fit_with_cancel(&x_train, &labels, &mut rng, cancel)?;

        let (evaluation, evaluation_split) = if test.is_empty() {
            log::warn!("Held-out split is empty; reporting accuracy on the training split");
            (
                Self::evaluate(&vectorizer, &classifier, &train)?,
                EvaluationSplit::Train,
            )
        } else {
            (
                Self::evaluate(&vectorizer, &classifier, &test)?,
                EvaluationSplit::Test,
            )
        };

        log::info!(
            "Accuracy on {:?} split: {:.2}% ({}/{})",
            evaluation_split,
            evaluation.accuracy * 100.0,
            evaluation.correct,
            evaluation.samples
        );
        if evaluation.accuracy < self.config.quality_threshold {
            log::warn!(
                "Model accuracy {:.2}% is below the quality threshold of {:.2}%",
                evaluation.accuracy * 100.0,
                self.config.quality_threshold * 100.0
            );
        }

        let metadata = ModelMetadata {
            model_type: "linear_svm_ovr".to_string(),
            feature_extractor: "tfidf".to_string(),
            accuracy: evaluation.accuracy,
            training_samples: train.len(),
            test_samples: test.len(),
            vocabulary_size: vectorizer.vocabulary_size(),
            categories: classifier.n_classes(),
            trained_date: Utc::now(),
            language: "vi".to_string(),
            version: crate::VERSION.to_string(),
            format_version: FORMAT_VERSION,
            evaluation_split,
            seed: self.config.seed,
            artifacts: ArtifactChecksums::default(),
        };

        Ok(TrainedModel {
            vectorizer,
            classifier,
            catalog,
            metadata,
            evaluation,
        })
    }

    /// Measure a model's accuracy on labelled samples.
    pub fn evaluate(
        vectorizer: &TfIdfVectorizer,
        classifier: &LinearSvm,
        samples: &[TransactionSample],
    ) -> Result<EvaluationReport> {
        if samples.is_empty() {
            return Err(VietcatError::invalid_argument(
                "Cannot evaluate on an empty sample set",
            ));
        }

        let mut per_category: BTreeMap<CategoryId, CategoryAccuracy> = BTreeMap::new();
        let mut correct = 0;
        for sample in samples {
            let features = vectorizer.transform(&sample.description)?;
            let hit = classifier.predict(&features)? == sample.category_id;

            let entry = per_category
                .entry(sample.category_id)
                .or_insert(CategoryAccuracy {
                    samples: 0,
                    correct: 0,
                    accuracy: 0.0,
                });
            entry.samples += 1;
            if hit {
                entry.correct += 1;
                correct += 1;
            }
        }

        for entry in per_category.values_mut() {
            entry.accuracy = entry.correct as f64 / entry.samples as f64;
        }

        Ok(EvaluationReport {
            accuracy: correct as f64 / samples.len() as f64,
            samples: samples.len(),
            correct,
            per_category,
        })
    }
}

/// Split `samples` into train and test sets independently per category.
///
/// Each category with `n` samples contributes `round(test_ratio * n)` test
/// samples, capped at `n - 1` so every category keeps a training sample.
/// The pooled training set is shuffled once more before it is returned.
pub fn stratified_split<R: Rng + ?Sized>(
    samples: &[TransactionSample],
    test_ratio: f64,
    rng: &mut R,
) -> Result<(Vec<TransactionSample>, Vec<TransactionSample>)> {
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(VietcatError::invalid_config(format!(
            "test_ratio must be within [0, 1), got {test_ratio}"
        )));
    }

    let mut by_category: BTreeMap<CategoryId, Vec<&TransactionSample>> = BTreeMap::new();
    for sample in samples {
        by_category.entry(sample.category_id).or_default().push(sample);
    }

    let mut train = Vec::with_capacity(samples.len());
    let mut test = Vec::new();
    for (category_id, mut group) in by_category {
        group.shuffle(rng);

        let n = group.len();
        let n_test = ((test_ratio * n as f64).round() as usize).min(n - 1);
        log::debug!("Category {category_id}: {} train, {n_test} test", n - n_test);

        let (test_part, train_part) = group.split_at(n_test);
        test.extend(test_part.iter().map(|&s| s.clone()));
        train.extend(train_part.iter().map(|&s| s.clone()));
    }

    train.shuffle(rng);
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(description: &str, category: &str, id: CategoryId) -> TransactionSample {
        TransactionSample::new(description, category, id)
    }

    fn food_and_transport() -> Vec<TransactionSample> {
        vec![
            sample("phở bò", "Ăn uống", 1),
            sample("cơm tấm sườn", "Ăn uống", 1),
            sample("bún chả Hà Nội", "Ăn uống", 1),
            sample("bánh mì thịt", "Ăn uống", 1),
            sample("trà sữa trân châu", "Ăn uống", 1),
            sample("grab bike đi làm", "Di chuyển", 2),
            sample("xe buýt số 8", "Di chuyển", 2),
            sample("đổ xăng xe máy", "Di chuyển", 2),
            sample("taxi sân bay", "Di chuyển", 2),
            sample("vé tàu hỏa", "Di chuyển", 2),
        ]
    }

    fn small_config() -> TrainingConfig {
        let mut config = TrainingConfig {
            max_features: 100,
            ..TrainingConfig::default()
        };
        config.svm.max_iterations = 200;
        config
    }

    #[test]
    fn test_stratified_split_sizes() {
        let mut samples = Vec::new();
        for i in 0..10 {
            samples.push(sample(&format!("an {i}"), "A", 1));
        }
        for i in 0..7 {
            samples.push(sample(&format!("di {i}"), "B", 2));
        }
        for i in 0..3 {
            samples.push(sample(&format!("mua {i}"), "C", 3));
        }

        let mut rng = StdRng::seed_from_u64(42);
        let (train, test) = stratified_split(&samples, 0.2, &mut rng).unwrap();

        assert_eq!(train.len() + test.len(), samples.len());
        let count = |set: &[TransactionSample], id| set.iter().filter(|s| s.category_id == id).count();
        // round(0.2 * 10) = 2, round(0.2 * 7) = 1, round(0.2 * 3) = 1
        assert_eq!(count(&test, 1), 2);
        assert_eq!(count(&test, 2), 1);
        assert_eq!(count(&test, 3), 1);

        for t in &test {
            assert!(!train.contains(t));
        }
    }

    #[test]
    fn test_stratified_split_keeps_a_training_sample() {
        let samples = vec![sample("pho", "A", 1), sample("grab", "B", 2)];
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = stratified_split(&samples, 0.9, &mut rng).unwrap();

        assert_eq!(train.len(), 2);
        assert!(test.is_empty());
    }

    #[test]
    fn test_stratified_split_is_deterministic() {
        let samples = food_and_transport();
        let a = stratified_split(&samples, 0.2, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = stratified_split(&samples, 0.2, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stratified_split_rejects_bad_ratio() {
        let samples = food_and_transport();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(stratified_split(&samples, 1.0, &mut rng).is_err());
        assert!(stratified_split(&samples, -0.1, &mut rng).is_err());
    }

    #[test]
    fn test_train_pipeline() {
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let model = trainer.train(&food_and_transport()).unwrap();

        assert_eq!(model.classifier.classes(), &[1, 2]);
        assert_eq!(model.metadata.categories, 2);
        assert_eq!(model.metadata.training_samples, 8);
        assert_eq!(model.metadata.test_samples, 2);
        assert_eq!(model.metadata.evaluation_split, EvaluationSplit::Test);
        assert_eq!(model.metadata.language, "vi");
        assert_eq!(model.metadata.vocabulary_size, model.vectorizer.vocabulary_size());
        assert_eq!(model.evaluation.samples, 2);
        assert_eq!(model.catalog.name_of(2), Some("Di chuyển"));
    }

    #[test]
    fn test_vectorizer_fitted_on_training_texts_only() {
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let samples = food_and_transport();
        let model = trainer.train(&samples).unwrap();

        assert_eq!(model.vectorizer.n_documents(), model.metadata.training_samples);
    }

    #[test]
    fn test_tiny_corpus_evaluates_on_train() {
        let samples = vec![
            sample("pho bo", "Ăn uống", 1),
            sample("com tam", "Ăn uống", 1),
            sample("grab bike", "Di chuyển", 2),
            sample("xe buyt", "Di chuyển", 2),
        ];
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let model = trainer.train(&samples).unwrap();

        assert_eq!(model.metadata.evaluation_split, EvaluationSplit::Train);
        assert_eq!(model.metadata.test_samples, 0);
        assert_eq!(model.evaluation.samples, 4);
        assert_eq!(model.evaluation.accuracy, 1.0);
    }

    #[test]
    fn test_training_is_reproducible() {
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let a = trainer.train(&food_and_transport()).unwrap();
        let b = trainer.train(&food_and_transport()).unwrap();

        assert_eq!(a.vectorizer.terms(), b.vectorizer.terms());
        assert_eq!(a.classifier, b.classifier);
    }

    #[test]
    fn test_invalid_corpus_rejected() {
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let err = trainer.train(&[]).unwrap_err();
        assert!(matches!(err, VietcatError::Corpus(_)));

        let single = vec![sample("pho", "A", 1), sample("com", "A", 1)];
        let err = trainer.train(&single).unwrap_err();
        assert!(matches!(err, VietcatError::Corpus(_)));
    }

    #[test]
    fn test_cancelled_training() {
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let cancel = AtomicBool::new(true);
        let err = trainer
            .train_with_cancel(&food_and_transport(), &cancel)
            .unwrap_err();
        assert!(matches!(err, VietcatError::OperationCancelled(_)));
    }

    #[test]
    fn test_evaluate_per_category() {
        let trainer = ModelTrainer::new(small_config()).unwrap();
        let samples = food_and_transport();
        let model = trainer.train(&samples).unwrap();

        let report = ModelTrainer::evaluate(&model.vectorizer, &model.classifier, &samples).unwrap();
        assert_eq!(report.samples, 10);
        assert_eq!(report.per_category.len(), 2);
        assert_eq!(report.per_category[&1].samples, 5);
        let total: usize = report.per_category.values().map(|c| c.correct).sum();
        assert_eq!(total, report.correct);

        assert!(ModelTrainer::evaluate(&model.vectorizer, &model.classifier, &[]).is_err());
    }
}
