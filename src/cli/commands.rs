//! Command implementations for the vietcat CLI.

use std::path::Path;
use std::time::Instant;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::Result;
use crate::ml::categorizer::{
    self, CategorizerConfig, CategoryCatalog, ModelStore, ModelTrainer, SvmCategorizer,
    TransactionClassifier,
};

/// Execute a CLI command.
pub fn execute_command(args: VietcatArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train_model(train_args, &args),
        Command::Classify(classify_args) => classify(classify_args, &args),
        Command::Evaluate(evaluate_args) => evaluate_model(evaluate_args, &args),
        Command::Inspect(inspect_args) => inspect_model(inspect_args, &args),
    }
}

fn load_config(path: Option<&Path>) -> Result<CategorizerConfig> {
    match path {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            CategorizerConfig::from_file(path)
        }
        None => Ok(CategorizerConfig::default()),
    }
}

/// Train a model and write its artifacts.
fn train_model(args: &TrainArgs, cli_args: &VietcatArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?.training;
    if let Some(max_features) = args.max_features {
        config.max_features = max_features;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(epochs) = args.epochs {
        config.svm.max_iterations = epochs;
    }

    let samples = categorizer::load_corpus(&args.corpus)?;
    let start = Instant::now();
    let trainer = ModelTrainer::new(config)?;
    let model = trainer.train(&samples)?;
    let duration = start.elapsed();

    ModelStore::create_dir(&args.model_dir)?.save_trained(&model)?;
    log::info!("Saved model to {}", args.model_dir.display());

    output_result(
        "Model trained successfully",
        &TrainingResult {
            model_dir: args.model_dir.to_string_lossy().to_string(),
            training_samples: model.metadata.training_samples,
            test_samples: model.metadata.test_samples,
            evaluation_split: model.metadata.evaluation_split,
            vocabulary_size: model.metadata.vocabulary_size,
            categories: model.metadata.categories,
            accuracy: model.metadata.accuracy,
            quality_threshold: trainer.config().quality_threshold,
            duration_ms: duration.as_millis() as u64,
        },
        cli_args,
    )
}

/// Categorize one description.
fn classify(args: &ClassifyArgs, cli_args: &VietcatArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = ModelStore::open_dir(&args.model_dir)?;
    let mut categorizer = SvmCategorizer::load(&store, config.calibration)?;
    if let Some(path) = &args.catalog {
        log::info!("Using category catalog {}", path.display());
        categorizer = categorizer.with_catalog(CategoryCatalog::load(path)?);
    }

    let categorization = categorizer.categorize(&args.description, args.amount)?;
    if categorization.requires_human_review {
        log::info!("Prediction for {:?} needs review", args.description);
    }

    output_result(
        "Transaction categorized",
        &ClassificationResult {
            description: args.description.clone(),
            amount: args.amount,
            classifier: categorizer.name().to_string(),
            categorization,
        },
        cli_args,
    )
}

/// Evaluate a saved model on a labelled corpus.
fn evaluate_model(args: &EvaluateArgs, cli_args: &VietcatArgs) -> Result<()> {
    let model = ModelStore::open_dir(&args.model_dir)?.load()?;
    let samples = categorizer::load_corpus(&args.corpus)?;
    let names = CategoryCatalog::from_samples(&samples)?;

    let unknown = samples
        .iter()
        .filter(|s| !model.classifier.classes().contains(&s.category_id))
        .count();
    if unknown > 0 {
        log::warn!("{unknown} samples belong to categories the model was not trained on");
    }

    let report = ModelTrainer::evaluate(&model.vectorizer, &model.classifier, &samples)?;
    let categories = report
        .per_category
        .keys()
        .map(|&id| (id, names.display_name(id)))
        .collect();

    output_result(
        "Model evaluated",
        &EvaluationResult {
            model_dir: args.model_dir.to_string_lossy().to_string(),
            corpus: args.corpus.to_string_lossy().to_string(),
            categories,
            report,
        },
        cli_args,
    )
}

/// Show model metadata and artifact headers.
fn inspect_model(args: &InspectArgs, cli_args: &VietcatArgs) -> Result<()> {
    let inspection = ModelStore::open_dir(&args.model_dir)?.inspect()?;

    output_result(
        "Model information",
        &InspectionResult {
            model_dir: args.model_dir.to_string_lossy().to_string(),
            inspection,
        },
        cli_args,
    )
}
