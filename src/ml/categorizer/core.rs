//! Helper functions for loading corpora and creating categorizers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{Result, VietcatError};
use crate::ml::categorizer::calibration::CalibrationConfig;
use crate::ml::categorizer::categorizer::SvmCategorizer;
use crate::ml::categorizer::classifier::TransactionClassifier;
use crate::ml::categorizer::store::ModelStore;
use crate::ml::categorizer::types::{CategoryId, TransactionSample};

/// Load and validate a training corpus from a JSON file.
///
/// The file holds an array of
/// `{"description", "category", "category_id", "type"}` objects.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionSample>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        VietcatError::corpus(format!("Cannot read corpus {}: {e}", path.display()))
    })?;
    let samples = parse_corpus(&content)?;
    log::info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

/// Parse and validate a corpus from JSON text.
pub fn parse_corpus(content: &str) -> Result<Vec<TransactionSample>> {
    let samples: Vec<TransactionSample> = serde_json::from_str(content)
        .map_err(|e| VietcatError::corpus(format!("Malformed corpus: {e}")))?;
    validate_corpus(&samples)?;
    Ok(samples)
}

/// Check that a corpus can be trained on.
pub fn validate_corpus(samples: &[TransactionSample]) -> Result<()> {
    if samples.is_empty() {
        return Err(VietcatError::corpus("Corpus is empty"));
    }

    let mut names: BTreeMap<CategoryId, &str> = BTreeMap::new();
    for (i, sample) in samples.iter().enumerate() {
        if sample.description.trim().is_empty() {
            return Err(VietcatError::corpus(format!(
                "Sample {i} has an empty description"
            )));
        }
        if sample.category.trim().is_empty() {
            return Err(VietcatError::corpus(format!(
                "Sample {i} has an empty category name"
            )));
        }
        match names.get(&sample.category_id) {
            Some(&name) if name != sample.category => {
                return Err(VietcatError::corpus(format!(
                    "Sample {i}: category id {} is named both '{name}' and '{}'",
                    sample.category_id, sample.category
                )));
            }
            Some(_) => {}
            None => {
                names.insert(sample.category_id, &sample.category);
            }
        }
    }

    let distinct: BTreeSet<CategoryId> = names.keys().copied().collect();
    if distinct.len() < 2 {
        return Err(VietcatError::corpus(format!(
            "Corpus needs at least two categories, found {}",
            distinct.len()
        )));
    }

    Ok(())
}

/// Load the model in `model_dir` and wrap it as a classifier.
pub fn new_svm_based<P: AsRef<Path>>(
    model_dir: P,
    calibration: CalibrationConfig,
) -> Result<Box<dyn TransactionClassifier>> {
    let store = ModelStore::open_dir(model_dir)?;
    Ok(Box::new(SvmCategorizer::load(&store, calibration)?))
}
