//! Configuration for training and serving the categorizer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VietcatError};
use crate::ml::categorizer::calibration::CalibrationConfig;
use crate::ml::categorizer::svm::SvmParams;
use crate::ml::categorizer::tfidf::DEFAULT_MAX_FEATURES;

/// Settings for an offline training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Upper bound on the vocabulary size.
    pub max_features: usize,
    /// Fraction of every category held out for evaluation.
    pub test_ratio: f64,
    /// Seed for the split and for the SVM sample order.
    pub seed: u64,
    /// Held-out accuracy below which a warning is logged.
    pub quality_threshold: f64,
    pub svm: SvmParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            max_features: DEFAULT_MAX_FEATURES,
            test_ratio: 0.2,
            seed: 42,
            quality_threshold: 0.95,
            svm: SvmParams::default(),
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_features == 0 {
            return Err(VietcatError::invalid_config(
                "max_features must be greater than zero",
            ));
        }
        if !(0.0..1.0).contains(&self.test_ratio) {
            return Err(VietcatError::invalid_config(format!(
                "test_ratio must be within [0, 1), got {}",
                self.test_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(VietcatError::invalid_config(format!(
                "quality_threshold must be within [0, 1], got {}",
                self.quality_threshold
            )));
        }
        self.svm.validate()
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizerConfig {
    pub training: TrainingConfig,
    pub calibration: CalibrationConfig,
}

impl CategorizerConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VietcatError::invalid_config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse a JSON configuration.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| VietcatError::invalid_config(format!("Invalid configuration: {e}")))
    }
}
