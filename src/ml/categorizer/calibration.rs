//! Confidence calibration of raw classifier scores.
//!
//! Raw one-vs-rest SVM margins are turned into a probability distribution
//! with a temperature-scaled softmax. The calibrator then decides whether a
//! prediction is trustworthy enough to apply automatically or needs a human
//! to confirm it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VietcatError};
use crate::ml::categorizer::types::{Alternative, CategoryCatalog, CategoryId};

/// Review thresholds and softmax temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Softmax temperature; values below 1.0 sharpen the distribution.
    pub temperature: f64,
    /// Predictions below this confidence require review.
    pub min_confidence: f64,
    /// Required gap between the top two probabilities.
    pub min_margin: f64,
    /// Normalized entropy above which a prediction requires review.
    pub max_entropy: f64,
    /// Number of runner-up categories to report.
    pub max_alternatives: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            temperature: 1.0,
            min_confidence: 0.5,
            min_margin: 0.1,
            max_entropy: 0.9,
            max_alternatives: 3,
        }
    }
}

impl CalibrationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(VietcatError::invalid_config(format!(
                "temperature must be a positive finite number, got {}",
                self.temperature
            )));
        }
        for (name, value) in [
            ("min_confidence", self.min_confidence),
            ("min_margin", self.min_margin),
            ("max_entropy", self.max_entropy),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VietcatError::invalid_config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Calibrated view of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedPrediction {
    pub category_id: CategoryId,
    /// Calibrated probability of the predicted category.
    pub confidence: f64,
    /// Top probability minus the runner-up probability.
    pub margin: f64,
    /// Shannon entropy of the distribution divided by `ln(classes)`.
    pub entropy: f64,
    pub alternatives: Vec<Alternative>,
    pub requires_human_review: bool,
    pub explanation: String,
}

/// Turns raw per-class scores into a calibrated confidence and review flag.
///
/// Invalid configuration fails closed: the calibrator still produces
/// probabilities (at temperature 1.0) but flags every prediction for review.
#[derive(Debug, Clone)]
pub struct ConfidenceCalibrator {
    config: CalibrationConfig,
    config_error: Option<String>,
}

impl Default for ConfidenceCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl ConfidenceCalibrator {
    /// Create a calibrator.
    pub fn new(config: CalibrationConfig) -> Self {
        let config_error = match config.validate() {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Invalid calibration config, all predictions will require review: {e}");
                Some(e.to_string())
            }
        };

        ConfidenceCalibrator {
            config,
            config_error,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Whether the configuration was rejected.
    pub fn is_fail_closed(&self) -> bool {
        self.config_error.is_some()
    }

    /// Calibrate the raw `scores` of a prediction.
    ///
    /// `classes` gives the category id of each score, in the classifier's
    /// class order. Names are resolved through `catalog`.
    pub fn calibrate(
        &self,
        predicted: CategoryId,
        classes: &[CategoryId],
        scores: &[f64],
        catalog: &CategoryCatalog,
    ) -> Result<CalibratedPrediction> {
        if classes.is_empty() || classes.len() != scores.len() {
            return Err(VietcatError::invalid_argument(format!(
                "Expected one score per class, got {} classes and {} scores",
                classes.len(),
                scores.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(VietcatError::invalid_argument("Scores must be finite"));
        }
        let top = classes
            .iter()
            .position(|&id| id == predicted)
            .ok_or_else(|| {
                VietcatError::invalid_argument(format!(
                    "Predicted category {predicted} is not in the class set"
                ))
            })?;

        let temperature = if self.config_error.is_some() {
            1.0
        } else {
            self.config.temperature
        };
        let probabilities = softmax(scores, temperature);
        let confidence = probabilities[top];

        // Runner-ups by probability, ties in class order.
        let mut ranked: Vec<usize> = (0..classes.len()).filter(|&i| i != top).collect();
        ranked.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

        let runner_up = ranked.first().map(|&i| probabilities[i]).unwrap_or(0.0);
        let margin = confidence - runner_up;
        let entropy = normalized_entropy(&probabilities);

        let alternatives = ranked
            .iter()
            .take(self.config.max_alternatives)
            .map(|&i| Alternative {
                category_id: classes[i],
                category_name: catalog.display_name(classes[i]),
                score: probabilities[i],
            })
            .collect();

        let mut reasons = Vec::new();
        if let Some(error) = &self.config_error {
            reasons.push(format!("calibration config rejected ({error})"));
        } else {
            if confidence < self.config.min_confidence {
                reasons.push(format!(
                    "low confidence ({:.1}% < {:.1}%)",
                    confidence * 100.0,
                    self.config.min_confidence * 100.0
                ));
            }
            if classes.len() > 1 && margin < self.config.min_margin {
                reasons.push(format!(
                    "ambiguous with '{}' (margin {margin:.3})",
                    catalog.display_name(classes[ranked[0]])
                ));
            }
            if entropy > self.config.max_entropy {
                reasons.push(format!("high uncertainty (entropy {entropy:.3})"));
            }
        }
        if !catalog.contains(predicted) {
            reasons.push(format!("category {predicted} missing from catalog"));
        }

        let mut explanation = format!(
            "Matched '{}' with {:.1}% confidence.",
            catalog.display_name(predicted),
            confidence * 100.0
        );
        if !reasons.is_empty() {
            explanation.push_str(" Needs review: ");
            explanation.push_str(&reasons.join("; "));
            explanation.push('.');
        }

        Ok(CalibratedPrediction {
            category_id: predicted,
            confidence,
            margin,
            entropy,
            alternatives,
            requires_human_review: !reasons.is_empty(),
            explanation,
        })
    }
}

/// Temperature-scaled softmax with max subtraction.
///
/// Returns a uniform distribution if the input cannot be normalized.
pub fn softmax(scores: &[f64], temperature: f64) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let scaled: Vec<f64> = scores.iter().map(|&s| s / temperature).collect();
    let max_val = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp_vals: Vec<f64> = scaled.iter().map(|&s| (s - max_val).exp()).collect();
    let total: f64 = exp_vals.iter().sum();

    if total == 0.0 || !total.is_finite() {
        return vec![1.0 / scores.len() as f64; scores.len()];
    }

    exp_vals.into_iter().map(|e| e / total).collect()
}

/// Shannon entropy of `probabilities`, normalized to `[0, 1]`.
///
/// 0.0 means all mass on one class, 1.0 means uniform.
pub fn normalized_entropy(probabilities: &[f64]) -> f64 {
    if probabilities.len() < 2 {
        return 0.0;
    }

    let max_entropy = (probabilities.len() as f64).ln();
    let mut h = 0.0;
    for &p in probabilities {
        if p > 1e-15 {
            h -= p * p.ln();
        }
    }
    (h / max_entropy).clamp(0.0, 1.0)
}
