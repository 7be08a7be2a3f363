//! One-vs-rest linear SVM trained with Pegasos-style sub-gradient descent.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VietcatError};
use crate::ml::categorizer::calibration::softmax;
use crate::ml::categorizer::types::{CategoryId, Prediction};

/// Hyper-parameters of the linear SVM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    /// Inverse regularization strength; `lambda = 1 / c`.
    pub c: f64,
    /// Number of passes over the training set.
    pub max_iterations: usize,
    /// Learning rate of the first epoch.
    pub initial_learning_rate: f64,
    /// Learning rate decay: `lr = initial / (1 + epoch * decay)`.
    pub decay_rate: f64,
}

impl Default for SvmParams {
    fn default() -> Self {
        SvmParams {
            c: 1.0,
            max_iterations: 1000,
            initial_learning_rate: 0.1,
            decay_rate: 0.01,
        }
    }
}

impl SvmParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(VietcatError::invalid_config(format!(
                "c must be a positive finite number, got {}",
                self.c
            )));
        }
        if self.max_iterations == 0 {
            return Err(VietcatError::invalid_config(
                "max_iterations must be greater than zero",
            ));
        }
        if !(self.initial_learning_rate.is_finite() && self.initial_learning_rate > 0.0) {
            return Err(VietcatError::invalid_config(format!(
                "initial_learning_rate must be a positive finite number, got {}",
                self.initial_learning_rate
            )));
        }
        if !(self.decay_rate.is_finite() && self.decay_rate >= 0.0) {
            return Err(VietcatError::invalid_config(format!(
                "decay_rate must be a non-negative finite number, got {}",
                self.decay_rate
            )));
        }
        Ok(())
    }

    /// Regularization strength.
    pub fn lambda(&self) -> f64 {
        1.0 / self.c
    }

    /// Learning rate used during `epoch` (zero-based).
    pub fn learning_rate(&self, epoch: usize) -> f64 {
        self.initial_learning_rate / (1.0 + epoch as f64 * self.decay_rate)
    }
}

/// Multi-class linear SVM using a one-vs-rest decomposition.
///
/// Row `i` of the weight matrix and bias `i` belong to `classes()[i]`;
/// classes are sorted ascending at training time.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSvm {
    params: SvmParams,
    classes: Vec<CategoryId>,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    n_features: usize,
}

impl LinearSvm {
    /// Create an untrained classifier.
    pub fn new(params: SvmParams) -> Self {
        LinearSvm {
            params,
            classes: Vec::new(),
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
        }
    }

    /// Rebuild a trained classifier from persisted state.
    pub fn from_parts(
        params: SvmParams,
        classes: Vec<CategoryId>,
        weights: Vec<Vec<f64>>,
        biases: Vec<f64>,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(VietcatError::model("Classifier has no classes"));
        }
        if weights.len() != classes.len() || biases.len() != classes.len() {
            return Err(VietcatError::model(format!(
                "Classifier has {} classes, {} weight rows and {} biases",
                classes.len(),
                weights.len(),
                biases.len()
            )));
        }
        if !classes.windows(2).all(|w| w[0] < w[1]) {
            return Err(VietcatError::model(
                "Classifier classes are not strictly ascending",
            ));
        }

        let n_features = weights[0].len();
        if n_features == 0 || weights.iter().any(|row| row.len() != n_features) {
            return Err(VietcatError::model("Classifier weight rows are ragged"));
        }

        Ok(LinearSvm {
            params,
            classes,
            weights,
            biases,
            n_features,
        })
    }

    /// Train on feature rows `x` with labels `y`.
    ///
    /// `rng` drives the per-epoch shuffle; pass a seeded generator for
    /// reproducible models.
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        x: &[Vec<f64>],
        y: &[CategoryId],
        rng: &mut R,
    ) -> Result<()> {
        let never = AtomicBool::new(false);
        self.fit_with_cancel(x, y, rng, &never)
    }

    /// Like [`fit`](Self::fit) but aborts with `OperationCancelled` once
    /// `cancel` is set. The flag is checked at every epoch boundary and the
    /// classifier is left untouched on any error.
    pub fn fit_with_cancel<R: Rng + ?Sized>(
        &mut self,
        x: &[Vec<f64>],
        y: &[CategoryId],
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<()> {
        self.params.validate()?;

        if x.is_empty() {
            return Err(VietcatError::training("Training set is empty"));
        }
        if x.len() != y.len() {
            return Err(VietcatError::training(format!(
                "Got {} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(VietcatError::training("Feature rows are empty"));
        }
        if x.iter().any(|row| row.len() != n_features) {
            return Err(VietcatError::training("Feature rows have different lengths"));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(VietcatError::training(format!(
                "Need at least two classes to train, got {}",
                classes.len()
            )));
        }

        let mut weights = Vec::with_capacity(classes.len());
        let mut biases = Vec::with_capacity(classes.len());
        for &class in &classes {
            let labels: Vec<f64> = y
                .iter()
                .map(|&label| if label == class { 1.0 } else { -1.0 })
                .collect();

            let (w, b) = self.train_binary(x, &labels, n_features, rng, cancel)?;
            log::debug!("Trained one-vs-rest model for class {class} (bias {b:.4})");

            weights.push(w);
            biases.push(b);
        }

        self.classes = classes;
        self.weights = weights;
        self.biases = biases;
        self.n_features = n_features;

        Ok(())
    }

    fn train_binary<R: Rng + ?Sized>(
        &self,
        x: &[Vec<f64>],
        labels: &[f64],
        n_features: usize,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> Result<(Vec<f64>, f64)> {
        let lambda = self.params.lambda();
        let mut w = vec![0.0; n_features];
        let mut b = 0.0;
        let mut order: Vec<usize> = (0..x.len()).collect();

        for epoch in 0..self.params.max_iterations {
            if cancel.load(Ordering::Relaxed) {
                return Err(VietcatError::cancelled(format!(
                    "SVM training stopped at epoch {epoch}"
                )));
            }

            order.shuffle(rng);
            let lr = self.params.learning_rate(epoch);
            let shrink = 1.0 - lr * lambda;

            // Rows are dense, so each sample already costs one O(d) pass for
            // the margin. The shrink rides along with the update pass.
            for &i in &order {
                let label = labels[i];
                let margin = label * (dot(&w, &x[i]) + b);

                // Hinge loss violated: step towards the sample. The bias is
                // not regularized.
                if margin < 1.0 {
                    let step = lr * label;
                    for (wj, xj) in w.iter_mut().zip(&x[i]) {
                        *wj = *wj * shrink + step * xj;
                    }
                    b += step;
                } else {
                    for wj in w.iter_mut() {
                        *wj *= shrink;
                    }
                }
            }
        }

        Ok((w, b))
    }

    fn check_input(&self, x: &[f64]) -> Result<()> {
        if !self.is_fitted() {
            return Err(VietcatError::invalid_argument(
                "Classifier must be trained before prediction",
            ));
        }
        if x.len() != self.n_features {
            return Err(VietcatError::invalid_argument(format!(
                "Expected {} features, got {}",
                self.n_features,
                x.len()
            )));
        }
        Ok(())
    }

    /// Raw score `w_c . x + b_c` for every class, in class order.
    pub fn decision_function(&self, x: &[f64]) -> Result<Vec<f64>> {
        self.check_input(x)?;
        Ok(self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| dot(w, x) + b)
            .collect())
    }

    /// Predict the class with the highest score. Ties go to the first class.
    pub fn predict(&self, x: &[f64]) -> Result<CategoryId> {
        let scores = self.decision_function(x)?;
        Ok(self.classes[argmax(&scores)])
    }

    /// Predict with the softmax probability of the winning class and the
    /// full score vector.
    pub fn predict_with_confidence(&self, x: &[f64]) -> Result<Prediction> {
        let scores = self.decision_function(x)?;
        let top = argmax(&scores);
        let probabilities = softmax(&scores, 1.0);

        Ok(Prediction {
            label: self.classes[top],
            confidence: probabilities[top],
            scores,
        })
    }

    /// Fraction of rows whose prediction matches the label.
    pub fn evaluate_accuracy(&self, x: &[Vec<f64>], y: &[CategoryId]) -> Result<f64> {
        if x.len() != y.len() {
            return Err(VietcatError::invalid_argument(format!(
                "Got {} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(VietcatError::invalid_argument(
                "Cannot evaluate on an empty set",
            ));
        }

        let mut correct = 0usize;
        for (row, &label) in x.iter().zip(y) {
            if self.predict(row)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / x.len() as f64)
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    /// Class labels in score order.
    pub fn classes(&self) -> &[CategoryId] {
        &self.classes
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn one_hot(dim: usize, idx: usize) -> Vec<f64> {
        let mut v = vec![0.0; dim];
        v[idx] = 1.0;
        v
    }

    fn toy_problem() -> (Vec<Vec<f64>>, Vec<CategoryId>) {
        let x = vec![
            one_hot(4, 0),
            one_hot(4, 1),
            one_hot(4, 2),
            one_hot(4, 3),
        ];
        (x, vec![10, 10, 20, 20])
    }

    #[test]
    fn test_fit_and_predict() {
        let (x, y) = toy_problem();
        let mut svm = LinearSvm::new(SvmParams::default());
        svm.fit(&x, &y, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(svm.classes(), &[10, 20]);
        assert_eq!(svm.n_features(), 4);
        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(svm.predict(row).unwrap(), label);
        }
        assert_eq!(svm.evaluate_accuracy(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_classes_sorted_regardless_of_input_order() {
        let x = vec![one_hot(3, 0), one_hot(3, 1), one_hot(3, 2)];
        let y = vec![7, -1, 3];
        let mut svm = LinearSvm::new(SvmParams {
            max_iterations: 50,
            ..SvmParams::default()
        });
        svm.fit(&x, &y, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(svm.classes(), &[-1, 3, 7]);
        assert_eq!(svm.weights().len(), 3);
        assert_eq!(svm.biases().len(), 3);
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let (x, y) = toy_problem();
        let mut a = LinearSvm::new(SvmParams::default());
        let mut b = LinearSvm::new(SvmParams::default());
        a.fit(&x, &y, &mut StdRng::seed_from_u64(7)).unwrap();
        b.fit(&x, &y, &mut StdRng::seed_from_u64(7)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_confidence_is_softmax_of_scores() {
        let (x, y) = toy_problem();
        let mut svm = LinearSvm::new(SvmParams::default());
        svm.fit(&x, &y, &mut StdRng::seed_from_u64(42)).unwrap();

        let prediction = svm.predict_with_confidence(&x[0]).unwrap();
        assert_eq!(prediction.label, 10);
        assert_eq!(prediction.scores.len(), 2);

        let expected = softmax(&prediction.scores, 1.0)[0];
        assert!((prediction.confidence - expected).abs() < 1e-12);
        assert!(prediction.confidence > 0.5);
    }

    #[test]
    fn test_zero_vector_is_resolved_by_bias() {
        let (x, y) = toy_problem();
        let mut svm = LinearSvm::new(SvmParams::default());
        svm.fit(&x, &y, &mut StdRng::seed_from_u64(42)).unwrap();

        let prediction = svm.predict_with_confidence(&[0.0; 4]).unwrap();
        assert!(svm.classes().contains(&prediction.label));
        assert_eq!(prediction.scores, svm.biases());
        assert!((prediction.confidence - 0.5).abs() < 0.1);
    }

    #[test]
    fn test_training_matches_hand_computed_updates() {
        // Three identical positives for class 1 guarantee that some sample
        // already clears the margin during the first epoch.
        let x = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ];
        let y = vec![1, 1, 1, 2];
        let seed = 11;
        let mut svm = LinearSvm::new(SvmParams {
            c: 2.0,
            max_iterations: 3,
            initial_learning_rate: 1.0,
            decay_rate: 0.5,
        });
        svm.fit(&x, &y, &mut StdRng::seed_from_u64(seed)).unwrap();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut satisfied = 0;
        for (row, class) in [1, 2].into_iter().enumerate() {
            let mut w = [0.0f64; 2];
            let mut b = 0.0f64;
            let mut order: Vec<usize> = (0..x.len()).collect();

            for epoch in 0..3 {
                order.shuffle(&mut rng);
                let lr = 1.0 / (1.0 + epoch as f64 * 0.5);

                for &i in &order {
                    let label = if y[i] == class { 1.0 } else { -1.0 };
                    let margin = label * (w[0] * x[i][0] + w[1] * x[i][1] + b);

                    w[0] *= 1.0 - lr * 0.5;
                    w[1] *= 1.0 - lr * 0.5;
                    if margin < 1.0 {
                        w[0] += lr * label * x[i][0];
                        w[1] += lr * label * x[i][1];
                        b += lr * label;
                    } else {
                        satisfied += 1;
                    }
                }
            }

            assert_eq!(svm.weights()[row][0].to_bits(), w[0].to_bits());
            assert_eq!(svm.weights()[row][1].to_bits(), w[1].to_bits());
            assert_eq!(svm.biases()[row].to_bits(), b.to_bits());
        }
        assert!(satisfied > 0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut svm = LinearSvm::new(SvmParams::default());
        let mut rng = StdRng::seed_from_u64(0);

        let err = svm.fit(&[], &[], &mut rng).unwrap_err();
        assert!(matches!(err, VietcatError::Training(_)));

        let err = svm
            .fit(&[vec![1.0], vec![0.5]], &[1, 1], &mut rng)
            .unwrap_err();
        assert!(matches!(err, VietcatError::Training(_)));

        let err = svm.fit(&[vec![1.0]], &[1, 2], &mut rng).unwrap_err();
        assert!(matches!(err, VietcatError::Training(_)));

        let err = svm
            .fit(&[vec![1.0], vec![0.5, 0.2]], &[1, 2], &mut rng)
            .unwrap_err();
        assert!(matches!(err, VietcatError::Training(_)));

        assert!(!svm.is_fitted());
    }

    #[test]
    fn test_invalid_params() {
        let mut svm = LinearSvm::new(SvmParams {
            c: 0.0,
            ..SvmParams::default()
        });
        let (x, y) = toy_problem();
        let err = svm
            .fit(&x, &y, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, VietcatError::Config(_)));
    }

    #[test]
    fn test_predict_errors() {
        let svm = LinearSvm::new(SvmParams::default());
        assert!(svm.predict(&[1.0]).is_err());

        let (x, y) = toy_problem();
        let mut svm = LinearSvm::new(SvmParams::default());
        svm.fit(&x, &y, &mut StdRng::seed_from_u64(0)).unwrap();
        let err = svm.predict(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, VietcatError::InvalidArgument(_)));
    }

    #[test]
    fn test_cancellation() {
        let (x, y) = toy_problem();
        let mut svm = LinearSvm::new(SvmParams::default());
        let cancel = AtomicBool::new(true);

        let err = svm
            .fit_with_cancel(&x, &y, &mut StdRng::seed_from_u64(0), &cancel)
            .unwrap_err();
        assert!(matches!(err, VietcatError::OperationCancelled(_)));
        assert!(!svm.is_fitted());
    }

    #[test]
    fn test_from_parts_validation() {
        let ok = LinearSvm::from_parts(
            SvmParams::default(),
            vec![1, 2],
            vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            vec![0.0, 0.1],
        )
        .unwrap();
        assert_eq!(ok.n_features(), 2);

        assert!(
            LinearSvm::from_parts(
                SvmParams::default(),
                vec![2, 1],
                vec![vec![0.1], vec![0.3]],
                vec![0.0, 0.1],
            )
            .is_err()
        );
        assert!(
            LinearSvm::from_parts(
                SvmParams::default(),
                vec![1, 2],
                vec![vec![0.1], vec![0.3, 0.4]],
                vec![0.0, 0.1],
            )
            .is_err()
        );
        assert!(
            LinearSvm::from_parts(SvmParams::default(), vec![1], vec![vec![0.1]], vec![])
                .is_err()
        );
    }

    #[test]
    fn test_learning_rate_schedule() {
        let params = SvmParams::default();
        assert_eq!(params.learning_rate(0), 0.1);
        assert!((params.learning_rate(100) - 0.05).abs() < 1e-12);
        assert_eq!(params.lambda(), 1.0);
    }
}
