//! Transaction classifier trait definition.

use crate::error::Result;
use crate::ml::categorizer::types::Categorization;

/// Transaction classifier trait.
///
/// Implementations map a free-text transaction description to a category.
/// A loaded classifier is immutable, so one instance can serve any number
/// of concurrent calls.
pub trait TransactionClassifier: Send + Sync {
    /// Categorize a transaction.
    ///
    /// # Arguments
    /// * `description` - Free-text description, typically Vietnamese
    /// * `amount` - Optional transaction amount, reported in the reasoning
    fn categorize(&self, description: &str, amount: Option<f64>) -> Result<Categorization>;

    /// Get the name of this classifier for debugging and logging.
    fn name(&self) -> &str;
}
