//! Common types for transaction categorization.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VietcatError};

/// Integer category identifier, as assigned by the surrounding application.
pub type CategoryId = i64;

/// Whether a category records money coming in or going out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// Money received.
    #[serde(alias = "INCOME", alias = "Income")]
    Income,
    /// Money spent.
    #[default]
    #[serde(alias = "EXPENSE", alias = "Expense")]
    Expense,
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryType::Income => write!(f, "income"),
            CategoryType::Expense => write!(f, "expense"),
        }
    }
}

/// One labelled transaction description in a training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSample {
    /// Free-text transaction description.
    pub description: String,
    /// Human-readable category name.
    pub category: String,
    /// Category identifier used as the class label.
    pub category_id: CategoryId,
    /// Income or expense.
    #[serde(rename = "type", default)]
    pub kind: CategoryType,
}

impl TransactionSample {
    /// Create a new expense sample.
    pub fn new<D: Into<String>, C: Into<String>>(
        description: D,
        category: C,
        category_id: CategoryId,
    ) -> Self {
        TransactionSample {
            description: description.into(),
            category: category.into(),
            category_id,
            kind: CategoryType::Expense,
        }
    }

    /// Set the category type.
    pub fn with_kind(mut self, kind: CategoryType) -> Self {
        self.kind = kind;
        self
    }
}

/// A category known to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CategoryType,
}

/// Lookup table from category id to its name and type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCatalog {
    categories: BTreeMap<CategoryId, Category>,
}

impl CategoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of categories.
    ///
    /// Fails if the same id appears twice with different names.
    pub fn from_categories<I: IntoIterator<Item = Category>>(categories: I) -> Result<Self> {
        let mut catalog = Self::new();
        for category in categories {
            if let Some(existing) = catalog.categories.get(&category.id) {
                if existing.name != category.name {
                    return Err(VietcatError::invalid_argument(format!(
                        "Category id {} has conflicting names '{}' and '{}'",
                        category.id, existing.name, category.name
                    )));
                }
                continue;
            }
            catalog.categories.insert(category.id, category);
        }
        Ok(catalog)
    }

    /// Derive the catalog from the categories referenced by a corpus.
    pub fn from_samples(samples: &[TransactionSample]) -> Result<Self> {
        Self::from_categories(samples.iter().map(|sample| Category {
            id: sample.category_id,
            name: sample.category.clone(),
            kind: sample.kind,
        }))
        .map_err(|e| match e {
            VietcatError::InvalidArgument(msg) => VietcatError::corpus(msg),
            other => other,
        })
    }

    /// Load a catalog from a JSON array of `{id, name, type}` objects.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(content.as_bytes())
    }

    /// Parse a catalog from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let categories: Vec<Category> = serde_json::from_slice(data)?;
        Self::from_categories(categories)
    }

    /// Serialize the catalog as a pretty-printed JSON array ordered by id.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let categories: Vec<&Category> = self.categories.values().collect();
        Ok(serde_json::to_vec_pretty(&categories)?)
    }

    /// Add or replace a category.
    pub fn insert(&mut self, category: Category) {
        self.categories.insert(category.id, category);
    }

    /// Look up a category.
    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    /// Look up a category name.
    pub fn name_of(&self, id: CategoryId) -> Option<&str> {
        self.categories.get(&id).map(|c| c.name.as_str())
    }

    /// Display name for an id, falling back to a placeholder for unknown ids.
    pub fn display_name(&self, id: CategoryId) -> String {
        self.name_of(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("category #{id}"))
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.categories.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Iterate over categories in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }
}

/// Raw output of the linear classifier for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Winning class label.
    pub label: CategoryId,
    /// Softmax probability of the winning class.
    pub confidence: f64,
    /// Raw decision scores, one per class in class order.
    pub scores: Vec<f64>,
}

/// A runner-up category suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub category_id: CategoryId,
    pub category_name: String,
    /// Calibrated probability.
    pub score: f64,
}

/// Final answer of a categorization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorization {
    pub category_id: CategoryId,
    pub category_name: String,
    /// Calibrated confidence in `[0, 1]`.
    pub confidence: f64,
    /// Next-best categories, most likely first.
    pub alternatives: Vec<Alternative>,
    pub requires_human_review: bool,
    /// Short human-readable explanation.
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_deserialization() {
        let json = r#"[
            {"description": "Phở bò", "category": "Ăn uống", "category_id": 1, "type": "EXPENSE"},
            {"description": "Lương tháng 5", "category": "Lương", "category_id": 7, "type": "income"}
        ]"#;

        let samples: Vec<TransactionSample> = serde_json::from_str(json).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].kind, CategoryType::Expense);
        assert_eq!(samples[1].kind, CategoryType::Income);
        assert_eq!(samples[1].category_id, 7);
    }

    #[test]
    fn test_sample_type_defaults_to_expense() {
        let json = r#"{"description": "grab", "category": "Di chuyển", "category_id": 2}"#;
        let sample: TransactionSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.kind, CategoryType::Expense);
    }

    #[test]
    fn test_catalog_from_samples() {
        let samples = vec![
            TransactionSample::new("pho bo", "Ăn uống", 1),
            TransactionSample::new("com tam", "Ăn uống", 1),
            TransactionSample::new("luong", "Lương", 2).with_kind(CategoryType::Income),
        ];

        let catalog = CategoryCatalog::from_samples(&samples).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name_of(1), Some("Ăn uống"));
        assert_eq!(catalog.get(2).unwrap().kind, CategoryType::Income);
        assert_eq!(catalog.display_name(99), "category #99");
        assert!(!catalog.contains(99));
    }

    #[test]
    fn test_catalog_conflicting_names() {
        let samples = vec![
            TransactionSample::new("pho bo", "Ăn uống", 1),
            TransactionSample::new("grab", "Di chuyển", 1),
        ];

        let err = CategoryCatalog::from_samples(&samples).unwrap_err();
        assert!(matches!(err, VietcatError::Corpus(_)));
    }

    #[test]
    fn test_catalog_json() {
        let mut catalog = CategoryCatalog::new();
        catalog.insert(Category {
            id: 3,
            name: "Giải trí".to_string(),
            kind: CategoryType::Expense,
        });
        catalog.insert(Category {
            id: 1,
            name: "Lương".to_string(),
            kind: CategoryType::Income,
        });

        let json = catalog.to_json().unwrap();
        let text = String::from_utf8(json.clone()).unwrap();
        assert!(text.find("Lương").unwrap() < text.find("Giải trí").unwrap());

        let parsed = CategoryCatalog::from_json(&json).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_catalog_load_missing_file() {
        assert!(CategoryCatalog::load("/nonexistent/catalog.json").is_err());
    }
}
