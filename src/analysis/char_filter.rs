//! Char filter implementations for text normalization.
//!
//! Char filters pre-process the raw string before it is handed to the
//! tokenizer.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseCharFilter`] - Unicode-aware lowercasing
//! - [`diacritic_folding::DiacriticFoldingCharFilter`] - Vietnamese diacritic removal
//! - [`pattern_replace::PatternReplaceCharFilter`] - Regex-based replacement

/// Trait for character filters that transform text before tokenization.
pub trait CharFilter: Send + Sync {
    /// Apply this filter to the input text, returning the filtered text.
    fn filter(&self, input: &str) -> String;

    /// Get the name of this char filter.
    fn name(&self) -> &'static str;
}

pub mod diacritic_folding;
pub mod lowercase;
pub mod pattern_replace;
