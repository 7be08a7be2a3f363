//! Pipeline analyzer that combines char filters, a tokenizer and token filters.
//!
//! Processing order:
//! 1. Char filters, in the order they were added
//! 2. Tokenizer
//! 3. Token filters, in the order they were added
//!
//! # Examples
//!
//! ```
//! use vietcat::analysis::analyzer::{Analyzer, PipelineAnalyzer};
//! use vietcat::analysis::char_filter::lowercase::LowercaseCharFilter;
//! use vietcat::analysis::token_filter::stop::StopFilter;
//! use vietcat::analysis::tokenizer::WhitespaceTokenizer;
//! use std::sync::Arc;
//!
//! let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
//!     .add_char_filter(Arc::new(LowercaseCharFilter::new()))
//!     .add_filter(Arc::new(StopFilter::from_words(vec!["va"])));
//!
//! let tokens: Vec<_> = analyzer.analyze("Dien VA nuoc").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(tokens[0].text, "dien");
//! assert_eq!(tokens[1].text, "nuoc");
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::char_filter::CharFilter;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// A configurable analyzer that combines a tokenizer with chains of filters.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    char_filters: Vec<Arc<dyn CharFilter>>,
    filters: Vec<Arc<dyn Filter>>,
    name: String,
}

impl PipelineAnalyzer {
    /// Create a new pipeline analyzer with the given tokenizer.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            name: format!("pipeline_{}", tokenizer.name()),
            tokenizer,
            char_filters: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Add a char filter to the pipeline.
    pub fn add_char_filter(mut self, char_filter: Arc<dyn CharFilter>) -> Self {
        self.char_filters.push(char_filter);
        self
    }

    /// Add a token filter to the pipeline.
    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set a custom name for this analyzer.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Apply only the char filters to `text`.
    pub fn apply_char_filters(&self, text: &str) -> String {
        self.char_filters
            .iter()
            .fold(text.to_string(), |acc, char_filter| char_filter.filter(&acc))
    }

    /// Get the tokenizer used by this analyzer.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Get the char filters used by this analyzer.
    pub fn char_filters(&self) -> &[Arc<dyn CharFilter>] {
        &self.char_filters
    }

    /// Get the token filters used by this analyzer.
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let filtered_text = self.apply_char_filters(text);

        let mut tokens = self.tokenizer.tokenize(&filtered_text)?;
        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
        }

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        // The configured name is not 'static; report the generic kind.
        "pipeline"
    }
}

impl std::fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("name", &self.name)
            .field("tokenizer", &self.tokenizer.name())
            .field(
                "char_filters",
                &self
                    .char_filters
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::char_filter::diacritic_folding::DiacriticFoldingCharFilter;
    use crate::analysis::char_filter::lowercase::LowercaseCharFilter;
    use crate::analysis::char_filter::pattern_replace::PatternReplaceCharFilter;
    use crate::analysis::token::Token;
    use crate::analysis::token_filter::stop::StopFilter;
    use crate::analysis::tokenizer::whitespace::WhitespaceTokenizer;

    #[test]
    fn test_pipeline_analyzer() {
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_filter(Arc::new(StopFilter::from_words(vec!["the", "and"])));

        let tokens: Vec<Token> = analyzer
            .analyze("hello the world and test")
            .unwrap()
            .collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[2].text, "test");
    }

    #[test]
    fn test_char_filters_run_in_order() {
        // Lowercasing must precede the [a-z0-9] replacement, otherwise
        // uppercase letters would be blanked out.
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_char_filter(Arc::new(LowercaseCharFilter::new()))
            .add_char_filter(Arc::new(DiacriticFoldingCharFilter::new()))
            .add_char_filter(Arc::new(PatternReplaceCharFilter::non_alphanumeric().unwrap()));

        let tokens: Vec<Token> = analyzer.analyze("Tiền ĐIỆN-tháng 5").unwrap().collect();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["tien", "dien", "thang", "5"]);
    }

    #[test]
    fn test_debug_lists_components() {
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_char_filter(Arc::new(LowercaseCharFilter::new()))
            .with_name("custom");
        let debug = format!("{analyzer:?}");
        assert!(debug.contains("custom"));
        assert!(debug.contains("lowercase"));
        assert!(debug.contains("whitespace"));
    }
}
