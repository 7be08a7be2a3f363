//! Vietnamese analyzer: the text normalizer used by the categorizer.

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::char_filter::diacritic_folding::DiacriticFoldingCharFilter;
use crate::analysis::char_filter::lowercase::LowercaseCharFilter;
use crate::analysis::char_filter::pattern_replace::PatternReplaceCharFilter;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::whitespace::WhitespaceTokenizer;
use crate::error::Result;

/// Analyzer name persisted with vectorizers built on the default stop list.
pub const VIETNAMESE_ANALYZER_NAME: &str = "vietnamese";

const CUSTOM_ANALYZER_NAME: &str = "vietnamese_custom";

/// Canonicalizes Vietnamese text into a token stream.
///
/// Steps, in order: lowercase, strip diacritics (`đ` → `d`), replace every
/// character outside `[a-z0-9]` and whitespace with a space, split on
/// whitespace, drop stop words. [`normalize`](Self::normalize) is idempotent.
pub struct VietnameseAnalyzer {
    inner: PipelineAnalyzer,
    name: &'static str,
}

impl VietnameseAnalyzer {
    /// Create an analyzer with the built-in Vietnamese stop word list.
    pub fn new() -> Result<Self> {
        Self::build(StopFilter::new(), VIETNAMESE_ANALYZER_NAME)
    }

    /// Create an analyzer with a custom stop word list.
    ///
    /// Stop words are matched after folding, so they must be given without
    /// diacritics.
    pub fn with_stop_words(stop_words: HashSet<String>) -> Result<Self> {
        Self::build(StopFilter::with_stop_words(stop_words), CUSTOM_ANALYZER_NAME)
    }

    fn build(stop_filter: StopFilter, name: &'static str) -> Result<Self> {
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_char_filter(Arc::new(LowercaseCharFilter::new()))
            .add_char_filter(Arc::new(DiacriticFoldingCharFilter::new()))
            .add_char_filter(Arc::new(PatternReplaceCharFilter::non_alphanumeric()?))
            .add_filter(Arc::new(stop_filter))
            .with_name(name);

        Ok(Self {
            inner: analyzer,
            name,
        })
    }

    /// Split `text` into normalized tokens. Never fails; empty tokens are
    /// never produced.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self.inner.analyze(text) {
            Ok(tokens) => tokens.map(|token| token.text).collect(),
            Err(e) => {
                log::warn!("analysis failed, treating input as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Normalize `text` to its canonical form: the tokens joined by single
    /// spaces, with no leading or trailing whitespace.
    pub fn normalize(&self, text: &str) -> String {
        self.tokenize(text).join(" ")
    }
}

impl Analyzer for VietnameseAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl Debug for VietnameseAnalyzer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VietnameseAnalyzer")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish()
    }
}
