//! Core analyzer trait definition.
//!
//! Analyzers combine char filters, a tokenizer and token filters to turn raw
//! text into the tokens the vectorizer counts:
//!
//! ```text
//! Raw Text → Analyzer → Token Stream → TF-IDF
//!             ↓
//!       Char Filters
//!             ↓
//!         Tokenizer
//!             ↓
//!       Token Filters
//! ```
//!
//! # Examples
//!
//! ```
//! use vietcat::analysis::analyzer::Analyzer;
//! use vietcat::analysis::analyzer::VietnameseAnalyzer;
//!
//! let analyzer = VietnameseAnalyzer::new().unwrap();
//! let tokens: Vec<_> = analyzer.analyze("Đổ xăng Petrolimex").unwrap().collect();
//!
//! assert_eq!(tokens[0].text, "do");
//! assert_eq!(tokens[1].text, "xang");
//! assert_eq!(tokens[2].text, "petrolimex");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
///
/// The trait requires `Send + Sync` so a loaded model can be shared across
/// concurrent inference calls.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    ///
    /// The name is persisted with a fitted vectorizer so that a loaded model
    /// can be checked against the analyzer it was trained with.
    fn name(&self) -> &'static str;
}
