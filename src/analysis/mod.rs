//! Text analysis module for vietcat.
//!
//! Raw transaction descriptions flow through an analysis pipeline before
//! feature extraction:
//!
//! ```text
//! Raw Text → Char Filters → Tokenizer → Token Filters → Tokens
//! ```
//!
//! The [`VietnameseAnalyzer`](analyzer::language::vietnamese::VietnameseAnalyzer)
//! assembles the canonical pipeline used by the categorizer.

pub mod analyzer;
pub mod char_filter;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

// Re-export commonly used types
pub use analyzer::*;
pub use token::*;
pub use token_filter::*;
pub use tokenizer::*;
