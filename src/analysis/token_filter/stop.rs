//! Stop filter implementation.
//!
//! This module provides a filter that removes common function words (stop
//! words) that carry no signal for categorization. The built-in list is
//! Vietnamese, written in its diacritic-folded form because the filter runs
//! after diacritic folding.
//!
//! # Examples
//!
//! ```
//! use vietcat::analysis::token_filter::Filter;
//! use vietcat::analysis::token_filter::stop::StopFilter;
//! use vietcat::analysis::token::Token;
//!
//! let filter = StopFilter::new();
//! let tokens = vec![
//!     Token::new("tien", 0),
//!     Token::new("cua", 1),
//!     Token::new("nha", 2),
//! ];
//!
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(result.len(), 2);
//! assert_eq!(result[0].text, "tien");
//! assert_eq!(result[1].text, "nha");
//! ```

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Default Vietnamese stop words, diacritics removed.
///
/// Words whose folded form collides with a content word common in
/// transaction descriptions are left out (`chi` as in "chi tiêu", `ve` as in
/// "vé", `do` as in "đồ").
const DEFAULT_VIETNAMESE_STOP_WORDS: &[&str] = &[
    "a", "ai", "bi", "boi", "cac", "cai", "can", "chu", "co", "cua", "cung", "da", "dang", "de",
    "den", "duoc", "gi", "hay", "hoac", "khi", "khong", "la", "lai", "ma", "moi", "mot", "nay",
    "neu", "nen", "nhieu", "nhu", "nhung", "o", "ra", "rat", "roi", "se", "sau", "thi", "tren",
    "trong", "tu", "va", "vao", "vi", "voi",
];

/// Default Vietnamese stop words as a HashSet.
pub static DEFAULT_VIETNAMESE_STOP_WORDS_SET: LazyLock<HashSet<String>> = LazyLock::new(|| {
    DEFAULT_VIETNAMESE_STOP_WORDS
        .iter()
        .map(|&s| s.to_string())
        .collect()
});

/// A filter that removes stop words from the token stream.
///
/// Matching is whole-token only: `"va"` is removed but `"vay"` is kept.
#[derive(Clone, Debug)]
pub struct StopFilter {
    /// The set of stop words to remove
    stop_words: Arc<HashSet<String>>,
}

impl StopFilter {
    /// Create a new stop filter with the default Vietnamese stop words.
    pub fn new() -> Self {
        Self::with_stop_words(DEFAULT_VIETNAMESE_STOP_WORDS_SET.clone())
    }

    /// Create a new stop filter with custom stop words.
    pub fn with_stop_words(stop_words: HashSet<String>) -> Self {
        StopFilter {
            stop_words: Arc::new(stop_words),
        }
    }

    /// Create a new stop filter from a list of stop words.
    ///
    /// ```
    /// use vietcat::analysis::token_filter::stop::StopFilter;
    ///
    /// let filter = StopFilter::from_words(vec!["foo", "bar", "baz"]);
    /// assert_eq!(filter.len(), 3);
    /// ```
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop_words = words.into_iter().map(|s| s.into()).collect();
        Self::with_stop_words(stop_words)
    }

    /// Check if a word is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Get the number of stop words.
    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    /// Check if the stop word set is empty.
    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered_tokens: Vec<Token> = tokens
            .filter(|token| !self.is_stop_word(&token.text))
            .collect();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}
