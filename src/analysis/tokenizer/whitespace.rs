//! Whitespace tokenizer implementation.

use super::Tokenizer;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// A tokenizer that splits text on runs of whitespace.
///
/// Empty tokens are never produced, so leading, trailing and repeated
/// whitespace collapse away.
#[derive(Clone, Debug, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    /// Create a new whitespace tokenizer.
    pub fn new() -> Self {
        WhitespaceTokenizer
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = Vec::new();
        let mut start: Option<usize> = None;

        for (idx, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(begin) = start.take() {
                    tokens.push(Token::with_offsets(
                        &text[begin..idx],
                        tokens.len(),
                        begin,
                        idx,
                    ));
                }
            } else if start.is_none() {
                start = Some(idx);
            }
        }

        if let Some(begin) = start {
            tokens.push(Token::with_offsets(
                &text[begin..],
                tokens.len(),
                begin,
                text.len(),
            ));
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("  grab   bike\tve nha ").unwrap().collect();

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["grab", "bike", "ve", "nha"]);
        assert_eq!(tokens[0].start_offset, 2);
        assert_eq!(tokens[0].end_offset, 6);
        assert_eq!(tokens[3].position, 3);
    }

    #[test]
    fn test_empty_input() {
        let tokenizer = WhitespaceTokenizer::new();
        assert_eq!(tokenizer.tokenize("").unwrap().count(), 0);
        assert_eq!(tokenizer.tokenize("   \n ").unwrap().count(), 0);
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(WhitespaceTokenizer::new().name(), "whitespace");
    }
}
