use regex::Regex;

use super::CharFilter;
use crate::error::{Result, VietcatError};

/// A char filter that replaces every match of a regex pattern.
#[derive(Clone, Debug)]
pub struct PatternReplaceCharFilter {
    pattern: Regex,
    replacement: String,
}

impl PatternReplaceCharFilter {
    /// Create a new pattern replace char filter.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| VietcatError::analysis(format!("Invalid pattern '{pattern}': {e}")))?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    /// Filter that turns every character outside `[a-z0-9]` and whitespace
    /// into a single space.
    pub fn non_alphanumeric() -> Result<Self> {
        Self::new(r"[^a-z0-9\s]", " ")
    }
}

impl CharFilter for PatternReplaceCharFilter {
    fn filter(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, regex::NoExpand(&self.replacement))
            .into_owned()
    }

    fn name(&self) -> &'static str {
        "pattern_replace"
    }
}
