use super::CharFilter;

/// A char filter that lowercases the whole input.
///
/// Lowercasing happens before tokenization so that later pattern-based
/// filters only have to deal with lowercase text.
#[derive(Clone, Debug, Default)]
pub struct LowercaseCharFilter;

impl LowercaseCharFilter {
    pub fn new() -> Self {
        LowercaseCharFilter
    }
}

impl CharFilter for LowercaseCharFilter {
    fn filter(&self, input: &str) -> String {
        if input.is_ascii() {
            input.to_ascii_lowercase()
        } else {
            input.to_lowercase()
        }
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}
