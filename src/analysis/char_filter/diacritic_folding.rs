use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::CharFilter;

/// A char filter that strips Vietnamese diacritics.
///
/// The input is canonically decomposed (NFD) and every combining mark is
/// dropped, so `"phở"` becomes `"pho"` and `"ưu đãi"` becomes `"uu dai"`.
/// The letter `đ`/`Đ` has no decomposition and is mapped to ASCII `d`
/// explicitly. Characters outside the Latin script pass through unchanged.
#[derive(Clone, Debug, Default)]
pub struct DiacriticFoldingCharFilter;

impl DiacriticFoldingCharFilter {
    pub fn new() -> Self {
        DiacriticFoldingCharFilter
    }
}

impl CharFilter for DiacriticFoldingCharFilter {
    fn filter(&self, input: &str) -> String {
        input
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .map(|c| match c {
                'đ' | 'Đ' => 'd',
                other => other,
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "diacritic_folding"
    }
}
