//! Language-specific analyzers.
//!
//! - [`vietnamese`] - Vietnamese text analysis with diacritic folding and
//!   Vietnamese stop words

pub mod vietnamese;
