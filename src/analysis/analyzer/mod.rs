//! Analyzer implementations that combine tokenizers and filters.

pub mod analyzer;
pub mod language;
pub mod pipeline;

pub use analyzer::Analyzer;
pub use language::vietnamese::VietnameseAnalyzer;
pub use pipeline::PipelineAnalyzer;
