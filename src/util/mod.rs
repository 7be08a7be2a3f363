//! Utility modules for vietcat.

pub mod varint;

// Re-export commonly used functions
pub use varint::*;
