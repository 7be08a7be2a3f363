//! Command line interface for the vietcat categorizer.

pub mod args;
pub mod commands;
pub mod output;

pub use args::*;
pub use commands::*;
pub use output::*;
