//! Storage abstraction layer for model artifacts.
//!
//! Model artifacts are written and read through the [`Storage`] trait so the
//! same persistence code runs against a directory on disk ([`FileStorage`])
//! or an in-memory map ([`MemoryStorage`]). Binary artifacts are encoded
//! with the checksummed [`StructWriter`]/[`StructReader`] pair.

pub mod file;
pub mod memory;
pub mod structured;
pub mod traits;

// Re-export commonly used types
pub use file::*;
pub use memory::*;
pub use structured::*;
pub use traits::*;
