//! Error types for the vietcat library.
//!
//! All errors are represented by the [`VietcatError`] enum. Errors fall into
//! two groups: fatal ones (a broken corpus, a missing or corrupt model
//! artifact, storage failures) that must abort training or refuse to serve,
//! and recoverable ones such as invalid arguments to a single call.
//!
//! # Examples
//!
//! ```
//! use vietcat::error::{VietcatError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(VietcatError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for vietcat operations.
#[derive(Error, Debug)]
pub enum VietcatError {
    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Malformed or missing training corpus
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Corrupt, missing or incompatible model artifact
    #[error("Model error: {0}")]
    Model(String),

    /// Degenerate training input
    #[error("Training error: {0}")]
    Training(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid argument passed to an operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with VietcatError.
pub type Result<T> = std::result::Result<T, VietcatError>;

impl VietcatError {
    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        VietcatError::Analysis(msg.into())
    }

    /// Create a new corpus error.
    pub fn corpus<S: Into<String>>(msg: S) -> Self {
        VietcatError::Corpus(msg.into())
    }

    /// Create a new model error.
    pub fn model<S: Into<String>>(msg: S) -> Self {
        VietcatError::Model(msg.into())
    }

    /// Create a new training error.
    pub fn training<S: Into<String>>(msg: S) -> Self {
        VietcatError::Training(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        VietcatError::Config(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        VietcatError::Storage(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        VietcatError::InvalidArgument(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        VietcatError::OperationCancelled(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        VietcatError::Other(msg.into())
    }

    /// Whether this error must abort the surrounding training run or
    /// service start-up.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VietcatError::Io(_)
                | VietcatError::Json(_)
                | VietcatError::Corpus(_)
                | VietcatError::Model(_)
                | VietcatError::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = VietcatError::corpus("Test corpus error");
        assert_eq!(error.to_string(), "Corpus error: Test corpus error");

        let error = VietcatError::model("bad magic");
        assert_eq!(error.to_string(), "Model error: bad magic");

        let error = VietcatError::analysis("Test analysis error");
        assert_eq!(error.to_string(), "Analysis error: Test analysis error");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = VietcatError::from(io_error);

        match error {
            VietcatError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(VietcatError::corpus("x").is_fatal());
        assert!(VietcatError::model("x").is_fatal());
        assert!(VietcatError::storage("x").is_fatal());
        assert!(!VietcatError::invalid_argument("x").is_fatal());
        assert!(!VietcatError::cancelled("x").is_fatal());
        assert!(!VietcatError::invalid_config("x").is_fatal());
    }
}
