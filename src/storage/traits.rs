//! Storage abstraction trait and common types.

use std::io::{Read, Write};

use crate::error::{Result, VietcatError};

/// A trait for storage backends that can store and retrieve named blobs.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing any existing file with the new name.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Create a temporary file whose name starts with `prefix`.
    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)> {
        for counter in 0..10_000 {
            let temp_name = format!("{prefix}_{counter}.tmp");
            if !self.file_exists(&temp_name) {
                let output = self.create_output(&temp_name)?;
                return Ok((temp_name, output));
            }
        }

        Err(StorageError::IoError("Could not create temporary file".to_string()).into())
    }
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;

    /// Close the input stream.
    fn close(&mut self) -> Result<()>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Get the number of bytes written so far.
    fn position(&self) -> Result<u64>;

    /// Close the output stream, making the written data visible.
    fn close(&mut self) -> Result<()>;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        (**self).flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        (**self).position()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        (**self).size()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Configuration for storage backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Buffer size for I/O operations.
    pub buffer_size: usize,

    /// Whether to flush after every write.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 65536,
            sync_writes: false,
        }
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// I/O error.
    IoError(String),

    /// Storage lock poisoned by a panicking writer.
    LockPoisoned,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::LockPoisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for VietcatError {
    fn from(err: StorageError) -> Self {
        VietcatError::storage(err.to_string())
    }
}
