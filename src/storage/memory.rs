//! In-memory storage implementation for testing.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::storage::traits::{Storage, StorageError, StorageInput, StorageOutput};

type FileMap = HashMap<String, Box<[u8]>>;

/// An in-memory storage implementation.
///
/// Outputs become visible only once they are closed, which mirrors the
/// write-then-rename discipline used for model artifacts on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<FileMap>>,
}

impl MemoryStorage {
    /// Create an empty memory storage.
    pub fn new() -> Self {
        MemoryStorage {
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn files(&self) -> Result<MutexGuard<'_, FileMap>> {
        self.files
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> Result<usize> {
        Ok(self.files()?.len())
    }

    /// Replace the contents of a file directly.
    pub fn put(&self, name: &str, data: Vec<u8>) -> Result<()> {
        self.files()?
            .insert(name.to_string(), data.into_boxed_slice());
        Ok(())
    }

    /// Copy the contents of a file.
    pub fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.files()?
            .get(name)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let data = self.get(name)?;
        Ok(Box::new(MemoryInput::new(data)))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Arc::clone(&self.files),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(name))
            .unwrap_or(false)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files()?.remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.files()?
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files()?;
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;

        files.insert(new_name.to_string(), data);
        Ok(())
    }
}

/// Reader over a snapshot of an in-memory file.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Vec<u8>>,
    size: u64,
}

impl MemoryInput {
    fn new(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        MemoryInput {
            cursor: Cursor::new(data),
            size,
        }
    }
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered writer that commits to the shared map on close.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    files: Arc<Mutex<FileMap>>,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, files: Arc<Mutex<FileMap>>) -> Self {
        MemoryOutput {
            name,
            buffer: Vec::new(),
            files,
            closed: false,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("output already closed"));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.buffer.len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let data = std::mem::take(&mut self.buffer).into_boxed_slice();
        self.files
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert(self.name.clone(), data);
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_basic() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.file_count().unwrap(), 0);
        assert!(!storage.file_exists("vectorizer.bin"));
        assert!(storage.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_write_visible_after_close() {
        let storage = MemoryStorage::new();

        let mut output = storage.create_output("classifier.bin").unwrap();
        output.write_all(b"VCSV").unwrap();
        assert!(!storage.file_exists("classifier.bin"));

        output.close().unwrap();
        assert!(storage.file_exists("classifier.bin"));
        assert_eq!(storage.file_size("classifier.bin").unwrap(), 4);

        let mut input = storage.open_input("classifier.bin").unwrap();
        let mut data = Vec::new();
        input.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"VCSV");
    }

    #[test]
    fn test_dropped_output_is_discarded() {
        let storage = MemoryStorage::new();

        {
            let mut output = storage.create_output("partial.bin").unwrap();
            output.write_all(b"half").unwrap();
        }

        assert!(!storage.file_exists("partial.bin"));
    }

    #[test]
    fn test_rename_and_delete() {
        let storage = MemoryStorage::new();
        storage.put("a.tmp", b"abc".to_vec()).unwrap();

        storage.rename_file("a.tmp", "a.bin").unwrap();
        assert_eq!(storage.get("a.bin").unwrap(), b"abc");
        assert!(storage.rename_file("a.tmp", "b.bin").is_err());

        storage.delete_file("a.bin").unwrap();
        assert_eq!(storage.file_count().unwrap(), 0);
    }

    #[test]
    fn test_temp_output_names() {
        let storage = MemoryStorage::new();

        let (first, mut output) = storage.create_temp_output("model").unwrap();
        output.close().unwrap();
        let (second, _) = storage.create_temp_output("model").unwrap();

        assert_eq!(first, "model_0.tmp");
        assert_eq!(second, "model_1.tmp");
    }
}
