//! File-based storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, VietcatError};
use crate::storage::traits::{Storage, StorageConfig, StorageError, StorageInput, StorageOutput};

/// A storage backend rooted at a directory on disk.
#[derive(Debug)]
pub struct FileStorage {
    /// The root directory for storage.
    directory: PathBuf,
    /// Storage configuration.
    config: StorageConfig,
}

impl FileStorage {
    /// Create a new file storage in the given directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| VietcatError::storage(format!("Failed to create directory: {e}")))?;
        }

        if !directory.is_dir() {
            return Err(VietcatError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage { directory, config })
    }

    /// Open an existing directory without creating it.
    pub fn open_existing<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_dir() {
            return Err(StorageError::FileNotFound(directory.display().to_string()).into());
        }

        Ok(FileStorage { directory, config })
    }

    /// The root directory of this storage.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

fn map_not_found(name: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::FileNotFound(name.to_string())
    } else {
        StorageError::IoError(e.to_string())
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let file = File::open(self.file_path(name)).map_err(|e| map_not_found(name, e))?;

        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.file_path(name))
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        Ok(Box::new(FileOutput::new(
            file,
            self.config.buffer_size,
            self.config.sync_writes,
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).is_file()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| StorageError::IoError(format!("Failed to delete file: {e}")))?;
        }

        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for entry in
            std::fs::read_dir(&self.directory).map_err(|e| StorageError::IoError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
            let path = entry.path();

            if path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let metadata = self
            .file_path(name)
            .metadata()
            .map_err(|e| map_not_found(name, e))?;

        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        std::fs::rename(self.file_path(old_name), self.file_path(new_name))
            .map_err(|e| StorageError::IoError(format!("Failed to rename file: {e}")))?;

        Ok(())
    }
}

/// A buffered reader over a file.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let size = file
            .metadata()
            .map_err(|e| VietcatError::storage(format!("Failed to get file metadata: {e}")))?
            .len();

        Ok(FileInput {
            reader: BufReader::with_capacity(buffer_size, file),
            size,
        })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A buffered writer over a file.
#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    sync_writes: bool,
    position: u64,
}

impl FileOutput {
    fn new(file: File, buffer_size: usize, sync_writes: bool) -> Self {
        FileOutput {
            writer: BufWriter::with_capacity(buffer_size, file),
            sync_writes,
            position: 0,
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.writer.write(buf)?;
        self.position += written as u64;

        if self.sync_writes {
            self.writer.flush()?;
        }

        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn close(&mut self) -> Result<()> {
        self.flush_and_sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path(), StorageConfig::default()).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_file_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("models").join("v1");
        let storage = FileStorage::new(&nested, StorageConfig::default()).unwrap();

        assert!(nested.is_dir());
        assert_eq!(storage.directory(), nested.as_path());
        assert!(storage.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_open_existing_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileStorage::open_existing(temp_dir.path().join("nope"), StorageConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_write_and_read() {
        let (_dir, storage) = storage();

        let mut output = storage.create_output("metadata.json").unwrap();
        output.write_all(b"{\"language\":\"vi\"}").unwrap();
        assert_eq!(output.position().unwrap(), 17);
        output.close().unwrap();

        assert!(storage.file_exists("metadata.json"));
        assert_eq!(storage.file_size("metadata.json").unwrap(), 17);

        let mut input = storage.open_input("metadata.json").unwrap();
        let mut buffer = String::new();
        input.read_to_string(&mut buffer).unwrap();
        assert_eq!(buffer, "{\"language\":\"vi\"}");
        assert_eq!(input.size().unwrap(), 17);
    }

    #[test]
    fn test_missing_file() {
        let (_dir, storage) = storage();

        assert!(!storage.file_exists("classifier.bin"));
        let err = storage.open_input("classifier.bin").unwrap_err();
        assert!(err.to_string().contains("File not found"));
        assert!(storage.file_size("classifier.bin").is_err());
    }

    #[test]
    fn test_temp_output_and_rename() {
        let (_dir, storage) = storage();

        let (temp_name, mut output) = storage.create_temp_output("vectorizer.bin").unwrap();
        assert_eq!(temp_name, "vectorizer.bin_0.tmp");
        output.write_all(b"data").unwrap();
        output.close().unwrap();

        storage.rename_file(&temp_name, "vectorizer.bin").unwrap();
        assert!(!storage.file_exists(&temp_name));
        assert_eq!(storage.list_files().unwrap(), vec!["vectorizer.bin"]);
    }

    #[test]
    fn test_delete_file() {
        let (_dir, storage) = storage();

        let mut output = storage.create_output("catalog.json").unwrap();
        output.write_all(b"[]").unwrap();
        output.close().unwrap();

        storage.delete_file("catalog.json").unwrap();
        assert!(!storage.file_exists("catalog.json"));
        // Deleting again is a no-op.
        storage.delete_file("catalog.json").unwrap();
    }
}
