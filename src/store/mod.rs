//! Snapshot persistence for paper records.
//!
//! The snapshot is the only shared mutable state in the service: a JSON file
//! holding the last exported record set, plus the CSV file derived from it.
//! [`PaperStore`] keeps handlers decoupled from concrete file paths, so tests
//! can inject a store rooted in a temp directory.
//!
//! Writes are wholesale overwrites (temp file, then rename); reads are
//! whole-file. There is no locking: concurrent writers race and the last
//! write wins, which is acceptable for a single-writer deployment.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::PaperRecord;

/// Errors from snapshot access
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested file does not exist yet
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The snapshot exists but does not hold valid JSON
    #[error("invalid snapshot format: {0}")]
    Format(String),

    /// Underlying filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence seam for the paper snapshot and its derived CSV.
pub trait PaperStore: Send + Sync + std::fmt::Debug {
    /// Read the persisted snapshot in full.
    fn load(&self) -> Result<Vec<PaperRecord>, StoreError>;

    /// Overwrite the snapshot wholesale.
    fn save(&self, records: &[PaperRecord]) -> Result<(), StoreError>;

    /// Overwrite the derived CSV file wholesale.
    fn save_csv(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Raw snapshot bytes, for file downloads.
    fn snapshot_bytes(&self) -> Result<Vec<u8>, StoreError>;

    /// Raw CSV bytes, for file downloads.
    fn csv_bytes(&self) -> Result<Vec<u8>, StoreError>;
}

/// File-backed store: one JSON snapshot and one derived CSV.
#[derive(Debug, Clone)]
pub struct FileStore {
    snapshot_path: PathBuf,
    csv_path: PathBuf,
}

impl FileStore {
    /// Create a store over the given snapshot and CSV paths.
    pub fn new(snapshot_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            csv_path: csv_path.into(),
        }
    }

    /// Path of the snapshot file.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Path of the derived CSV file.
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    fn read_file(path: &Path) -> Result<Vec<u8>, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Ok(fs::read(path)?)
    }

    // Write to a temp file in the target directory, then rename over the
    // destination. Readers observe either the old content or the new,
    // never a partial write.
    fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl PaperStore for FileStore {
    fn load(&self) -> Result<Vec<PaperRecord>, StoreError> {
        let bytes = Self::read_file(&self.snapshot_path)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Format(e.to_string()))
    }

    fn save(&self, records: &[PaperRecord]) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(records).map_err(|e| StoreError::Format(e.to_string()))?;
        Self::write_file(&self.snapshot_path, &bytes)
    }

    fn save_csv(&self, bytes: &[u8]) -> Result<(), StoreError> {
        Self::write_file(&self.csv_path, bytes)
    }

    fn snapshot_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Self::read_file(&self.snapshot_path)
    }

    fn csv_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Self::read_file(&self.csv_path)
    }
}
