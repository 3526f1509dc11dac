use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Storage;
use crate::{PkError, Result};

const STORAGE_VERSION: i32 = 1;

/// Key-value storage persisted as a single JSON file.
///
/// The whole file is rewritten on every [`Storage::set`].
pub struct FileStorage {
    label: String,
    path: PathBuf,
    data: Mutex<FileStorageData>,
}

/// The document serialized to and from disk
#[derive(Serialize, Deserialize)]
struct FileStorageData {
    version: i32,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Create an empty file storage with a diagnostic label and file path
    pub fn new(label: String, path: &Path) -> Self {
        Self {
            label,
            path: PathBuf::from(path),
            data: Mutex::new(FileStorageData {
                version: STORAGE_VERSION,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// Create a file storage and load the entries already on disk, if any
    pub fn open(label: String, path: &Path) -> Result<Self> {
        let storage = Self::new(label, path);
        if storage.path.exists() {
            let entries = storage.read_fs()?;
            storage.data().entries = entries;
        }
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the storage file from disk
    pub fn erase(&self) -> Result<()> {
        fs::remove_file(&self.path).map_err(|err| {
            PkError::Storage(self.label.clone(), err.to_string())
        })
    }

    fn data(&self) -> MutexGuard<'_, FileStorageData> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_fs(&self) -> Result<BTreeMap<String, String>> {
        let file = File::open(&self.path)?;
        let data: FileStorageData = serde_json::from_reader(file)
            .map_err(|err| {
                PkError::Storage(self.label.clone(), err.to_string())
            })?;
        if data.version != STORAGE_VERSION {
            return Err(PkError::Storage(
                self.label.clone(),
                format!(
                    "Storage version mismatch: expected {}, got {}",
                    STORAGE_VERSION, data.version
                ),
            ));
        }
        Ok(data.entries)
    }

    fn write_fs(&self, data: &FileStorageData) -> Result<()> {
        let parent_dir = self.path.parent().ok_or_else(|| {
            PkError::Storage(
                self.label.clone(),
                "Failed to get parent directory".to_owned(),
            )
        })?;
        fs::create_dir_all(parent_dir)?;
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, data)?;
        writer.flush()?;

        log::info!(
            "{} {} entries have been written",
            self.label,
            data.entries.len()
        );
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut data = self.data();
        data.entries.insert(key.to_owned(), value);
        self.write_fs(&data)
    }
}
