//! Persisted catalog of one storefront day
//!
//! The JSON file is the source of truth and is rewritten in full on every
//! save; the CSV file is a rendering of the same list. Both are written to a
//! temporary sibling first and renamed into place.

use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::record::{COLUMNS, Record};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

impl StoreError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn encode(path: &Path, reason: impl ToString) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    fn decode(path: &Path, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStore {
    json_path: PathBuf,
    csv_path: PathBuf,
}

impl CatalogStore {
    #[must_use]
    pub const fn new(json_path: PathBuf, csv_path: PathBuf) -> Self {
        Self { json_path, csv_path }
    }

    #[must_use]
    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    #[must_use]
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.json_path.is_file()
    }

    /// Read the persisted records; `None` when nothing has been written yet
    pub fn load(&self) -> StoreResult<Option<Vec<Record>>> {
        if !self.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.json_path).map_err(|e| StoreError::io(&self.json_path, e))?;
        if raw.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::decode(&self.json_path, e))
    }

    /// Read the persisted records, treating an unreadable store as empty.
    ///
    /// A store that fails to decode is copied aside as `<name>.corrupt-<timestamp>`
    /// before it is overwritten by the next save.
    pub fn load_or_empty(&self) -> Vec<Record> {
        match self.load() {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                warn!("⚠️ Treating unreadable store as empty: {}", e);
                if let Some(backup) = self.quarantine() {
                    warn!("Unreadable store preserved as {}", backup.display());
                }
                Vec::new()
            }
        }
    }

    /// Copy the current JSON file next to itself with a `.corrupt-<timestamp>` suffix
    fn quarantine(&self) -> Option<PathBuf> {
        let file_name = self.json_path.file_name()?.to_string_lossy().into_owned();
        let backup = self
            .json_path
            .with_file_name(format!("{file_name}.corrupt-{}", Local::now().format("%Y%m%dT%H%M%S")));

        match fs::copy(&self.json_path, &backup) {
            Ok(_) => Some(backup),
            Err(e) => {
                warn!("Could not preserve unreadable store {}: {}", self.json_path.display(), e);
                None
            }
        }
    }

    /// Rewrite both encodings from `records`
    pub fn save(&self, records: &[Record]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(records).map_err(|e| StoreError::encode(&self.json_path, e))?;
        write_atomically(&self.json_path, json.as_bytes())?;

        let csv = render_csv(records).map_err(|e| StoreError::encode(&self.csv_path, e))?;
        write_atomically(&self.csv_path, &csv)?;

        debug!(
            "Saved {} records to {} and {}",
            records.len(),
            self.json_path.display(),
            self.csv_path.display()
        );
        Ok(())
    }
}

fn render_csv(records: &[Record]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

fn write_atomically(path: &Path, contents: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents).map_err(|e| StoreError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))
}
