//! Per-storefront, per-day output paths
//!
//! `<output_root>/Ceniki_Scraping/<Shop>/<YYYY-MM-DD>/` holds the day's
//! JSON store, its CSV rendering and the session logs. All names are derived
//! from one timestamp so every file of a session agrees on the day.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::catalog_store::{CatalogStore, StoreError};
use super::logging::session_log_file_name;

/// Top-level directory under the output root
pub const SCRAPING_DIR: &str = "Ceniki_Scraping";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    daily_dir: PathBuf,
    json_path: PathBuf,
    csv_path: PathBuf,
    log_file_name: String,
}

impl StorePaths {
    /// Paths of `shop`'s session started at `started_at`
    #[must_use]
    pub fn for_session(output_root: &Path, shop: &str, started_at: DateTime<Local>) -> Self {
        let daily_dir = output_root
            .join(SCRAPING_DIR)
            .join(shop)
            .join(started_at.format("%Y-%m-%d").to_string());

        let file_date = started_at.format("%d_%m_%Y");
        let json_path = daily_dir.join(format!("{shop}_Podatki_{file_date}.json"));
        let csv_path = daily_dir.join(format!("{shop}_Podatki_{file_date}.csv"));

        Self {
            log_file_name: session_log_file_name(shop, started_at),
            daily_dir,
            json_path,
            csv_path,
        }
    }

    /// Create the daily directory if it is missing
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        if !self.daily_dir.exists() {
            std::fs::create_dir_all(&self.daily_dir).map_err(|e| StoreError::io(&self.daily_dir, e))?;
            debug!("Created output directory: {}", self.daily_dir.display());
        }
        Ok(())
    }

    #[must_use]
    pub fn daily_dir(&self) -> &Path {
        &self.daily_dir
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
    pub fn log_file_name(&self) -> &str {
        &self.log_file_name
    }

    /// Store backed by this session's files
    #[must_use]
    pub fn catalog_store(&self) -> CatalogStore {
        CatalogStore::new(self.json_path.clone(), self.csv_path.clone())
    }
}
