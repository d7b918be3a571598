//! Resuming sequence numbers across process restarts

use tracing::{info, warn};

use crate::domain::SequenceCounter;
use crate::infrastructure::catalog_store::CatalogStore;

/// Counter continuing after the highest number in `store`.
///
/// An absent or unreadable store starts numbering at 1.
pub fn resume(store: &CatalogStore) -> SequenceCounter {
    match store.load() {
        Ok(Some(records)) => {
            let last = records.iter().filter_map(|record| record.sequence).max().unwrap_or(0);
            info!(
                "🔄 Resuming after sequence {} ({} records in {})",
                last,
                records.len(),
                store.json_path().display()
            );
            SequenceCounter::starting_after(last)
        }
        Ok(None) => SequenceCounter::default(),
        Err(e) => {
            warn!("⚠️ Cannot resume numbering, starting from 1: {}", e);
            SequenceCounter::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Record;
    use std::fs;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CatalogStore {
        CatalogStore::new(dir.path().join("shop.json"), dir.path().join("shop.csv"))
    }

    #[test]
    fn absent_store_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resume(&store(&dir)).last(), 0);
    }

    #[test]
    fn continues_after_the_maximum() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let records: Vec<Record> = [4, 17, 9]
            .into_iter()
            .map(|n| Record {
                sequence: Some(n),
                code: format!("C{n}"),
                ..Record::default()
            })
            .collect();
        store.save(&records).unwrap();

        let mut counter = resume(&store);
        assert_eq!(counter.assign_next(), 18);
    }

    #[test]
    fn corrupt_store_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.json_path(), "[{\"Zap\": 3,").unwrap();

        assert_eq!(resume(&store).last(), 0);
    }
}
