//! Merge/upsert of harvested records into the persisted catalog
//!
//! Records are keyed by [`DedupKey`]. A key keeps the sequence number it got
//! first; later sightings only overwrite the other fields.

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, info};

use crate::domain::{DedupKey, Record, SequenceCounter};
use crate::infrastructure::catalog_store::{CatalogStore, StoreError};

/// Result of one merge
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// Records ordered by sequence number
    pub records: Vec<Record>,
    /// Batch records whose key was new
    pub inserted: usize,
    /// Batch records that overwrote a known key
    pub updated: usize,
}

/// Counters of one upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub total: usize,
}

/// Merge `batch` into `existing`.
///
/// New keys get the next numbers from `counter` in encounter order. Existing
/// records without a number are numbered after every number already in use.
#[must_use]
pub fn merge(existing: Vec<Record>, batch: Vec<Record>, counter: &mut SequenceCounter) -> Vec<Record> {
    merge_counted(existing, batch, counter).records
}

/// [`merge`] that also reports how many batch records were new
#[must_use]
pub fn merge_counted(existing: Vec<Record>, batch: Vec<Record>, counter: &mut SequenceCounter) -> Merged {
    for sequence in existing.iter().filter_map(|record| record.sequence) {
        counter.observe(sequence);
    }

    let mut by_key: IndexMap<DedupKey, Record> = IndexMap::with_capacity(existing.len() + batch.len());
    for record in existing {
        upsert_one(&mut by_key, record, counter, |record, counter| {
            record.sequence.unwrap_or_else(|| counter.assign_next())
        });
    }

    let mut inserted = 0;
    let mut updated = 0;
    for record in batch {
        if upsert_one(&mut by_key, record, counter, |_, counter| counter.assign_next()) {
            inserted += 1;
        } else {
            updated += 1;
        }
    }

    let mut records: Vec<Record> = by_key.into_values().collect();
    records.sort_by_key(|record| record.sequence);

    Merged {
        records,
        inserted,
        updated,
    }
}

/// Insert or overwrite `record`; true when its key was new
fn upsert_one<F>(by_key: &mut IndexMap<DedupKey, Record>, mut record: Record, counter: &mut SequenceCounter, number: F) -> bool
where
    F: FnOnce(&Record, &mut SequenceCounter) -> u64,
{
    match by_key.entry(record.dedup_key()) {
        Entry::Occupied(mut slot) => {
            record.sequence = slot.get().sequence;
            slot.insert(record);
            false
        }
        Entry::Vacant(slot) => {
            record.sequence = Some(number(&record, counter));
            slot.insert(record);
            true
        }
    }
}

/// Persisted catalog that merges every flushed batch
#[derive(Debug, Clone)]
pub struct RecordStore {
    catalog: CatalogStore,
}

impl RecordStore {
    #[must_use]
    pub const fn new(catalog: CatalogStore) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Merge `batch` against the current persisted state and rewrite both files.
    ///
    /// An unreadable store counts as empty.
    pub fn upsert(&self, batch: Vec<Record>, counter: &mut SequenceCounter) -> Result<MergeSummary, StoreError> {
        let existing = self.catalog.load_or_empty();
        let previous = existing.len();
        let merged = merge_counted(existing, batch, counter);

        self.catalog.save(&merged.records)?;

        let summary = MergeSummary {
            inserted: merged.inserted,
            updated: merged.updated,
            total: merged.records.len(),
        };
        debug!("Store had {} records", previous);
        info!(
            "💾 Saved {} records (+{} new, {} updated) to {}",
            summary.total,
            summary.inserted,
            summary.updated,
            self.catalog.json_path().display()
        );
        Ok(summary)
    }
}
