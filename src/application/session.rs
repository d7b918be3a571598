//! One harvesting session of one storefront
//!
//! [`SessionContext`] owns everything with session lifetime: the sequence
//! counter, the record buffer, the store and the log handle. Buffered records
//! are flushed when the buffer reaches the threshold, at every endpoint
//! boundary and once more on termination, so at most `threshold - 1` records
//! can be lost on an abnormal exit. Dropping an unfinished context still
//! attempts the final flush.
//!
//! [`HarvestSession`] drives the traversal: categories, endpoints, listing
//! pages, then one detail fetch per item, strictly one request at a time.

use chrono::Local;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::checkpoint;
use crate::application::page_walker::{PageWalker, WalkOutcome};
use crate::application::record_store::{MergeSummary, RecordStore};
use crate::application::throttle::{Pacer, PauseKind};
use crate::domain::{Endpoint, Record, SequenceCounter, StorefrontId};
use crate::infrastructure::catalog_store::StoreError;
use crate::infrastructure::config::HarvestConfig;
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::logging::LogHandle;
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef};
use crate::infrastructure::store_paths::StorePaths;

/// Session-fatal errors; transport and extraction failures never reach this level
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Failed to persist harvested records: {0}")]
    Store(#[from] StoreError),
}

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Threshold,
    Boundary,
    Termination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub endpoints: usize,
    pub pages: u32,
    pub references: usize,
    pub duplicates: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub detail_failures: usize,
    pub threshold_flushes: usize,
    pub boundary_flushes: usize,
    pub termination_flushes: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl SessionStats {
    #[must_use]
    pub const fn flushes(&self) -> usize {
        self.threshold_flushes + self.boundary_flushes + self.termination_flushes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    /// Stopped by an interrupt; the partial catalog is kept
    Interrupted,
    Failed,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    /// Process exit code; an interrupted run still succeeded
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Completed | Self::Interrupted => 0,
            Self::Failed => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub storefront: StorefrontId,
    pub status: SessionStatus,
    pub stats: SessionStats,
    pub last_sequence: u64,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub duration_sec: f64,
    pub error: Option<String>,
}

impl SessionReport {
    pub fn log_summary(&self) {
        let stats = &self.stats;
        info!(
            "🏁 {} harvest {} in {:.1}s: {} endpoints, {} pages, {} references, {} accepted, {} skipped, {} detail failures",
            self.storefront.display_name(),
            self.status.as_str(),
            self.duration_sec,
            stats.endpoints,
            stats.pages,
            stats.references,
            stats.accepted,
            stats.skipped,
            stats.detail_failures
        );
        info!(
            "💾 Flushes: {} threshold, {} boundary, {} final; {} new, {} updated, last sequence {}",
            stats.threshold_flushes,
            stats.boundary_flushes,
            stats.termination_flushes,
            stats.inserted,
            stats.updated,
            self.last_sequence
        );
        info!("📁 {} / {}", self.json_path.display(), self.csv_path.display());
        if let Some(error) = &self.error {
            error!("❌ {}", error);
        }
    }
}

/// Session-scoped state with a guaranteed final flush
pub struct SessionContext {
    paths: StorePaths,
    store: RecordStore,
    counter: SequenceCounter,
    buffer: Vec<Record>,
    threshold: usize,
    seen_urls: HashSet<String>,
    valid_from: String,
    stats: SessionStats,
    log: LogHandle,
    finished: bool,
}

impl SessionContext {
    /// Resume numbering from the persisted store and start an empty buffer
    pub fn open(paths: StorePaths, config: &HarvestConfig, log: LogHandle) -> Self {
        let store = RecordStore::new(paths.catalog_store());
        let counter = checkpoint::resume(store.catalog());

        Self {
            paths,
            store,
            counter,
            buffer: Vec::with_capacity(config.flush_threshold),
            threshold: config.flush_threshold.max(1),
            seen_urls: HashSet::new(),
            valid_from: Local::now().format("%d/%m/%Y").to_string(),
            stats: SessionStats::default(),
            log,
            finished: false,
        }
    }

    #[must_use]
    pub const fn counter(&self) -> SequenceCounter {
        self.counter
    }

    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub const fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Session start date, `DD/MM/YYYY`
    #[must_use]
    pub fn valid_from(&self) -> &str {
        &self.valid_from
    }

    /// True when a record for `url` was already accepted in this session
    pub fn already_harvested(&mut self, url: &str) -> bool {
        let seen = self.seen_urls.contains(url);
        if seen {
            self.stats.duplicates += 1;
        }
        seen
    }

    /// Remember `url` so later listings of it are not fetched again
    pub fn mark_harvested(&mut self, url: &str) {
        self.seen_urls.insert(url.to_string());
    }

    /// Buffer a record, flushing once the threshold is reached
    pub fn accept(&mut self, record: Record) -> Result<(), HarvestError> {
        self.buffer.push(record);
        self.stats.accepted += 1;
        if self.buffer.len() >= self.threshold {
            self.flush(FlushTrigger::Threshold)?;
        }
        Ok(())
    }

    /// Flush whatever the finished endpoint left in the buffer
    pub fn end_endpoint(&mut self) -> Result<(), HarvestError> {
        self.stats.endpoints += 1;
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.flush(FlushTrigger::Boundary)
    }

    /// Final flush; rewrites the store whenever there is something to write or it already exists
    pub fn finish(&mut self) -> Result<(), HarvestError> {
        self.finished = true;
        if self.buffer.is_empty() && !self.store.catalog().exists() {
            debug!("Nothing harvested and no store to rewrite");
            return Ok(());
        }
        self.flush(FlushTrigger::Termination)
    }

    /// Flush pending log lines and close the session log
    pub fn close_log(&mut self) {
        self.log.close();
    }

    #[must_use]
    pub fn report(&self, storefront: StorefrontId, status: SessionStatus, started: Instant, error: Option<String>) -> SessionReport {
        SessionReport {
            storefront,
            status,
            stats: self.stats.clone(),
            last_sequence: self.counter.last(),
            json_path: self.paths.json_path().to_path_buf(),
            csv_path: self.paths.csv_path().to_path_buf(),
            log_file: self.log.log_file().map(PathBuf::from),
            duration_sec: started.elapsed().as_secs_f64(),
            error,
        }
    }

    fn note_walk(&mut self, outcome: &WalkOutcome) {
        self.stats.pages += outcome.pages_collected;
        self.stats.references += outcome.items.len();
    }

    fn note_skipped(&mut self) {
        self.stats.skipped += 1;
    }

    fn note_detail_failure(&mut self) {
        self.stats.detail_failures += 1;
    }

    /// Merge the buffer into the store; the buffer survives a failed write
    fn flush(&mut self, trigger: FlushTrigger) -> Result<(), HarvestError> {
        debug!("Flushing {} buffered records ({:?})", self.buffer.len(), trigger);
        let MergeSummary { inserted, updated, .. } = self.store.upsert(self.buffer.clone(), &mut self.counter)?;
        self.buffer.clear();

        self.stats.inserted += inserted;
        self.stats.updated += updated;
        match trigger {
            FlushTrigger::Threshold => self.stats.threshold_flushes += 1,
            FlushTrigger::Boundary => self.stats.boundary_flushes += 1,
            FlushTrigger::Termination => self.stats.termination_flushes += 1,
        }
        Ok(())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        if !self.finished && !self.buffer.is_empty() {
            warn!("⚠️ Session ended without a final flush, saving {} buffered records", self.buffer.len());
            if let Err(e) = self.flush(FlushTrigger::Termination) {
                error!("❌ Buffered records could not be saved: {}", e);
            }
        }
    }
}

/// Sequential traversal of one storefront
pub struct HarvestSession<'a> {
    fetcher: &'a dyn PageFetcher,
    extractor: &'a dyn ItemExtractor,
    pacer: &'a dyn Pacer,
    max_pages: Option<u32>,
}

impl<'a> HarvestSession<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        extractor: &'a dyn ItemExtractor,
        pacer: &'a dyn Pacer,
        config: &HarvestConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pacer,
            max_pages: config.max_pages_per_endpoint,
        }
    }

    /// Harvest every endpoint, then flush and report.
    ///
    /// Cancelling `cancel` stops the traversal at its next await point; the
    /// buffered records are still flushed and the session counts as interrupted.
    pub async fn run(&self, mut context: SessionContext, cancel: &CancellationToken) -> SessionReport {
        let storefront = self.extractor.profile().id;
        let started = Instant::now();
        info!(
            "🚀 Starting {} harvest, numbering after {}",
            storefront.display_name(),
            context.counter().last()
        );

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.harvest(&mut context) => Some(result),
        };

        let (mut status, mut failure) = match outcome {
            Some(Ok(())) => (SessionStatus::Completed, None),
            None => {
                warn!("🛑 Interrupted, saving what was harvested so far");
                (SessionStatus::Interrupted, None)
            }
            Some(Err(e)) => {
                error!("❌ Harvest aborted: {}", e);
                (SessionStatus::Failed, Some(e.to_string()))
            }
        };

        if let Err(e) = context.finish() {
            error!("❌ Final flush failed: {}", e);
            status = SessionStatus::Failed;
            failure.get_or_insert_with(|| e.to_string());
        }

        let report = context.report(storefront, status, started, failure);
        report.log_summary();
        context.close_log();
        report
    }

    async fn harvest(&self, context: &mut SessionContext) -> Result<(), HarvestError> {
        self.pacer.pause(PauseKind::Startup).await;

        let walker = PageWalker::new(self.fetcher, self.extractor, self.pacer).with_page_limit(self.max_pages);
        for (category, endpoint) in self.extractor.profile().endpoints() {
            info!("📂 {} / {}: {}", category.name, endpoint.group, endpoint.url);
            let outcome = walker.walk(endpoint).await;
            context.note_walk(&outcome);

            for item in &outcome.items {
                self.harvest_item(context, endpoint, item).await?;
            }
            context.end_endpoint()?;
        }
        Ok(())
    }

    async fn harvest_item(&self, context: &mut SessionContext, endpoint: &Endpoint, item: &ItemRef) -> Result<(), HarvestError> {
        if context.already_harvested(&item.url) {
            debug!("Already processed in this session: {}", item.url);
            return Ok(());
        }
        if let Some(reason) = self.extractor.screen(item) {
            info!("⏭️ Skipping {}", reason);
            context.note_skipped();
            return Ok(());
        }

        let detail = if self.extractor.needs_detail() {
            let fetched = self.fetcher.fetch_text(&item.url).await;
            self.pacer.pause(PauseKind::Detail).await;
            match fetched {
                Ok(html) => Some(html),
                Err(e) => {
                    warn!("⚠️ Detail page failed, skipping item: {}", e);
                    context.note_detail_failure();
                    return Ok(());
                }
            }
        } else {
            None
        };

        match self.extractor.extract(item, detail.as_deref()) {
            Extraction::Fragment(fragment) => {
                let record = Record::from_fragment(fragment, &endpoint.group, context.valid_from(), self.extractor.profile());
                debug!("✅ {} | {} | {}", record.code, record.description, record.price_gross);
                context.mark_harvested(&item.url);
                context.accept(record)
            }
            Extraction::Skip(reason) => {
                debug!("Skipped: {}", reason);
                context.note_skipped();
                Ok(())
            }
        }
    }
}
