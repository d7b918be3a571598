//! End-to-end harvesting sessions against scripted storefronts
use chrono::{Local, TimeZone};
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use storefront_harvester::application::{HarvestSession, NoPause, SessionContext, SessionStatus};
use storefront_harvester::domain::Record;
use storefront_harvester::infrastructure::{HarvestConfig, LogHandle, StorePaths};
use storefront_harvester::test_utils::{FixtureExtractor, ScriptedFetcher, detail, listing};

fn paths(dir: &TempDir) -> StorePaths {
    let started = Local.with_ymd_and_hms(2026, 10, 14, 7, 30, 0).unwrap();
    let paths = StorePaths::for_session(dir.path(), "Merkur", started);
    paths.ensure_dirs().unwrap();
    paths
}

/// Listing page plus one detail page per item
fn storefront(endpoint: &str, prefix: &str, count: usize) -> ScriptedFetcher {
    add_endpoint(ScriptedFetcher::new(), endpoint, prefix, count)
}

fn add_endpoint(mut fetcher: ScriptedFetcher, endpoint: &str, prefix: &str, count: usize) -> ScriptedFetcher {
    let urls: Vec<String> = (1..=count).map(|i| format!("https://shop.test/p/{prefix}{i}")).collect();
    let items: Vec<(&str, &str)> = urls.iter().map(|url| (url.as_str(), "card")).collect();
    fetcher = fetcher.with_page(endpoint, &listing(&items, false));
    for (i, url) in urls.iter().enumerate() {
        fetcher = fetcher.with_page(url, &detail(&format!("{prefix}{}", i + 1), "Ploščica", "12,20"));
    }
    fetcher
}

#[tokio::test]
async fn five_items_flush_once_at_the_threshold() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let store = paths.catalog_store();
    let extractor = FixtureExtractor::single_endpoint("https://shop.test/c/a");
    let fetcher = storefront("https://shop.test/c/a", "A", 5);
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &CancellationToken::new())
        .await;

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.stats.accepted, 5);
    assert_eq!(report.stats.threshold_flushes, 1);
    assert_eq!(report.stats.boundary_flushes, 0);

    let saved = store.load().unwrap().unwrap();
    let sequences: Vec<Option<u64>> = saved.iter().map(|record| record.sequence).collect();
    assert_eq!(sequences, [Some(1), Some(2), Some(3), Some(4), Some(5)]);
    assert_eq!(saved[0].code, "A1");
    assert_eq!(saved[0].group, "Fixture");
    assert_eq!(saved[0].price_net, "10,00");
    assert!(store.csv_path().is_file());
}

#[tokio::test]
async fn remainder_is_flushed_at_the_endpoint_boundary() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let extractor = FixtureExtractor::new(&[("Ploščice", &["https://shop.test/c/a", "https://shop.test/c/b"])]);
    let fetcher = add_endpoint(storefront("https://shop.test/c/a", "A", 7), "https://shop.test/c/b", "B", 2);
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &CancellationToken::new())
        .await;

    assert_eq!(report.stats.accepted, 9);
    assert_eq!(report.stats.threshold_flushes, 1);
    assert_eq!(report.stats.boundary_flushes, 2);
    assert_eq!(report.stats.endpoints, 2);
    assert_eq!(report.last_sequence, 9);
}

#[tokio::test]
async fn numbering_resumes_after_the_persisted_maximum() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let store = paths.catalog_store();
    let earlier: Vec<Record> = [3, 17]
        .into_iter()
        .map(|n| Record {
            sequence: Some(n),
            code: format!("OLD{n}"),
            ..Record::default()
        })
        .collect();
    store.save(&earlier).unwrap();

    let extractor = FixtureExtractor::single_endpoint("https://shop.test/c/a");
    let fetcher = storefront("https://shop.test/c/a", "N", 3);
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &CancellationToken::new())
        .await;

    let saved = store.load().unwrap().unwrap();
    let numbered: Vec<(String, Option<u64>)> = saved.into_iter().map(|r| (r.code, r.sequence)).collect();
    assert_eq!(
        numbered,
        [
            ("OLD3".to_string(), Some(3)),
            ("OLD17".to_string(), Some(17)),
            ("N1".to_string(), Some(18)),
            ("N2".to_string(), Some(19)),
            ("N3".to_string(), Some(20)),
        ]
    );
    assert_eq!(report.stats.inserted, 3);
}

#[tokio::test]
async fn failed_details_and_repeated_references_are_contained() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let extractor = FixtureExtractor::new(&[("Ploščice", &["https://shop.test/c/a", "https://shop.test/c/b"])])
        .screening("https://shop.test/p/A3");
    let fetcher = storefront("https://shop.test/c/a", "A", 3)
        .with_failure("https://shop.test/p/A2", 500)
        .with_page("https://shop.test/c/b", &listing(&[("https://shop.test/p/A1", "again")], false));
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &CancellationToken::new())
        .await;

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.stats.accepted, 1);
    assert_eq!(report.stats.detail_failures, 1);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.duplicates, 1);
    assert_eq!(fetcher.request_count("https://shop.test/p/A1"), 1);
    assert_eq!(fetcher.request_count("https://shop.test/p/A3"), 0);
}

#[tokio::test]
async fn interrupted_session_reports_success() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let store = paths.catalog_store();
    let extractor = FixtureExtractor::single_endpoint("https://shop.test/c/a");
    let fetcher = storefront("https://shop.test/c/a", "A", 2);
    let config = HarvestConfig::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &cancel)
        .await;

    assert_eq!(report.status, SessionStatus::Interrupted);
    assert_eq!(report.status.exit_code(), 0);
    assert!(fetcher.requests().is_empty());
    assert!(!store.exists());
}

#[tokio::test]
async fn item_that_failed_once_is_retried_on_a_later_listing() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let extractor = FixtureExtractor::new(&[("Ploščice", &["https://shop.test/c/a", "https://shop.test/c/b"])]);
    let item = "https://shop.test/p/X";
    let fetcher = ScriptedFetcher::new()
        .with_page("https://shop.test/c/a", &listing(&[(item, "card")], false))
        .with_page("https://shop.test/c/b", &listing(&[(item, "card")], false))
        .with_page(item, &detail("X1", "Lepilo", "9,76"))
        .with_transient_failure(item, 503);
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &CancellationToken::new())
        .await;

    assert_eq!(report.stats.accepted, 1);
    assert_eq!(report.stats.detail_failures, 1);
    assert_eq!(report.stats.duplicates, 0);
    assert_eq!(fetcher.request_count(item), 2);
}

#[tokio::test]
async fn interrupt_mid_endpoint_keeps_the_buffered_records() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    let store = paths.catalog_store();
    let extractor = FixtureExtractor::single_endpoint("https://shop.test/c/a");
    let cancel = CancellationToken::new();
    let fetcher = storefront("https://shop.test/c/a", "A", 4).with_cancel_on("https://shop.test/p/A3", &cancel);
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &cancel)
        .await;

    assert_eq!(report.status, SessionStatus::Interrupted);
    assert_eq!(report.stats.accepted, 2);
    assert_eq!(report.stats.termination_flushes, 1);
    assert_eq!(fetcher.request_count("https://shop.test/p/A4"), 0);

    let saved = store.load().unwrap().unwrap();
    let codes: Vec<&str> = saved.iter().map(|record| record.code.as_str()).collect();
    assert_eq!(codes, ["A1", "A2"]);
}

#[tokio::test]
async fn unwritable_store_fails_the_session() {
    let dir = TempDir::new().unwrap();
    let paths = paths(&dir);
    // a directory where the JSON file should go makes every save fail
    fs::create_dir_all(paths.json_path()).unwrap();
    let extractor = FixtureExtractor::single_endpoint("https://shop.test/c/a");
    let fetcher = storefront("https://shop.test/c/a", "A", 2);
    let config = HarvestConfig::default();

    let context = SessionContext::open(paths, &config, LogHandle::detached());
    let report = HarvestSession::new(&fetcher, &extractor, &NoPause, &config)
        .run(context, &CancellationToken::new())
        .await;

    assert_eq!(report.status, SessionStatus::Failed);
    assert_eq!(report.status.exit_code(), 1);
    assert!(report.error.as_deref().is_some_and(|error| !error.is_empty()));
    assert_eq!(report.stats.accepted, 2);
    assert_eq!(report.stats.flushes(), 0);
    assert_eq!(report.stats.inserted, 0);
}
