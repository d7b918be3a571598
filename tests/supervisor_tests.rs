//! Supervising harvester processes (uses `sh`, so Unix only)
#![cfg(unix)]

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use storefront_harvester::application::supervisor::{PROGRESS_FILE, SUMMARY_FILE};
use storefront_harvester::application::{HarvestUnit, RunSummary, Supervisor, UnitStatus};
use storefront_harvester::infrastructure::config::SupervisorConfig;

fn supervisor(dir: &TempDir, timeout: Duration) -> Supervisor {
    Supervisor::new(SupervisorConfig {
        output_dir: dir.path().join("artifacts"),
        unit_timeout: timeout,
        tail_chars: 16,
    })
}

fn shell(name: &str, script: &str) -> HarvestUnit {
    HarvestUnit::new(name, "sh", &["-c", script])
}

#[tokio::test]
async fn classifies_success_error_and_timeout() {
    let dir = TempDir::new().unwrap();
    let units = [
        shell("ok", "echo \"harvested into $OUTPUT_DIR\""),
        shell("broken", "echo boom >&2; exit 3"),
        shell("slow", "exec sleep 30"),
    ];

    let summary = supervisor(&dir, Duration::from_millis(500)).run(&units).await.unwrap();

    let statuses: Vec<UnitStatus> = summary.results.iter().map(|result| result.status).collect();
    assert_eq!(statuses, [UnitStatus::Success, UnitStatus::Error, UnitStatus::Timeout]);
    assert_eq!(summary.results[0].return_code, Some(0));
    assert_eq!(summary.results[1].return_code, Some(3));
    assert_eq!(summary.results[1].stderr_tail, "boom\n");
    assert_eq!(summary.results[2].return_code, None);
    assert!(summary.results[2].duration_sec < 10.0);
    assert!(summary.any_failed());
}

#[tokio::test]
async fn keeps_only_the_output_tail() {
    let dir = TempDir::new().unwrap();
    let units = [shell("chatty", "printf 'aaaaaaaaaaaaaaaaaaaaBBBBBBBBBBBBBBBB'")];

    let summary = supervisor(&dir, Duration::from_secs(10)).run(&units).await.unwrap();

    assert_eq!(summary.results[0].stdout_tail, "BBBBBBBBBBBBBBBB");
    assert!(!summary.any_failed());
}

#[tokio::test]
async fn writes_progress_and_summary_files() {
    let dir = TempDir::new().unwrap();
    let units = [shell("one", "true"), shell("two", "true")];

    let summary = supervisor(&dir, Duration::from_secs(10)).run(&units).await.unwrap();

    let artifacts = dir.path().join("artifacts");
    let progress: RunSummary = serde_json::from_str(&fs::read_to_string(artifacts.join(PROGRESS_FILE)).unwrap()).unwrap();
    let written: RunSummary = serde_json::from_str(&fs::read_to_string(artifacts.join(SUMMARY_FILE)).unwrap()).unwrap();

    assert_eq!(progress.results.len(), 2);
    assert!(progress.finished.is_none());
    assert_eq!(written.started, summary.started);
    assert_eq!(written.results.len(), 2);
    assert!(written.finished.is_some());
    assert!(written.results.iter().all(|result| result.status == UnitStatus::Success));
}
