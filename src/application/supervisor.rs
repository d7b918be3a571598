//! Runs every storefront harvester as its own process
//!
//! Units run one after another, each under a wall-clock budget. The run
//! progress is written to `run_progress.json` before the first unit and after
//! each one; `run_summary.json` is written when all units are done.

use anyhow::Context;
use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::StorefrontId;
use crate::infrastructure::config::SupervisorConfig;

pub const PROGRESS_FILE: &str = "run_progress.json";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// How long to wait for a killed unit's output pipes to close
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One executable harvester invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestUnit {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl HarvestUnit {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }

    /// `harvest --storefront <id>`
    pub fn for_storefront(harvest_bin: &Path, storefront: StorefrontId) -> Self {
        Self::new(storefront.as_str(), harvest_bin, &["--storefront", storefront.as_str()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Success,
    Error,
    Timeout,
}

impl UnitStatus {
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub unit: String,
    pub status: UnitStatus,
    pub return_code: Option<i32>,
    pub started: String,
    pub finished: String,
    pub duration_sec: f64,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    pub script_timeout_min: u64,
    pub output_dir: String,
    pub results: Vec<UnitResult>,
}

impl RunSummary {
    /// Any unit ended in `error` or `timeout`
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.results.iter().any(|result| result.status.is_failure())
    }
}

/// Last `max_chars` characters of `text`
#[must_use]
pub fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    text.char_indices()
        .nth(count - max_chars)
        .map_or("", |(start, _)| &text[start..])
}

fn timestamp(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, false)
}

async fn read_stream<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if let Err(e) = reader.read_to_end(&mut bytes).await {
        warn!("Output stream ended early: {}", e);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn collect(reader: Option<JoinHandle<String>>) -> String {
    let Some(handle) = reader else {
        return String::new();
    };
    match tokio::time::timeout(PIPE_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Output reader failed: {}", e);
            String::new()
        }
        Err(_) => {
            warn!("Output pipe still open after {:?}, dropping it", PIPE_DRAIN_TIMEOUT);
            String::new()
        }
    }
}

pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    #[must_use]
    pub const fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Run `units` in order and write the progress and summary files
    pub async fn run(&self, units: &[HarvestUnit]) -> anyhow::Result<RunSummary> {
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

        let started = Local::now();
        let clock = Instant::now();
        let mut summary = RunSummary {
            started: timestamp(started),
            finished: None,
            duration_sec: None,
            script_timeout_min: self.config.timeout_minutes(),
            output_dir: output_dir.display().to_string(),
            results: Vec::with_capacity(units.len()),
        };
        self.write_json(PROGRESS_FILE, &summary).await?;

        for unit in units {
            info!("=== Running: {} (timeout {} min) ===", unit.name, self.config.timeout_minutes());
            let result = self.run_unit(unit).await;
            match result.status {
                UnitStatus::Success => info!("✅ {} finished in {:.1}s", unit.name, result.duration_sec),
                UnitStatus::Error => error!("❌ {} failed (exit code {:?})", unit.name, result.return_code),
                UnitStatus::Timeout => error!("⏰ TIMEOUT: {}", unit.name),
            }
            summary.results.push(result);
            self.write_json(PROGRESS_FILE, &summary).await?;
        }

        summary.finished = Some(timestamp(Local::now()));
        summary.duration_sec = Some(clock.elapsed().as_secs_f64());
        self.write_json(SUMMARY_FILE, &summary).await?;

        Ok(summary)
    }

    /// Run one unit to completion, failure or timeout
    pub async fn run_unit(&self, unit: &HarvestUnit) -> UnitResult {
        let started = Local::now();
        let clock = Instant::now();

        let mut command = Command::new(&unit.program);
        command
            .args(&unit.args)
            .env("OUTPUT_DIR", &self.config.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("❌ Failed to start {}: {}", unit.program.display(), e);
                return self.result(unit, UnitStatus::Error, None, started, clock, "", &format!("failed to start: {e}"));
            }
        };

        let stdout = child.stdout.take().map(|out| tokio::spawn(read_stream(out)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(read_stream(err)));

        let (status, return_code) = match tokio::time::timeout(self.config.unit_timeout, child.wait()).await {
            Ok(Ok(exit)) => {
                let status = if exit.success() { UnitStatus::Success } else { UnitStatus::Error };
                (status, exit.code())
            }
            Ok(Err(e)) => {
                warn!("Lost track of {}: {}", unit.name, e);
                (UnitStatus::Error, None)
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", unit.name, e);
                }
                (UnitStatus::Timeout, None)
            }
        };

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;
        self.result(unit, status, return_code, started, clock, &stdout, &stderr)
    }

    fn result(
        &self,
        unit: &HarvestUnit,
        status: UnitStatus,
        return_code: Option<i32>,
        started: DateTime<Local>,
        clock: Instant,
        stdout: &str,
        stderr: &str,
    ) -> UnitResult {
        UnitResult {
            unit: unit.name.clone(),
            status,
            return_code,
            started: timestamp(started),
            finished: timestamp(Local::now()),
            duration_sec: clock.elapsed().as_secs_f64(),
            stdout_tail: tail(stdout, self.config.tail_chars).to_string(),
            stderr_tail: tail(stderr, self.config.tail_chars).to_string(),
        }
    }

    async fn write_json(&self, file_name: &str, summary: &RunSummary) -> anyhow::Result<()> {
        let path = self.config.output_dir.join(file_name);
        let json = serde_json::to_string_pretty(summary).context("Failed to encode run summary")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
