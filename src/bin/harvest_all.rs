//! `harvest-all` - run every storefront harvester under a wall-clock budget
//!
//! Environment:
//! - `OUTPUT_DIR`: where the run files go and what the harvesters get (default `artifacts`)
//! - `SCRIPT_TIMEOUT_MIN`: minutes per harvester (default 45)
//! - `HARVEST_BIN`: harvester executable (default: `harvest` next to this binary)
//!
//! Exits 1 when any harvester ended in `error` or `timeout`.

use anyhow::Context;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use storefront_harvester::application::{HarvestUnit, Supervisor};
use storefront_harvester::domain::StorefrontId;
use storefront_harvester::infrastructure::config::SupervisorConfig;
use storefront_harvester::infrastructure::logging::init_console_logging;

fn harvest_binary() -> anyhow::Result<PathBuf> {
    if let Some(path) = std::env::var_os("HARVEST_BIN") {
        return Ok(PathBuf::from(path));
    }

    let current = std::env::current_exe().context("Cannot locate the running executable")?;
    let dir = current
        .parent()
        .context("The running executable has no parent directory")?;
    Ok(dir.join(format!("harvest{}", std::env::consts::EXE_SUFFIX)))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _log = match init_console_logging("info") {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("harvest-all: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = SupervisorConfig::from_env();
    let harvest_bin = harvest_binary()?;
    let units: Vec<HarvestUnit> = StorefrontId::ALL
        .iter()
        .map(|storefront| HarvestUnit::for_storefront(&harvest_bin, *storefront))
        .collect();

    info!(
        "🚀 Running {} harvesters from {} into {}",
        units.len(),
        harvest_bin.display(),
        config.output_dir.display()
    );

    let summary = Supervisor::new(config).run(&units).await?;
    let failed = summary.results.iter().filter(|result| result.status.is_failure()).count();
    info!("🏁 {} of {} harvesters succeeded", summary.results.len() - failed, summary.results.len());

    Ok(if summary.any_failed() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
