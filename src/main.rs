//! `harvest` - harvest one storefront's catalog for today
//!
//! Exit status 0 when the session completed or was interrupted, 1 when it failed.

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use storefront_harvester::application::{HarvestSession, RandomPacer, SessionContext};
use storefront_harvester::domain::StorefrontId;
use storefront_harvester::infrastructure::logging::init_session_logging;
use storefront_harvester::infrastructure::{ExtractorRegistry, HarvestConfig, HttpClient, StorePaths};

#[derive(Parser, Debug)]
#[command(name = "harvest", version, about = "Harvest one storefront's product catalog")]
struct Cli {
    /// Storefront to harvest
    #[arg(long, value_enum)]
    storefront: StorefrontId,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the output tree, overrides the configuration and OUTPUT_DIR
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Use the short CI delay profile
    #[arg(long, default_value_t = false)]
    ci: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Logging may not be up yet
            eprintln!("harvest: {e:#}");
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = HarvestConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_root = dir;
    }
    config.ci_mode |= cli.ci;
    config.validate()?;

    let extractor = ExtractorRegistry::build(cli.storefront)
        .with_context(|| format!("Failed to set up the {} extractor", cli.storefront))?;
    let shop = extractor.profile().display_name;

    let paths = StorePaths::for_session(&config.output_root, shop, Local::now());
    paths.ensure_dirs()?;
    let log = init_session_logging(&config.logging, Some(paths.daily_dir()), paths.log_file_name())?;

    info!(
        "🛒 {} harvest into {} ({} mode)",
        shop,
        paths.daily_dir().display(),
        if config.ci_mode { "CI" } else { "interactive" }
    );

    let client = HttpClient::new(config.http.clone())?;
    let pacer = RandomPacer::new(*config.delay_profile());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("🛑 Interrupt received, finishing up");
                interrupt.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let context = SessionContext::open(paths, &config, log);
    let session = HarvestSession::new(&client, extractor.as_ref(), &pacer, &config);
    let report = session.run(context, &cancel).await;

    Ok(ExitCode::from(report.status.exit_code()))
}
