//! Logging system initialization
//!
//! One subscriber per process:
//! - console output on stdout
//! - a plain text (or JSON lines) log file per harvester session, written
//!   through a non-blocking appender into the session's daily directory
//! - local wall-clock timestamps
//!
//! `RUST_LOG` overrides the configured level when set.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

/// Local time formatter, `2026-10-14 08:15:02`
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Keeps the file writer alive; dropping it flushes and closes the log file
#[derive(Debug, Default)]
pub struct LogHandle {
    guard: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogHandle {
    /// Handle that owns no log file
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            guard: None,
            log_file: None,
        }
    }

    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Flush pending lines and close the log file
    pub fn close(&mut self) {
        if self.guard.take().is_some() {
            debug!("Session log closed");
        }
    }
}

/// `<Shop>_Harvest_Log_<HH-MM-SS>.log`
#[must_use]
pub fn session_log_file_name(shop: &str, started_at: DateTime<Local>) -> String {
    format!("{shop}_Harvest_Log_{}.log", started_at.format("%H-%M-%S"))
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);

        // Keep dependency chatter down unless TRACE is requested
        if !config.level.to_lowercase().contains("trace") {
            for directive in ["reqwest=info", "hyper=warn", "h2=warn", "html5ever=warn", "selectors=warn"] {
                if let Ok(directive) = directive.parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }

        filter
    })
}

/// Initialize logging for a harvester session.
///
/// With `log_dir` set and file output enabled, the session log is written to
/// `log_dir/file_name`. A second initialization in the same process keeps the
/// existing subscriber.
pub fn init_session_logging(
    config: &LoggingConfig,
    log_dir: Option<&Path>,
    file_name: &str,
) -> anyhow::Result<LogHandle> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut handle = LogHandle::detached();

    if let (true, Some(dir)) = (config.file_output, log_dir) {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("Failed to create log directory {}: {e}", dir.display()))?;

        let (file_writer, guard) = non_blocking(rolling::never(dir, file_name));
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);

        layers.push(if config.json_format {
            file_layer.json().with_target(true).boxed()
        } else {
            file_layer.with_target(false).boxed()
        });

        handle.guard = Some(guard);
        handle.log_file = Some(dir.join(file_name));
    }

    if config.console_output {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    if layers.is_empty() {
        return Err(anyhow::anyhow!("No logging output configured"));
    }

    match Registry::default().with(layers).with(build_filter(config)).try_init() {
        Ok(()) => {
            info!("Logging system initialized (level: {})", config.level);
            if let Some(path) = handle.log_file() {
                info!("Session log: {}", path.display());
            }
        }
        Err(e) => debug!("Keeping the existing log subscriber: {e}"),
    }

    Ok(handle)
}

/// Console-only logging for tools that do not own a session directory
pub fn init_console_logging(level: &str) -> anyhow::Result<LogHandle> {
    let config = LoggingConfig {
        level: level.to_string(),
        file_output: false,
        ..LoggingConfig::default()
    };
    init_session_logging(&config, None, "")
}
