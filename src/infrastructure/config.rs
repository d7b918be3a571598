//! Harvester configuration
//!
//! Sources, lowest priority first:
//! 1. built-in defaults (see [`defaults`])
//! 2. an optional configuration file (TOML/JSON/YAML, picked by extension)
//! 3. `HARVEST_*` environment variables, `__` separating nested keys
//!    (`HARVEST_DELAYS__CI__DETAIL__MAX_MS=900`)
//! 4. the legacy variables `OUTPUT_DIR`, `GITHUB_ACTIONS` and `CI`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default configuration values
pub mod defaults {
    /// Prefix of the layered environment variables
    pub const ENV_PREFIX: &str = "HARVEST";

    /// Buffered records that trigger a flush
    pub const FLUSH_THRESHOLD: usize = 5;

    /// Request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;

    /// Hard request ceiling beneath the randomized delays
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    /// Output root when neither the configuration nor `OUTPUT_DIR` names one
    pub const OUTPUT_ROOT: &str = ".";

    /// Supervisor output directory when `OUTPUT_DIR` is unset
    pub const SUPERVISOR_OUTPUT_DIR: &str = "artifacts";

    /// Wall-clock budget per harvester run, in minutes
    pub const SCRIPT_TIMEOUT_MIN: u64 = 45;

    /// Characters of stdout/stderr kept per harvester run
    pub const OUTPUT_TAIL_CHARS: usize = 4000;

    pub const USER_AGENTS: [&str; 4] = [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    ];
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// Environment variable accessor (production vs. tests)
#[cfg(not(test))]
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
pub(crate) mod test_env {
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    // Shared map to simulate environment in tests without touching real process env
    pub static TEST_ENV: Lazy<Mutex<HashMap<String, String>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));

    static SERIAL: Mutex<()> = Mutex::new(());

    pub fn get(name: &str) -> Option<String> {
        TEST_ENV.lock().unwrap_or_else(|e| e.into_inner()).get(name).cloned()
    }

    /// Replace the simulated environment; holding the guard serializes tests
    pub fn set(vars: &[(&str, &str)]) -> MutexGuard<'static, ()> {
        let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = TEST_ENV.lock().unwrap_or_else(|e| e.into_inner());
        map.clear();
        map.extend(vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        guard
    }
}

#[cfg(test)]
pub(crate) fn env_var(name: &str) -> Option<String> {
    test_env::get(name)
}

fn read_flag(name: &str) -> bool {
    env_var(name).is_some_and(|value| {
        let value = value.trim();
        !value.is_empty() && !value.eq_ignore_ascii_case("0") && !value.eq_ignore_ascii_case("false")
    })
}

/// True when running under GitHub Actions or another CI runner
pub fn is_ci_environment() -> bool {
    env_var("GITHUB_ACTIONS").is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
        || read_flag("CI")
}

/// Inclusive range of a randomized pause, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

/// Pauses applied at the three throttling points of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayProfile {
    /// Before the first request
    pub startup: DelayRange,
    /// Between two listing pages of one endpoint
    pub listing_page: DelayRange,
    /// After every detail fetch
    pub detail: DelayRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub interactive: DelayProfile,
    pub ci: DelayProfile,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            interactive: DelayProfile {
                startup: DelayRange::new(1_000, 10_000),
                listing_page: DelayRange::new(2_000, 5_000),
                detail: DelayRange::new(2_000, 20_000),
            },
            ci: DelayProfile {
                startup: DelayRange::new(0, 2_000),
                listing_page: DelayRange::new(700, 2_500),
                detail: DelayRange::new(700, 2_500),
            },
        }
    }
}

impl DelayConfig {
    /// Profile matching the execution mode
    #[must_use]
    pub const fn active(&self, ci_mode: bool) -> &DelayProfile {
        if ci_mode { &self.ci } else { &self.interactive }
    }
}

/// HTTP client configuration for harvesting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Browser identities rotated per request
    pub user_agents: Vec<String>,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::USER_AGENTS.iter().map(ToString::to_string).collect(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            follow_redirects: true,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Write the session log file as JSON lines
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable the per-session log file
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
        }
    }
}

/// Complete configuration of one harvester run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Root of the `Ceniki_Scraping/<Shop>/<date>/` tree
    pub output_root: PathBuf,
    /// Shorter randomized delays
    pub ci_mode: bool,
    pub flush_threshold: usize,
    /// Optional safety cap on listing pages per endpoint
    pub max_pages_per_endpoint: Option<u32>,
    pub http: HttpClientConfig,
    pub delays: DelayConfig,
    pub logging: LoggingConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(defaults::OUTPUT_ROOT),
            ci_mode: false,
            flush_threshold: defaults::FLUSH_THRESHOLD,
            max_pages_per_endpoint: None,
            http: HttpClientConfig::default(),
            delays: DelayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load the layered configuration, optionally reading `path` on top of the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// Honour `OUTPUT_DIR` and the CI markers of the old harvester scripts
    pub fn apply_legacy_env(&mut self) {
        if let Some(dir) = env_var("OUTPUT_DIR").filter(|dir| !dir.trim().is_empty()) {
            self.output_root = PathBuf::from(dir);
        }
        if is_ci_environment() {
            self.ci_mode = true;
        }
    }

    /// Delay profile of the current execution mode
    #[must_use]
    pub const fn delay_profile(&self) -> &DelayProfile {
        self.delays.active(self.ci_mode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_threshold == 0 {
            return Err(ConfigError::validation("flush_threshold must be at least 1"));
        }

        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::validation("http.timeout_seconds must be greater than 0"));
        }

        if self.http.max_requests_per_second == 0 {
            return Err(ConfigError::validation(
                "http.max_requests_per_second must be greater than 0",
            ));
        }

        if self.max_pages_per_endpoint == Some(0) {
            return Err(ConfigError::validation("max_pages_per_endpoint must be at least 1 when set"));
        }

        for (mode, profile) in [("interactive", &self.delays.interactive), ("ci", &self.delays.ci)] {
            for (name, range) in [
                ("startup", profile.startup),
                ("listing_page", profile.listing_page),
                ("detail", profile.detail),
            ] {
                if range.min_ms > range.max_ms {
                    return Err(ConfigError::validation(format!(
                        "delays.{mode}.{name}: min_ms cannot be greater than max_ms"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Settings of the `harvest-all` supervisor, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub output_dir: PathBuf,
    pub unit_timeout: Duration,
    pub tail_chars: usize,
}

impl SupervisorConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let output_dir = env_var("OUTPUT_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| defaults::SUPERVISOR_OUTPUT_DIR.to_string());

        let minutes = match env_var("SCRIPT_TIMEOUT_MIN") {
            Some(raw) => raw.trim().parse::<u64>().ok().filter(|m| *m > 0).unwrap_or_else(|| {
                warn!(
                    "Ignoring invalid SCRIPT_TIMEOUT_MIN '{}', using {} minutes",
                    raw,
                    defaults::SCRIPT_TIMEOUT_MIN
                );
                defaults::SCRIPT_TIMEOUT_MIN
            }),
            None => defaults::SCRIPT_TIMEOUT_MIN,
        };

        Self {
            output_dir: PathBuf::from(output_dir),
            unit_timeout: Duration::from_secs(minutes * 60),
            tail_chars: defaults::OUTPUT_TAIL_CHARS,
        }
    }

    #[must_use]
    pub const fn timeout_minutes(&self) -> u64 {
        self.unit_timeout.as_secs() / 60
    }
}
