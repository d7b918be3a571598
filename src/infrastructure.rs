//! Infrastructure layer - HTTP, HTML parsing, persistence, configuration, logging
//!
//! Modern Rust module organization: every module is its own file in the
//! infrastructure/ directory.

pub mod catalog_store;
pub mod config;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod store_paths;

pub use catalog_store::{CatalogStore, StoreError};
pub use config::{ConfigError, DelayProfile, DelayRange, HarvestConfig, HttpClientConfig, LoggingConfig};
pub use http_client::{FetchError, HttpClient, PageFetcher};
pub use logging::LogHandle;
pub use parsing::{Extraction, ExtractorRegistry, ItemExtractor, ItemRef, ListPage, ParsingError};
pub use store_paths::StorePaths;
