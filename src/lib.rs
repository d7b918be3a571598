//! Storefront Harvester - incremental product catalog harvesting
//!
//! Walks the paginated category listings of a storefront, extracts one record
//! per product, normalizes VAT pricing and keeps a de-duplicated daily catalog
//! per storefront that resumes its numbering across runs.

// Module declarations
pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod test_utils;

// Re-export the types the binaries and integration tests reach for
pub use application::{HarvestSession, SessionContext, SessionReport, SessionStatus};
pub use domain::{Record, StorefrontId};
pub use infrastructure::config::HarvestConfig;
