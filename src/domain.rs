//! Domain module - catalog records and the rules that govern them
//!
//! Everything here is pure: no network, no file system. Each module is its
//! own file in the domain/ directory; the common items are re-exported here.

pub mod price;
pub mod record;
pub mod sequence;
pub mod storefront;

pub use price::normalize;
pub use record::{DedupKey, Record, RecordFragment};
pub use sequence::SequenceCounter;
pub use storefront::{Category, Endpoint, PaginationScheme, StorefrontId, StorefrontProfile};
