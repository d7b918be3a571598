//! Storefront extraction contract
//!
//! Every storefront registers exactly one [`ItemExtractor`]. The harvesting
//! engine only talks to this trait, so markup knowledge never leaks past the
//! `sites` modules. Extractors are pure: the same content always yields the
//! same listing page and the same fragment.

pub mod dom;
pub mod error;
pub mod registry;
pub mod sites;

pub use error::{ParsingError, ParsingResult};
pub use registry::ExtractorRegistry;

use crate::domain::{Endpoint, RecordFragment, StorefrontProfile};

/// One product reference found on a listing page.
///
/// Besides the detail URL, listing cards often carry fields the detail page
/// repeats or lacks; they are kept here for the extraction step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRef {
    pub url: String,
    pub title: String,
    pub price_text: String,
    pub unit: String,
    pub image_url: String,
}

impl ItemRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Parsed listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<ItemRef>,
    /// A "next page" affordance is present
    pub has_next: bool,
    /// The storefront explicitly says the listing has no items
    pub no_items_marker: bool,
}

/// Outcome of extracting one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fragment(RecordFragment),
    /// Nothing usable here; not an error
    Skip(String),
}

impl Extraction {
    /// Skip fragments that carry neither a description nor a price
    #[must_use]
    pub fn from_fragment(fragment: RecordFragment) -> Self {
        if fragment.is_unusable() {
            Self::Skip(format!("no description and no price: {}", fragment.url))
        } else {
            Self::Fragment(fragment)
        }
    }
}

/// Capability interface implemented once per storefront
pub trait ItemExtractor: Send + Sync {
    fn profile(&self) -> &StorefrontProfile;

    /// URL of listing page `page` (1-based) of `endpoint`
    fn page_url(&self, endpoint: &Endpoint, page: u32) -> String {
        self.profile().page_url(endpoint, page)
    }

    /// Parse one listing page into item references and pagination signals
    fn list_page(&self, html: &str) -> ListPage;

    /// Cheap proxy used to detect a listing page served twice.
    ///
    /// Defaults to the first item's title, or its URL for cards without one.
    fn first_item_fingerprint(&self, page: &ListPage) -> Option<String> {
        page.items.first().map(|item| {
            if item.title.trim().is_empty() {
                item.url.clone()
            } else {
                item.title.trim().to_string()
            }
        })
    }

    /// Whether [`extract`](Self::extract) wants the detail page content
    fn needs_detail(&self) -> bool {
        true
    }

    /// Reason to drop a reference before its detail page is fetched
    fn screen(&self, _item: &ItemRef) -> Option<String> {
        None
    }

    /// Produce the record fields from the listing card and the detail content
    fn extract(&self, item: &ItemRef, detail_html: Option<&str>) -> Extraction;
}
