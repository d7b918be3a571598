//! Listing pagination as an explicit two-state machine
//!
//! A walk starts `Walking` at page 1. Each step fetches one listing page and
//! either moves to the next page or lands in `Done` with the reason it
//! stopped. Every step stops or strictly increments the page, so a walk is
//! bounded by the storefront's content.
//!
//! The repeated-page check only compares the first item of two consecutive
//! pages. A storefront that pins the same item on top of every page would be
//! cut short after page 1; that is accepted as a known heuristic.

use tracing::{debug, info, warn};

use crate::application::throttle::{Pacer, PauseKind};
use crate::domain::Endpoint;
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing::{ItemExtractor, ItemRef};

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A listing page could not be fetched; earlier pages are kept
    TransportFailure,
    /// The storefront said the listing has no items
    NoItemsMarker,
    /// The item list was absent or empty
    EmptyListing,
    /// The page repeated the previous page's first item
    RepeatedPage,
    /// No "next page" affordance after the last collected page
    NoNextPage,
    /// The configured page limit was reached
    PageLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkState {
    Walking { page: u32, last_fingerprint: Option<String> },
    Done(StopReason),
}

/// Item references collected by one walk, in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub items: Vec<ItemRef>,
    pub pages_collected: u32,
    pub stop_reason: StopReason,
}

/// Page `page` served the same first item as the page before it
#[must_use]
pub fn is_repeated_page(page: u32, previous: Option<&str>, current: Option<&str>) -> bool {
    page > 1 && current.is_some() && previous == current
}

/// Walks the listing pages of one endpoint
pub struct PageWalker<'a> {
    fetcher: &'a dyn PageFetcher,
    extractor: &'a dyn ItemExtractor,
    pacer: &'a dyn Pacer,
    max_pages: Option<u32>,
}

impl<'a> PageWalker<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, extractor: &'a dyn ItemExtractor, pacer: &'a dyn Pacer) -> Self {
        Self {
            fetcher,
            extractor,
            pacer,
            max_pages: None,
        }
    }

    /// Stop after `max_pages` collected pages
    #[must_use]
    pub const fn with_page_limit(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub async fn walk(&self, endpoint: &Endpoint) -> WalkOutcome {
        let mut items = Vec::new();
        let mut pages_collected = 0;
        let mut state = WalkState::Walking {
            page: 1,
            last_fingerprint: None,
        };

        let stop_reason = loop {
            match state {
                WalkState::Walking { page, last_fingerprint } => {
                    state = self
                        .step(endpoint, page, last_fingerprint, &mut items, &mut pages_collected)
                        .await;
                }
                WalkState::Done(reason) => break reason,
            }
        };

        info!(
            "📄 {} ({}): {} references from {} pages, stopped: {:?}",
            endpoint.group,
            endpoint.url,
            items.len(),
            pages_collected,
            stop_reason
        );

        WalkOutcome {
            items,
            pages_collected,
            stop_reason,
        }
    }

    async fn step(
        &self,
        endpoint: &Endpoint,
        page: u32,
        last_fingerprint: Option<String>,
        items: &mut Vec<ItemRef>,
        pages_collected: &mut u32,
    ) -> WalkState {
        let url = self.extractor.page_url(endpoint, page);
        debug!("🔗 Listing page {}: {}", page, url);

        let html = match self.fetcher.fetch_text(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("⚠️ Listing page {} failed, ending this endpoint: {}", page, e);
                return WalkState::Done(StopReason::TransportFailure);
            }
        };

        let listing = self.extractor.list_page(&html);
        if listing.no_items_marker {
            debug!("Page {} reports no items", page);
            return WalkState::Done(StopReason::NoItemsMarker);
        }
        if listing.items.is_empty() {
            debug!("Page {} lists no items", page);
            return WalkState::Done(StopReason::EmptyListing);
        }

        let fingerprint = self.extractor.first_item_fingerprint(&listing);
        if is_repeated_page(page, last_fingerprint.as_deref(), fingerprint.as_deref()) {
            info!("🔁 Page {} repeats page {}, stopping", page, page - 1);
            return WalkState::Done(StopReason::RepeatedPage);
        }

        debug!("Page {}: {} references", page, listing.items.len());
        items.extend(listing.items);
        *pages_collected += 1;

        if !listing.has_next {
            return WalkState::Done(StopReason::NoNextPage);
        }
        if self.max_pages.is_some_and(|max| *pages_collected >= max) {
            return WalkState::Done(StopReason::PageLimit);
        }

        self.pacer.pause(PauseKind::ListingPage).await;
        WalkState::Walking {
            page: page + 1,
            last_fingerprint: fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::throttle::NoPause;
    use crate::test_utils::{FixtureExtractor, ScriptedFetcher, listing};
    use rstest::rstest;

    #[rstest]
    #[case(1, Some("A"), Some("A"), false)]
    #[case(2, Some("A"), Some("A"), true)]
    #[case(2, Some("A"), Some("B"), false)]
    #[case(2, None, None, false)]
    #[case(3, None, Some("A"), false)]
    fn repeated_page_predicate(
        #[case] page: u32,
        #[case] previous: Option<&str>,
        #[case] current: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(is_repeated_page(page, previous, current), expected);
    }

    #[tokio::test]
    async fn stops_on_the_no_items_marker() {
        let extractor = FixtureExtractor::single_endpoint("https://shop.test/c");
        let fetcher = ScriptedFetcher::new()
            .with_page("https://shop.test/c", &listing(&[("https://shop.test/p/1", "One")], true))
            .with_page("https://shop.test/c?page=2", "no-items\n");
        let endpoint = extractor.first_endpoint().unwrap();

        let outcome = PageWalker::new(&fetcher, &extractor, &NoPause).walk(&endpoint).await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.stop_reason, StopReason::NoItemsMarker);
    }

    #[tokio::test]
    async fn transport_failure_keeps_earlier_pages() {
        let extractor = FixtureExtractor::single_endpoint("https://shop.test/c");
        let fetcher = ScriptedFetcher::new()
            .with_page("https://shop.test/c", &listing(&[("https://shop.test/p/1", "One")], true))
            .with_failure("https://shop.test/c?page=2", 503);
        let endpoint = extractor.first_endpoint().unwrap();

        let outcome = PageWalker::new(&fetcher, &extractor, &NoPause).walk(&endpoint).await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.pages_collected, 1);
        assert_eq!(outcome.stop_reason, StopReason::TransportFailure);
    }

    #[tokio::test]
    async fn honours_the_page_limit() {
        let extractor = FixtureExtractor::single_endpoint("https://shop.test/c");
        let fetcher = ScriptedFetcher::new()
            .with_page("https://shop.test/c", &listing(&[("https://shop.test/p/1", "One")], true))
            .with_page("https://shop.test/c?page=2", &listing(&[("https://shop.test/p/2", "Two")], true));
        let endpoint = extractor.first_endpoint().unwrap();

        let outcome = PageWalker::new(&fetcher, &extractor, &NoPause)
            .with_page_limit(Some(1))
            .walk(&endpoint)
            .await;

        assert_eq!(outcome.stop_reason, StopReason::PageLimit);
        assert_eq!(fetcher.requests(), vec!["https://shop.test/c".to_string()]);
    }
}
