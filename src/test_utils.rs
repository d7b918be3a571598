//! Test doubles for harvesting without a network
//!
//! [`ScriptedFetcher`] serves canned bodies by URL and records the order of
//! requests. It can also fail a URL once, or cancel a session when a URL is
//! requested. [`FixtureExtractor`] understands a line-based fixture format
//! instead of storefront markup:
//!
//! ```text
//! item https://shop.test/p/1 | Title | 12,50
//! next
//! ```
//!
//! `no-items` marks an empty listing. Detail bodies are `key=value` lines
//! with the keys `description`, `code`, `price`, `promo` and `unit`.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::domain::{Endpoint, PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::http_client::{FetchError, PageFetcher};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage};

/// Listing fixture with `(url, title)` items
#[must_use]
pub fn listing(items: &[(&str, &str)], has_next: bool) -> String {
    let mut body: String = items
        .iter()
        .map(|(url, title)| format!("item {url} | {title} |\n"))
        .collect();
    if has_next {
        body.push_str("next\n");
    }
    body
}

/// Detail fixture with a code, a description and a gross price
#[must_use]
pub fn detail(code: &str, description: &str, price: &str) -> String {
    format!("code={code}\ndescription={description}\nprice={price}\n")
}

/// URL-keyed canned responses; unknown URLs answer 404
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Result<String, u16>>,
    transient: Mutex<HashMap<String, u16>>,
    cancel_on: HashMap<String, CancellationToken>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    /// Answer `url` with HTTP `status`
    #[must_use]
    pub fn with_failure(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    /// Answer the first request for `url` with HTTP `status`, later ones normally
    #[must_use]
    pub fn with_transient_failure(self, url: &str, status: u16) -> Self {
        self.transient
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), status);
        self
    }

    /// Cancel `token` when `url` is requested, before answering it
    #[must_use]
    pub fn with_cancel_on(mut self, url: &str, token: &CancellationToken) -> Self {
        self.cancel_on.insert(url.to_string(), token.clone());
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|requested| *requested == url).count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        if let Some(token) = self.cancel_on.get(url) {
            token.cancel();
            tokio::task::yield_now().await;
        }

        let transient = self
            .transient
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(url);
        if let Some(status) = transient {
            return Err(FetchError::status(url, status));
        }

        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::status(url, *status)),
            None => Err(FetchError::status(url, 404)),
        }
    }
}

/// Storefront double driven by the fixture format
pub struct FixtureExtractor {
    profile: StorefrontProfile,
    screened: HashSet<String>,
}

impl FixtureExtractor {
    /// Categories of `(name, endpoint urls)`; each endpoint's group is its category name
    #[must_use]
    pub fn new(categories: &[(&str, &[&str])]) -> Self {
        let profile = categories.iter().fold(
            StorefrontProfile::new(
                StorefrontId::Merkur,
                "https://shop.test",
                PaginationScheme::BareFirstPage { param: "page" },
            ),
            |profile, (name, urls)| profile.with_category(name, urls, |category, _| category.to_string()),
        );

        Self {
            profile,
            screened: HashSet::new(),
        }
    }

    #[must_use]
    pub fn single_endpoint(url: &str) -> Self {
        let urls: &[&str] = &[url];
        Self::new(&[("Fixture", urls)])
    }

    /// Drop `url` before its detail page is fetched
    #[must_use]
    pub fn screening(mut self, url: &str) -> Self {
        self.screened.insert(url.to_string());
        self
    }

    #[must_use]
    pub fn first_endpoint(&self) -> Option<Endpoint> {
        self.profile.endpoints().next().map(|(_, endpoint)| endpoint.clone())
    }
}

impl ItemExtractor for FixtureExtractor {
    fn profile(&self) -> &StorefrontProfile {
        &self.profile
    }

    fn list_page(&self, html: &str) -> ListPage {
        let mut page = ListPage::default();
        for line in html.lines().map(str::trim) {
            match line {
                "next" => page.has_next = true,
                "no-items" => page.no_items_marker = true,
                _ => {
                    if let Some(rest) = line.strip_prefix("item ") {
                        let mut fields = rest.split('|').map(str::trim);
                        let url = fields.next().unwrap_or_default();
                        page.items.push(ItemRef {
                            title: fields.next().unwrap_or_default().to_string(),
                            price_text: fields.next().unwrap_or_default().to_string(),
                            ..ItemRef::new(url)
                        });
                    }
                }
            }
        }
        page
    }

    fn screen(&self, item: &ItemRef) -> Option<String> {
        self.screened
            .contains(&item.url)
            .then(|| format!("screened: {}", item.url))
    }

    fn extract(&self, item: &ItemRef, detail_html: Option<&str>) -> Extraction {
        let mut fragment = RecordFragment {
            url: item.url.clone(),
            description: item.title.clone(),
            price_gross: item.price_text.clone(),
            unit: "KOS".to_string(),
            ..RecordFragment::default()
        };

        for (key, value) in detail_html
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.split_once('='))
        {
            let value = value.trim().to_string();
            match key.trim() {
                "description" => fragment.description = value,
                "code" => fragment.code = value,
                "price" => fragment.price_gross = value,
                "promo" => fragment.promo_price_gross = value,
                "unit" => fragment.unit = value,
                _ => {}
            }
        }

        Extraction::from_fragment(fragment)
    }
}
