//! Slovenijales (trgovina.slovenijales.si)
//!
//! Detail pages carry schema.org microdata for code and EAN. When an old price
//! is shown, the highlighted price is the promotion.

use scraper::{Html, Selector};
use tracing::debug;

use crate::domain::price::first_number;
use crate::domain::{PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::parsing::dom::{attr_in, compile, has_match, resolve_url, text_in};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage, ParsingResult};

use super::DEFAULT_UNIT;

const BASE_URL: &str = "https://trgovina.slovenijales.si";

/// Slovenijales publishes no lead times
const AVAILABILITY: &str = "N/A";

const CATEGORIES: [(&str, &[&str]); 3] = [
    (
        "LESNI MATERIALI",
        &[
            "https://trgovina.slovenijales.si/lesni-materiali/lepljene-plosce",
            "https://trgovina.slovenijales.si/lesni-materiali/gradbene-plosce-in-les",
            "https://trgovina.slovenijales.si/lesni-materiali/opazne-plosce",
            "https://trgovina.slovenijales.si/lesni-materiali/lepljeni-nosilci",
            "https://trgovina.slovenijales.si/lesni-materiali/vezane-plosce",
            "https://trgovina.slovenijales.si/lesni-materiali/letve-palice-in-rocaji",
        ],
    ),
    (
        "PLOSKOVNI MATERIALI",
        &[
            "https://trgovina.slovenijales.si/ploskovni-materiali/iverne-plosce",
            "https://trgovina.slovenijales.si/ploskovni-materiali/oplemenitene-iverne-plosce",
            "https://trgovina.slovenijales.si/ploskovni-materiali/vlaknene-plosce",
            "https://trgovina.slovenijales.si/ploskovni-materiali/kuhinjski-pulti-in-obloge",
            "https://trgovina.slovenijales.si/ploskovni-materiali/kompaktne-plosce",
        ],
    ),
    (
        "TALNE IN STENSKE OBLOGE",
        &[
            "https://trgovina.slovenijales.si/talne-in-stenske-obloge/talne-obloge",
            "https://trgovina.slovenijales.si/talne-in-stenske-obloge/masivne-obloge",
            "https://trgovina.slovenijales.si/talne-in-stenske-obloge/zakljucni-profili-in-letve",
            "https://trgovina.slovenijales.si/talne-in-stenske-obloge/vodoodporne-stenske-obloge-rocko",
            "https://trgovina.slovenijales.si/talne-in-stenske-obloge/akusticni-paneli",
        ],
    ),
];

struct Selectors {
    card: Selector,
    link: Selector,
    next: Selector,
    description: Selector,
    sku: Selector,
    ean: Selector,
    new_price: Selector,
    old_price: Selector,
    image: Selector,
}

pub struct SlovenijalesExtractor {
    profile: StorefrontProfile,
    selectors: Selectors,
}

impl SlovenijalesExtractor {
    pub fn new() -> ParsingResult<Self> {
        let profile = CATEGORIES.iter().fold(
            StorefrontProfile::new(
                StorefrontId::Slovenijales,
                BASE_URL,
                PaginationScheme::Query { param: "page", suffix: "" },
            ),
            |profile, (name, urls)| profile.with_category(name, urls, |category, _| category.to_string()),
        );

        Ok(Self {
            profile,
            selectors: Selectors {
                card: compile("div.single-product.border-left[itemscope]")?,
                link: compile(".product-img a")?,
                next: compile(r#"ul.pagination a[aria-label="Naprej"]"#)?,
                description: compile(r#"h1[itemprop="name"]"#)?,
                sku: compile(r#"meta[itemprop="sku"]"#)?,
                ean: compile(r#"meta[itemprop="gtin13"]"#)?,
                new_price: compile(".product-info-price span.new")?,
                old_price: compile(".product-info-price span.old")?,
                image: compile(".flexslider .slides img")?,
            },
        })
    }
}

fn price_in(root: scraper::ElementRef<'_>, selector: &Selector) -> Option<String> {
    text_in(root, selector).and_then(|text| first_number(&text).map(str::to_string))
}

impl ItemExtractor for SlovenijalesExtractor {
    fn profile(&self) -> &StorefrontProfile {
        &self.profile
    }

    fn list_page(&self, html: &str) -> ListPage {
        let document = Html::parse_document(html);
        let items = document
            .select(&self.selectors.card)
            .filter_map(|card| {
                let href = attr_in(card, &self.selectors.link, "href")?;
                resolve_url(&href, self.profile.base_url)
                    .map_err(|e| debug!("Dropping link: {}", e))
                    .ok()
                    .map(ItemRef::new)
            })
            .collect();

        ListPage {
            items,
            has_next: has_match(&document, &self.selectors.next),
            no_items_marker: false,
        }
    }

    fn extract(&self, item: &ItemRef, detail_html: Option<&str>) -> Extraction {
        let mut fragment = RecordFragment {
            url: item.url.clone(),
            unit: DEFAULT_UNIT.to_string(),
            availability: AVAILABILITY.to_string(),
            ..RecordFragment::default()
        };

        if let Some(html) = detail_html {
            let document = Html::parse_document(html);
            let root = document.root_element();

            fragment.description = text_in(root, &self.selectors.description).unwrap_or_default();
            fragment.code = attr_in(root, &self.selectors.sku, "content").unwrap_or_default();
            fragment.ean = attr_in(root, &self.selectors.ean, "content").unwrap_or_default();

            if let Some(current) = price_in(root, &self.selectors.new_price) {
                if root.select(&self.selectors.old_price).next().is_some() {
                    fragment.promo_price_gross = current;
                    fragment.price_gross = price_in(root, &self.selectors.old_price).unwrap_or_default();
                } else {
                    fragment.price_gross = current;
                }
            }

            fragment.image_url = attr_in(root, &self.selectors.image, "src").unwrap_or_default();
        }

        Extraction::from_fragment(fragment)
    }
}
