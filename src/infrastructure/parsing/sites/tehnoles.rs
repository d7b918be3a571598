//! Tehnoles (tehnoles.si)
//!
//! Same shop engine as Kalcer for the detail page, but relative links and a
//! `?pagenum=N` listing parameter.

use scraper::{Html, Selector};
use tracing::debug;

use super::DEFAULT_UNIT;
use super::kalcer::spec_rows;
use crate::domain::price::first_number;
use crate::domain::{PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::parsing::dom::{
    attr_in, compile, compile_all, element_text, has_match, last_path_segment, resolve_url, text_in,
    text_with_fallbacks,
};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage, ParsingResult};

const BASE_URL: &str = "https://www.tehnoles.si";

const CATEGORIES: [(&str, &[&str]); 2] = [
    (
        "Gradbeni material",
        &[
            "https://www.tehnoles.si/gradbeni-material-c-28.aspx",
            "https://www.tehnoles.si/barve-laki-in-premazi-c-31.aspx",
            "https://www.tehnoles.si/lepila-in-kiti-c-32.aspx",
            "https://www.tehnoles.si/izolacije-c-48.aspx",
            "https://www.tehnoles.si/suhomontazni-material-c-17.aspx",
            "https://www.tehnoles.si/kasetni-stropi-c-84.aspx",
            "https://www.tehnoles.si/delovna-zascitna-sredstva-c-69.aspx",
            "https://www.tehnoles.si/delovni-stroji-c-160.aspx",
            "https://www.tehnoles.si/vodovod-c-151.aspx",
        ],
    ),
    (
        "Orodje",
        &[
            "https://www.tehnoles.si/rocno-orodje-c-41.aspx",
            "https://www.tehnoles.si/elektricno-orodje-c-40.aspx",
        ],
    ),
];

/// `lepila-in-kiti-c-32.aspx` becomes `lepila-in-kiti`
fn group_of(url: &str) -> String {
    let segment = last_path_segment(url);
    segment.split("-c-").next().unwrap_or(segment).to_string()
}

struct Selectors {
    card: Selector,
    link: Selector,
    next: Selector,
    description: Selector,
    spec_row: Selector,
    cell: Selector,
    price: Vec<Selector>,
    image: Selector,
}

pub struct TehnolesExtractor {
    profile: StorefrontProfile,
    selectors: Selectors,
}

impl TehnolesExtractor {
    pub fn new() -> ParsingResult<Self> {
        let profile = CATEGORIES.iter().fold(
            StorefrontProfile::new(
                StorefrontId::Tehnoles,
                BASE_URL,
                PaginationScheme::Query {
                    param: "pagenum",
                    suffix: "",
                },
            ),
            |profile, (name, urls)| profile.with_category(name, urls, |_, url| group_of(url)),
        );

        Ok(Self {
            profile,
            selectors: Selectors {
                card: compile("li.wrapper_prods.category")?,
                link: compile(".name a")?,
                next: compile("a.PagerPrevNextLink")?,
                description: compile("h1.productInfo")?,
                spec_row: compile(".listing.stockMargin tr")?,
                cell: compile("td")?,
                price: compile_all(&["span.productSpecialPrice", "span.priceColor"])?,
                image: compile("a.lightbox-image")?,
            },
        })
    }

    fn absolute(&self, href: &str) -> Option<String> {
        resolve_url(href, self.profile.base_url)
            .map_err(|e| debug!("Dropping link: {}", e))
            .ok()
    }
}

impl ItemExtractor for TehnolesExtractor {
    fn profile(&self) -> &StorefrontProfile {
        &self.profile
    }

    fn list_page(&self, html: &str) -> ListPage {
        let document = Html::parse_document(html);
        let items = document
            .select(&self.selectors.card)
            .filter_map(|card| {
                let link = card.select(&self.selectors.link).next()?;
                let url = self.absolute(link.value().attr("href")?)?;
                Some(ItemRef {
                    title: element_text(link),
                    ..ItemRef::new(url)
                })
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
            ..RecordFragment::default()
        };

        if let Some(html) = detail_html {
            let document = Html::parse_document(html);
            let root = document.root_element();

            fragment.description = text_in(root, &self.selectors.description).unwrap_or_default();
            for (label, value) in spec_rows(&document, &self.selectors.spec_row, &self.selectors.cell) {
                if label.contains("Ident") {
                    fragment.code = value;
                } else if label.contains("Enota mere") && !value.is_empty() {
                    fragment.unit = value;
                }
            }
            fragment.price_gross = text_with_fallbacks(root, &self.selectors.price)
                .and_then(|text| first_number(&text).map(str::to_string))
                .unwrap_or_default();
            fragment.image_url = attr_in(root, &self.selectors.image, "href")
                .and_then(|href| self.absolute(&href))
                .unwrap_or_default();
        }

        Extraction::from_fragment(fragment)
    }
}
