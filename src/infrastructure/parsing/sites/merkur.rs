//! Merkur (merkur.si)
//!
//! Listing cards carry the title, the price and the image; the detail page is
//! only needed for the product code. A card showing an old and a new price
//! lists the old one first.

use scraper::{ElementRef, Html, Selector};

use super::DEFAULT_UNIT;
use crate::domain::price::number_runs;
use crate::domain::{PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::parsing::dom::{attr_in, compile, has_match, humanize_slug, last_path_segment, text_in};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage, ParsingResult};

const BASE_URL: &str = "https://www.merkur.si";

const CATEGORIES: [(&str, &[&str]); 3] = [
    (
        "Osnovni gradbeni izdelki in les",
        &[
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/gradbene-surovine/",
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/opazne-plosce-in-elementi/",
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/osb-in-lsb-plosce/",
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/opeka-prizme/",
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/malte-in-ometi/",
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/zagan-les-in-letve/",
            "https://www.merkur.si/gradnja/osnovni-gradbeni-izdelki-in-les/lepljenci/",
        ],
    ),
    (
        "Termoizolacije",
        &[
            "https://www.merkur.si/gradnja/termoizolacije/stiropor/",
            "https://www.merkur.si/gradnja/termoizolacije/estrudirani-polistiren-xps/",
            "https://www.merkur.si/gradnja/termoizolacije/steklena-volna/",
            "https://www.merkur.si/gradnja/termoizolacije/kamena-volna/",
            "https://www.merkur.si/gradnja/termoizolacije/folije/",
            "https://www.merkur.si/gradnja/termoizolacije/ostalo/",
        ],
    ),
    (
        "Hidroizolacije",
        &[
            "https://www.merkur.si/gradnja/hidroizolacije/bitumenski-trakovi-in-premazi/bitumenski-premazi/",
            "https://www.merkur.si/gradnja/hidroizolacije/bitumenski-trakovi-in-premazi/bitumenski-trakovi/",
            "https://www.merkur.si/gradnja/hidroizolacije/cementna-hidroizolacija/mrezica/",
        ],
    ),
];

struct Selectors {
    container: Selector,
    card: Selector,
    title: Selector,
    link: Selector,
    price: Selector,
    image: Selector,
    next: Selector,
    product_id: Selector,
}

pub struct MerkurExtractor {
    profile: StorefrontProfile,
    selectors: Selectors,
}

impl MerkurExtractor {
    pub fn new() -> ParsingResult<Self> {
        let profile = CATEGORIES.iter().fold(
            StorefrontProfile::new(
                StorefrontId::Merkur,
                BASE_URL,
                PaginationScheme::Query {
                    param: "p",
                    suffix: "#section-products",
                },
            ),
            |profile, (name, urls)| {
                profile.with_category(name, urls, |_, url| humanize_slug(last_path_segment(url)))
            },
        );

        Ok(Self {
            profile,
            selectors: Selectors {
                container: compile("div.list-items")?,
                card: compile("div.item")?,
                title: compile("h3")?,
                link: compile("a")?,
                price: compile("span")?,
                image: compile("img")?,
                next: compile("a.next")?,
                product_id: compile("div.product-id")?,
            },
        })
    }

    fn card(&self, card: ElementRef<'_>) -> Option<ItemRef> {
        let url = attr_in(card, &self.selectors.link, "href")?;
        Some(ItemRef {
            url,
            title: text_in(card, &self.selectors.title).unwrap_or_default(),
            price_text: card
                .select(&self.selectors.price)
                .next()
                .map(|span| card_price(&span.text().collect::<String>()))
                .unwrap_or_default(),
            unit: DEFAULT_UNIT.to_string(),
            image_url: attr_in(card, &self.selectors.image, "src").unwrap_or_default(),
        })
    }
}

/// Current price of a card: the only number, or the second of two
fn card_price(text: &str) -> String {
    let without_grouping = text.replace('.', "");
    let runs: Vec<&str> = number_runs(&without_grouping).collect();
    match runs.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [_, current, ..] => (*current).to_string(),
    }
}

impl ItemExtractor for MerkurExtractor {
    fn profile(&self) -> &StorefrontProfile {
        &self.profile
    }

    fn list_page(&self, html: &str) -> ListPage {
        let document = Html::parse_document(html);
        let items = document
            .select(&self.selectors.container)
            .next()
            .map(|container| {
                container
                    .select(&self.selectors.card)
                    .filter_map(|card| self.card(card))
                    .collect()
            })
            .unwrap_or_default();

        ListPage {
            items,
            has_next: has_match(&document, &self.selectors.next),
            no_items_marker: false,
        }
    }

    fn screen(&self, item: &ItemRef) -> Option<String> {
        (item.title.is_empty() && item.price_text.is_empty())
            .then(|| format!("card without description and price: {}", item.url))
    }

    fn extract(&self, item: &ItemRef, detail_html: Option<&str>) -> Extraction {
        let code = detail_html
            .and_then(|html| {
                let document = Html::parse_document(html);
                text_in(document.root_element(), &self.selectors.product_id)
            })
            .and_then(|text| {
                text.split(|c: char| !c.is_ascii_digit())
                    .find(|run| !run.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        Extraction::from_fragment(RecordFragment {
            url: item.url.clone(),
            code,
            description: item.title.clone(),
            unit: item.unit.clone(),
            price_gross: item.price_text.clone(),
            image_url: item.image_url.clone(),
            ..RecordFragment::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="list-items">
            <div class="item">
              <a href="https://www.merkur.si/stiropor-eps-100"><img src="https://cdn.merkur.si/eps.jpg"></a>
              <h3> Stiropor EPS 100 </h3>
              <span class="price">1.299,99 € 1.099,99 €</span>
            </div>
            <div class="item">
              <a href="https://www.merkur.si/stiropor-eps-70"></a>
              <h3>Stiropor EPS 70</h3>
              <span>Cena: 8,49 €</span>
            </div>
            <div class="item"><h3>Brez povezave</h3></div>
          </div>
          <a class="next" href="?p=2">Naprej</a>
        </body></html>"#;

    #[test]
    fn parses_cards_and_next_affordance() {
        let extractor = MerkurExtractor::new().unwrap();
        let page = extractor.list_page(LISTING);

        assert_eq!(page.items.len(), 2);
        assert!(page.has_next);
        assert_eq!(page.items[0].title, "Stiropor EPS 100");
        assert_eq!(page.items[0].price_text, "1099,99");
        assert_eq!(page.items[0].image_url, "https://cdn.merkur.si/eps.jpg");
        assert_eq!(page.items[1].price_text, "8,49");
        assert_eq!(extractor.first_item_fingerprint(&page).as_deref(), Some("Stiropor EPS 100"));
    }

    #[test]
    fn missing_container_yields_empty_page() {
        let extractor = MerkurExtractor::new().unwrap();
        let page = extractor.list_page("<html><body><p>Ni izdelkov</p></body></html>");
        assert!(page.items.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn screens_cards_without_title_and_price() {
        let extractor = MerkurExtractor::new().unwrap();
        assert!(extractor.screen(&ItemRef::new("https://www.merkur.si/x")).is_some());

        let item = ItemRef {
            title: "Plošča".into(),
            ..ItemRef::new("https://www.merkur.si/x")
        };
        assert!(extractor.screen(&item).is_none());
    }

    #[test]
    fn extracts_code_from_detail_page() {
        let extractor = MerkurExtractor::new().unwrap();
        let item = extractor.list_page(LISTING).items.remove(0);
        let detail = r#"<div class="product-id">Šifra: 0401234</div>"#;

        let Extraction::Fragment(fragment) = extractor.extract(&item, Some(detail)) else {
            panic!("expected a fragment");
        };
        assert_eq!(fragment.code, "0401234");
        assert_eq!(fragment.description, "Stiropor EPS 100");
        assert_eq!(fragment.price_gross, "1099,99");
        assert_eq!(fragment.unit, "KOS");
    }

    #[test]
    fn groups_are_humanized_slugs() {
        let extractor = MerkurExtractor::new().unwrap();
        let (_, endpoint) = extractor.profile().endpoints().nth(7).unwrap();
        assert_eq!(endpoint.group, "Stiropor");
        assert_eq!(
            extractor.page_url(endpoint, 2),
            "https://www.merkur.si/gradnja/termoizolacije/stiropor/?p=2#section-products"
        );
    }
}
