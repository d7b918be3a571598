//! OBI (obi.si)
//!
//! The listing card gives the price and the unit (`12,99 € / m2`); the detail
//! page adds the description and the product code. OBI occasionally serves
//! the same listing page for every page number, hence the `h4` fingerprint.

use scraper::{ElementRef, Html, Selector};

use crate::domain::price::first_number;
use crate::domain::{PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::parsing::dom::{attr_in, compile, has_match, text_in};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage, ParsingResult};

const BASE_URL: &str = "https://www.obi.si";

/// OBI writes the unit in lower case
const DEFAULT_UNIT: &str = "kos";

const CATEGORIES: [(&str, &[&str]); 3] = [
    (
        "Ploščice",
        &[
            "https://www.obi.si/c/gradnja-877/ploscice-308/talne-ploscice-1150",
            "https://www.obi.si/c/gradnja-877/ploscice-308/stenske-ploscice-786",
            "https://www.obi.si/c/gradnja-877/ploscice-308/stenske-obrobe-1850",
            "https://www.obi.si/c/gradnja-877/ploscice-308/okrasne-ploscice-1849",
            "https://www.obi.si/c/gradnja-877/ploscice-308/ploscice-iz-naravnega-kamna-1151",
            "https://www.obi.si/c/gradnja-877/ploscice-308/obzidniki-in-koticki-481",
            "https://www.obi.si/c/gradnja-877/ploscice-308/mozaiki-572",
            "https://www.obi.si/c/gradnja-877/ploscice-308/robne-ploscice-1152",
        ],
    ),
    (
        "Ureditev okolice",
        &[
            "https://www.obi.si/c/gradnja-877/ureditev-okolice-336/pohodne-plosce-914",
            "https://www.obi.si/c/gradnja-877/ureditev-okolice-336/tlakovci-608",
            "https://www.obi.si/c/gradnja-877/ureditev-okolice-336/obrobe-stopnice-in-zidni-sistemi-1281",
            "https://www.obi.si/c/gradnja-877/ureditev-okolice-336/terasne-deske-1464",
            "https://www.obi.si/c/gradnja-877/ureditev-okolice-336/terasne-in-pohodne-plosce-1279",
            "https://www.obi.si/c/gradnja-877/ureditev-okolice-336/okrasni-prod-in-okrasni-drobljenec-1382",
        ],
    ),
    (
        "Gradbeni materiali",
        &[
            "https://www.obi.si/c/gradnja-877/gradbeni-materiali-175/omet-malta-in-cement-619",
            "https://www.obi.si/c/gradnja-877/gradbeni-materiali-175/suha-gradnja-764",
            "https://www.obi.si/c/gradnja-877/gradbeni-materiali-175/kamni-in-pesek-720",
            "https://www.obi.si/c/gradnja-877/gradbeni-materiali-175/izolacijski-material-233",
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
    description: Selector,
    product_id: Selector,
}

pub struct ObiExtractor {
    profile: StorefrontProfile,
    selectors: Selectors,
}

impl ObiExtractor {
    pub fn new() -> ParsingResult<Self> {
        let profile = CATEGORIES.iter().fold(
            StorefrontProfile::new(
                StorefrontId::Obi,
                BASE_URL,
                PaginationScheme::Query { param: "p", suffix: "" },
            ),
            |profile, (name, urls)| profile.with_category(name, urls, |category, _| category.to_string()),
        );

        Ok(Self {
            profile,
            selectors: Selectors {
                container: compile("div.list-items.list-category-products")?,
                card: compile("div.item")?,
                title: compile("h4")?,
                link: compile("a")?,
                price: compile("span.price")?,
                image: compile("img")?,
                next: compile("a.next")?,
                description: compile("div.product-basics-info.part-1 h1")?,
                product_id: compile("div.product-id")?,
            },
        })
    }

    fn card(&self, card: ElementRef<'_>) -> Option<ItemRef> {
        let url = attr_in(card, &self.selectors.link, "href")?;
        let price = card.select(&self.selectors.price).next();

        Some(ItemRef {
            url,
            title: text_in(card, &self.selectors.title).unwrap_or_default(),
            price_text: price
                .and_then(|span| first_number(&span.text().collect::<String>()).map(str::to_string))
                .unwrap_or_default(),
            unit: price.and_then(unit_next_to_price).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            image_url: attr_in(card, &self.selectors.image, "src").unwrap_or_default(),
        })
    }
}

/// Unit written after the slash in the price line, e.g. `m2` in `12,99 € / m2`
fn unit_next_to_price(price: ElementRef<'_>) -> Option<String> {
    let line = price
        .parent()
        .and_then(ElementRef::wrap)
        .map_or_else(|| price.text().collect::<String>(), |parent| parent.text().collect());

    line.trim()
        .split_once('/')
        .map(|(_, unit)| unit.trim().to_string())
        .filter(|unit| !unit.is_empty())
}

impl ItemExtractor for ObiExtractor {
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

    fn extract(&self, item: &ItemRef, detail_html: Option<&str>) -> Extraction {
        let mut fragment = RecordFragment {
            url: item.url.clone(),
            unit: item.unit.clone(),
            price_gross: item.price_text.clone(),
            image_url: item.image_url.clone(),
            ..RecordFragment::default()
        };

        if let Some(html) = detail_html {
            let document = Html::parse_document(html);
            let root = document.root_element();
            fragment.description = text_in(root, &self.selectors.description).unwrap_or_default();
            fragment.code = text_in(root, &self.selectors.product_id).unwrap_or_default();
        }

        Extraction::from_fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <div class="list-items list-category-products">
          <div class="item">
            <a href="https://www.obi.si/p/101"><img src="https://img.obi.si/101.jpg"></a>
            <h4>Talna ploščica Siena</h4>
            <div class="price-line"><span class="price">19,99 €</span> / m2</div>
          </div>
          <div class="item">
            <a href="https://www.obi.si/p/102"></a>
            <h4>Obroba</h4>
            <div><span class="price">4,49 €</span></div>
          </div>
        </div>"#;

    #[test]
    fn reads_price_and_unit_from_cards() {
        let extractor = ObiExtractor::new().unwrap();
        let page = extractor.list_page(LISTING);

        assert_eq!(page.items.len(), 2);
        assert!(!page.has_next);
        assert_eq!(page.items[0].price_text, "19,99");
        assert_eq!(page.items[0].unit, "m2");
        assert_eq!(page.items[1].unit, "kos");
        assert_eq!(extractor.first_item_fingerprint(&page).as_deref(), Some("Talna ploščica Siena"));
    }

    #[test]
    fn completes_fragment_from_detail_page() {
        let extractor = ObiExtractor::new().unwrap();
        let item = extractor.list_page(LISTING).items.remove(0);
        let detail = r#"
            <div class="product-basics-info part-1"><h1> Talna ploščica Siena 60x60 </h1></div>
            <div class="product-id"> 4417123 </div>"#;

        let Extraction::Fragment(fragment) = extractor.extract(&item, Some(detail)) else {
            panic!("expected a fragment");
        };
        assert_eq!(fragment.description, "Talna ploščica Siena 60x60");
        assert_eq!(fragment.code, "4417123");
        assert_eq!(fragment.price_gross, "19,99");
    }

    #[test]
    fn groups_use_the_category_name() {
        let extractor = ObiExtractor::new().unwrap();
        let (category, endpoint) = extractor.profile().endpoints().next().unwrap();
        assert_eq!(endpoint.group, category.name);
        assert_eq!(
            extractor.page_url(endpoint, 3),
            "https://www.obi.si/c/gradnja-877/ploscice-308/talne-ploscice-1150?p=3"
        );
    }
}
