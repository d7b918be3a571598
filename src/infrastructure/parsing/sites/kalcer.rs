//! Kalcer (trgovina-kalcer.si)
//!
//! Listings only provide links; everything else comes from the detail page.
//! The page number is appended as `&page=N` to the category URL as-is.

use scraper::{ElementRef, Html, Selector};

use super::DEFAULT_UNIT;
use crate::domain::price::first_number;
use crate::domain::{PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::parsing::dom::{
    attr_in, compile, compile_all, element_text, last_path_segment, text_in, text_with_fallbacks,
};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage, ParsingResult};

const BASE_URL: &str = "https://www.trgovina-kalcer.si";

/// Present in the results summary while more pages follow
const MORE_RESULTS_MARKER: &str = "Prikazujem";

const SUBCATEGORIES: [&str; 43] = [
    "izolacije/fasadni-izdelki/fasadne-izolacije",
    "izolacije/fasadni-izdelki/fasadna-lepila-in-malte",
    "izolacije/fasadni-izdelki/fasadne-barve-in-zakljucni-sloji",
    "izolacije/fasadni-izdelki/fasadna-sidra",
    "izolacije/fasadni-izdelki/fasadne-mrezice-in-profili",
    "izolacije/fasadni-izdelki/fasadne-stukature",
    "izolacije/toplotne-izolacije/steklena-izolacija",
    "izolacije/toplotne-izolacije/kamena-izolacija",
    "izolacije/toplotne-izolacije/izolacijske-plosce",
    "izolacije/toplotne-izolacije/izolacijska-folija",
    "izolacije/toplotne-izolacije/izolacijsko-nasutje",
    "izolacije/folije-za-izolacijo",
    "izolacije/izolacijski-lepilni-trakovi",
    "izolacije/izolacijska-tesnila",
    "izolacije/pozarni-izdelki-plosce",
    "suhomontazni-sistemi/gradbene-plosce-gradnja",
    "suhomontazni-sistemi/konstrukcija",
    "suhomontazni-sistemi/pribor-za-suhi-estrih",
    "suhomontazni-sistemi/suhi-estrihi",
    "suhomontazni-sistemi/podlage-za-suhi-estrih",
    "suhomontazni-sistemi/ogrevanje-hlajenje/talno-ogrevanje-hlajenje",
    "suhomontazni-sistemi/ogrevanje-hlajenje/stensko-in-stropno-ogrevanje-hlajenje",
    "pripomocki-suha-gradnja/svetila",
    "pripomocki-suha-gradnja/pripomocki-pritrjevanje-suha-gradnja",
    "pripomocki-suha-gradnja/fugiranje-armiranje/mase",
    "pripomocki-suha-gradnja/fugiranje-armiranje/trakovi",
    "pripomocki-suha-gradnja/fugiranje-armiranje/vogalniki",
    "pripomocki-suha-gradnja/revizijske-odprtine",
    "pripomocki-suha-gradnja/ciscenje",
    "pripomocki-suha-gradnja/barvanje",
    "lepljenje-tesnenje/hidroizolacije/stresne-folije",
    "lepljenje-tesnenje/hidroizolacije/tekoce-brezsivne-folije",
    "lepljenje-tesnenje/hidroizolacije/bitumenske-hidroizolacije",
    "lepljenje-tesnenje/hidroizolacije/cementne-hidroizolacije",
    "lepljenje-tesnenje/izravnalne-mase",
    "lepljenje-tesnenje/radonska-zascita",
    "lepljenje-tesnenje/tesnilne-mase",
    "lepljenje-tesnenje/tesnilni-trakovi",
    "lepljenje-tesnenje/lepila",
    "gradbena-akustika/zvocni-absorberji",
    "gradbena-akustika/zvocne-izolacije",
    "gradbena-akustika/modularni-stropi",
    "gradbena-akustika/akusticni-pribor",
];

struct Selectors {
    card: Selector,
    link: Selector,
    results_summary: Selector,
    description: Vec<Selector>,
    spec_row: Selector,
    cell: Selector,
    brand: Selector,
    price: Vec<Selector>,
    image: Selector,
}

pub struct KalcerExtractor {
    profile: StorefrontProfile,
    selectors: Selectors,
}

impl KalcerExtractor {
    pub fn new() -> ParsingResult<Self> {
        let urls: Vec<String> = SUBCATEGORIES
            .iter()
            .map(|path| format!("{BASE_URL}/gradnja/{path}"))
            .collect();
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();

        let profile = StorefrontProfile::new(
            StorefrontId::Kalcer,
            BASE_URL,
            PaginationScheme::Appended { param: "page" },
        )
        .with_category("Gradnja", &urls, |_, url| last_path_segment(url).to_string());

        Ok(Self {
            profile,
            selectors: Selectors {
                card: compile(".product-list > div, .product-grid .product")?,
                link: compile(".name a")?,
                results_summary: compile(".pagination-results .text-right")?,
                description: compile_all(&["h1.product-name", "h1.productInfo"])?,
                spec_row: compile(".listing.stockMargin tr")?,
                cell: compile("td")?,
                brand: compile(r#".product-info .description a[href*="/m-"]"#)?,
                price: compile_all(&["span.productSpecialPrice", ".price-new, .price"])?,
                image: compile("a.lightbox-image")?,
            },
        })
    }
}

/// Values of the two-cell attribute rows, by label
pub(super) fn spec_rows(document: &Html, row: &Selector, cell: &Selector) -> Vec<(String, String)> {
    document
        .select(row)
        .filter_map(|tr| {
            let cells: Vec<ElementRef<'_>> = tr.select(cell).collect();
            match cells.as_slice() {
                [label, value] => Some((element_text(*label), element_text(*value))),
                _ => None,
            }
        })
        .collect()
}

impl ItemExtractor for KalcerExtractor {
    fn profile(&self) -> &StorefrontProfile {
        &self.profile
    }

    fn list_page(&self, html: &str) -> ListPage {
        let document = Html::parse_document(html);
        let items = document
            .select(&self.selectors.card)
            .filter_map(|card| {
                let link = card.select(&self.selectors.link).next()?;
                let href = link.value().attr("href")?.trim();
                (!href.is_empty()).then(|| ItemRef {
                    title: element_text(link),
                    ..ItemRef::new(href)
                })
            })
            .collect();

        let has_next = document
            .select(&self.selectors.results_summary)
            .next()
            .is_some_and(|summary| element_text(summary).contains(MORE_RESULTS_MARKER));

        ListPage {
            items,
            has_next,
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

            fragment.description = text_with_fallbacks(root, &self.selectors.description).unwrap_or_default();
            for (label, value) in spec_rows(&document, &self.selectors.spec_row, &self.selectors.cell) {
                if label.contains("Ident") {
                    fragment.code = value;
                } else if label.contains("Enota mere") && !value.is_empty() {
                    fragment.unit = value;
                }
            }
            fragment.manufacturer = text_in(root, &self.selectors.brand).unwrap_or_default();
            fragment.price_gross = text_with_fallbacks(root, &self.selectors.price)
                .and_then(|text| first_number(&text).map(str::to_string))
                .unwrap_or_default();
            fragment.image_url = attr_in(root, &self.selectors.image, "href").unwrap_or_default();
        }

        Extraction::from_fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <div class="product-list">
          <div><div class="name"><a href="https://www.trgovina-kalcer.si/knauf-a">Knauf plošča A</a></div></div>
          <div><div class="name"><a href="https://www.trgovina-kalcer.si/knauf-b">Knauf plošča B</a></div></div>
          <div><div class="name"><a>Brez povezave</a></div></div>
        </div>
        <div class="pagination-results"><div class="text-right">Prikazujem 1 do 2 (od 40)</div></div>"#;

    const DETAIL: &str = r#"
        <h1 class="productInfo">Knauf plošča A 12,5 mm</h1>
        <table class="listing stockMargin">
          <tr><td>Ident:</td><td>KN-125</td></tr>
          <tr><td>Enota mere:</td><td>m2</td></tr>
          <tr><td>Samo ena celica</td></tr>
        </table>
        <div class="product-info"><div class="description"><a href="/m-knauf">Knauf</a></div></div>
        <span class="price">1.049,90 €</span>
        <a class="lightbox-image" href="https://www.trgovina-kalcer.si/img/a.jpg">slika</a>"#;

    #[test]
    fn lists_links_and_reads_results_summary() {
        let extractor = KalcerExtractor::new().unwrap();
        let page = extractor.list_page(LISTING);

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].url, "https://www.trgovina-kalcer.si/knauf-a");
        assert_eq!(page.items[0].title, "Knauf plošča A");
        assert!(page.has_next);
        assert!(!extractor.list_page("<div class=\"product-list\"></div>").has_next);
    }

    #[test]
    fn extracts_detail_fields() {
        let extractor = KalcerExtractor::new().unwrap();
        let item = ItemRef::new("https://www.trgovina-kalcer.si/knauf-a");

        let Extraction::Fragment(fragment) = extractor.extract(&item, Some(DETAIL)) else {
            panic!("expected a fragment");
        };
        assert_eq!(fragment.description, "Knauf plošča A 12,5 mm");
        assert_eq!(fragment.code, "KN-125");
        assert_eq!(fragment.unit, "m2");
        assert_eq!(fragment.manufacturer, "Knauf");
        assert_eq!(fragment.price_gross, "1.049,90");
        assert_eq!(fragment.image_url, "https://www.trgovina-kalcer.si/img/a.jpg");
    }

    #[test]
    fn empty_detail_page_is_skipped() {
        let extractor = KalcerExtractor::new().unwrap();
        let item = ItemRef::new("https://www.trgovina-kalcer.si/x");
        assert!(matches!(extractor.extract(&item, Some("<html></html>")), Extraction::Skip(_)));
    }

    #[test]
    fn pages_are_appended_literally() {
        let extractor = KalcerExtractor::new().unwrap();
        let (_, endpoint) = extractor.profile().endpoints().last().unwrap();
        assert_eq!(endpoint.group, "akusticni-pribor");
        assert_eq!(
            extractor.page_url(endpoint, 2),
            "https://www.trgovina-kalcer.si/gradnja/gradbena-akustika/akusticni-pribor&page=2"
        );
    }
}
