//! Zagožen (eshop-zagozen.si)
//!
//! Magento storefront: page 1 is the bare category URL, an explicit notice
//! marks an empty listing, and the price box distinguishes special and old
//! prices. The unit is only stated in prose ("Cena je na m.").

use regex::Regex;
use scraper::{Html, Selector};

use crate::domain::{PaginationScheme, RecordFragment, StorefrontId, StorefrontProfile};
use crate::infrastructure::parsing::dom::{attr_in, compile, element_text, has_match, humanize_slug, text_in};
use crate::infrastructure::parsing::{Extraction, ItemExtractor, ItemRef, ListPage, ParsingError, ParsingResult};

use super::DEFAULT_UNIT;

const BASE_URL: &str = "https://eshop-zagozen.si/";

const NO_ITEMS_NOTICE: &str = "ni izdelkov";

const UNIT_PATTERN: &str = r"(?i)Cena je na\s*([^.]+)";

const CATEGORIES: [(&str, &[&str]); 3] = [
    (
        "vodovod",
        &[
            "zbiralniki-za-vodo-aquastay-in-oprema",
            "vodomerni-termo-jaski-in-oprema",
            "vodovodne-pe-cevi-in-spojke",
            "spojke-za-popravila",
            "pocinkani-fitingi-protipovratni-in-krogelni-ventili",
            "hisni-prikljucki-za-vodovod",
            "ventili-za-redukcijo-tlaka",
            "ploscata-tesnila",
            "dodatno",
        ],
    ),
    (
        "kanalizacija",
        &[
            "kanalizacijske-cevi-in-fazoni",
            "kanalizacijski-jaski-in-oprema",
            "lovilci-olj-in-mascob",
            "cistilne-naprave-in-oprema",
            "ponikovalna-polja",
            "drenazne-cevi",
            "greznice",
            "kanalizacijski-pokrovi-resetke-in-oprema",
            "opozorilni-trakovi",
            "crpalni-jaski",
        ],
    ),
    (
        "zascita-in-energetika",
        &["pe-cevi-za-zascito-aflex-in-spojke", "pvc-energetske-cevi", "opozorilni-trakovi"],
    ),
];

/// Zagožen prices: strip the euro sign, NBSP and thousands dots
fn clean_price(text: &str) -> String {
    text.replace(['€', '\u{a0}', '.'], "").trim().to_string()
}

struct Selectors {
    notice: Selector,
    card: Selector,
    link: Selector,
    next: Selector,
    description: Selector,
    sku: Selector,
    availability: Selector,
    special_price: Selector,
    old_price: Selector,
    regular_price: Selector,
    unit_note: Selector,
    image: Selector,
}

pub struct ZagozenExtractor {
    profile: StorefrontProfile,
    selectors: Selectors,
    unit_pattern: Regex,
}

impl ZagozenExtractor {
    pub fn new() -> ParsingResult<Self> {
        let profile = CATEGORIES.iter().fold(
            StorefrontProfile::new(StorefrontId::Zagozen, BASE_URL, PaginationScheme::BareFirstPage { param: "p" }),
            |profile, (slug, subcategories)| {
                let urls: Vec<String> = subcategories.iter().map(|sub| format!("{BASE_URL}{slug}/{sub}")).collect();
                let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
                profile.with_category(&humanize_slug(slug), &urls, |category, _| category.to_string())
            },
        );

        Ok(Self {
            profile,
            selectors: Selectors {
                notice: compile("p.note-msg")?,
                card: compile("ul.products-grid li.item")?,
                link: compile("a.product-image")?,
                next: compile("div.pages a.next, div.pages a.i-next")?,
                description: compile("div.product-name h1")?,
                sku: compile("div.sku strong")?,
                availability: compile("div.sku span.dobava")?,
                special_price: compile("div.price-box p.special-price span.price")?,
                old_price: compile("div.price-box p.old-price span.price")?,
                regular_price: compile("div.price-box span.regular-price span.price")?,
                unit_note: compile("div.em")?,
                image: compile(".product-img-box img#image-main, .product-img-box img.gallery-image")?,
            },
            unit_pattern: Regex::new(UNIT_PATTERN)
                .map_err(|e| ParsingError::invalid_pattern(UNIT_PATTERN, &e.to_string()))?,
        })
    }

    fn unit_from_note(&self, note: &str) -> Option<String> {
        self.unit_pattern
            .captures(note)
            .and_then(|caps| caps.get(1))
            .map(|unit| unit.as_str().trim().to_uppercase())
            .filter(|unit| !unit.is_empty())
    }
}

impl ItemExtractor for ZagozenExtractor {
    fn profile(&self) -> &StorefrontProfile {
        &self.profile
    }

    fn list_page(&self, html: &str) -> ListPage {
        let document = Html::parse_document(html);

        let no_items_marker = document
            .select(&self.selectors.notice)
            .any(|notice| element_text(notice).to_lowercase().contains(NO_ITEMS_NOTICE));
        if no_items_marker {
            return ListPage {
                no_items_marker,
                ..ListPage::default()
            };
        }

        let items = document
            .select(&self.selectors.card)
            .filter_map(|card| {
                let link = card.select(&self.selectors.link).next()?;
                let href = link.value().attr("href")?.trim();
                (!href.is_empty()).then(|| ItemRef {
                    title: link.value().attr("title").unwrap_or_default().trim().to_string(),
                    ..ItemRef::new(href)
                })
            })
            .collect();

        ListPage {
            items,
            has_next: has_match(&document, &self.selectors.next),
            no_items_marker,
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
            fragment.code = text_in(root, &self.selectors.sku).unwrap_or_default();
            fragment.availability = text_in(root, &self.selectors.availability)
                .map(|text| text.replace("Dobava:", "").trim().to_string())
                .unwrap_or_default();

            if let Some(special) = text_in(root, &self.selectors.special_price) {
                fragment.promo_price_gross = clean_price(&special);
                fragment.price_gross = text_in(root, &self.selectors.old_price)
                    .map(|old| clean_price(&old))
                    .unwrap_or_default();
            } else if let Some(regular) = text_in(root, &self.selectors.regular_price) {
                fragment.price_gross = clean_price(&regular);
            }

            if let Some(unit) = text_in(root, &self.selectors.unit_note).and_then(|note| self.unit_from_note(&note)) {
                fragment.unit = unit;
            }

            fragment.image_url = attr_in(root, &self.selectors.image, "src").unwrap_or_default();
        }

        Extraction::from_fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_is_the_bare_category_url() {
        let extractor = ZagozenExtractor::new().unwrap();
        let (category, endpoint) = extractor.profile().endpoints().next().unwrap();

        assert_eq!(category.name, "Vodovod");
        assert_eq!(endpoint.group, "Vodovod");
        assert_eq!(
            extractor.page_url(endpoint, 1),
            "https://eshop-zagozen.si/vodovod/zbiralniki-za-vodo-aquastay-in-oprema"
        );
        assert_eq!(
            extractor.page_url(endpoint, 2),
            "https://eshop-zagozen.si/vodovod/zbiralniki-za-vodo-aquastay-in-oprema?p=2"
        );
    }

    #[test]
    fn reports_the_no_items_notice() {
        let extractor = ZagozenExtractor::new().unwrap();
        let page = extractor.list_page(r#"<p class="note-msg">V tej kategoriji Ni izdelkov.</p>"#);

        assert!(page.no_items_marker);
        assert!(page.items.is_empty());
    }

    #[test]
    fn lists_product_links() {
        let extractor = ZagozenExtractor::new().unwrap();
        let page = extractor.list_page(
            r#"<ul class="products-grid">
                 <li class="item"><a class="product-image" href="https://eshop-zagozen.si/cev-110" title="Cev PE 110"></a></li>
                 <li class="item"><a class="product-image" href="https://eshop-zagozen.si/cev-160"></a></li>
               </ul>
               <div class="pages"><a class="i-next" href="?p=2">Naprej</a></div>"#,
        );

        assert_eq!(page.items.len(), 2);
        assert!(page.has_next);
        assert!(!page.no_items_marker);
        assert_eq!(extractor.first_item_fingerprint(&page).as_deref(), Some("Cev PE 110"));
    }

    #[test]
    fn reads_special_and_old_prices_and_unit_note() {
        let extractor = ZagozenExtractor::new().unwrap();
        let detail = "
            <div class=\"product-name\"><h1>Jašek 400</h1></div>
            <div class=\"sku\"><strong>ZG-400</strong> <span class=\"dobava\">Dobava: 3 dni</span></div>
            <div class=\"price-box\">
              <p class=\"old-price\"><span class=\"price\">1.250,00\u{a0}€</span></p>
              <p class=\"special-price\"><span class=\"price\">999,00 €</span></p>
            </div>
            <div class=\"em\">Cena je na kos.</div>
            <div class=\"product-img-box\"><img id=\"image-main\" src=\"https://eshop-zagozen.si/m/400.jpg\"></div>";

        let Extraction::Fragment(fragment) = extractor.extract(&ItemRef::new("https://eshop-zagozen.si/jasek-400"), Some(detail)) else {
            panic!("expected a fragment");
        };
        assert_eq!(fragment.description, "Jašek 400");
        assert_eq!(fragment.code, "ZG-400");
        assert_eq!(fragment.availability, "3 dni");
        assert_eq!(fragment.price_gross, "1250,00");
        assert_eq!(fragment.promo_price_gross, "999,00");
        assert_eq!(fragment.unit, "KOS");
        assert_eq!(fragment.image_url, "https://eshop-zagozen.si/m/400.jpg");
    }

    #[test]
    fn regular_price_without_promotion() {
        let extractor = ZagozenExtractor::new().unwrap();
        let detail = r#"
            <div class="price-box"><span class="regular-price"><span class="price">12,40 €</span></span></div>
            <div class="em">Cena je na m</div>"#;

        let Extraction::Fragment(fragment) = extractor.extract(&ItemRef::new("https://eshop-zagozen.si/x"), Some(detail)) else {
            panic!("expected a fragment");
        };
        assert_eq!(fragment.price_gross, "12,40");
        assert_eq!(fragment.promo_price_gross, "");
        assert_eq!(fragment.unit, "M");
    }
}
