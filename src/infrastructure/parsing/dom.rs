//! Small helpers over `scraper` shared by the storefront extractors

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use super::error::{ParsingError, ParsingResult};

/// Compile one CSS selector
pub fn compile(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| {
        warn!("Failed to compile selector '{}': {}", selector, e);
        ParsingError::invalid_selector(selector, &e.to_string())
    })
}

/// Compile a fallback chain of selectors, tried in order at extraction time
pub fn compile_all(selectors: &[&str]) -> ParsingResult<Vec<Selector>> {
    selectors.iter().copied().map(compile).collect()
}

/// Text content with surrounding whitespace stripped from every piece
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `selector` below `element`, if non-empty
#[must_use]
pub fn text_in(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// First non-empty text over a fallback chain
#[must_use]
pub fn text_with_fallbacks(element: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| text_in(element, selector))
}

/// Attribute of the first match of `selector` below `element`, if non-empty
#[must_use]
pub fn attr_in(element: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|found| found.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub fn has_match(document: &Html, selector: &Selector) -> bool {
    document.select(selector).next().is_some()
}

/// Resolve a possibly relative link against the storefront base URL
pub fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }

    let base = Url::parse(base_url)
        .map_err(|e| ParsingError::url_resolution_failed(base_url, &format!("Invalid base URL: {e}")))?;
    base.join(href)
        .map(String::from)
        .map_err(|e| ParsingError::url_resolution_failed(href, &format!("Failed to join URL: {e}")))
}

/// Upper-case the first character and lower-case the rest
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// `steklena-volna` becomes `Steklena volna`
#[must_use]
pub fn humanize_slug(slug: &str) -> String {
    capitalize(&slug.replace('-', " "))
}

/// Last non-empty path segment of a URL
#[must_use]
pub fn last_path_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}
