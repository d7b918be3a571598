//! VAT price normalization
//!
//! Storefront prices arrive as locale text: `.` groups thousands, `,` marks the
//! decimals, and the currency sign or a non-breaking space may be glued on.
//! Conversion never fails loudly; anything unparseable becomes an empty string.

/// Convert a VAT-inclusive price text into the VAT-exclusive price text.
///
/// Returns an empty string when the price cannot be parsed.
///
/// ```
/// use storefront_harvester::domain::price::normalize;
///
/// assert_eq!(normalize("1.220,00", 0.22), "1000,00");
/// assert_eq!(normalize("n/a", 0.22), "");
/// ```
#[must_use]
pub fn normalize(price_text: &str, vat_rate: f64) -> String {
    if !vat_rate.is_finite() || vat_rate <= -1.0 {
        return String::new();
    }

    parse_locale_price(price_text)
        .map(|gross| render_locale_price(gross / (1.0 + vat_rate)))
        .unwrap_or_default()
}

/// Parse a locale formatted price (`1.234,56 €`) into a number.
#[must_use]
pub fn parse_locale_price(price_text: &str) -> Option<f64> {
    let cleaned = clean_price_text(price_text);
    if cleaned.is_empty() {
        return None;
    }

    let canonical = cleaned.replace('.', "").replace(',', ".");
    canonical
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Render a number with two decimals and a comma separator.
#[must_use]
pub fn render_locale_price(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

/// Strip currency signs, non-breaking spaces and whitespace from a price text.
#[must_use]
pub fn clean_price_text(price_text: &str) -> String {
    price_text
        .chars()
        .filter(|c| !matches!(c, '€' | '\u{a0}') && !c.is_whitespace())
        .collect()
}

/// Iterate over the runs of digits, dots and commas inside a text.
pub fn number_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .filter(|run| run.chars().any(|c| c.is_ascii_digit()))
}

/// First number-looking run of a text, e.g. `"cena: 12,99 €/kos"` gives `"12,99"`.
#[must_use]
pub fn first_number(text: &str) -> Option<&str> {
    number_runs(text).next()
}
