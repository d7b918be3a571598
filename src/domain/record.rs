//! Catalog record and its identity rules
//!
//! Serialized field names are the legacy column headers of the published
//! price lists, so stores written by earlier tooling keep loading. Optional
//! text fields are empty strings rather than `None`, matching those files.

use serde::{Deserialize, Deserializer, Serialize};

use super::price::normalize;
use super::storefront::StorefrontProfile;

/// Currency of every harvested price
pub const CURRENCY: &str = "EUR";

/// Column headers of the tabular rendering, in their fixed order
pub const COLUMNS: [&str; 17] = [
    "Skupina",
    "Zap",
    "Oznaka / naziv",
    "EAN",
    "Opis",
    "EM",
    "Valuta",
    "DDV",
    "Proizvajalec",
    "Veljavnost od",
    "Dobava",
    "Cena / EM (z DDV)",
    "Akcijska cena / EM (z DDV)",
    "Cena / EM (brez DDV)",
    "Akcijska cena / EM (brez DDV)",
    "URL",
    "SLIKA URL",
];

/// One catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(rename = "Skupina", deserialize_with = "lenient_text")]
    pub group: String,
    #[serde(rename = "Zap", deserialize_with = "lenient_sequence")]
    pub sequence: Option<u64>,
    #[serde(rename = "Oznaka / naziv", deserialize_with = "lenient_text")]
    pub code: String,
    #[serde(rename = "EAN", deserialize_with = "lenient_text")]
    pub ean: String,
    #[serde(rename = "Opis", deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(rename = "EM", deserialize_with = "lenient_text")]
    pub unit: String,
    #[serde(rename = "Valuta", deserialize_with = "lenient_text")]
    pub currency: String,
    #[serde(rename = "DDV", deserialize_with = "lenient_text")]
    pub vat_label: String,
    #[serde(rename = "Proizvajalec", deserialize_with = "lenient_text")]
    pub manufacturer: String,
    #[serde(rename = "Veljavnost od", deserialize_with = "lenient_text")]
    pub valid_from: String,
    #[serde(rename = "Dobava", deserialize_with = "lenient_text")]
    pub availability: String,
    #[serde(rename = "Cena / EM (z DDV)", deserialize_with = "lenient_text")]
    pub price_gross: String,
    #[serde(rename = "Akcijska cena / EM (z DDV)", deserialize_with = "lenient_text")]
    pub promo_price_gross: String,
    #[serde(rename = "Cena / EM (brez DDV)", deserialize_with = "lenient_text")]
    pub price_net: String,
    #[serde(rename = "Akcijska cena / EM (brez DDV)", deserialize_with = "lenient_text")]
    pub promo_price_net: String,
    #[serde(rename = "URL", deserialize_with = "lenient_text")]
    pub url: String,
    #[serde(rename = "SLIKA URL", deserialize_with = "lenient_text")]
    pub image_url: String,
}

/// Identity of a record inside one store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DedupKey {
    Code(String),
    Url(String),
}

/// Fields an extractor could determine for one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFragment {
    pub url: String,
    pub code: String,
    pub ean: String,
    pub description: String,
    pub unit: String,
    pub manufacturer: String,
    pub availability: String,
    pub price_gross: String,
    pub promo_price_gross: String,
    pub image_url: String,
}

impl RecordFragment {
    /// Neither a description nor any price: nothing worth keeping
    #[must_use]
    pub fn is_unusable(&self) -> bool {
        self.description.trim().is_empty()
            && self.price_gross.trim().is_empty()
            && self.promo_price_gross.trim().is_empty()
    }
}

impl Record {
    /// Build a record from an extracted fragment.
    ///
    /// Net prices are always derived from the gross prices seen now. The
    /// sequence number stays unassigned until the record is merged.
    #[must_use]
    pub fn from_fragment(
        fragment: RecordFragment,
        group: &str,
        valid_from: &str,
        profile: &StorefrontProfile,
    ) -> Self {
        let price_net = normalize(&fragment.price_gross, profile.vat_rate);
        let promo_price_net = normalize(&fragment.promo_price_gross, profile.vat_rate);

        Self {
            group: group.to_string(),
            sequence: None,
            code: fragment.code,
            ean: fragment.ean,
            description: fragment.description,
            unit: fragment.unit,
            currency: CURRENCY.to_string(),
            vat_label: profile.vat_label.to_string(),
            manufacturer: fragment.manufacturer,
            valid_from: valid_from.to_string(),
            availability: fragment.availability,
            price_gross: fragment.price_gross,
            promo_price_gross: fragment.promo_price_gross,
            price_net,
            promo_price_net,
            url: fragment.url,
            image_url: fragment.image_url,
        }
    }

    /// Code when present, otherwise the source URL
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        let code = self.code.trim();
        if code.is_empty() {
            DedupKey::Url(self.url.trim().to_string())
        } else {
            DedupKey::Code(code.to_string())
        }
    }
}

/// Shapes a legacy cell may take
#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyCell {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LegacyCell>::deserialize(deserializer)? {
        Some(LegacyCell::Text(text)) => text,
        Some(LegacyCell::Integer(value)) => value.to_string(),
        Some(LegacyCell::Float(value)) => value.to_string(),
        Some(LegacyCell::Flag(value)) => value.to_string(),
        None => String::new(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_sequence<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let sequence = match Option::<LegacyCell>::deserialize(deserializer)? {
        Some(LegacyCell::Integer(value)) => u64::try_from(value).ok(),
        Some(LegacyCell::Float(value)) if value.is_finite() && value >= 1.0 => Some(value as u64),
        Some(LegacyCell::Text(text)) => {
            let text = text.trim();
            text.parse::<u64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite() && *value >= 1.0)
                    .map(|value| value as u64)
            })
        }
        _ => None,
    };
    Ok(sequence.filter(|value| *value > 0))
}
