//! Storefront identity and traversal profile
//!
//! A profile is static description only: where the storefront lives, how its
//! listing pages are numbered and which category endpoints are harvested.
//! The markup knowledge lives with the extractor that owns the profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default VAT rate applied to Slovenian consumer prices
pub const DEFAULT_VAT_RATE: f64 = 0.22;

/// Label written into the `DDV` column for [`DEFAULT_VAT_RATE`]
pub const DEFAULT_VAT_LABEL: &str = "22";

/// Every supported storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorefrontId {
    Merkur,
    Obi,
    Kalcer,
    Slovenijales,
    Tehnoles,
    Zagozen,
}

impl StorefrontId {
    /// Harvest order used by the supervisor
    pub const ALL: [Self; 6] = [
        Self::Merkur,
        Self::Obi,
        Self::Kalcer,
        Self::Slovenijales,
        Self::Tehnoles,
        Self::Zagozen,
    ];

    /// Identifier used on the command line and in configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merkur => "merkur",
            Self::Obi => "obi",
            Self::Kalcer => "kalcer",
            Self::Slovenijales => "slovenijales",
            Self::Tehnoles => "tehnoles",
            Self::Zagozen => "zagozen",
        }
    }

    /// Shop name used in directory and file names
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Merkur => "Merkur",
            Self::Obi => "OBI",
            Self::Kalcer => "Kalcer",
            Self::Slovenijales => "Slovenijales",
            Self::Tehnoles => "Tehnoles",
            Self::Zagozen => "Zagozen",
        }
    }
}

impl fmt::Display for StorefrontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a storefront identifier is not known
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storefront '{0}' (expected one of: merkur, obi, kalcer, slovenijales, tehnoles, zagozen)")]
pub struct UnknownStorefront(pub String);

impl FromStr for StorefrontId {
    type Err = UnknownStorefront;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStorefront(s.to_string()))
    }
}

/// How a listing page number is put into the endpoint URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationScheme {
    /// `{url}?{param}={n}{suffix}`, or `&` when the URL already has a query
    Query {
        param: &'static str,
        suffix: &'static str,
    },
    /// `{url}&{param}={n}` appended literally
    Appended { param: &'static str },
    /// Page 1 is the bare endpoint URL, later pages use `?{param}={n}`
    BareFirstPage { param: &'static str },
}

impl PaginationScheme {
    #[must_use]
    pub fn page_url(&self, endpoint_url: &str, page: u32) -> String {
        match *self {
            Self::Query { param, suffix } => {
                let joiner = if endpoint_url.contains('?') { '&' } else { '?' };
                format!("{endpoint_url}{joiner}{param}={page}{suffix}")
            }
            Self::Appended { param } => format!("{endpoint_url}&{param}={page}"),
            Self::BareFirstPage { param } => {
                if page <= 1 {
                    endpoint_url.to_string()
                } else {
                    format!("{endpoint_url}?{param}={page}")
                }
            }
        }
    }
}

/// One paginated listing to walk, together with the group name its records get
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub group: String,
}

/// A named main category made of listing endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub endpoints: Vec<Endpoint>,
}

/// Static description of one storefront
#[derive(Debug, Clone)]
pub struct StorefrontProfile {
    pub id: StorefrontId,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub vat_rate: f64,
    pub vat_label: &'static str,
    pub pagination: PaginationScheme,
    pub categories: Vec<Category>,
}

impl StorefrontProfile {
    /// Profile with the default VAT settings and no categories yet
    #[must_use]
    pub const fn new(id: StorefrontId, base_url: &'static str, pagination: PaginationScheme) -> Self {
        Self {
            id,
            display_name: id.display_name(),
            base_url,
            vat_rate: DEFAULT_VAT_RATE,
            vat_label: DEFAULT_VAT_LABEL,
            pagination,
            categories: Vec::new(),
        }
    }

    /// Add a category whose endpoint group names are derived from the URL
    #[must_use]
    pub fn with_category<F>(mut self, name: &str, urls: &[&str], group_of: F) -> Self
    where
        F: Fn(&str, &str) -> String,
    {
        let endpoints = urls
            .iter()
            .map(|url| Endpoint {
                url: (*url).to_string(),
                group: group_of(name, url),
            })
            .collect();
        self.categories.push(Category {
            name: name.to_string(),
            endpoints,
        });
        self
    }

    #[must_use]
    pub fn page_url(&self, endpoint: &Endpoint, page: u32) -> String {
        self.pagination.page_url(&endpoint.url, page)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = (&Category, &Endpoint)> {
        self.categories
            .iter()
            .flat_map(|category| category.endpoints.iter().map(move |endpoint| (category, endpoint)))
    }
}
