//! One extractor per storefront

pub mod kalcer;
pub mod merkur;
pub mod obi;
pub mod slovenijales;
pub mod tehnoles;
pub mod zagozen;

pub use kalcer::KalcerExtractor;
pub use merkur::MerkurExtractor;
pub use obi::ObiExtractor;
pub use slovenijales::SlovenijalesExtractor;
pub use tehnoles::TehnolesExtractor;
pub use zagozen::ZagozenExtractor;

/// Default unit of measure when a storefront does not state one
pub(crate) const DEFAULT_UNIT: &str = "KOS";
