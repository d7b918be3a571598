//! Storefront id to extractor mapping

use super::ItemExtractor;
use super::error::ParsingResult;
use super::sites::{
    KalcerExtractor, MerkurExtractor, ObiExtractor, SlovenijalesExtractor, TehnolesExtractor,
    ZagozenExtractor,
};
use crate::domain::StorefrontId;

pub struct ExtractorRegistry;

impl ExtractorRegistry {
    /// Build the extractor registered for `id`
    pub fn build(id: StorefrontId) -> ParsingResult<Box<dyn ItemExtractor>> {
        Ok(match id {
            StorefrontId::Merkur => Box::new(MerkurExtractor::new()?),
            StorefrontId::Obi => Box::new(ObiExtractor::new()?),
            StorefrontId::Kalcer => Box::new(KalcerExtractor::new()?),
            StorefrontId::Slovenijales => Box::new(SlovenijalesExtractor::new()?),
            StorefrontId::Tehnoles => Box::new(TehnolesExtractor::new()?),
            StorefrontId::Zagozen => Box::new(ZagozenExtractor::new()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_storefront_builds_with_categories() {
        for id in StorefrontId::ALL {
            let extractor = ExtractorRegistry::build(id).unwrap();
            let profile = extractor.profile();

            assert_eq!(profile.id, id);
            assert_eq!(profile.display_name, id.display_name());
            assert!((profile.vat_rate - 0.22).abs() < f64::EPSILON);
            assert!(profile.endpoints().count() > 0, "{id} has no endpoints");
            assert!(profile.endpoints().all(|(_, endpoint)| !endpoint.group.is_empty()));
        }
    }
}
