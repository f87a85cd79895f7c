//! Data-quality scoring: weighted completeness over the scored fields.

use crate::types::NormalizedListing;

/// Field weights. They sum to 1.0, so the score is achieved weight over
/// total weight and always lands in [0, 1].
const TITLE_WEIGHT: f64 = 0.20;
const ADDRESS_WEIGHT: f64 = 0.20;
const PRICE_WEIGHT: f64 = 0.20;
const SIZE_WEIGHT: f64 = 0.15;
const ROOMS_WEIGHT: f64 = 0.10;
const YEAR_BUILT_WEIGHT: f64 = 0.10;
const OVERVIEW_WEIGHT: f64 = 0.05;

const TOTAL_WEIGHT: f64 = TITLE_WEIGHT
    + ADDRESS_WEIGHT
    + PRICE_WEIGHT
    + SIZE_WEIGHT
    + ROOMS_WEIGHT
    + YEAR_BUILT_WEIGHT
    + OVERVIEW_WEIGHT;

/// Score a normalized listing by how many of the scored fields are
/// present with usable values.
pub fn quality_score(listing: &NormalizedListing) -> f64 {
    let mut achieved = 0.0;

    if listing.title.is_some() {
        achieved += TITLE_WEIGHT;
    }
    if listing.address.is_some() {
        achieved += ADDRESS_WEIGHT;
    }
    if listing.price.is_some() {
        achieved += PRICE_WEIGHT;
    }
    if listing.size.is_some() {
        achieved += SIZE_WEIGHT;
    }
    if listing.rooms.is_some() {
        achieved += ROOMS_WEIGHT;
    }
    if listing.year_built.is_some() {
        achieved += YEAR_BUILT_WEIGHT;
    }
    if listing.overview.is_some() {
        achieved += OVERVIEW_WEIGHT;
    }

    (achieved / TOTAL_WEIGHT).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_listing(url: &str) -> NormalizedListing {
        NormalizedListing {
            url: url.to_string(),
            title: None,
            address: None,
            postal_code: None,
            price: None,
            size: None,
            rooms: None,
            year_built: None,
            overview: None,
            extra: Default::default(),
            quality_score: 0.0,
        }
    }

    #[test]
    fn all_fields_present_scores_one() {
        let mut l = empty_listing("https://example.com/1");
        l.title = Some("t".into());
        l.address = Some("a".into());
        l.price = Some(100_000.0);
        l.size = Some(80.0);
        l.rooms = Some(3.0);
        l.year_built = Some(1990);
        l.overview = Some("o".into());
        assert!((quality_score(&l) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn title_and_address_only_scores_forty_percent() {
        let mut l = empty_listing("https://example.com/2");
        l.title = Some("t".into());
        l.address = Some("a".into());
        assert!((quality_score(&l) - 0.40).abs() < 1e-9);
    }

    #[test]
    fn empty_listing_scores_zero() {
        assert_eq!(quality_score(&empty_listing("https://example.com/3")), 0.0);
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let mut l = empty_listing("https://example.com/4");
        l.price = Some(1.0);
        l.rooms = Some(2.0);
        let s = quality_score(&l);
        assert!((0.0..=1.0).contains(&s));
    }
}
