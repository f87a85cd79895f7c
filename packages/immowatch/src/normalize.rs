//! Field normalization for scraped listing payloads.
//!
//! Display strings from detail pages ("349.000 €", "82,5 m²", "ca. 1964")
//! are turned into typed values. The cleaner is deliberately forgiving: an
//! unparseable value becomes `None` and only lowers the quality score.
//! Changing that to a hard error would alter observable skip and scoring
//! outcomes, so it stays documented behavior.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ImmowatchError, Result};
use crate::quality;
use crate::types::{NormalizedListing, RawListing};

/// Sanity range for construction years.
const YEAR_MIN: i32 = 1800;
const YEAR_MAX: i32 = 2100;

fn postal_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // German five-digit postal code embedded in free-text addresses.
    RE.get_or_init(|| Regex::new(r"\b(\d{5})\b").expect("valid postal code regex"))
}

/// Parse a locale-formatted numeric display string.
///
/// Comma is the decimal separator; dot and space group thousands
/// ("1.234,56" → 1234.56). Currency symbols and units are ignored.
/// Returns `None` for anything that does not contain a usable number.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    if cleaned.contains(',') {
        // Decimal comma locale: dots are thousands separators.
        cleaned.retain(|c| c != '.');
        cleaned = cleaned.replace(',', ".");
    } else if cleaned.matches('.').count() > 1 {
        // "1.234.567" — thousands grouping only.
        cleaned.retain(|c| c != '.');
    } else if let Some((_, frac)) = cleaned.split_once('.') {
        // A lone dot followed by exactly three digits is grouping in this
        // locale ("349.000" is 349 000, not 349.0). Anything else keeps
        // the dot as a plain decimal point ("1234.5").
        if frac.len() == 3 && frac.chars().all(|c| c.is_ascii_digit()) {
            cleaned.retain(|c| c != '.');
        }
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a construction year, rejecting values outside a sanity range.
pub fn parse_year(raw: &str) -> Option<i32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).take(4).collect();
    if digits.len() < 4 {
        return None;
    }
    digits
        .parse::<i32>()
        .ok()
        .filter(|y| (YEAR_MIN..=YEAR_MAX).contains(y))
}

/// Extract a postal code from a free-text address.
pub fn extract_postal_code(address: &str) -> Option<String> {
    postal_code_re()
        .captures(address)
        .map(|c| c[1].to_string())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Normalize a raw listing into typed fields plus a quality score.
///
/// Fails only on a missing url; field-level problems degrade to `None`.
pub fn normalize_listing(raw: &RawListing) -> Result<NormalizedListing> {
    if raw.url.trim().is_empty() {
        return Err(ImmowatchError::Validation {
            url: "<missing>".into(),
            reason: "listing has no url".into(),
        });
    }

    let address = non_empty(raw.address.as_ref());
    let listing = NormalizedListing {
        url: raw.url.trim().to_string(),
        title: non_empty(raw.title.as_ref()),
        postal_code: address.as_deref().and_then(extract_postal_code),
        address,
        price: raw.price.as_deref().and_then(parse_numeric),
        size: raw.size.as_deref().and_then(parse_numeric),
        rooms: raw.rooms.as_deref().and_then(parse_numeric),
        year_built: raw.year_built.as_deref().and_then(parse_year),
        overview: non_empty(raw.overview.as_ref()),
        extra: raw.extra.clone(),
        quality_score: 0.0,
    };

    Ok(NormalizedListing {
        quality_score: quality::quality_score(&listing),
        ..listing
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_comma() {
        assert_eq!(parse_numeric("82,5 m²"), Some(82.5));
        assert_eq!(parse_numeric("349.000 €"), Some(349_000.0));
        assert_eq!(parse_numeric("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_numeric("1.234,56"), Some(1234.56));
    }

    #[test]
    fn plain_numbers_pass_through() {
        assert_eq!(parse_numeric("3"), Some(3.0));
        assert_eq!(parse_numeric("1234.5"), Some(1234.5));
    }

    #[test]
    fn single_dot_with_three_digits_is_grouping() {
        assert_eq!(parse_numeric("349.000 €"), Some(349_000.0));
        assert_eq!(parse_numeric("1.234"), Some(1234.0));
        // Fewer or more than three trailing digits stay decimal.
        assert_eq!(parse_numeric("12.34"), Some(12.34));
        assert_eq!(parse_numeric("5.1234"), Some(5.1234));
    }

    #[test]
    fn unparseable_is_none_not_error() {
        assert_eq!(parse_numeric("auf Anfrage"), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("€"), None);
    }

    #[test]
    fn year_sanity_range() {
        assert_eq!(parse_year("1964"), Some(1964));
        assert_eq!(parse_year("ca. 1987"), Some(1987));
        assert_eq!(parse_year("1492"), None);
        assert_eq!(parse_year("87"), None);
    }

    #[test]
    fn postal_code_from_address() {
        assert_eq!(
            extract_postal_code("Musterstraße 12, 80331 München"),
            Some("80331".to_string())
        );
        assert_eq!(extract_postal_code("Musterstraße 12, München"), None);
        // Longer digit runs are not postal codes.
        assert_eq!(extract_postal_code("Parzelle 123456"), None);
    }

    #[test]
    fn missing_url_is_validation_error() {
        let raw = RawListing::new("  ");
        assert!(matches!(
            normalize_listing(&raw),
            Err(ImmowatchError::Validation { .. })
        ));
    }

    #[test]
    fn normalization_fills_derived_fields() {
        let mut raw = RawListing::new("https://example.com/expose/1");
        raw.title = Some("Helle 3-Zimmer-Wohnung".into());
        raw.address = Some("Gartenweg 4, 50667 Köln".into());
        raw.price = Some("289.000 €".into());
        raw.size = Some("78,5 m²".into());
        raw.rooms = Some("3".into());
        raw.year_built = Some("1978".into());

        let n = normalize_listing(&raw).unwrap();
        assert_eq!(n.postal_code.as_deref(), Some("50667"));
        assert_eq!(n.price, Some(289_000.0));
        assert_eq!(n.size, Some(78.5));
        assert_eq!(n.rooms, Some(3.0));
        assert_eq!(n.year_built, Some(1978));
        assert!(n.quality_score > 0.0);
    }
}
