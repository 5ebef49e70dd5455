//! Price extraction from a result page.
//!
//! The price site renders one block per station. Extraction first checks
//! that the station is mentioned at all, then looks for price-shaped
//! numbers in the text following the station name, then anywhere on the
//! page, and finally in elements whose own text carries a euro sign.
//! Among plausible candidates the highest one wins: premium grades are the
//! most expensive figures listed next to a station.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use tracing::debug;

use fueltrack_types::{StationTarget, parse_price};

use crate::error::{FetchError, Result};
use crate::validation::PriceBounds;

/// Number of bytes after the station name searched first.
const STATION_WINDOW: usize = 2_000;

/// Elements with a euro sign inspected by the fallback pass.
const EURO_ELEMENT_LIMIT: usize = 10;

static PRICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d[.,]\d{2,3}\b").expect("valid price regex"));

/// The part of a station name used to find it on the page.
///
/// Catalog names may carry a `| BRAND` suffix that the site does not print.
pub fn short_name(name: &str) -> &str {
    name.split('|').next().unwrap_or(name).trim()
}

/// Extract the price for `target` from a result page.
pub fn extract_price(html: &str, target: &StationTarget, bounds: &PriceBounds) -> Result<Decimal> {
    let full_name = target.station.name.trim();
    let short = short_name(full_name);

    let position = html
        .find(short)
        .or_else(|| html.find(full_name))
        .ok_or_else(|| FetchError::StationNotFound(full_name.to_string()))?;

    let window_end = floor_char_boundary(html, position + STATION_WINDOW);
    let window = &html[position..window_end];

    if let Some(price) = best_candidate(window, bounds) {
        debug!("Price {} found near '{}'", price, short);
        return Ok(price);
    }

    if let Some(price) = best_candidate(html, bounds) {
        debug!("Price {} found elsewhere on the page for '{}'", price, short);
        return Ok(price);
    }

    if let Some(price) = euro_element_price(html, bounds) {
        debug!("Price {} found in a euro-labelled element for '{}'", price, short);
        return Ok(price);
    }

    Err(FetchError::PriceNotFound(full_name.to_string()))
}

/// Highest price-shaped number in `text` that lies inside `bounds`.
fn best_candidate(text: &str, bounds: &PriceBounds) -> Option<Decimal> {
    PRICE_PATTERN
        .find_iter(text)
        .filter_map(|m| parse_price(m.as_str()).ok())
        .filter(|p| bounds.contains(*p))
        .max()
}

/// First plausible price printed right before a euro sign.
fn euro_element_price(html: &str, bounds: &PriceBounds) -> Option<Decimal> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("body *").ok()?;

    document
        .select(&selector)
        .filter_map(|element| {
            let own_text: String = element
                .children()
                .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
                .collect();
            own_text.contains('€').then_some(own_text)
        })
        .take(EURO_ELEMENT_LIMIT)
        .find_map(|text| {
            let before_euro = text.split('€').next()?.trim();
            let token = before_euro.split_whitespace().last()?;
            parse_price(token).ok().filter(|p| bounds.contains(*p))
        })
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueltrack_types::StationConfig;
    use rust_decimal_macros::dec;

    fn target(name: &str) -> StationTarget {
        StationTarget::new("92400", StationConfig::new(name))
    }

    #[test]
    fn test_short_name_strips_brand() {
        assert_eq!(short_name("RELAIS DU PARC | TOTAL"), "RELAIS DU PARC");
        assert_eq!(short_name("AUCHAN"), "AUCHAN");
    }

    #[test]
    fn test_station_not_found() {
        let html = "<html><body><p>AUCHAN 1.799</p></body></html>";
        let err = extract_price(html, &target("RELAIS"), &PriceBounds::default()).unwrap_err();
        assert!(matches!(err, FetchError::StationNotFound(_)));
    }

    #[test]
    fn test_prefers_prices_near_station() {
        let html = format!(
            "<div>AUCHAN Gazole 2.199</div>{}<div>RELAIS DU PARC SP98 1.899 E10 1.829</div>",
            " ".repeat(STATION_WINDOW + 10)
        );
        let price = extract_price(
            &html,
            &target("RELAIS DU PARC | TOTAL"),
            &PriceBounds::default(),
        )
        .unwrap();
        assert_eq!(price, dec!(1.899));
    }

    #[test]
    fn test_ignores_implausible_numbers() {
        let html = "<p>RELAIS version 3.141 distance 0.75 prix 1,859</p>";
        let price = extract_price(html, &target("RELAIS"), &PriceBounds::default()).unwrap();
        assert_eq!(price, dec!(1.859));
    }

    #[test]
    fn test_falls_back_to_whole_page() {
        let html = format!(
            "<p>1.745</p><p>RELAIS</p>{}",
            "x".repeat(STATION_WINDOW + 10)
        );
        let price = extract_price(&html, &target("RELAIS"), &PriceBounds::default()).unwrap();
        assert_eq!(price, dec!(1.745));
    }

    #[test]
    fn test_euro_element_fallback() {
        // One decimal only, so the plain pattern cannot match.
        let html = "<body><h2>RELAIS</h2><span>SP98 1.9 €/L</span></body>";
        let price = extract_price(html, &target("RELAIS"), &PriceBounds::default()).unwrap();
        assert_eq!(price, dec!(1.9));

        let narrow = PriceBounds::new(dec!(1.5), dec!(1.8));
        assert!(extract_price(html, &target("RELAIS"), &narrow).is_err());
    }

    #[test]
    fn test_price_not_found() {
        let html = "<p>RELAIS fermé</p>";
        let err = extract_price(html, &target("RELAIS"), &PriceBounds::default()).unwrap_err();
        assert!(matches!(err, FetchError::PriceNotFound(_)));
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        let html = format!("RELAIS {} 1.799", "é".repeat(STATION_WINDOW));
        let price = extract_price(&html, &target("RELAIS"), &PriceBounds::default()).unwrap();
        assert_eq!(price, dec!(1.799));
    }
}
