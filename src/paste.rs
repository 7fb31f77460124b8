//! Parser for network statistics pasted as plain text.
//!
//! Expected layout, one block per ticker separated by blank lines:
//!
//! ```text
//! btc
//! BTC
//! 707.933 Eh/s
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::ocr::extract::extract_number_unit;
use crate::ocr::matcher::TickerMatcher;
use crate::units::HashUnit;

/// Network rate read from pasted text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PastedRate {
    pub rate: f64,
    pub unit: HashUnit,
}

impl PastedRate {
    pub fn rate_in_base(&self) -> f64 {
        self.unit.to_base(self.rate)
    }
}

/// Parses pasted text into ticker → rate.
///
/// A line that resolves to a ticker opens that ticker's context; a blank line
/// closes it. Every other line inside a context is scanned for a rate, and a
/// later rate line replaces an earlier one. Unlike the image path, a unit
/// word that is not recognized falls back to Gh/s here.
pub fn parse_pasted_text(text: &str, matcher: &TickerMatcher) -> BTreeMap<String, PastedRate> {
    let mut parsed = BTreeMap::new();
    let mut context: Option<String> = None;

    for line in text.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            context = None;
            continue;
        }

        if let Some(ticker) = matcher.resolve(&line.to_uppercase()) {
            context = Some(ticker.to_string());
            continue;
        }

        let Some(ticker) = &context else {
            continue;
        };
        let Some(found) = extract_number_unit(line) else {
            continue;
        };
        let Some(rate) = found.parsed_value() else {
            continue;
        };

        let unit = found
            .unit
            .as_deref()
            .and_then(HashUnit::normalize)
            .unwrap_or(HashUnit::Ghs);
        debug!("Pasted {} -> {} {}", ticker, rate, unit);
        parsed.insert(ticker.clone(), PastedRate { rate, unit });
    }

    info!("Parsed {} tickers from pasted text", parsed.len());
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
rlt
RLT
485.544 Eh/s

rst
RST
215.061 Eh/s

Crypto Currencies

xrp
XRP
234.557 Eh/s

matic
POL
636.577 Eh/s

ltc
LTC
195.149 Eh/s
";

    #[test]
    fn test_sample_dashboard_text() {
        let parsed = parse_pasted_text(SAMPLE, &TickerMatcher::standard());
        assert_eq!(parsed.len(), 5);
        assert_eq!(
            parsed["RLT"],
            PastedRate {
                rate: 485.544,
                unit: HashUnit::Ehs
            }
        );
        assert_eq!(parsed["POL"].rate, 636.577);
        assert_eq!(parsed["LTC"].unit, HashUnit::Ehs);
    }

    #[test]
    fn test_blank_line_resets_context() {
        let text = "BTC\n\n12 Th/s\n";
        assert!(parse_pasted_text(text, &TickerMatcher::standard()).is_empty());
    }

    #[test]
    fn test_unknown_unit_falls_back_to_base() {
        let parsed = parse_pasted_text("ETH\n5 furlongs", &TickerMatcher::standard());
        assert_eq!(parsed["ETH"].unit, HashUnit::Ghs);
        assert_eq!(parsed["ETH"].rate_in_base(), 5.0);
    }

    #[test]
    fn test_missing_unit_and_separators() {
        let parsed = parse_pasted_text("doge\n1,234.5", &TickerMatcher::standard());
        assert_eq!(parsed["DOGE"].rate, 1234.5);
        assert_eq!(parsed["DOGE"].unit, HashUnit::Ghs);
    }

    #[test]
    fn test_later_rate_line_wins() {
        let parsed = parse_pasted_text("BNB\n1 Ph/s\n2 Eh/s", &TickerMatcher::standard());
        assert_eq!(parsed["BNB"].rate, 2.0);
        assert_eq!(parsed["BNB"].unit, HashUnit::Ehs);
    }

    #[test]
    fn test_ticker_without_rate_is_absent() {
        let parsed = parse_pasted_text("SOL\n\nBTC\n3 Th/s", &TickerMatcher::standard());
        assert!(!parsed.contains_key("SOL"));
        assert_eq!(parsed["BTC"].rate, 3.0);
    }
}
