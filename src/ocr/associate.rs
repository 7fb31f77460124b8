//! Pairs ticker labels with the rate text on the same visual row.
//!
//! For each record that resolves to a ticker, every rate candidate is scored
//! with `|dx| + weight * |dy|`. A candidate is eligible only when it is within
//! the vertical tolerance, strictly to the right of the ticker, and closer
//! than the horizontal search radius.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extract::NumberUnitCandidate;
use super::matcher::TickerMatcher;
use super::records::PositionedTextRecord;
use crate::config::AssociationParams;
use crate::units::RateUnit;

/// Network rate found for one ticker, plus where its label sat on the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRateEntry {
    pub rate: f64,
    pub unit: RateUnit,
    pub ticker_x: i32,
    pub ticker_y: i32,
    pub ticker_height: i32,
}

impl TickerRateEntry {
    /// Network rate in Gh/s; 0.0 when the unit was not recognized.
    pub fn rate_in_base(&self) -> f64 {
        self.unit.to_base(self.rate)
    }
}

/// Ticker -> network rate, rebuilt on every analysis.
pub type TickerRateMap = BTreeMap<String, TickerRateEntry>;

/// Picks the nearest eligible candidate for a ticker at `(x, y)`.
///
/// Ties keep the first candidate encountered.
pub fn nearest_candidate<'a>(
    x: i32,
    y: i32,
    candidates: &'a [NumberUnitCandidate],
    params: &AssociationParams,
) -> Option<&'a NumberUnitCandidate> {
    let mut best: Option<(&NumberUnitCandidate, i64)> = None;

    for candidate in candidates {
        // Coordinates can span the whole i32 range
        let dx = (candidate.x as i64 - x as i64).abs();
        let dy = (candidate.y as i64 - y as i64).abs();

        if dy > params.vertical_tolerance as i64 {
            continue;
        }
        if candidate.x <= x || dx >= params.max_horizontal_distance as i64 {
            continue;
        }

        let distance = dx + dy * params.vertical_weight as i64;
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Builds the ticker-rate map from records and their rate candidates.
///
/// Records are visited in input order. The first occurrence of a ticker that
/// finds a candidate populates its entry; later occurrences never overwrite it.
pub fn associate(
    records: &[PositionedTextRecord],
    candidates: &[NumberUnitCandidate],
    matcher: &TickerMatcher,
    params: &AssociationParams,
) -> TickerRateMap {
    let mut detected = TickerRateMap::new();

    for record in records {
        let text = record.text.trim();
        if text.is_empty() {
            continue;
        }

        let Some(ticker) = matcher.resolve(&text.to_uppercase()) else {
            continue;
        };
        if detected.contains_key(ticker) {
            continue;
        }

        let Some(candidate) = nearest_candidate(record.left, record.top, candidates, params) else {
            debug!("No rate found to the right of {} at ({}, {})", ticker, record.left, record.top);
            continue;
        };
        let Ok(rate) = candidate.value.parse::<f64>() else {
            continue;
        };

        debug!(
            "{} -> {} {} (label at {}, {})",
            ticker, rate, candidate.unit, record.left, record.top
        );
        detected.insert(
            ticker.to_string(),
            TickerRateEntry {
                rate,
                unit: candidate.unit.clone(),
                ticker_x: record.left,
                ticker_y: record.top,
                ticker_height: record.height,
            },
        );
    }

    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::HashUnit;

    fn candidate(value: &str, x: i32, y: i32) -> NumberUnitCandidate {
        NumberUnitCandidate {
            value: value.to_string(),
            unit: RateUnit::Known(HashUnit::Ehs),
            x,
            y,
            width: 60,
            height: 12,
        }
    }

    fn record(text: &str, left: i32, top: i32) -> PositionedTextRecord {
        PositionedTextRecord {
            text: text.to_string(),
            left,
            top,
            width: 30,
            height: 14,
            confidence: 95.0,
        }
    }

    #[test]
    fn test_nearer_candidate_wins() {
        let params = AssociationParams::default();
        let candidates = vec![candidate("20", 900, 50), candidate("10", 120, 55)];
        let best = nearest_candidate(100, 50, &candidates, &params).unwrap();
        assert_eq!(best.value, "10");
    }

    #[test]
    fn test_far_apart_extremes_do_not_overflow() {
        let params = AssociationParams::default();
        let candidates = vec![candidate("10", i32::MAX, i32::MAX)];
        assert!(nearest_candidate(i32::MIN, i32::MIN, &candidates, &params).is_none());

        let candidates = vec![candidate("10", i32::MAX, i32::MIN + 5)];
        let best = nearest_candidate(i32::MAX - 100, i32::MIN, &candidates, &params).unwrap();
        assert_eq!(best.value, "10");
    }

    #[test]
    fn test_candidate_left_of_ticker_ignored() {
        let params = AssociationParams::default();
        let candidates = vec![candidate("1", 400, 50)];
        assert!(nearest_candidate(500, 50, &candidates, &params).is_none());
        // Same column is not "to the right" either
        let candidates = vec![candidate("1", 500, 50)];
        assert!(nearest_candidate(500, 50, &candidates, &params).is_none());
    }

    #[test]
    fn test_tolerances() {
        let params = AssociationParams::default();
        // Too far below
        assert!(nearest_candidate(100, 50, &[candidate("1", 150, 101)], &params).is_none());
        // Exactly at the vertical tolerance is fine
        assert!(nearest_candidate(100, 50, &[candidate("1", 150, 100)], &params).is_some());
        // Horizontal radius is exclusive
        assert!(nearest_candidate(100, 50, &[candidate("1", 1000, 50)], &params).is_none());
        assert!(nearest_candidate(100, 50, &[candidate("1", 999, 50)], &params).is_some());
    }

    #[test]
    fn test_vertical_offset_weighs_more() {
        let params = AssociationParams::default();
        // 200 px right on the same row beats 20 px right but 40 px lower (20 + 200)
        let candidates = vec![candidate("low", 120, 90), candidate("row", 300, 50)];
        let best = nearest_candidate(100, 50, &candidates, &params).unwrap();
        assert_eq!(best.value, "row");
    }

    #[test]
    fn test_equal_distance_keeps_first() {
        let params = AssociationParams::default();
        let candidates = vec![candidate("first", 150, 50), candidate("second", 150, 50)];
        let best = nearest_candidate(100, 50, &candidates, &params).unwrap();
        assert_eq!(best.value, "first");
    }

    #[test]
    fn test_first_ticker_occurrence_wins() {
        let matcher = TickerMatcher::standard();
        let params = AssociationParams::default();
        let records = vec![record("BTC", 100, 50), record("BTC", 100, 300)];
        let candidates = vec![candidate("1.5", 200, 50), candidate("9.9", 200, 300)];

        let map = associate(&records, &candidates, &matcher, &params);
        assert_eq!(map.len(), 1);
        assert_eq!(map["BTC"].rate, 1.5);
        assert_eq!(map["BTC"].ticker_y, 50);
    }

    #[test]
    fn test_occurrence_without_candidate_does_not_block_later_one() {
        let matcher = TickerMatcher::standard();
        let params = AssociationParams::default();
        // First BTC label has nothing to its right
        let records = vec![record("BTC", 900, 50), record("btcc", 100, 300)];
        let candidates = vec![candidate("9.9", 200, 300)];

        let map = associate(&records, &candidates, &matcher, &params);
        assert_eq!(map["BTC"].rate, 9.9);
        assert_eq!(map["BTC"].ticker_height, 14);
    }

    #[test]
    fn test_multiple_tickers() {
        let matcher = TickerMatcher::standard();
        let params = AssociationParams::default();
        let records = vec![
            record("RLT", 40, 100),
            record("ETH", 40, 160),
            record("Network power", 300, 20),
        ];
        let candidates = vec![candidate("485.544", 300, 102), candidate("252.110", 300, 161)];

        let map = associate(&records, &candidates, &matcher, &params);
        assert_eq!(map.len(), 2);
        assert_eq!(map["RLT"].rate, 485.544);
        assert_eq!(map["ETH"].rate, 252.11);
        assert!((map["ETH"].rate_in_base() - 252.11e9).abs() < 1.0);
    }
}
