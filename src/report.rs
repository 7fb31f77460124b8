//! Per-ticker reward rows for the tickers a tier unlocks.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::block_data::{BlockData, BlockDataMap};
use crate::ocr::TickerRateEntry;
use crate::paste::PastedRate;
use crate::rewards::RewardBreakdown;
use crate::tiers::Tier;

/// Network rate as the reward calculation consumes it: a number and the unit
/// text it came with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkRate {
    pub rate: f64,
    pub unit: String,
}

impl From<&TickerRateEntry> for NetworkRate {
    fn from(entry: &TickerRateEntry) -> Self {
        Self {
            rate: entry.rate,
            unit: entry.unit.to_string(),
        }
    }
}

impl From<&PastedRate> for NetworkRate {
    fn from(pasted: &PastedRate) -> Self {
        Self {
            rate: pasted.rate,
            unit: pasted.unit.to_string(),
        }
    }
}

pub type NetworkRates = BTreeMap<String, NetworkRate>;

/// Combines image rates with pasted ones. Image rates win; pasted rates only
/// fill tickers the image missed and the tier unlocks.
pub fn merge_rates(detected: NetworkRates, pasted: &NetworkRates, tier: &Tier) -> NetworkRates {
    let mut merged = detected;
    for (ticker, rate) in pasted {
        if tier.unlocks(ticker) && !merged.contains_key(ticker) {
            merged.insert(ticker.clone(), rate.clone());
        }
    }
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardRow {
    pub ticker: String,
    pub network: Option<NetworkRate>,
    #[serde(skip)]
    pub block: BlockData,
    pub rewards: RewardBreakdown,
}

/// One row per ticker the tier unlocks, in the tier's order. Tickers with no
/// network rate or block data still get a row, with zero rewards.
pub fn build_rows(
    user_power: &str,
    user_unit: &str,
    tier: &Tier,
    network: &NetworkRates,
    block_data: &BlockDataMap,
) -> Vec<RewardRow> {
    tier.tickers
        .iter()
        .map(|&ticker| {
            let rate = network.get(ticker).cloned();
            let block = block_data.get(ticker).cloned().unwrap_or_default();

            let (rate_text, unit_text) = match &rate {
                Some(r) => (r.rate.to_string(), r.unit.clone()),
                None => ("0".to_string(), "Gh/s".to_string()),
            };
            let rewards = RewardBreakdown::compute(
                user_power,
                user_unit,
                block.reward.as_deref().unwrap_or(""),
                block.duration.as_deref().unwrap_or(""),
                &rate_text,
                &unit_text,
            );

            RewardRow {
                ticker: ticker.to_string(),
                network: rate,
                block,
                rewards,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::tier_by_name;
    use crate::units::{HashUnit, RateUnit};

    fn block(duration: &str, reward: &str) -> BlockData {
        BlockData {
            duration: Some(duration.to_string()),
            reward: Some(reward.to_string()),
        }
    }

    #[test]
    fn test_rows_follow_tier() {
        let tier = tier_by_name("Bronze I").unwrap();
        let rows = build_rows("1", "Eh/s", tier, &NetworkRates::new(), &BlockDataMap::new());
        let tickers: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["RLT", "RST", "BTC", "LTC"]);
        assert!(rows.iter().all(|r| r.rewards == RewardBreakdown::default()));
    }

    #[test]
    fn test_row_rewards() {
        let tier = tier_by_name("Bronze I").unwrap();
        let mut network = NetworkRates::new();
        network.insert(
            "BTC".to_string(),
            NetworkRate {
                rate: 10.0,
                unit: "Eh/s".to_string(),
            },
        );
        let mut blocks = BlockDataMap::new();
        blocks.insert("BTC".to_string(), block("10 Min 0 Sec", "50"));

        let rows = build_rows("1", "Eh/s", tier, &network, &blocks);
        let btc = rows.iter().find(|r| r.ticker == "BTC").unwrap();
        assert!((btc.rewards.per_block - 5.0).abs() < 1e-9);
        assert!((btc.rewards.per_day - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrecognized_image_unit_gives_zero() {
        let entry = TickerRateEntry {
            rate: 10.0,
            unit: RateUnit::Unrecognized("blocks".to_string()),
            ticker_x: 0,
            ticker_y: 0,
            ticker_height: 10,
        };
        let mut network = NetworkRates::new();
        network.insert("BTC".to_string(), NetworkRate::from(&entry));
        let mut blocks = BlockDataMap::new();
        blocks.insert("BTC".to_string(), block("10m 0s", "50"));

        let tier = tier_by_name("Bronze I").unwrap();
        let rows = build_rows("1", "Eh/s", tier, &network, &blocks);
        let btc = rows.iter().find(|r| r.ticker == "BTC").unwrap();
        assert_eq!(btc.rewards.per_block, 0.0);
    }

    fn rate(rate: f64, unit: &str) -> NetworkRate {
        NetworkRate {
            rate,
            unit: unit.to_string(),
        }
    }

    #[test]
    fn test_merge_prefers_detected_rates() {
        let tier = tier_by_name("Bronze II").unwrap();
        let mut detected = NetworkRates::new();
        detected.insert("BTC".to_string(), rate(1.5, "Eh/s"));

        let mut pasted = NetworkRates::new();
        pasted.insert("BTC".to_string(), rate(9.0, "Eh/s"));
        pasted.insert("BNB".to_string(), rate(20.0, "Ph/s"));
        // Not unlocked in Bronze II
        pasted.insert("SOL".to_string(), rate(3.0, "Eh/s"));

        let merged = merge_rates(detected, &pasted, tier);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["BTC"], rate(1.5, "Eh/s"));
        assert_eq!(merged["BNB"], rate(20.0, "Ph/s"));
        assert!(!merged.contains_key("SOL"));
    }

    #[test]
    fn test_merge_without_detection_uses_paste() {
        let tier = tier_by_name("Gold II").unwrap();
        let mut pasted = NetworkRates::new();
        pasted.insert("SOL".to_string(), rate(3.0, "Eh/s"));

        let merged = merge_rates(NetworkRates::new(), &pasted, tier);
        assert_eq!(merged, pasted);
    }

    #[test]
    fn test_pasted_rate_conversion() {
        let pasted = PastedRate {
            rate: 2.5,
            unit: HashUnit::Phs,
        };
        assert_eq!(
            NetworkRate::from(&pasted),
            NetworkRate {
                rate: 2.5,
                unit: "Ph/s".to_string()
            }
        );
    }
}
