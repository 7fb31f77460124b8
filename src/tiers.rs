//! League tiers: power brackets and the tickers each one unlocks.
//!
//! The table is static and read-only after first use.

use std::sync::LazyLock;

use crate::units::{power_to_base, HashUnit};

/// Boundary slack for floating point comparisons.
const TIER_EPSILON: f64 = 1e-9;

/// A named rank with an inclusive-lower / exclusive-upper power range in Gh/s.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub name: &'static str,
    pub min_ghs: f64,
    pub max_ghs: f64,
    pub tickers: &'static [&'static str],
}

impl Tier {
    /// Returns true if this tier shows rewards for the ticker.
    pub fn unlocks(&self, ticker: &str) -> bool {
        self.tickers.contains(&ticker)
    }

    fn contains(&self, power_ghs: f64) -> bool {
        self.min_ghs - TIER_EPSILON <= power_ghs && power_ghs < self.max_ghs - TIER_EPSILON
    }
}

const BRONZE_I: &[&str] = &["RLT", "RST", "BTC", "LTC"];
const BRONZE_II: &[&str] = &["RLT", "RST", "BTC", "LTC", "BNB"];
const BRONZE_III: &[&str] = &["RLT", "RST", "BTC", "LTC", "BNB", "POL"];
const SILVER_I: &[&str] = &["RLT", "RST", "BTC", "LTC", "BNB", "POL", "XRP"];
const SILVER_II: &[&str] = &["RLT", "RST", "BTC", "LTC", "BNB", "POL", "XRP", "DOGE"];
const SILVER_III: &[&str] = &[
    "RLT", "RST", "BTC", "LTC", "BNB", "POL", "XRP", "DOGE", "ETH",
];
const GOLD_I: &[&str] = &[
    "RLT", "RST", "BTC", "LTC", "BNB", "POL", "XRP", "DOGE", "ETH", "TRX",
];
const FULL_SET: &[&str] = &[
    "RLT", "RST", "BTC", "LTC", "BNB", "POL", "XRP", "DOGE", "ETH", "TRX", "SOL",
];
// Diamond leagues no longer mine RLT
const DIAMOND: &[&str] = &[
    "RST", "BTC", "LTC", "BNB", "POL", "XRP", "DOGE", "ETH", "TRX", "SOL",
];

static TIERS: LazyLock<Vec<Tier>> = LazyLock::new(|| {
    let ph = HashUnit::Phs.multiplier();
    let eh = HashUnit::Ehs.multiplier();
    let zh = HashUnit::Zhs.multiplier();
    let tier = |name, min_ghs, max_ghs, tickers| Tier {
        name,
        min_ghs,
        max_ghs,
        tickers,
    };
    vec![
        tier("Bronze I", 0.0, 5.0 * ph, BRONZE_I),
        tier("Bronze II", 5.0 * ph, 30.0 * ph, BRONZE_II),
        tier("Bronze III", 30.0 * ph, 100.0 * ph, BRONZE_III),
        tier("Silver I", 100.0 * ph, 200.0 * ph, SILVER_I),
        tier("Silver II", 200.0 * ph, 500.0 * ph, SILVER_II),
        tier("Silver III", 500.0 * ph, 1.0 * eh, SILVER_III),
        tier("Gold I", 1.0 * eh, 2.0 * eh, GOLD_I),
        tier("Gold II", 2.0 * eh, 5.0 * eh, FULL_SET),
        tier("Gold III", 5.0 * eh, 15.0 * eh, FULL_SET),
        tier("Platinum I", 15.0 * eh, 50.0 * eh, FULL_SET),
        tier("Platinum II", 50.0 * eh, 100.0 * eh, FULL_SET),
        tier("Platinum III", 100.0 * eh, 200.0 * eh, FULL_SET),
        tier("Diamond I", 200.0 * eh, 400.0 * eh, DIAMOND),
        tier("Diamond II", 400.0 * eh, 10.0 * zh, DIAMOND),
        tier("Diamond III", 10.0 * zh, f64::INFINITY, DIAMOND),
    ]
});

/// All tiers, lowest first.
pub fn all_tiers() -> &'static [Tier] {
    &TIERS
}

/// Looks up a tier by its display name.
pub fn tier_by_name(name: &str) -> Option<&'static Tier> {
    TIERS.iter().find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}

/// Returns the first tier whose range contains `power_ghs`.
pub fn determine_tier(power_ghs: f64) -> Option<&'static Tier> {
    TIERS.iter().find(|t| t.contains(power_ghs))
}

/// Determines the tier for user-typed power text; `default_unit` applies when
/// the text carries no unit.
///
/// Uses the strict converter, so an unrecognized unit counts as zero power and
/// lands in the lowest tier.
pub fn tier_for_user_power(text: &str, default_unit: &str) -> Option<&'static Tier> {
    determine_tier(power_to_base(text, default_unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(determine_tier(0.0).unwrap().name, "Bronze I");
        assert_eq!(determine_tier(4.9e6).unwrap().name, "Bronze I");
        // Lower bound is inclusive
        assert_eq!(determine_tier(5e6).unwrap().name, "Bronze II");
        assert_eq!(determine_tier(1.5e9).unwrap().name, "Gold I");
        assert_eq!(determine_tier(1e16).unwrap().name, "Diamond III");
        assert!(determine_tier(-1.0).is_none());
    }

    #[test]
    fn test_tiers_are_contiguous() {
        for pair in all_tiers().windows(2) {
            assert_eq!(pair[0].max_ghs, pair[1].min_ghs, "{} -> {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_user_power_text() {
        assert_eq!(tier_for_user_power("1.807 Eh/s", "Gh/s").unwrap().name, "Gold I");
        assert_eq!(tier_for_user_power("150 Ph/s", "Gh/s").unwrap().name, "Silver I");
        assert_eq!(tier_for_user_power("150", "Ph/s").unwrap().name, "Silver I");
        // Unknown unit counts as zero power
        assert_eq!(tier_for_user_power("150 Qh/s", "Gh/s").unwrap().name, "Bronze I");
    }

    #[test]
    fn test_unlocks() {
        let bronze = tier_by_name("bronze i").unwrap();
        assert!(bronze.unlocks("BTC"));
        assert!(!bronze.unlocks("SOL"));
        let diamond = tier_by_name("Diamond II").unwrap();
        assert!(!diamond.unlocks("RLT"));
        assert!(diamond.unlocks("SOL"));
        assert!(tier_by_name("Mythic").is_none());
    }
}
