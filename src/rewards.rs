//! Reward arithmetic: share of network power times block reward, scaled to
//! longer periods.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::units::power_to_base;

/// Placeholder for an unset duration or reward.
pub const UNSET: &str = "00";

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const DAYS_PER_WEEK: f64 = 7.0;
pub const DAYS_PER_MONTH: f64 = 30.44;
pub const DAYS_PER_YEAR: f64 = 365.25;

static MIN_SEC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(m|min(?:ute)?s?)\s*(\d+)\s*(s|sec(?:ond)?s?)")
        .expect("duration pattern is valid")
});

static BARE_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)").expect("number pattern is valid"));

/// Parses a block duration into seconds.
///
/// Accepts `"10 Min 4 Sec"`, `"10m 4s"` or a bare number of seconds.
/// `"00"` is the unset placeholder and gives exactly 0.
pub fn parse_duration(text: &str) -> f64 {
    let text = text.trim();
    if text == UNSET {
        return 0.0;
    }

    if let Some(caps) = MIN_SEC_REGEX.captures(text) {
        let minutes: f64 = caps[1].parse().unwrap_or(0.0);
        let seconds: f64 = caps[3].parse().unwrap_or(0.0);
        return minutes * 60.0 + seconds;
    }

    if let Some(caps) = BARE_NUMBER_REGEX.captures(text) {
        if let Ok(seconds) = caps[1].parse::<f64>() {
            warn!("Ambiguous duration '{}', assuming {} seconds", text, seconds);
            return seconds;
        }
    }

    warn!("{}", AnalysisError::ParseFailure(text.to_string()));
    0.0
}

/// Maps blank and `"--"` inputs to the unset placeholder.
pub fn or_unset(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() || text == "--" {
        UNSET
    } else {
        text
    }
}

/// Expected coins per block for the user's share of the network.
///
/// A zero network rate gives 0.0. Unparseable power or reward also count as 0.
pub fn calculate_reward_per_block(
    user_power: &str,
    user_unit: &str,
    block_reward: &str,
    network_rate: &str,
    network_unit: &str,
) -> f64 {
    let user_ghs = power_to_base(user_power, user_unit);
    let network_ghs = power_to_base(network_rate, network_unit);

    let reward = match block_reward.trim().parse::<f64>() {
        Ok(r) => r,
        Err(_) => {
            warn!("{}", AnalysisError::ParseFailure(block_reward.to_string()));
            0.0
        }
    };

    if network_ghs == 0.0 {
        debug!("Network rate is zero, reward per block is 0");
        return 0.0;
    }

    user_ghs / network_ghs * reward
}

/// Blocks the network mines per day; 0 when the duration is unset.
pub fn blocks_per_day(duration: &str) -> f64 {
    let seconds = parse_duration(duration);
    if seconds > 0.0 {
        SECONDS_PER_DAY / seconds
    } else {
        0.0
    }
}

/// Expected rewards over each reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RewardBreakdown {
    pub per_block: f64,
    pub per_day: f64,
    pub per_week: f64,
    pub per_month: f64,
    pub per_year: f64,
}

impl RewardBreakdown {
    pub fn from_block_reward(per_block: f64, blocks_per_day: f64) -> Self {
        let per_day = per_block * blocks_per_day;
        Self {
            per_block,
            per_day,
            per_week: per_day * DAYS_PER_WEEK,
            per_month: per_day * DAYS_PER_MONTH,
            per_year: per_day * DAYS_PER_YEAR,
        }
    }

    /// Full calculation from the raw text fields. Blank or `"--"` duration and
    /// reward count as unset.
    pub fn compute(
        user_power: &str,
        user_unit: &str,
        block_reward: &str,
        duration: &str,
        network_rate: &str,
        network_unit: &str,
    ) -> Self {
        let per_block = calculate_reward_per_block(
            user_power,
            user_unit,
            or_unset(block_reward),
            network_rate,
            network_unit,
        );
        Self::from_block_reward(per_block, blocks_per_day(or_unset(duration)))
    }

    /// Every period multiplied by a price.
    pub fn converted(&self, rate: f64) -> Self {
        Self {
            per_block: self.per_block * rate,
            per_day: self.per_day * rate,
            per_week: self.per_week * rate,
            per_month: self.per_month * rate,
            per_year: self.per_year * rate,
        }
    }
}

/// Eight decimals with trailing zeros trimmed; `"00"` for zero.
pub fn format_reward(value: f64) -> String {
    if value.abs() < 1e-9 {
        return UNSET.to_string();
    }
    let formatted = format!("{:.8}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        UNSET.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration("10 Min 4 Sec"), 604.0);
        assert_eq!(parse_duration("10m 4s"), 604.0);
        assert_eq!(parse_duration("40 minutes 5 seconds"), 2405.0);
        assert_eq!(parse_duration("00"), 0.0);
        assert_eq!(parse_duration("90"), 90.0);
        assert_eq!(parse_duration("12.5 sec"), 12.5);
        assert_eq!(parse_duration("soon"), 0.0);
    }

    #[test]
    fn test_zero_network_guard() {
        assert_eq!(calculate_reward_per_block("1", "Gh/s", "10", "0", "Gh/s"), 0.0);
    }

    #[test]
    fn test_reward_share() {
        // 1 Eh/s of a 10 Eh/s network with 50 coins per block
        let r = calculate_reward_per_block("1", "Eh/s", "50", "10", "Eh/s");
        assert!((r - 5.0).abs() < 1e-12);
        // Units differ but convert to the same base
        let r = calculate_reward_per_block("1000", "Ph/s", "50", "10", "Eh/s");
        assert!((r - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_inputs_degrade() {
        assert_eq!(calculate_reward_per_block("1", "Eh/s", "lots", "10", "Eh/s"), 0.0);
        assert_eq!(calculate_reward_per_block("abc", "Eh/s", "50", "10", "Eh/s"), 0.0);
        // Unknown network unit is a zero network
        assert_eq!(calculate_reward_per_block("1", "Eh/s", "50", "10", "blocks"), 0.0);
    }

    #[test]
    fn test_blocks_per_day() {
        assert_eq!(blocks_per_day("10 Min 0 Sec"), 144.0);
        assert_eq!(blocks_per_day("00"), 0.0);
    }

    #[test]
    fn test_breakdown_periods() {
        let b = RewardBreakdown::compute("1", "Eh/s", "50", "10m 0s", "10", "Eh/s");
        assert!((b.per_block - 5.0).abs() < 1e-9);
        assert!((b.per_day - 720.0).abs() < 1e-9);
        assert!((b.per_week - 5040.0).abs() < 1e-9);
        assert!((b.per_month - 720.0 * 30.44).abs() < 1e-6);
        assert!((b.per_year - 720.0 * 365.25).abs() < 1e-6);

        let usd = b.converted(2.0);
        assert!((usd.per_day - 1440.0).abs() < 1e-9);
    }

    #[test]
    fn test_unset_fields_give_zero() {
        let b = RewardBreakdown::compute("1", "Eh/s", "--", "10m 0s", "10", "Eh/s");
        assert_eq!(b, RewardBreakdown::default());
        let b = RewardBreakdown::compute("1", "Eh/s", "50", "", "10", "Eh/s");
        assert_eq!(b.per_day, 0.0);
        assert!(b.per_block > 0.0);
    }

    #[test]
    fn test_format_reward() {
        assert_eq!(format_reward(0.0), "00");
        assert_eq!(format_reward(1e-12), "00");
        assert_eq!(format_reward(5.0), "5");
        assert_eq!(format_reward(0.125), "0.125");
        assert_eq!(format_reward(1.0 / 3.0), "0.33333333");
    }
}
