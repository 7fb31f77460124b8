//! Hash-rate units and conversion to the common base unit (Gh/s).
//!
//! Two policies meet here and must stay distinct:
//! - no unit token at all means Gh/s
//! - a unit token that is present but unknown makes the magnitude 0.0
//!
//! The second one feeds tier detection, so callers must not paper over it
//! with the default.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::warn;

use crate::error::AnalysisError;

/// Canonical hash-rate units, powers of 1000 apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashUnit {
    #[serde(rename = "Gh/s")]
    Ghs,
    #[serde(rename = "Th/s")]
    Ths,
    #[serde(rename = "Ph/s")]
    Phs,
    #[serde(rename = "Eh/s")]
    Ehs,
    #[serde(rename = "Zh/s")]
    Zhs,
}

impl HashUnit {
    pub const ALL: [HashUnit; 5] = [
        HashUnit::Ghs,
        HashUnit::Ths,
        HashUnit::Phs,
        HashUnit::Ehs,
        HashUnit::Zhs,
    ];

    /// Multiplier to Gh/s.
    pub fn multiplier(self) -> f64 {
        match self {
            HashUnit::Ghs => 1.0,
            HashUnit::Ths => 1e3,
            HashUnit::Phs => 1e6,
            HashUnit::Ehs => 1e9,
            HashUnit::Zhs => 1e12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashUnit::Ghs => "Gh/s",
            HashUnit::Ths => "Th/s",
            HashUnit::Phs => "Ph/s",
            HashUnit::Ehs => "Eh/s",
            HashUnit::Zhs => "Zh/s",
        }
    }

    /// Normalizes a raw unit token, case-insensitively.
    ///
    /// An empty token is Gh/s. Returns `None` for anything outside the table.
    pub fn normalize(token: &str) -> Option<HashUnit> {
        let upper = token.trim().to_uppercase();
        match upper.as_str() {
            "" | "G" | "GH" | "GH/S" | "GHS" => Some(HashUnit::Ghs),
            "T" | "TH" | "TH/S" | "THS" => Some(HashUnit::Ths),
            "P" | "PH" | "PH/S" | "PHS" | "PVS" => Some(HashUnit::Phs),
            "E" | "EH" | "EH/S" | "ES" | "EHS" => Some(HashUnit::Ehs),
            "B" | "Z" | "ZH" | "ZH/S" | "ZHS" => Some(HashUnit::Zhs),
            _ => None,
        }
    }

    pub fn to_base(self, value: f64) -> f64 {
        value * self.multiplier()
    }
}

impl fmt::Display for HashUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit as it came out of text: either one of the canonical units or the
/// raw token that failed to normalize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateUnit {
    Known(HashUnit),
    Unrecognized(String),
}

impl RateUnit {
    /// Builds a unit from an optional detected token.
    ///
    /// `None` (no token in the text) defaults to Gh/s. A present token that does
    /// not normalize is kept as `Unrecognized`.
    pub fn from_token(token: Option<&str>) -> RateUnit {
        match token {
            None => RateUnit::Known(HashUnit::Ghs),
            Some(raw) => match HashUnit::normalize(raw) {
                Some(unit) => RateUnit::Known(unit),
                None => RateUnit::Unrecognized(raw.to_string()),
            },
        }
    }

    /// Converts to Gh/s. An unrecognized unit yields 0.0.
    pub fn to_base(&self, value: f64) -> f64 {
        match self {
            RateUnit::Known(unit) => unit.to_base(value),
            RateUnit::Unrecognized(raw) => {
                warn!(
                    "{}; treating {} as 0 Gh/s",
                    AnalysisError::UnitUnrecognized(raw.clone()),
                    value
                );
                0.0
            }
        }
    }
}

impl fmt::Display for RateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateUnit::Known(unit) => write!(f, "{}", unit),
            RateUnit::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Converts a unit token and numeric value to Gh/s, failing soft to 0.0.
pub fn convert_to_base(value: f64, unit_token: &str) -> f64 {
    match HashUnit::normalize(unit_token) {
        Some(unit) => unit.to_base(value),
        None => RateUnit::Unrecognized(unit_token.to_string()).to_base(value),
    }
}

static POWER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d,]*\.?\d*)\s*([a-zA-Z/]+)?").expect("power pattern is valid")
});

/// Converts user-typed power text (e.g. `"1.807 Eh/s"`) to Gh/s.
///
/// `selected_unit` applies unless the text carries its own unit token, which
/// overrides it. Unrecognized effective units and text without digits give 0.0.
pub fn power_to_base(text: &str, selected_unit: &str) -> f64 {
    let Some(caps) = POWER_PATTERN.captures(text) else {
        return 0.0;
    };
    let digits = caps[1].replace(',', "");
    let Ok(value) = digits.parse::<f64>() else {
        warn!("{}", AnalysisError::ParseFailure(text.to_string()));
        return 0.0;
    };

    let token = caps
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or(selected_unit);
    convert_to_base(value, token)
}
