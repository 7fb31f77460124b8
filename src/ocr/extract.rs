use regex::Regex;
use std::sync::LazyLock;

use super::records::PositionedTextRecord;
use crate::units::RateUnit;

/// Pattern for a rate literal and its optional unit word:
/// - digits with optional thousands separators: 1,807
/// - optional decimal part: 1,807.5
/// - optional whitespace and a unit-like word: 1,807.5 Eh/s
const NUMBER_UNIT_PATTERN: &str = r"(\d[\d,]*\.?\d*)\s*([a-zA-Z/]+)?";

static NUMBER_UNIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER_UNIT_PATTERN).expect("number/unit pattern is valid"));

/// First numeric run found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberUnit {
    /// Numeric literal with thousands separators removed
    pub value: String,
    /// Unit word exactly as it appeared, if any
    pub unit: Option<String>,
}

impl NumberUnit {
    /// Strict unit policy: missing means Gh/s, unknown stays unrecognized.
    pub fn rate_unit(&self) -> RateUnit {
        RateUnit::from_token(self.unit.as_deref())
    }

    pub fn parsed_value(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

/// A rate candidate located on the image.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberUnitCandidate {
    pub value: String,
    pub unit: RateUnit,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Scans `text` for its leftmost numeric literal and trailing unit word.
///
/// Only the first numeric run counts. Returns `None` when the text has no
/// digits at all.
pub fn extract_number_unit(text: &str) -> Option<NumberUnit> {
    let caps = NUMBER_UNIT_REGEX.captures(text)?;
    Some(NumberUnit {
        value: caps[1].replace(',', ""),
        unit: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

/// Builds one candidate per record that carries a numeric literal.
pub fn extract_candidates(records: &[PositionedTextRecord]) -> Vec<NumberUnitCandidate> {
    records
        .iter()
        .filter_map(|record| {
            let found = extract_number_unit(record.text.trim())?;
            // The literal always starts with a digit, but "1." style values
            // still need to survive the float parse later on
            found.parsed_value()?;
            Some(NumberUnitCandidate {
                unit: found.rate_unit(),
                value: found.value,
                x: record.left,
                y: record.top,
                width: record.width,
                height: record.height,
            })
        })
        .collect()
}
