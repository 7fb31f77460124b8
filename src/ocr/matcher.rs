//! Typo-tolerant ticker recognition.
//!
//! Resolution runs in a fixed order and stops at the first hit:
//! 1. exact membership in the known set
//! 2. the curated misspelling table
//! 3. fuzzy strategies, tried per known ticker in set order
//!
//! The fuzzy stage takes the first acceptable ticker, not the closest one.
//! That keeps false positives between look-alike tickers bounded, so do not
//! turn it into a best-match search.

use std::collections::HashMap;

use tracing::debug;

use crate::config::DEFAULT_TICKERS;
use crate::error::AnalysisError;

/// Misspellings seen in real OCR output of the game's dashboards.
const DEFAULT_CORRECTIONS: &[(&str, &str)] = &[
    ("RRIUT", "RLT"),
    ("RRU", "RLT"),
    ("R.RU", "RLT"),
    ("RLJ", "RLT"),
    ("RLY", "RLT"),
    ("RSTT", "RST"),
    ("RSTU", "RST"),
    ("TRXY", "TRX"),
    ("YTRX", "TRX"),
    ("TX", "TRX"),
    ("LIC", "LTC"),
    ("LTCC", "LTC"),
    ("GC", "DOGE"),
    ("DOGE.", "DOGE"),
    ("CC", "BTC"),
    ("BTCC", "BTC"),
    ("EH", "ETH"),
    ("ETTH", "ETH"),
    ("BNBV", "BNB"),
    ("BNN", "BNB"),
    ("SOLL", "SOL"),
    ("5OL", "SOL"),
    ("POOL", "POL"),
    ("PQOL", "POL"),
    ("MATIC", "POL"),
];

/// A fuzzy rule: `(candidate, known_ticker) -> accepted?`
pub type FuzzyPredicate = fn(&str, &str) -> bool;

/// Fuzzy strategies in priority order.
pub const FUZZY_STRATEGIES: &[(&str, FuzzyPredicate)] = &[
    ("hamming", within_one_substitution),
    ("contains", contains_known),
    ("prefix", shares_prefix),
    ("suffix", ends_with_known),
];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn length_gap(a: &str, b: &str) -> usize {
    char_len(a).abs_diff(char_len(b))
}

/// Same length and at most one differing position.
pub fn within_one_substitution(candidate: &str, known: &str) -> bool {
    if char_len(candidate) != char_len(known) {
        return false;
    }
    candidate
        .chars()
        .zip(known.chars())
        .filter(|(a, b)| a != b)
        .count()
        <= 1
}

/// Known ticker appears inside the candidate with at most two extra chars.
pub fn contains_known(candidate: &str, known: &str) -> bool {
    candidate.contains(known) && length_gap(candidate, known) <= 2
}

/// One is a prefix of the other and they differ by at most one char.
pub fn shares_prefix(candidate: &str, known: &str) -> bool {
    (candidate.starts_with(known) || known.starts_with(candidate))
        && length_gap(candidate, known) <= 1
}

/// Candidate ends with the known ticker plus at most one leading char.
pub fn ends_with_known(candidate: &str, known: &str) -> bool {
    candidate.ends_with(known) && length_gap(candidate, known) <= 1
}

/// Resolves noisy tokens to canonical ticker symbols.
#[derive(Debug, Clone)]
pub struct TickerMatcher {
    known: Vec<String>,
    corrections: HashMap<String, String>,
}

impl TickerMatcher {
    /// Matcher over an arbitrary ticker set with no curated corrections.
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            corrections: HashMap::new(),
        }
    }

    /// Adds curated `misspelling -> ticker` corrections. Entries whose
    /// target is outside the known set are dropped.
    pub fn with_corrections<'a, I>(mut self, corrections: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (from, to) in corrections {
            if self.known.iter().any(|k| k == to) {
                self.corrections.insert(from.to_string(), to.to_string());
            }
        }
        self
    }

    /// The game's ticker set with the built-in correction table.
    pub fn standard() -> Self {
        Self::new(DEFAULT_TICKERS).with_corrections(DEFAULT_CORRECTIONS.iter().copied())
    }

    /// Known ticker set with the built-in correction table.
    pub fn for_tickers(known: &[String]) -> Self {
        Self::new(known.iter().cloned()).with_corrections(DEFAULT_CORRECTIONS.iter().copied())
    }

    /// Resolves an uppercased token to a canonical ticker, or `None`.
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        if let Some(exact) = self.known.iter().find(|k| k.as_str() == candidate) {
            return Some(exact.as_str());
        }

        if let Some(corrected) = self.corrections.get(candidate) {
            return Some(corrected.as_str());
        }

        for known in &self.known {
            for (name, accepts) in FUZZY_STRATEGIES {
                if accepts(candidate, known.as_str()) {
                    debug!("'{}' -> {} via {} rule", candidate, known, name);
                    return Some(known.as_str());
                }
            }
        }

        debug!("{}", AnalysisError::NoMatch(candidate.to_string()));
        None
    }
}

impl Default for TickerMatcher {
    fn default() -> Self {
        Self::standard()
    }
}
