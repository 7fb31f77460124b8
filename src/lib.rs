//! Rollercoin reward calculator.
//!
//! Reads network statistics from a dashboard screenshot or pasted text,
//! reconciles them into a ticker → network rate map, and computes expected
//! mining rewards for the user's power.

pub mod block_data;
pub mod config;
pub mod error;
pub mod ocr;
pub mod paste;
pub mod paths;
pub mod prices;
pub mod report;
pub mod rewards;
pub mod tiers;
pub mod units;
pub mod worker;
