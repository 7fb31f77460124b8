//! Persistence of user-entered block duration and reward per ticker.
//!
//! File layout (UTF-8):
//!
//! ```text
//! if you wish, change appropriate values here and it will be adjusted in the calculator too
//! ----------------------------------------------------------------------------------------
//! BTC - block duration: 10 Min 4 Sec
//!       block reward: 0.00011
//!
//! ETH - block duration: --
//!       block reward: 0.005
//!
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const CONFIG_DIR_NAME: &str = "Calconfig";
const SAVE_FILE_NAME: &str = "Save file for Block Reward and Duration.txt";

const HEADER_TEXT: &str = "if you wish, change appropriate values here and it will be adjusted in the calculator too\n\
--------------------------------------------------------------------------------------\n";

/// Written in place of a missing duration.
const UNSET_MARKER: &str = "--";

static DURATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-zA-Z]+)\s+-\s+block duration:\s*(.*)").expect("duration line pattern is valid")
});

static REWARD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s{6}block reward:\s*(.*)").expect("reward line pattern is valid")
});

/// User overrides for one ticker. `None` means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockData {
    pub duration: Option<String>,
    pub reward: Option<String>,
}

impl BlockData {
    pub fn is_empty(&self) -> bool {
        self.duration.is_none() && self.reward.is_none()
    }
}

pub type BlockDataMap = BTreeMap<String, BlockData>;

/// Treats blank and `"--"` as unset.
fn meaningful(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == UNSET_MARKER {
        None
    } else {
        Some(value.to_string())
    }
}

/// Reads and writes the block data save file under `<base_dir>/Calconfig/`.
#[derive(Debug, Clone)]
pub struct BlockDataStore {
    config_dir: PathBuf,
    save_file: PathBuf,
}

impl BlockDataStore {
    pub fn new(base_dir: &Path) -> Self {
        let config_dir = base_dir.join(CONFIG_DIR_NAME);
        let save_file = config_dir.join(SAVE_FILE_NAME);
        Self {
            config_dir,
            save_file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.save_file
    }

    /// Loads saved data. A missing or unreadable file gives an empty map;
    /// lines that fit neither record form are skipped.
    pub fn load(&self) -> BlockDataMap {
        if !self.save_file.exists() {
            debug!("No block data at {}", self.save_file.display());
            return BlockDataMap::new();
        }

        match fs::read_to_string(&self.save_file) {
            Ok(contents) => {
                let data = parse_block_data(&contents);
                info!("Loaded block data for {} tickers", data.len());
                data
            }
            Err(e) => {
                warn!("Failed to read {}: {}", self.save_file.display(), e);
                BlockDataMap::new()
            }
        }
    }

    /// Writes `data`, tickers sorted. Failures are logged and the save is
    /// skipped.
    pub fn save(&self, data: &BlockDataMap) -> bool {
        match self.try_save(data) {
            Ok(()) => {
                info!("Saved block data to {}", self.save_file.display());
                true
            }
            Err(e) => {
                warn!("Block data not saved: {:#}", e);
                false
            }
        }
    }

    fn try_save(&self, data: &BlockDataMap) -> Result<()> {
        fs::create_dir_all(&self.config_dir)
            .with_context(|| format!("Failed to create {}", self.config_dir.display()))?;
        fs::write(&self.save_file, format_block_data(data))
            .with_context(|| format!("Failed to write {}", self.save_file.display()))?;
        Ok(())
    }
}

/// Parses the save file body.
pub fn parse_block_data(contents: &str) -> BlockDataMap {
    let mut data = BlockDataMap::new();
    let mut current: Option<String> = None;

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("if you wish,") || trimmed.starts_with("----") {
            continue;
        }

        if let Some(caps) = DURATION_LINE.captures(line) {
            let ticker = caps[1].to_uppercase();
            let entry = data.entry(ticker.clone()).or_insert_with(BlockData::default);
            entry.duration = meaningful(&caps[2]);
            current = Some(ticker);
            continue;
        }

        if let Some(caps) = REWARD_LINE.captures(line) {
            if let Some(ticker) = &current {
                let entry = data.entry(ticker.clone()).or_insert_with(BlockData::default);
                entry.reward = meaningful(&caps[1]);
                continue;
            }
        }

        debug!("Skipping block data line: {}", line);
    }

    data.retain(|_, entry| !entry.is_empty());
    data
}

/// Renders the save file body.
pub fn format_block_data(data: &BlockDataMap) -> String {
    let mut out = String::from(HEADER_TEXT);

    for (ticker, entry) in data {
        if entry.is_empty() {
            continue;
        }
        let duration = entry.duration.as_deref().unwrap_or(UNSET_MARKER);
        let _ = writeln!(out, "{} - block duration: {}", ticker, duration);
        if let Some(reward) = &entry.reward {
            let _ = writeln!(out, "      block reward: {}", reward);
        }
        out.push('\n');
    }

    out
}

/// Applies a user edit. `None` leaves a field alone; blank or `"--"` clears
/// it. A ticker left with no values is removed.
pub fn set_override(data: &mut BlockDataMap, ticker: &str, duration: Option<&str>, reward: Option<&str>) {
    let ticker = ticker.trim().to_uppercase();
    let entry = data.entry(ticker.clone()).or_default();

    if let Some(duration) = duration {
        entry.duration = meaningful(duration);
    }
    if let Some(reward) = reward {
        entry.reward = meaningful(reward);
    }

    if entry.is_empty() {
        data.remove(&ticker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(duration: Option<&str>, reward: Option<&str>) -> BlockData {
        BlockData {
            duration: duration.map(str::to_string),
            reward: reward.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(BlockDataStore::new(dir.path()).load().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = BlockDataStore::new(dir.path());

        let mut data = BlockDataMap::new();
        data.insert("ETH".to_string(), entry(None, Some("0.005")));
        data.insert("BTC".to_string(), entry(Some("10 Min 4 Sec"), Some("0.00011")));
        data.insert("SOL".to_string(), entry(Some("5m 0s"), None));

        assert!(store.save(&data));
        assert!(store.path().ends_with("Calconfig/Save file for Block Reward and Duration.txt"));
        assert_eq!(store.load(), data);
    }

    #[test]
    fn test_written_layout() {
        let mut data = BlockDataMap::new();
        data.insert("ETH".to_string(), entry(None, Some("0.005")));
        data.insert("BTC".to_string(), entry(Some("10 Min 4 Sec"), None));
        data.insert("LTC".to_string(), BlockData::default());

        let text = format_block_data(&data);
        let body: Vec<&str> = text.lines().skip(2).collect();
        assert_eq!(
            body,
            vec![
                "BTC - block duration: 10 Min 4 Sec",
                "",
                "ETH - block duration: --",
                "      block reward: 0.005",
                "",
            ]
        );
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let text = "garbage line\n\
                    btc - block duration: 9m 2s\n\
                    \x20  block reward: 12\n\
                    \x20     block reward: 0.5\n\
                    \x20     block reward: 0.75\n";
        let data = parse_block_data(text);
        assert_eq!(data["BTC"].duration.as_deref(), Some("9m 2s"));
        // Only the six-space form counts; the last one wins
        assert_eq!(data["BTC"].reward.as_deref(), Some("0.75"));
    }

    #[test]
    fn test_reward_before_any_ticker_ignored() {
        let data = parse_block_data("      block reward: 3\n");
        assert!(data.is_empty());
    }

    #[test]
    fn test_set_override() {
        let mut data = BlockDataMap::new();
        set_override(&mut data, "btc", Some("10m 4s"), None);
        set_override(&mut data, "BTC", None, Some("0.1"));
        assert_eq!(data["BTC"], entry(Some("10m 4s"), Some("0.1")));

        set_override(&mut data, "BTC", Some("--"), None);
        assert_eq!(data["BTC"], entry(None, Some("0.1")));

        set_override(&mut data, "BTC", None, Some(" "));
        assert!(!data.contains_key("BTC"));
    }

    #[test]
    fn test_unwritable_dir_skips_save() {
        let dir = tempdir().unwrap();
        // A file where the Calconfig directory should go
        fs::write(dir.path().join(CONFIG_DIR_NAME), b"").unwrap();
        let store = BlockDataStore::new(dir.path());
        assert!(!store.save(&BlockDataMap::new()));
    }
}
