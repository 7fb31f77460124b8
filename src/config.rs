//! Application configuration.
//!
//! Loads settings from config.json at startup. Provides the ticker list,
//! association tolerances, preprocessing and Tesseract options, and price
//! lookup settings. Every field has a default, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// The tickers the game currently mines, in matching priority order.
pub const DEFAULT_TICKERS: [&str; 11] = [
    "RLT", "RST", "XRP", "TRX", "DOGE", "BTC", "ETH", "BNB", "POL", "SOL", "LTC",
];

/// Geometry limits for pairing a ticker label with its rate text.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationParams {
    /// Maximum |Δy| in pixels between ticker and rate
    pub vertical_tolerance: i32,
    /// Rate must start less than this many pixels right of the ticker
    pub max_horizontal_distance: i32,
    /// Weight of |Δy| in the distance metric
    pub vertical_weight: i32,
}

impl Default for AssociationParams {
    fn default() -> Self {
        Self {
            vertical_tolerance: 50,
            max_horizontal_distance: 900,
            vertical_weight: 5,
        }
    }
}

/// Image cleanup applied before detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub enabled: bool,
    /// Contrast adjustment in percent (see `image::imageops::contrast`).
    /// The stretch factor is `((100 + contrast) / 100)^2`, so 22.5 gives 1.5x.
    pub contrast: f32,
    /// Narrower images are upscaled to this width
    pub min_width: u32,
    /// Median filter radius (1 = 3x3)
    pub median_radius: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contrast: 22.5,
            min_width: 1000,
            median_radius: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Explicit path to the tesseract executable
    pub executable: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata: Option<PathBuf>,
    pub language: String,
    /// Page segmentation mode; 11 = sparse text, suits game dashboards
    pub psm: u32,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            executable: None,
            tessdata: None,
            language: "eng".to_string(),
            psm: 11,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Ticker -> exchange base symbol. Tickers missing here are not fetched.
    pub symbols: BTreeMap<String, String>,
    /// Prices used when the exchange has no listing
    pub fallback_prices: BTreeMap<String, f64>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        let symbols = [
            ("BTC", "BTC"),
            ("LTC", "LTC"),
            ("BNB", "BNB"),
            ("POL", "POLYX"),
            ("XRP", "XRP"),
            ("DOGE", "DOGE"),
            ("ETH", "ETH"),
            ("TRX", "TRX"),
            ("SOL", "SOL"),
        ]
        .into_iter()
        .map(|(t, s)| (t.to_string(), s.to_string()))
        .collect();
        let fallback_prices = [("RLT", 0.5), ("RST", 0.0001)]
            .into_iter()
            .map(|(t, p)| (t.to_string(), p))
            .collect();
        Self {
            endpoint: "https://api.binance.com/api/v3/ticker/price".to_string(),
            timeout_secs: 5,
            symbols,
            fallback_prices,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub known_tickers: Vec<String>,
    pub association: AssociationParams,
    pub preprocess: PreprocessConfig,
    pub tesseract: TesseractConfig,
    pub prices: PriceConfig,
    /// Directory holding `Calconfig/`; defaults to the executable directory
    pub save_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            known_tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            association: AssociationParams::default(),
            preprocess: PreprocessConfig::default(),
            tesseract: TesseractConfig::default(),
            prices: PriceConfig::default(),
            save_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`, or returns defaults if it is missing
    /// or unreadable.
    pub fn load(path: &Path) -> Self {
        info!("Looking for config at: {}", path.display());

        if !path.exists() {
            info!("{} not found. Using default config.", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_dir(&self) -> PathBuf {
        self.save_dir
            .clone()
            .unwrap_or_else(|| crate::paths::get_exe_dir().clone())
    }
}

/// Initializes the global configuration from config.json next to the
/// executable. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(AppConfig::load(&crate::paths::get_config_path()));
}

/// Returns the global configuration, falling back to defaults if
/// `init_config` was never called.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
