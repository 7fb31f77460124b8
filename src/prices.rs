//! Coin prices for converting rewards into fiat-like quote currencies.
//!
//! Fetching runs on a background thread. Readers take a copy of the latest
//! snapshot and see an empty map until the first refresh lands.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PriceConfig;

/// Currency rewards can be shown in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuoteCurrency {
    Usdt,
    Eur,
}

impl QuoteCurrency {
    /// Suffix of the exchange pair symbol.
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteCurrency::Usdt => "USDT",
            QuoteCurrency::Eur => "EUR",
        }
    }
}

/// Looks up the price of one exchange symbol.
pub trait PriceSource: Send + Sync {
    fn price(&self, symbol: &str, quote: QuoteCurrency) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Binance public ticker endpoint: `GET <endpoint>?symbol=BTCUSDT`.
pub struct BinanceSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl BinanceSource {
    pub fn new(config: &PriceConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("rollercoin-calculator")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl PriceSource for BinanceSource {
    fn price(&self, symbol: &str, quote: QuoteCurrency) -> Result<f64> {
        let pair = format!("{}{}", symbol, quote.as_str());
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("symbol", pair.as_str())])
            .send()
            .with_context(|| format!("Request for {} failed", pair))?;

        if !response.status().is_success() {
            return Err(anyhow!("{}: HTTP {}", pair, response.status()));
        }

        let body: TickerPrice = response
            .json()
            .with_context(|| format!("Unexpected response for {}", pair))?;
        body.price
            .parse()
            .with_context(|| format!("Bad price '{}' for {}", body.price, pair))
    }
}

/// Fetches every mapped ticker. Failures are logged and left out.
pub fn fetch_prices(
    source: &dyn PriceSource,
    symbols: &BTreeMap<String, String>,
    quote: QuoteCurrency,
) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    for (ticker, symbol) in symbols {
        match source.price(symbol, quote) {
            Ok(price) => {
                debug!("{} = {} {}", ticker, price, quote.as_str());
                prices.insert(ticker.clone(), price);
            }
            Err(e) => warn!("No {} price for {}: {:#}", quote.as_str(), ticker, e),
        }
    }
    prices
}

#[derive(Debug, Clone)]
struct PriceSnapshot {
    prices: HashMap<String, f64>,
    fetched_at: DateTime<Local>,
}

/// Latest known prices per quote currency.
#[derive(Clone)]
pub struct PriceBoard {
    source: Arc<dyn PriceSource>,
    symbols: BTreeMap<String, String>,
    fallback_prices: BTreeMap<String, f64>,
    snapshots: Arc<Mutex<HashMap<QuoteCurrency, PriceSnapshot>>>,
}

impl PriceBoard {
    pub fn new(source: Arc<dyn PriceSource>, config: &PriceConfig) -> Self {
        Self {
            source,
            symbols: config.symbols.clone(),
            fallback_prices: config.fallback_prices.clone(),
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetches now, on the calling thread.
    pub fn refresh(&self, quote: QuoteCurrency) {
        let mut prices = fetch_prices(self.source.as_ref(), &self.symbols, quote);
        for (ticker, price) in &self.fallback_prices {
            prices.entry(ticker.clone()).or_insert(*price);
        }
        info!("Fetched {} {} prices", prices.len(), quote.as_str());

        let snapshot = PriceSnapshot {
            prices,
            fetched_at: Local::now(),
        };
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.insert(quote, snapshot);
        }
    }

    /// Fire-and-forget refresh. The handle is only needed by callers that
    /// want to wait.
    pub fn refresh_in_background(&self, quote: QuoteCurrency) -> JoinHandle<()> {
        let board = self.clone();
        thread::spawn(move || board.refresh(quote))
    }

    /// Copy of the latest prices; empty if none were fetched yet.
    pub fn rates(&self, quote: QuoteCurrency) -> HashMap<String, f64> {
        self.snapshots
            .lock()
            .ok()
            .and_then(|s| s.get(&quote).map(|snap| snap.prices.clone()))
            .unwrap_or_default()
    }

    pub fn fetched_at(&self, quote: QuoteCurrency) -> Option<DateTime<Local>> {
        self.snapshots
            .lock()
            .ok()
            .and_then(|s| s.get(&quote).map(|snap| snap.fetched_at))
    }
}
