//! Rollercoin Calculator
//!
//! Command-line front end: analyze a screenshot, pasted text or a saved OCR
//! result, and print expected rewards for the tickers your league unlocks.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

use rollercoin_calculator::block_data::{set_override, BlockDataStore};
use rollercoin_calculator::config::{get_config, init_config, AppConfig};
use rollercoin_calculator::ocr::{
    analyze_records, records_from_json, AnalysisSettings, TesseractDetector, TickerRateMap,
};
use rollercoin_calculator::paste::parse_pasted_text;
use rollercoin_calculator::prices::{BinanceSource, PriceBoard, QuoteCurrency};
use rollercoin_calculator::report::{
    build_rows, merge_rates, NetworkRate, NetworkRates, RewardRow,
};
use rollercoin_calculator::rewards::{format_reward, RewardBreakdown};
use rollercoin_calculator::tiers::{all_tiers, tier_by_name, tier_for_user_power, Tier};
use rollercoin_calculator::worker::AnalysisRunner;

#[derive(Parser, Debug)]
#[command(name = "rollercoin-calculator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read network rates and print expected rewards
    Analyze(AnalyzeArgs),
    /// Saved block durations and rewards
    Block {
        #[command(subcommand)]
        action: BlockAction,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Your mining power, e.g. "1.5" or "1.5 Eh/s"
    #[arg(long)]
    power: String,

    /// Unit for --power when it carries none
    #[arg(long, default_value = "Gh/s")]
    unit: String,

    #[command(flatten)]
    input: InputSource,

    /// League name; detected from --power when omitted
    #[arg(long)]
    tier: Option<String>,

    #[arg(long, value_enum, default_value_t = Currency::Crypto)]
    currency: Currency,
}

/// Rates from `--image` or `--ocr-json` take precedence; `--paste` fills the
/// tickers they missed.
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
struct InputSource {
    /// Dashboard screenshot
    #[arg(long, conflicts_with = "ocr_json")]
    image: Option<PathBuf>,

    /// Text copied from the dashboard
    #[arg(long)]
    paste: Option<PathBuf>,

    /// PaddleOCR-style JSON result
    #[arg(long)]
    ocr_json: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum BlockAction {
    List,
    Set {
        ticker: String,
        /// e.g. "10 Min 4 Sec"; "--" clears it
        #[arg(long)]
        duration: Option<String>,
        /// Coins per block; "--" clears it
        #[arg(long)]
        reward: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Currency {
    Crypto,
    Usdt,
    Eur,
}

impl Currency {
    fn quote(self) -> Option<QuoteCurrency> {
        match self {
            Currency::Crypto => None,
            Currency::Usdt => Some(QuoteCurrency::Usdt),
            Currency::Eur => Some(QuoteCurrency::Eur),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    // Route panics through the log as well
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        error!("[PANIC]{} {}", location, msg);
    }));

    let cli = Cli::parse();
    init_config();
    let config = get_config();

    match cli.command {
        Command::Analyze(args) => run_analyze(config, &args),
        Command::Block { action } => run_block(config, action),
    }
}

fn run_analyze(config: &AppConfig, args: &AnalyzeArgs) -> Result<()> {
    let tier = select_tier(args)?;
    info!("League: {}", tier.name);

    let network = read_network_rates(config, &args.input, tier)?;
    if network.is_empty() {
        warn!("No network rates found in the input");
    }
    for ticker in network.keys().filter(|t| !tier.unlocks(t.as_str())) {
        info!("{} is not mined in {}, skipping", ticker, tier.name);
    }

    let store = BlockDataStore::new(&config.save_dir());
    let block_data = store.load();
    let rows = build_rows(&args.power, &args.unit, tier, &network, &block_data);

    let prices = args.currency.quote().map(|quote| {
        let board = BinanceSource::new(&config.prices)
            .map(|source| PriceBoard::new(Arc::new(source), &config.prices));
        match board {
            Ok(board) => {
                if board.refresh_in_background(quote).join().is_err() {
                    warn!("Price refresh thread exited abnormally");
                }
                if let Some(at) = board.fetched_at(quote) {
                    info!("Prices as of {}", at.format("%Y-%m-%d %H:%M:%S"));
                }
                board.rates(quote)
            }
            Err(e) => {
                warn!("Prices unavailable: {:#}", e);
                Default::default()
            }
        }
    });

    let label = args
        .currency
        .quote()
        .map(|q| q.as_str())
        .unwrap_or("coins");
    println!("League {} ({})", tier.name, label);
    println!(
        "{:<6} {:>18} {:>14} {:>14} {:>14} {:>14} {:>14}",
        "Ticker", "Network", "Block", "Day", "Week", "Month", "Year"
    );
    for row in &rows {
        let shown = match &prices {
            None => Some(row.rewards),
            Some(prices) => match prices.get(&row.ticker) {
                Some(&price) => Some(row.rewards.converted(price)),
                None => {
                    warn!("No {} price for {}", label, row.ticker);
                    None
                }
            },
        };
        println!("{}", format_row(row, shown.as_ref()));
    }

    Ok(())
}

fn to_network_rates(rates: &TickerRateMap) -> NetworkRates {
    rates
        .iter()
        .map(|(t, e)| (t.clone(), NetworkRate::from(e)))
        .collect()
}

fn read_network_rates(config: &AppConfig, input: &InputSource, tier: &Tier) -> Result<NetworkRates> {
    let settings = AnalysisSettings::from_config(config);

    let pasted: Option<NetworkRates> = match &input.paste {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let parsed = parse_pasted_text(&text, &settings.matcher);
            Some(parsed.iter().map(|(t, r)| (t.clone(), NetworkRate::from(r))).collect())
        }
        None => None,
    };

    let detected: Option<NetworkRates> = if let Some(path) = &input.image {
        let img = image::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .to_rgb8();
        let detector = TesseractDetector::new(&config.tesseract)?;
        let (mut runner, events) = AnalysisRunner::new(Arc::new(detector), settings);
        let request = runner.submit(img);
        let rates = runner
            .await_result(&events, request)
            .ok_or_else(|| anyhow!("Analysis ended without a result"))?;
        Some(to_network_rates(&rates))
    } else if let Some(path) = &input.ocr_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        Some(to_network_rates(&analyze_records(&records_from_json(&value), &settings)))
    } else {
        None
    };

    match (detected, pasted) {
        (Some(detected), Some(pasted)) => Ok(merge_rates(detected, &pasted, tier)),
        (Some(rates), None) | (None, Some(rates)) => Ok(rates),
        (None, None) => Err(anyhow!("No input given")),
    }
}

fn select_tier(args: &AnalyzeArgs) -> Result<&'static Tier> {
    match &args.tier {
        Some(name) => tier_by_name(name).ok_or_else(|| {
            let names: Vec<_> = all_tiers().iter().map(|t| t.name).collect();
            anyhow!("Unknown league '{}', expected one of: {}", name, names.join(", "))
        }),
        None => tier_for_user_power(&args.power, &args.unit)
            .ok_or_else(|| anyhow!("No league for power '{}'", args.power)),
    }
}

fn format_row(row: &RewardRow, rewards: Option<&RewardBreakdown>) -> String {
    let network = row
        .network
        .as_ref()
        .map(|n| format!("{} {}", n.rate, n.unit))
        .unwrap_or_else(|| "--".to_string());
    let cells: Vec<String> = match rewards {
        Some(r) => [r.per_block, r.per_day, r.per_week, r.per_month, r.per_year]
            .iter()
            .map(|v| format_reward(*v))
            .collect(),
        None => vec!["--".to_string(); 5],
    };
    format!(
        "{:<6} {:>18} {:>14} {:>14} {:>14} {:>14} {:>14}",
        row.ticker, network, cells[0], cells[1], cells[2], cells[3], cells[4],
    )
}

fn run_block(config: &AppConfig, action: BlockAction) -> Result<()> {
    let store = BlockDataStore::new(&config.save_dir());
    let mut data = store.load();

    match action {
        BlockAction::List => {
            if data.is_empty() {
                println!("No saved block data ({})", store.path().display());
            }
            for (ticker, entry) in &data {
                println!(
                    "{:<6} duration: {:<16} reward: {}",
                    ticker,
                    entry.duration.as_deref().unwrap_or("--"),
                    entry.reward.as_deref().unwrap_or("--"),
                );
            }
        }
        BlockAction::Set {
            ticker,
            duration,
            reward,
        } => {
            set_override(&mut data, &ticker, duration.as_deref(), reward.as_deref());
            if !store.save(&data) {
                return Err(anyhow!("Could not save {}", store.path().display()));
            }
        }
    }

    Ok(())
}
