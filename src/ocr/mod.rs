pub mod associate;
pub mod engine;
pub mod extract;
pub mod matcher;
pub mod preprocess;
pub mod records;
pub mod setup;

pub use associate::{associate, TickerRateEntry, TickerRateMap};
pub use engine::{TesseractDetector, TextDetector};
pub use extract::{extract_candidates, extract_number_unit, NumberUnit, NumberUnitCandidate};
pub use matcher::TickerMatcher;
pub use records::{process_batch, records_from_json, PositionedTextRecord, RawOcrBatch};

use image::RgbImage;
use tracing::{info, warn};

use crate::config::{AppConfig, AssociationParams, PreprocessConfig};
use preprocess::prepare_for_ocr;

/// Everything one analysis pass needs besides its input.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub matcher: TickerMatcher,
    pub association: AssociationParams,
    pub preprocess: PreprocessConfig,
}

impl AnalysisSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            matcher: TickerMatcher::for_tickers(&config.known_tickers),
            association: config.association,
            preprocess: config.preprocess.clone(),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            matcher: TickerMatcher::standard(),
            association: AssociationParams::default(),
            preprocess: PreprocessConfig::default(),
        }
    }
}

/// Records → ticker-rate map.
pub fn analyze_records(records: &[PositionedTextRecord], settings: &AnalysisSettings) -> TickerRateMap {
    let candidates = extract_candidates(records);
    associate(records, &candidates, &settings.matcher, &settings.association)
}

/// Raw detector batch → ticker-rate map.
pub fn analyze_batch(batch: &RawOcrBatch, settings: &AnalysisSettings) -> TickerRateMap {
    analyze_records(&process_batch(batch), settings)
}

/// High-level function: screenshot → ticker-rate map.
///
/// Preprocesses the image, runs the detector, and reconciles its output.
/// A detector failure is logged and gives an empty map.
pub fn analyze_image(
    detector: &dyn TextDetector,
    img: &RgbImage,
    settings: &AnalysisSettings,
) -> TickerRateMap {
    let prepared = prepare_for_ocr(img, &settings.preprocess);
    match detector.detect(&prepared) {
        Ok(batch) => {
            let rates = analyze_batch(&batch, settings);
            info!(
                "{}: {} regions, {} tickers with rates",
                detector.name(),
                batch.len(),
                rates.len()
            );
            rates
        }
        Err(e) => {
            warn!("{} failed: {:#}", detector.name(), e);
            TickerRateMap::new()
        }
    }
}
