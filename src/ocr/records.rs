//! Normalizes raw detector output into positioned text records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::AnalysisError;

/// One detected text region as a detector reports it: four `(x, y)` corners.
pub type Quad = [[f32; 2]; 4];

/// Batch output of a text detector, as parallel sequences.
///
/// The sequences are not guaranteed to have equal lengths. Only the first
/// `min(len)` entries are used; the rest are dropped without error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOcrBatch {
    pub rec_texts: Vec<String>,
    /// Recognition confidence, 0.0 - 1.0
    pub rec_scores: Vec<f32>,
    pub dt_polys: Vec<Quad>,
}

impl RawOcrBatch {
    /// Appends one region given as an axis-aligned rectangle.
    pub fn push_rect(&mut self, text: &str, score: f32, left: f32, top: f32, width: f32, height: f32) {
        let right = left + width;
        let bottom = top + height;
        self.rec_texts.push(text.to_string());
        self.rec_scores.push(score);
        self.dt_polys
            .push([[left, top], [right, top], [right, bottom], [left, bottom]]);
    }

    pub fn len(&self) -> usize {
        self.rec_texts
            .len()
            .min(self.rec_scores.len())
            .min(self.dt_polys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A text region with its axis-aligned bounding box in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedTextRecord {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// Confidence, 0 - 100
    pub confidence: f32,
}

/// Converts a detector batch into records, in input order.
///
/// Regions whose trimmed text is empty are skipped.
pub fn process_batch(batch: &RawOcrBatch) -> Vec<PositionedTextRecord> {
    batch
        .rec_texts
        .iter()
        .zip(&batch.rec_scores)
        .zip(&batch.dt_polys)
        .filter_map(|((text, &score), quad)| {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            let (x_min, x_max) = min_max(quad.iter().map(|p| p[0]));
            let (y_min, y_max) = min_max(quad.iter().map(|p| p[1]));
            let left = x_min as i32;
            let top = y_min as i32;

            Some(PositionedTextRecord {
                text: text.to_string(),
                left,
                top,
                width: (x_max as i32).saturating_sub(left),
                height: (y_max as i32).saturating_sub(top),
                confidence: score * 100.0,
            })
        })
        .collect()
}

fn min_max(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Parses a PaddleOCR-style JSON result: a list whose first element is an
/// object with `rec_texts`, `rec_scores` and `dt_polys`.
pub fn batch_from_json(value: &Value) -> Result<RawOcrBatch, AnalysisError> {
    let first = match value {
        Value::Array(items) => items.first(),
        _ => None,
    }
    .ok_or_else(|| AnalysisError::EngineShapeMismatch("expected a non-empty list".to_string()))?;

    if !first.is_object() {
        return Err(AnalysisError::EngineShapeMismatch(
            "first result is not an object".to_string(),
        ));
    }

    RawOcrBatch::deserialize(first)
        .map_err(|e| AnalysisError::EngineShapeMismatch(e.to_string()))
}

/// Records from an engine JSON result; an unexpected shape gives no records.
pub fn records_from_json(value: &Value) -> Vec<PositionedTextRecord> {
    match batch_from_json(value) {
        Ok(batch) => process_batch(&batch),
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bounding_box_from_quad() {
        let batch = RawOcrBatch {
            rec_texts: vec!["  BTC ".to_string()],
            rec_scores: vec![0.95],
            dt_polys: vec![[[102.7, 50.0], [140.0, 48.2], [141.9, 70.0], [101.0, 71.5]]],
        };
        let records = process_batch(&batch);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.text, "BTC");
        assert_eq!((r.left, r.top), (101, 48));
        assert_eq!((r.width, r.height), (40, 23));
        assert!((r.confidence - 95.0).abs() < 1e-3);
    }

    #[test]
    fn test_extreme_coordinates_saturate() {
        let batch = RawOcrBatch {
            rec_texts: vec!["BTC".to_string()],
            rec_scores: vec![0.9],
            dt_polys: vec![[[-3e9, -3e9], [3e9, -3e9], [3e9, 3e9], [-3e9, 3e9]]],
        };
        let records = process_batch(&batch);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].left, records[0].top), (i32::MIN, i32::MIN));
        assert_eq!((records[0].width, records[0].height), (i32::MAX, i32::MAX));
    }

    #[test]
    fn test_mismatched_lengths_truncate() {
        let mut batch = RawOcrBatch::default();
        batch.push_rect("BTC", 0.9, 10.0, 10.0, 30.0, 10.0);
        batch.push_rect("ETH", 0.9, 10.0, 40.0, 30.0, 10.0);
        batch.rec_texts.push("LTC".to_string());
        batch.rec_scores.pop();

        assert_eq!(batch.len(), 1);
        let records = process_batch(&batch);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "BTC");
    }

    #[test]
    fn test_blank_text_skipped_order_kept() {
        let mut batch = RawOcrBatch::default();
        batch.push_rect("ETH", 0.9, 10.0, 90.0, 30.0, 10.0);
        batch.push_rect("   ", 0.9, 10.0, 40.0, 30.0, 10.0);
        batch.push_rect("BTC", 0.9, 10.0, 10.0, 30.0, 10.0);

        let texts: Vec<_> = process_batch(&batch).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["ETH", "BTC"]);
    }

    #[test]
    fn test_records_from_paddle_json() {
        let value = json!([{
            "rec_texts": ["BTC", "1.5 Eh/s"],
            "rec_scores": [0.95, 0.9],
            "dt_polys": [
                [[100, 50], [130, 50], [130, 62], [100, 62]],
                [[150, 52], [210, 52], [210, 64], [150, 64]]
            ]
        }]);
        let records = records_from_json(&value);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].left, 150);
    }

    #[test]
    fn test_unexpected_shape_gives_no_records() {
        assert!(records_from_json(&json!({"rec_texts": ["BTC"]})).is_empty());
        assert!(records_from_json(&json!([])).is_empty());
        assert!(records_from_json(&json!([null])).is_empty());
        assert!(records_from_json(&json!([["BTC", 0.9]])).is_empty());
        assert!(records_from_json(&json!([{"rec_texts": "BTC"}])).is_empty());
    }
}
