use anyhow::Result;
use image::RgbImage;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use super::records::RawOcrBatch;
use super::setup::{locate_tesseract, TesseractPaths};
use crate::config::TesseractConfig;
use crate::error::AnalysisError;

/// A text detector: image in, positioned text regions out.
///
/// Implementations must be usable from the background analysis thread.
pub trait TextDetector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, image: &RgbImage) -> Result<RawOcrBatch>;
}

/// Runs the Tesseract CLI and reads its TSV output.
pub struct TesseractDetector {
    paths: TesseractPaths,
    language: String,
    psm: u32,
}

impl TesseractDetector {
    pub fn new(config: &TesseractConfig) -> Result<Self> {
        Ok(Self {
            paths: locate_tesseract(config)?,
            language: config.language.clone(),
            psm: config.psm,
        })
    }
}

impl TextDetector for TesseractDetector {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn detect(&self, image: &RgbImage) -> Result<RawOcrBatch> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut cmd = Command::new(&self.paths.executable);
        cmd.arg(temp_input.path()).arg(&output_base);
        if let Some(tessdata) = &self.paths.tessdata {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }
        let output = cmd
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .output()
            .map_err(|e| AnalysisError::EngineFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::EngineFailed(stderr.trim().to_string()).into());
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| AnalysisError::EngineFailed(format!("reading {}: {}", tsv_path, e)))?;
        let _ = std::fs::remove_file(&tsv_path);

        let batch = parse_tsv_output(&tsv_content);
        debug!("Tesseract returned {} text regions", batch.len());
        Ok(batch)
    }
}

#[derive(Debug)]
struct TsvWord {
    line_key: (i32, i32, i32),
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    conf: f32,
    text: String,
}

impl TsvWord {
    fn right(&self) -> i32 {
        self.left + self.width
    }
}

/// Parses Tesseract TSV into one region per phrase.
///
/// Words sharing a (block, paragraph, line) key are merged, except where the
/// horizontal gap between neighbours exceeds the line height: the ticker label
/// and the rate on a dashboard row must stay separate regions.
pub fn parse_tsv_output(tsv: &str) -> RawOcrBatch {
    let mut batch = RawOcrBatch::default();
    let mut phrase: Vec<TsvWord> = Vec::new();

    // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
    //             left, top, width, height, conf, text
    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let num = |i: usize| fields[i].trim().parse::<i32>().unwrap_or(-1);
        // Level 5 = word
        if num(0) != 5 {
            continue;
        }
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let word = TsvWord {
            line_key: (num(2), num(3), num(4)),
            left: num(6),
            top: num(7),
            width: num(8),
            height: num(9),
            conf,
            text: text.to_string(),
        };

        if let Some(prev) = phrase.last() {
            let gap = word.left - prev.right();
            let line_height = prev.height.max(word.height);
            if prev.line_key != word.line_key || gap > line_height {
                flush_phrase(&mut batch, &mut phrase);
            }
        }
        phrase.push(word);
    }
    flush_phrase(&mut batch, &mut phrase);

    batch
}

fn flush_phrase(batch: &mut RawOcrBatch, phrase: &mut Vec<TsvWord>) {
    if phrase.is_empty() {
        return;
    }

    let left = phrase.iter().map(|w| w.left).min().unwrap_or(0);
    let top = phrase.iter().map(|w| w.top).min().unwrap_or(0);
    let right = phrase.iter().map(|w| w.right()).max().unwrap_or(left);
    let bottom = phrase.iter().map(|w| w.top + w.height).max().unwrap_or(top);
    let conf = phrase.iter().map(|w| w.conf).sum::<f32>() / phrase.len() as f32;
    let text = phrase
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    batch.push_rect(
        &text,
        conf / 100.0,
        left as f32,
        top as f32,
        (right - left) as f32,
        (bottom - top) as f32,
    );
    phrase.clear();
}
