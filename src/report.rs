//! Detection reports
//!
//! Persists per-cover results as JSON and plain text, and the batch summary
//! as JSON.

use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::belly_band::DetectionResult;

/// Summary file name inside the output directory
pub const SUMMARY_FILE_NAME: &str = "belly_band_summary.json";

/// Error type for report writing
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// JSON report for one cover
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverReport {
    #[serde(flatten)]
    pub result: DetectionResult,
    /// RFC 3339 creation time
    pub timestamp: String,
    pub image_file: String,
}

impl CoverReport {
    pub fn new(result: DetectionResult, image_file: impl Into<String>) -> Self {
        Self {
            result,
            timestamp: chrono::Utc::now().to_rfc3339(),
            image_file: image_file.into(),
        }
    }

    /// Write `<stem>_belly_band.json` into `output_dir`
    pub fn save(&self, output_dir: &Path, stem: &str) -> Result<PathBuf> {
        let path = output_dir.join(format!("{stem}_belly_band.json"));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Human-readable report text
pub fn render_text_report(result: &DetectionResult) -> String {
    let mut out = String::new();

    match (&result.band_text, result.has_band) {
        (Some(text), true) => {
            writeln!(out, "Belly band found: {text}").ok();
            writeln!(
                out,
                "Confidence: {:.2}",
                result.band_confidence.unwrap_or_default()
            )
            .ok();
            writeln!(
                out,
                "Position: {:.1}%",
                result.relative_position.unwrap_or_default() * 100.0
            )
            .ok();
        }
        _ => {
            writeln!(out, "No belly band").ok();
        }
    }

    writeln!(out, "\n=== All text ===").ok();
    for d in &result.all_detections {
        writeln!(out, "{} (confidence: {:.2})", d.text, d.confidence).ok();
    }

    out
}

/// Write `<stem>_belly_band.txt` into `output_dir`
pub fn save_text_report(result: &DetectionResult, output_dir: &Path, stem: &str) -> Result<PathBuf> {
    let path = output_dir.join(format!("{stem}_belly_band.txt"));
    std::fs::write(&path, render_text_report(result))?;
    Ok(path)
}

/// One line of the batch summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub file: String,
    pub has_belly_band: bool,
    pub text: Option<String>,
}

impl SummaryEntry {
    pub fn from_result(file: impl Into<String>, result: &DetectionResult) -> Self {
        Self {
            file: file.into(),
            has_belly_band: result.has_band,
            text: result.band_text.clone().filter(|_| result.has_band),
        }
    }
}

/// Batch summary over a directory of covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Covers found, including ones that failed to process
    pub total_images: usize,
    pub belly_bands_found: usize,
    /// `belly_bands_found / total_images * 100`, 0 for an empty batch
    pub percentage: f64,
    pub results: Vec<SummaryEntry>,
}

impl BatchSummary {
    pub fn new(total_images: usize, results: Vec<SummaryEntry>) -> Self {
        let belly_bands_found = results.iter().filter(|r| r.has_belly_band).count();
        let percentage = if total_images == 0 {
            0.0
        } else {
            belly_bands_found as f64 / total_images as f64 * 100.0
        };
        Self {
            total_images,
            belly_bands_found,
            percentage,
            results,
        }
    }

    /// Write the summary into `output_dir`
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(SUMMARY_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
