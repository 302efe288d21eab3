//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::belly_band::BandDetectOptions;
use crate::config::OutputConfig;
use crate::pipeline::DEFAULT_EXTENSION;

/// Belly band detection for book cover OCR results
#[derive(Debug, Parser)]
#[command(name = "bellyband", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: <config dir>/bellyband/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect belly bands for every OCR dump in a directory
    Detect(DetectArgs),
    /// Print the detection result of a single OCR dump as JSON
    Inspect(InspectArgs),
}

/// Parse a threshold value, rejecting NaN and infinities
fn finite_f64(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{s} is not a finite number"))
    }
}

/// Threshold overrides shared by all subcommands
#[derive(Debug, Clone, Default, Args)]
pub struct ThresholdArgs {
    /// Vertical grouping threshold in pixels
    #[arg(long, value_parser = finite_f64)]
    pub y_threshold: Option<f64>,

    /// Minimum band width/height ratio
    #[arg(long, value_parser = finite_f64)]
    pub min_aspect_ratio: Option<f64>,

    /// Minimum band width as a fraction of the cover width
    #[arg(long, value_parser = finite_f64)]
    pub min_width_fraction: Option<f64>,
}

impl ThresholdArgs {
    /// Apply overrides on top of `base`
    pub fn apply(&self, base: &BandDetectOptions) -> BandDetectOptions {
        let mut builder = BandDetectOptions::builder()
            .y_threshold(base.y_threshold)
            .min_aspect_ratio(base.min_aspect_ratio)
            .min_width_fraction(base.min_width_fraction);

        if let Some(t) = self.y_threshold {
            builder = builder.y_threshold(t);
        }
        if let Some(r) = self.min_aspect_ratio {
            builder = builder.min_aspect_ratio(r);
        }
        if let Some(f) = self.min_width_fraction {
            builder = builder.min_width_fraction(f);
        }

        builder.build()
    }
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Directory of OCR dump files
    pub input_dir: PathBuf,

    /// Output directory for reports
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Directory holding the cover images (default: next to each dump)
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Dump file extension
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Worker threads (default: number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip overlay images
    #[arg(long)]
    pub no_visualize: bool,

    /// Skip plain-text reports
    #[arg(long)]
    pub no_text_report: bool,

    /// Font file for the overlay label (default: from config, else no label)
    #[arg(long)]
    pub font: Option<PathBuf>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

impl DetectArgs {
    /// Output switches after CLI overrides
    pub fn effective_output(&self, base: &OutputConfig) -> OutputConfig {
        OutputConfig {
            visualize: base.visualize && !self.no_visualize,
            write_text_report: base.write_text_report && !self.no_text_report,
            font: self.font.clone().or_else(|| base.font.clone()),
        }
    }
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// OCR dump file
    pub dump: PathBuf,

    /// Directory holding the cover image (default: next to the dump)
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}
