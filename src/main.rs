//! bellyband CLI

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bellyband::cli::{Cli, Commands, DetectArgs, InspectArgs};
use bellyband::{AppConfig, BellyBandDetector, CoverPipeline, OcrDump, ProgressCallback};

/// Progress bar reporter for the detect command
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl ProgressCallback for BarProgress {
    fn on_step_start(&self, step: &str) {
        self.bar.set_message(step.to_string());
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    fn on_step_complete(&self, step: &str, detail: &str) {
        self.bar.finish_and_clear();
        println!("{step}: {detail}");
    }

    fn on_debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_detect(args: &DetectArgs, config: &AppConfig) -> Result<()> {
    let mut pipeline = CoverPipeline::from_config(config);
    pipeline.options = args.thresholds.apply(&config.detection);
    pipeline.output = args.effective_output(&config.output);
    pipeline.images_dir = args.images_dir.clone();
    pipeline.extension = args.extension.clone();
    if let Some(jobs) = args.jobs {
        pipeline.jobs = jobs;
    }

    tracing::debug!(?pipeline, "detect");

    let progress = BarProgress::new();
    pipeline
        .run(&args.input_dir, &args.output_dir, &progress)
        .with_context(|| format!("processing {}", args.input_dir.display()))?;
    Ok(())
}

fn run_inspect(args: &InspectArgs, config: &AppConfig) -> Result<()> {
    let options = args.thresholds.apply(&config.detection);
    let dump = OcrDump::load(&args.dump)
        .with_context(|| format!("reading {}", args.dump.display()))?;
    let (width, height) = dump.dimensions(args.images_dir.as_deref())?;

    let result = BellyBandDetector::detect(&dump.detections, width, height, &options)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref()).context("loading config")?;

    match &cli.command {
        Commands::Detect(args) => run_detect(args, &config),
        Commands::Inspect(args) => run_inspect(args, &config),
    }
}
