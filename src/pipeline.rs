//! Cover batch pipeline
//!
//! Walks a directory of OCR dumps, runs belly band detection on every cover
//! in parallel and writes per-cover reports plus a batch summary.

use ab_glyph::FontVec;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;

use crate::belly_band::{BandDetectOptions, BellyBandDetector, BellyBandError};
use crate::config::{AppConfig, OutputConfig};
use crate::ocr_input::{OcrDump, OcrInputError};
use crate::report::{save_text_report, BatchSummary, CoverReport, ReportError, SummaryEntry};
use crate::visualize::{load_font, save_overlay, VisualizeError};

/// Default extension of OCR dump files
pub const DEFAULT_EXTENSION: &str = "json";

/// Error type for the cover pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Input error: {0}")]
    Input(#[from] OcrInputError),

    #[error("Detection error: {0}")]
    Detection(#[from] BellyBandError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Visualization error: {0}")]
    Visualize(#[from] VisualizeError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================
// Progress Reporting
// ============================================================

/// Progress hooks for long-running batches
///
/// Called from worker threads, hence `Sync`.
pub trait ProgressCallback: Sync {
    fn on_step_start(&self, step: &str);
    fn on_step_progress(&self, current: usize, total: usize);
    fn on_step_complete(&self, step: &str, detail: &str);
    fn on_debug(&self, message: &str);
}

/// Progress reporter that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressCallback for TracingProgress {
    fn on_step_start(&self, step: &str) {
        tracing::info!("{step}");
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        tracing::debug!(current, total, "progress");
    }

    fn on_step_complete(&self, step: &str, detail: &str) {
        tracing::info!("{step}: {detail}");
    }

    fn on_debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}

// ============================================================
// Pipeline
// ============================================================

/// Directory batch driver
#[derive(Debug, Clone)]
pub struct CoverPipeline {
    pub options: BandDetectOptions,
    pub output: OutputConfig,
    /// Where cover images live; defaults to each dump's directory
    pub images_dir: Option<PathBuf>,
    /// Dump file extension (without dot)
    pub extension: String,
    /// Worker threads
    pub jobs: usize,
}

impl Default for CoverPipeline {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl CoverPipeline {
    /// Create a pipeline from loaded configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            options: config.detection.clone(),
            output: config.output.clone(),
            images_dir: None,
            extension: DEFAULT_EXTENSION.to_string(),
            jobs: num_cpus::get(),
        }
    }

    /// Dump files in `input_dir`, sorted by name
    pub fn collect_inputs(&self, input_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        if !input_dir.is_dir() {
            return Err(PipelineError::InputNotFound(input_dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Process every dump in `input_dir` and write results to `output_dir`
    ///
    /// Covers that fail are logged and skipped; they still count toward
    /// `total_images` in the summary.
    pub fn run<P: ProgressCallback>(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: &P,
    ) -> Result<BatchSummary, PipelineError> {
        let start_time = Instant::now();
        let inputs = self.collect_inputs(input_dir)?;
        std::fs::create_dir_all(output_dir)?;

        let font = match (&self.output.font, self.output.visualize) {
            (Some(path), true) => Some(load_font(path)?),
            _ => None,
        };

        let total = inputs.len();
        progress.on_step_start(&format!("Detecting belly bands ({total} covers)..."));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.max(1))
            .build()?;
        let done = AtomicUsize::new(0);
        let font = font.as_ref();

        let outcomes: Vec<Option<SummaryEntry>> = pool.install(|| {
            inputs
                .par_iter()
                .map(|path| {
                    let outcome = match self.process_cover(path, output_dir, font, progress) {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "cover skipped");
                            progress.on_debug(&format!("{}: {}", path.display(), e));
                            None
                        }
                    };
                    progress.on_step_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                    outcome
                })
                .collect()
        });

        let summary = BatchSummary::new(total, outcomes.into_iter().flatten().collect());
        let summary_path = summary.save(output_dir)?;

        tracing::info!(
            total = summary.total_images,
            found = summary.belly_bands_found,
            elapsed_seconds = start_time.elapsed().as_secs_f64(),
            "batch complete"
        );
        progress.on_step_complete(
            "Belly band detection",
            &format!(
                "{} of {} covers ({:.1}%), summary: {}",
                summary.belly_bands_found,
                summary.total_images,
                summary.percentage,
                summary_path.display()
            ),
        );

        Ok(summary)
    }

    /// Detect and write reports for one dump
    ///
    /// `font` labels the overlay; pass `None` to draw boxes only.
    pub fn process_cover<P: ProgressCallback>(
        &self,
        dump_path: &Path,
        output_dir: &Path,
        font: Option<&FontVec>,
        progress: &P,
    ) -> Result<SummaryEntry, PipelineError> {
        let dump = OcrDump::load(dump_path)?;
        let stem = dump.stem();
        let image_dir = self.images_dir.as_deref();
        let image_path = dump.image_path(image_dir);
        let (width, height) = dump.dimensions(image_dir)?;

        let analysis = BellyBandDetector::analyze(&dump.detections, width, height, &self.options)?;
        let result = &analysis.result;

        let image_file = dump.image_file.clone().unwrap_or_else(|| {
            dump_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string()
        });

        CoverReport::new(result.clone(), image_file.as_str()).save(output_dir, &stem)?;

        if self.output.write_text_report {
            save_text_report(result, output_dir, &stem)?;
        }

        if self.output.visualize {
            match image_path.filter(|p| p.exists()) {
                Some(image_path) => {
                    let viz_path = output_dir.join(format!("{stem}_belly_band_viz.jpg"));
                    save_overlay(&image_path, &analysis, &viz_path, font)?;
                }
                None => progress.on_debug(&format!("{stem}: no cover image, overlay skipped")),
            }
        }

        match &result.band_text {
            Some(text) => progress.on_debug(&format!("{stem}: belly band \"{text}\"")),
            None => progress.on_debug(&format!("{stem}: no belly band")),
        }

        Ok(SummaryEntry::from_result(image_file, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SUMMARY_FILE_NAME;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    const BAND_DUMP: &str = r#"{
        "image": "band.png",
        "width": 1000,
        "height": 1500,
        "detections": [
            {"polygon": [[0,1180],[360,1180],[360,1220],[0,1220]], "text": "정가 15,000원", "confidence": 0.92},
            {"polygon": [[350,1195],[700,1195],[700,1235],[350,1235]], "text": "2024 올해의 소설", "confidence": 0.88},
            {"polygon": [[650,1200],[1000,1200],[1000,1240],[650,1240]], "text": "김작가 장편소설", "confidence": 0.95}
        ]
    }"#;

    const PLAIN_DUMP: &str = r#"{
        "image": "plain.png",
        "width": 1000,
        "height": 1500,
        "detections": [
            {"polygon": [[0,300],[1000,300],[1000,900],[0,900]], "text": "제목", "confidence": 0.99}
        ]
    }"#;

    #[derive(Default)]
    struct RecordingProgress {
        steps: Mutex<Vec<String>>,
        last_progress: Mutex<Option<(usize, usize)>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_step_start(&self, step: &str) {
            self.steps.lock().unwrap().push(step.to_string());
        }

        fn on_step_progress(&self, current: usize, total: usize) {
            let mut last = self.last_progress.lock().unwrap();
            if (*last).is_none_or(|(c, _)| current > c) {
                *last = Some((current, total));
            }
        }

        fn on_step_complete(&self, step: &str, _detail: &str) {
            self.steps.lock().unwrap().push(step.to_string());
        }

        fn on_debug(&self, _message: &str) {}
    }

    fn pipeline() -> CoverPipeline {
        CoverPipeline {
            jobs: 2,
            ..CoverPipeline::from_config(&AppConfig::default())
        }
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.JSON", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.json")).unwrap();

        let files = pipeline().collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }

    #[test]
    fn test_collect_inputs_missing_dir() {
        let result = pipeline().collect_inputs(Path::new("/nonexistent/dumps"));
        assert!(matches!(result, Err(PipelineError::InputNotFound(_))));
    }

    #[test]
    fn test_run_writes_reports_and_summary() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("band.json"), BAND_DUMP).unwrap();
        std::fs::write(input.path().join("plain.json"), PLAIN_DUMP).unwrap();
        std::fs::write(input.path().join("broken.json"), "{oops").unwrap();
        RgbImage::from_pixel(1000, 1500, Rgb([200, 200, 200]))
            .save(input.path().join("band.png"))
            .unwrap();

        let progress = RecordingProgress::default();
        let summary = pipeline().run(input.path(), output.path(), &progress).unwrap();

        assert_eq!(summary.total_images, 3);
        assert_eq!(summary.belly_bands_found, 1);
        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.results[0].file, "band.png");
        assert_eq!(
            summary.results[0].text.as_deref(),
            Some("정가 15,000원 2024 올해의 소설 김작가 장편소설")
        );
        assert!(!summary.results[1].has_belly_band);

        let out = output.path();
        assert!(out.join(SUMMARY_FILE_NAME).exists());
        assert!(out.join("band_belly_band.json").exists());
        assert!(out.join("band_belly_band.txt").exists());
        assert!(out.join("band_belly_band_viz.jpg").exists());
        assert!(out.join("plain_belly_band.json").exists());
        // No cover image for the plain dump
        assert!(!out.join("plain_belly_band_viz.jpg").exists());
        assert!(!out.join("broken_belly_band.json").exists());

        assert_eq!(*progress.last_progress.lock().unwrap(), Some((3, 3)));
        assert_eq!(progress.steps.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_run_respects_output_switches() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("band.json"), BAND_DUMP).unwrap();

        let mut p = pipeline();
        p.output = OutputConfig {
            visualize: false,
            write_text_report: false,
            font: None,
        };
        p.run(input.path(), output.path(), &TracingProgress).unwrap();

        assert!(output.path().join("band_belly_band.json").exists());
        assert!(!output.path().join("band_belly_band.txt").exists());
    }

    #[test]
    fn test_run_empty_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let summary = pipeline()
            .run(input.path(), output.path(), &TracingProgress)
            .unwrap();
        assert_eq!(summary.total_images, 0);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn test_process_cover_zero_size_fails() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let path = input.path().join("zero.json");
        std::fs::write(&path, r#"{"width": 0, "height": 100, "detections": []}"#).unwrap();

        let result = pipeline().process_cover(&path, output.path(), None, &TracingProgress);
        assert!(matches!(
            result,
            Err(PipelineError::Detection(BellyBandError::InvalidImageSize { .. }))
        ));
    }

    #[test]
    fn test_run_bad_font_fails_before_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("band.json"), BAND_DUMP).unwrap();
        let font = input.path().join("label.ttf");
        std::fs::write(&font, b"not a font").unwrap();

        let mut p = pipeline();
        p.output.font = Some(font);
        let result = p.run(input.path(), output.path(), &TracingProgress);

        assert!(matches!(
            result,
            Err(PipelineError::Visualize(VisualizeError::FontParse(_)))
        ));
        assert!(!output.path().join(SUMMARY_FILE_NAME).exists());
    }

    #[test]
    fn test_run_huge_band_still_writes_summary() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let dump = r#"{
            "image": "huge.png",
            "width": 100,
            "height": 200,
            "detections": [
                {"polygon": [[-1e12,100],[0,100],[0,140],[-1e12,140]], "text": "left", "confidence": 0.9},
                {"polygon": [[0,100],[1e12,100],[1e12,140],[0,140]], "text": "right", "confidence": 0.9}
            ]
        }"#;
        std::fs::write(input.path().join("huge.json"), dump).unwrap();
        RgbImage::from_pixel(100, 200, Rgb([255, 255, 255]))
            .save(input.path().join("huge.png"))
            .unwrap();

        let summary = pipeline()
            .run(input.path(), output.path(), &TracingProgress)
            .unwrap();

        assert_eq!(summary.belly_bands_found, 1);
        assert!(output.path().join("huge_belly_band_viz.jpg").exists());
        assert!(output.path().join(SUMMARY_FILE_NAME).exists());
    }
}
