//! bellyband - belly band detection for book covers
//!
//! Finds the promotional strip (belly band) wrapped around a book cover from
//! the cover's OCR text detections, and reports its text, confidence, box and
//! vertical position.
//!
//! # Example
//!
//! ```
//! use bellyband::{axis_aligned_quad, detect, TextDetection};
//!
//! let detections = vec![
//!     TextDetection::new(axis_aligned_quad(0.0, 1180.0, 480.0, 1220.0), "정가 15,000원", 0.92),
//!     TextDetection::new(axis_aligned_quad(500.0, 1185.0, 980.0, 1225.0), "올해의 소설", 0.88),
//! ];
//!
//! let result = detect(&detections, 1000, 1500).unwrap();
//! assert!(result.has_band);
//! assert_eq!(result.band_text.as_deref(), Some("정가 15,000원 올해의 소설"));
//! ```
//!
//! OCR itself, image decoding and model management stay with the caller;
//! [`ocr_input`] reads detections that an OCR engine has already written.

pub mod belly_band;
pub mod cli;
pub mod config;
pub mod ocr_input;
pub mod pipeline;
pub mod report;
pub mod visualize;

// Re-export public API
pub use belly_band::{
    axis_aligned_quad, detect, detect_batch, is_band_shape, BandAnalysis, BandCandidate,
    BandDetectOptions, BandDetectOptionsBuilder, BatchStats, BellyBandDetector, BellyBandError,
    CoverDetections, DetectionResult, Point, Quad, TextDetection,
};
pub use config::{AppConfig, ConfigError, OutputConfig};
pub use ocr_input::{OcrDump, OcrInputError};
pub use pipeline::{CoverPipeline, PipelineError, ProgressCallback, TracingProgress};
pub use report::{BatchSummary, CoverReport, ReportError, SummaryEntry};
pub use visualize::{load_font, render_overlay, save_overlay, VisualizeError};
