//! Belly band module core types
//!
//! Contains the data structures shared by the geometry classifier, the row
//! grouper and the candidate selector.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Default vertical clustering threshold (pixels)
pub const DEFAULT_Y_THRESHOLD: f64 = 30.0;

/// Default minimum width/height ratio of a band
pub const DEFAULT_MIN_ASPECT_RATIO: f64 = 2.0;

/// Default minimum band width as a fraction of the image width
pub const DEFAULT_MIN_WIDTH_FRACTION: f64 = 0.3;

/// Stricter aspect ratio for covers with many wide titles
pub const STRICT_MIN_ASPECT_RATIO: f64 = 3.0;

/// Stricter width fraction for covers with many wide titles
pub const STRICT_MIN_WIDTH_FRACTION: f64 = 0.5;

/// Relaxed aspect ratio for tall, dense bands
pub const LENIENT_MIN_ASPECT_RATIO: f64 = 1.5;

/// Relaxed width fraction for narrow bands
pub const LENIENT_MIN_WIDTH_FRACTION: f64 = 0.2;

/// Smallest row group that may become a candidate
pub const MIN_GROUP_MEMBERS: usize = 2;

/// Y threshold clamp range
pub const MIN_Y_THRESHOLD: f64 = 1.0;
pub const MAX_Y_THRESHOLD: f64 = 1000.0;

/// Aspect ratio clamp range
pub const MIN_ASPECT_RATIO_CLAMP: f64 = 1.0;
pub const MAX_ASPECT_RATIO_CLAMP: f64 = 50.0;

/// Width fraction clamp range
pub const MIN_WIDTH_FRACTION_CLAMP: f64 = 0.0;
pub const MAX_WIDTH_FRACTION_CLAMP: f64 = 1.0;

// ============================================================
// Error Types
// ============================================================

/// Belly band detection error types
#[derive(Debug, Error, PartialEq)]
pub enum BellyBandError {
    #[error("Invalid image size: {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },

    #[error("Detection {index}: polygon has {points} points, expected 4")]
    MalformedPolygon { index: usize, points: usize },

    #[error("Detection {index}: polygon has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

pub type Result<T> = std::result::Result<T, BellyBandError>;

// ============================================================
// Geometry Primitives
// ============================================================

/// 2D point in image pixel coordinates
///
/// Serialized as a `[x, y]` pair, the layout OCR engines emit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Four-vertex polygon: top-left, top-right, bottom-right, bottom-left
/// (or any consistent winding with the width edge first).
pub type Quad = [Point; 4];

// ============================================================
// Core Data Structures
// ============================================================

/// One OCR result: polygon, recognized text and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    /// Region outline
    pub polygon: Quad,
    /// Recognized text (may be empty)
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f64,
}

impl TextDetection {
    /// Create a new detection
    pub fn new(polygon: Quad, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            polygon,
            text: text.into(),
            confidence,
        }
    }

    /// Create a detection from a variable-length point list
    ///
    /// `index` is the detection's position in its source list and only
    /// appears in the error.
    pub fn from_points(
        index: usize,
        points: &[Point],
        text: impl Into<String>,
        confidence: f64,
    ) -> Result<Self> {
        let polygon: Quad = points
            .try_into()
            .map_err(|_| BellyBandError::MalformedPolygon {
                index,
                points: points.len(),
            })?;
        if !polygon.iter().all(Point::is_finite) {
            return Err(BellyBandError::NonFiniteCoordinate { index });
        }
        Ok(Self::new(polygon, text, confidence))
    }

    /// Mean of the polygon's y-coordinates
    pub fn vertical_center(&self) -> f64 {
        super::geometry::vertical_center(&self.polygon)
    }
}

/// Detections of one cover image together with its pixel size
#[derive(Debug, Clone, PartialEq)]
pub struct CoverDetections {
    pub width: u32,
    pub height: u32,
    pub detections: Vec<TextDetection>,
}

impl CoverDetections {
    pub fn new(width: u32, height: u32, detections: Vec<TextDetection>) -> Self {
        Self {
            width,
            height,
            detections,
        }
    }
}

/// Detections judged to lie on the same horizontal line
///
/// Borrowed from the detection list; lives only while candidates are built.
#[derive(Debug, Clone)]
pub struct RowGroup<'a> {
    members: Vec<&'a TextDetection>,
    anchor: f64,
}

impl<'a> RowGroup<'a> {
    /// Start a group with its first member; the anchor stays fixed afterwards
    pub fn start(first: &'a TextDetection, anchor: f64) -> Self {
        Self {
            members: vec![first],
            anchor,
        }
    }

    pub fn push(&mut self, detection: &'a TextDetection) {
        self.members.push(detection);
    }

    /// Vertical center of the first member
    pub fn anchor(&self) -> f64 {
        self.anchor
    }

    pub fn members(&self) -> &[&'a TextDetection] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A row group whose merged box passed the band shape test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandCandidate {
    /// Axis-aligned merged box of all members
    pub bbox: Quad,
    /// Member texts joined by a single space
    pub text: String,
    /// Mean member confidence
    pub confidence: f64,
    /// Number of merged detections (>= 2)
    pub member_count: usize,
    /// Box vertical center divided by image height (not clamped)
    pub relative_position: f64,
}

impl BandCandidate {
    /// Selection score: corroborating detections times mean confidence
    pub fn score(&self) -> f64 {
        self.member_count as f64 * self.confidence
    }
}

/// Belly band verdict for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub has_band: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Quad>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_position: Option<f64>,
    /// Accepted candidates considered (0 if none)
    pub candidate_count: usize,
    /// Unmodified input detections, kept for auditing
    pub all_detections: Vec<TextDetection>,
}

impl DetectionResult {
    /// Result for an image without a belly band
    pub fn no_band(all_detections: Vec<TextDetection>, candidate_count: usize) -> Self {
        Self {
            has_band: false,
            band_text: None,
            band_confidence: None,
            bbox: None,
            relative_position: None,
            candidate_count,
            all_detections,
        }
    }
}

/// Detection result together with every accepted candidate
#[derive(Debug, Clone, PartialEq)]
pub struct BandAnalysis {
    pub result: DetectionResult,
    /// Accepted candidates in top-to-bottom order
    pub candidates: Vec<BandCandidate>,
    /// Index of the winner in `candidates`
    pub best_index: Option<usize>,
}

impl BandAnalysis {
    pub fn best(&self) -> Option<&BandCandidate> {
        self.best_index.and_then(|i| self.candidates.get(i))
    }
}

// ============================================================
// Options
// ============================================================

/// Heuristic thresholds for band detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BandDetectOptions {
    /// Maximum vertical center distance to a group's anchor (pixels, exclusive)
    pub y_threshold: f64,
    /// Minimum width/height ratio of a band
    pub min_aspect_ratio: f64,
    /// Minimum band width as a fraction of the image width
    pub min_width_fraction: f64,
}

impl Default for BandDetectOptions {
    fn default() -> Self {
        Self {
            y_threshold: DEFAULT_Y_THRESHOLD,
            min_aspect_ratio: DEFAULT_MIN_ASPECT_RATIO,
            min_width_fraction: DEFAULT_MIN_WIDTH_FRACTION,
        }
    }
}

impl BandDetectOptions {
    /// Create a new options builder
    pub fn builder() -> BandDetectOptionsBuilder {
        BandDetectOptionsBuilder::default()
    }

    /// Options that reject wide subtitles more aggressively
    pub fn strict() -> Self {
        Self {
            min_aspect_ratio: STRICT_MIN_ASPECT_RATIO,
            min_width_fraction: STRICT_MIN_WIDTH_FRACTION,
            ..Default::default()
        }
    }

    /// Options that accept shorter or taller bands
    pub fn lenient() -> Self {
        Self {
            min_aspect_ratio: LENIENT_MIN_ASPECT_RATIO,
            min_width_fraction: LENIENT_MIN_WIDTH_FRACTION,
            ..Default::default()
        }
    }

    /// First threshold that is NaN or infinite, with its value
    ///
    /// Clamping passes NaN through, so callers reading thresholds from
    /// outside check this first.
    pub fn non_finite_field(&self) -> Option<(&'static str, f64)> {
        [
            ("y_threshold", self.y_threshold),
            ("min_aspect_ratio", self.min_aspect_ratio),
            ("min_width_fraction", self.min_width_fraction),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
    }

    /// Re-apply the builder clamps, e.g. after loading from a file
    #[must_use]
    pub fn clamped(self) -> Self {
        let Self {
            y_threshold,
            min_aspect_ratio,
            min_width_fraction,
        } = self;
        Self::builder()
            .y_threshold(y_threshold)
            .min_aspect_ratio(min_aspect_ratio)
            .min_width_fraction(min_width_fraction)
            .build()
    }
}

/// Builder for BandDetectOptions
#[derive(Debug, Default)]
pub struct BandDetectOptionsBuilder {
    options: BandDetectOptions,
}

impl BandDetectOptionsBuilder {
    /// Set vertical clustering threshold (clamped to 1-1000 px)
    #[must_use]
    pub fn y_threshold(mut self, pixels: f64) -> Self {
        self.options.y_threshold = pixels.clamp(MIN_Y_THRESHOLD, MAX_Y_THRESHOLD);
        self
    }

    /// Set minimum width/height ratio (clamped to 1-50)
    #[must_use]
    pub fn min_aspect_ratio(mut self, ratio: f64) -> Self {
        self.options.min_aspect_ratio = ratio.clamp(MIN_ASPECT_RATIO_CLAMP, MAX_ASPECT_RATIO_CLAMP);
        self
    }

    /// Set minimum width fraction of the image (clamped to 0-1)
    #[must_use]
    pub fn min_width_fraction(mut self, fraction: f64) -> Self {
        self.options.min_width_fraction =
            fraction.clamp(MIN_WIDTH_FRACTION_CLAMP, MAX_WIDTH_FRACTION_CLAMP);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> BandDetectOptions {
        self.options
    }
}
