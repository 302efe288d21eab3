//! OCR detection input
//!
//! Reads per-cover JSON dumps written by an external OCR engine. Each
//! detection is either an object or an EasyOCR `readtext` tuple:
//!
//! ```json
//! { "image": "cover.jpg", "width": 1000, "height": 1500,
//!   "detections": [
//!     { "polygon": [[0,0],[400,0],[400,40],[0,40]], "text": "정가", "confidence": 0.9 },
//!     [[[420,0],[900,0],[900,40],[420,40]], "15,000원", 0.88]
//!   ] }
//! ```
//!
//! `width`/`height` may be left out; the cover image is then probed for its
//! size without decoding pixels.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::belly_band::{BellyBandError, CoverDetections, Point, TextDetection};

/// Error type for OCR dump loading
#[derive(Debug, Error)]
pub enum OcrInputError {
    #[error("Detection file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid detection in {path}: {error}")]
    Detection { path: PathBuf, error: BellyBandError },

    #[error("Image size missing in {0} and no cover image to probe")]
    MissingDimensions(PathBuf),

    #[error("Image probe failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OcrInputError>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDetection {
    Object {
        polygon: Vec<Point>,
        #[serde(default)]
        text: String,
        confidence: f64,
    },
    Tuple(Vec<Point>, String, f64),
}

impl RawDetection {
    fn into_parts(self) -> (Vec<Point>, String, f64) {
        match self {
            RawDetection::Object {
                polygon,
                text,
                confidence,
            } => (polygon, text, confidence),
            RawDetection::Tuple(polygon, text, confidence) => (polygon, text, confidence),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDump {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

/// Parsed OCR output for one cover
#[derive(Debug, Clone)]
pub struct OcrDump {
    /// File the dump was read from
    pub source: PathBuf,
    /// Cover image file name, if recorded
    pub image_file: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub detections: Vec<TextDetection>,
}

impl OcrDump {
    /// Load and validate a dump file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OcrInputError::NotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::parse(&json, path)
    }

    /// Parse dump JSON; `source` is kept for error messages and image lookup
    pub fn parse(json: &str, source: &Path) -> Result<Self> {
        let raw: RawDump = serde_json::from_str(json)?;

        let detections = raw
            .detections
            .into_iter()
            .enumerate()
            .map(|(index, d)| {
                let (points, text, confidence) = d.into_parts();
                TextDetection::from_points(index, &points, text, confidence).map_err(|error| {
                    OcrInputError::Detection {
                        path: source.to_path_buf(),
                        error,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: source.to_path_buf(),
            image_file: raw.image,
            width: raw.width,
            height: raw.height,
            detections,
        })
    }

    /// File stem of the dump, used to name reports
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Locate the cover image
    ///
    /// The recorded `image` name is resolved against `images_dir`, falling
    /// back to the dump's own directory.
    pub fn image_path(&self, images_dir: Option<&Path>) -> Option<PathBuf> {
        let name = self.image_file.as_ref()?;
        let dir = match images_dir {
            Some(dir) => dir.to_path_buf(),
            None => self
                .source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        Some(dir.join(name))
    }

    /// Image size from the dump, or probed from the cover image
    pub fn dimensions(&self, images_dir: Option<&Path>) -> Result<(u32, u32)> {
        if let (Some(w), Some(h)) = (self.width, self.height) {
            return Ok((w, h));
        }

        let image_path = self
            .image_path(images_dir)
            .filter(|p| p.exists())
            .ok_or_else(|| OcrInputError::MissingDimensions(self.source.clone()))?;

        let (w, h) = image::image_dimensions(&image_path)?;
        tracing::debug!(path = %image_path.display(), w, h, "probed cover size");
        Ok((w, h))
    }

    /// Convert into detector input
    pub fn into_cover(self, images_dir: Option<&Path>) -> Result<CoverDetections> {
        let (width, height) = self.dimensions(images_dir)?;
        Ok(CoverDetections::new(width, height, self.detections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const DUMP: &str = r#"{
        "image": "cover.jpg",
        "width": 1000,
        "height": 1500,
        "detections": [
            { "polygon": [[0, 1180], [360, 1180], [360, 1220], [0, 1220]],
              "text": "정가 15,000원", "confidence": 0.92 },
            [[[350, 1195], [700, 1195], [700, 1235], [350, 1235]], "2024 올해의 소설", 0.88]
        ]
    }"#;

    #[test]
    fn test_parse_both_detection_forms() {
        let dump = OcrDump::parse(DUMP, Path::new("dumps/cover.json")).unwrap();
        assert_eq!(dump.image_file.as_deref(), Some("cover.jpg"));
        assert_eq!((dump.width, dump.height), (Some(1000), Some(1500)));
        assert_eq!(dump.detections.len(), 2);
        assert_eq!(dump.detections[0].text, "정가 15,000원");
        assert_eq!(dump.detections[1].polygon[2], Point::new(700.0, 1235.0));
        assert_eq!(dump.detections[1].confidence, 0.88);
        assert_eq!(dump.stem(), "cover");
    }

    #[test]
    fn test_parse_empty_detections() {
        let dump = OcrDump::parse(r#"{"width": 10, "height": 10}"#, Path::new("x.json")).unwrap();
        assert!(dump.detections.is_empty());
        assert!(dump.image_file.is_none());
    }

    #[test]
    fn test_parse_rejects_three_point_polygon() {
        let json = r#"{"width": 10, "height": 10, "detections": [
            {"polygon": [[0,0],[5,0],[5,5]], "text": "x", "confidence": 0.5}
        ]}"#;
        let err = OcrDump::parse(json, Path::new("bad.json")).unwrap_err();
        assert!(matches!(
            err,
            OcrInputError::Detection {
                error: BellyBandError::MalformedPolygon { index: 0, points: 3 },
                ..
            }
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            OcrDump::parse("{not json", Path::new("x.json")),
            Err(OcrInputError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = OcrDump::load(Path::new("/nonexistent/cover.json"));
        assert!(matches!(result, Err(OcrInputError::NotFound(_))));
    }

    #[test]
    fn test_image_path_resolution() {
        let dump = OcrDump::parse(DUMP, Path::new("/data/dumps/cover.json")).unwrap();
        assert_eq!(
            dump.image_path(None),
            Some(PathBuf::from("/data/dumps/cover.jpg"))
        );
        assert_eq!(
            dump.image_path(Some(Path::new("/data/covers"))),
            Some(PathBuf::from("/data/covers/cover.jpg"))
        );
    }

    #[test]
    fn test_dimensions_missing_without_image() {
        let dump = OcrDump::parse(r#"{"detections": []}"#, Path::new("x.json")).unwrap();
        assert!(matches!(
            dump.dimensions(None),
            Err(OcrInputError::MissingDimensions(_))
        ));
    }

    #[test]
    fn test_dimensions_read_from_image() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(64, 96, Rgb([255, 255, 255]))
            .save(dir.path().join("cover.png"))
            .unwrap();
        let dump_path = dir.path().join("cover.json");
        std::fs::write(&dump_path, r#"{"image": "cover.png", "detections": []}"#).unwrap();

        let cover = OcrDump::load(&dump_path).unwrap().into_cover(None).unwrap();
        assert_eq!((cover.width, cover.height), (64, 96));
        assert!(cover.detections.is_empty());
    }
}
