//! Belly Band Detection Implementation
//!
//! Turns a cover's OCR detections into a single belly band verdict:
//! row grouping, candidate building, best-candidate selection and result
//! assembly.

use super::geometry::{is_band_shape_with, merge_bounds, relative_position};
use super::grouping::group_rows;
use super::types::{
    BandAnalysis, BandCandidate, BandDetectOptions, BellyBandError, CoverDetections,
    DetectionResult, Result, RowGroup, TextDetection,
};
use rayon::prelude::*;

// ============================================================
// Candidate Building
// ============================================================

/// Merge a row group into a band candidate
///
/// Returns `None` when the merged box fails the band shape test; that is a
/// rejection, not an error.
pub fn build_candidate(
    group: &RowGroup<'_>,
    image_width: u32,
    image_height: u32,
    options: &BandDetectOptions,
) -> Option<BandCandidate> {
    let members = group.members();
    let bbox = merge_bounds(members.iter().map(|d| &d.polygon))?;

    if !is_band_shape_with(&bbox, image_width, options) {
        return None;
    }

    let text = members
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let confidence = members.iter().map(|d| d.confidence).sum::<f64>() / members.len() as f64;

    Some(BandCandidate {
        bbox,
        text,
        confidence,
        member_count: members.len(),
        relative_position: relative_position(&bbox, image_height),
    })
}

/// Build candidates for every row group, keeping top-to-bottom order
pub fn find_candidates(
    detections: &[TextDetection],
    image_width: u32,
    image_height: u32,
    options: &BandDetectOptions,
) -> Vec<BandCandidate> {
    let groups = group_rows(detections, options.y_threshold);
    let candidates: Vec<BandCandidate> = groups
        .iter()
        .filter_map(|g| build_candidate(g, image_width, image_height, options))
        .collect();

    tracing::debug!(
        detections = detections.len(),
        groups = groups.len(),
        candidates = candidates.len(),
        "belly band candidates"
    );

    candidates
}

// ============================================================
// Selection
// ============================================================

/// Index of the candidate with the highest `member_count * confidence`
///
/// Ties keep the first candidate encountered.
pub fn select_best_index(candidates: &[BandCandidate]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, candidate) in candidates.iter().enumerate() {
        let score = candidate.score();
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    best.map(|(i, _)| i)
}

/// Candidate with the highest `member_count * confidence`, or `None`
pub fn select_best(candidates: &[BandCandidate]) -> Option<&BandCandidate> {
    select_best_index(candidates).map(|i| &candidates[i])
}

// ============================================================
// Result Assembly
// ============================================================

/// Package the verdict for one image
pub fn assemble(
    detections: Vec<TextDetection>,
    candidates: &[BandCandidate],
    best: Option<&BandCandidate>,
) -> DetectionResult {
    match best {
        Some(best) => DetectionResult {
            has_band: true,
            band_text: Some(best.text.clone()),
            band_confidence: Some(best.confidence),
            bbox: Some(best.bbox),
            relative_position: Some(best.relative_position),
            candidate_count: candidates.len(),
            all_detections: detections,
        },
        None => DetectionResult::no_band(detections, candidates.len()),
    }
}

// ============================================================
// Entry Points
// ============================================================

/// Detect a belly band with default thresholds
pub fn detect(
    detections: &[TextDetection],
    image_width: u32,
    image_height: u32,
) -> Result<DetectionResult> {
    BellyBandDetector::detect(
        detections,
        image_width,
        image_height,
        &BandDetectOptions::default(),
    )
}

/// Stateless belly band detector
///
/// Holds no model or cache; every call depends only on its arguments, so
/// covers may be processed from any number of threads.
pub struct BellyBandDetector;

impl BellyBandDetector {
    /// Detect a belly band in one cover
    pub fn detect(
        detections: &[TextDetection],
        image_width: u32,
        image_height: u32,
        options: &BandDetectOptions,
    ) -> Result<DetectionResult> {
        Self::analyze(detections, image_width, image_height, options).map(|a| a.result)
    }

    /// Detect a belly band and keep every accepted candidate
    pub fn analyze(
        detections: &[TextDetection],
        image_width: u32,
        image_height: u32,
        options: &BandDetectOptions,
    ) -> Result<BandAnalysis> {
        Self::validate(detections, image_width, image_height)?;

        let candidates = find_candidates(detections, image_width, image_height, options);
        let best_index = select_best_index(&candidates);

        if let Some(best) = best_index.map(|i| &candidates[i]) {
            tracing::debug!(
                members = best.member_count,
                confidence = best.confidence,
                score = best.score(),
                position = best.relative_position,
                "belly band selected"
            );
        }

        let result = assemble(
            detections.to_vec(),
            &candidates,
            best_index.map(|i| &candidates[i]),
        );

        Ok(BandAnalysis {
            result,
            candidates,
            best_index,
        })
    }

    /// Reject zero-sized images and non-finite coordinates up front
    fn validate(detections: &[TextDetection], image_width: u32, image_height: u32) -> Result<()> {
        if image_width == 0 || image_height == 0 {
            return Err(BellyBandError::InvalidImageSize {
                width: image_width,
                height: image_height,
            });
        }

        if let Some(index) = detections
            .iter()
            .position(|d| !d.polygon.iter().all(|p| p.is_finite()))
        {
            return Err(BellyBandError::NonFiniteCoordinate { index });
        }

        Ok(())
    }
}

// ============================================================
// Batch Processing
// ============================================================

/// Process many covers in parallel; output order follows input order
pub fn detect_batch(
    covers: &[CoverDetections],
    options: &BandDetectOptions,
) -> Vec<Result<DetectionResult>> {
    covers
        .par_iter()
        .map(|c| BellyBandDetector::detect(&c.detections, c.width, c.height, options))
        .collect()
}

/// Statistics over a batch of detection results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub total: usize,
    pub with_band: usize,
    pub without_band: usize,
    pub errors: usize,
}

impl BatchStats {
    /// Create stats from batch results
    pub fn from_results(results: &[Result<DetectionResult>]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Default::default()
        };

        for r in results {
            match r {
                Ok(r) if r.has_band => stats.with_band += 1,
                Ok(_) => stats.without_band += 1,
                Err(_) => stats.errors += 1,
            }
        }

        stats
    }

    /// Fraction of covers with a belly band
    pub fn band_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.with_band as f64 / self.total as f64
    }
}
