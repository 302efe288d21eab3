//! Belly Band Detection module
//!
//! Decides whether a book cover carries a belly band (a promotional strip
//! wrapped around the cover) from the cover's OCR text detections.
//!
//! # Pipeline
//!
//! 1. Row grouping: cluster detections by vertical center
//! 2. Candidate building: merge each row into one box, keep band-shaped rows
//! 3. Selection: highest `member_count * confidence` wins
//! 4. Assembly: verdict, winning text/box/position and the raw detections
//!
//! The module never loads images or runs OCR; callers pass detections in.

mod detect;
mod geometry;
mod grouping;
mod types;

pub use detect::{
    assemble, build_candidate, detect, detect_batch, find_candidates, select_best,
    select_best_index, BatchStats, BellyBandDetector,
};
pub use geometry::{
    axis_aligned_quad, edge_lengths, is_band_shape, is_band_shape_with, merge_bounds,
    relative_position, vertical_center,
};
pub use grouping::group_rows;
pub use types::*;
