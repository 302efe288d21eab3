//! Row grouping
//!
//! Clusters text detections into horizontal rows by vertical proximity.

use super::types::{RowGroup, TextDetection, MIN_GROUP_MEMBERS};

/// Group detections whose vertical centers lie close together
///
/// # Algorithm
/// 1. Sort detections by vertical center (stable, so equal centers keep
///    their input order)
/// 2. Sweep top to bottom; a detection joins the current group while
///    `|center - anchor| < y_threshold`, where the anchor is the center of
///    the group's first member and never moves
/// 3. A group is emitted when it closes with at least 2 members; singleton
///    runs are dropped
///
/// Groups come back in top-to-bottom order.
pub fn group_rows(detections: &[TextDetection], y_threshold: f64) -> Vec<RowGroup<'_>> {
    let mut ordered: Vec<(f64, &TextDetection)> = detections
        .iter()
        .map(|d| (d.vertical_center(), d))
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut sweep = ordered.into_iter();
    let mut current = match sweep.next() {
        Some((center, first)) => RowGroup::start(first, center),
        None => return Vec::new(),
    };

    let mut groups = Vec::new();
    for (center, detection) in sweep {
        if (center - current.anchor()).abs() < y_threshold {
            current.push(detection);
        } else {
            let closed = std::mem::replace(&mut current, RowGroup::start(detection, center));
            if closed.len() >= MIN_GROUP_MEMBERS {
                groups.push(closed);
            }
        }
    }

    if current.len() >= MIN_GROUP_MEMBERS {
        groups.push(current);
    }

    tracing::trace!(
        detections = detections.len(),
        groups = groups.len(),
        y_threshold,
        "grouped rows"
    );

    groups
}
