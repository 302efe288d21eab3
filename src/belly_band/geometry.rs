//! Band geometry
//!
//! Shape test for horizontal promotional strips plus the box arithmetic used
//! when row groups are merged into candidates.

use super::types::{BandDetectOptions, Point, Quad};

/// Width and height of a quad, measured along its first two edges
///
/// Width is the `p0 -> p1` edge, height the `p1 -> p2` edge. No axis
/// alignment is assumed.
pub fn edge_lengths(polygon: &Quad) -> (f64, f64) {
    let width = polygon[1].distance_to(&polygon[0]);
    let height = polygon[2].distance_to(&polygon[1]);
    (width, height)
}

/// Check whether a polygon looks like a belly band, using default thresholds
///
/// `image_height` is part of the contract but only the width ratio depends on
/// the image.
pub fn is_band_shape(polygon: &Quad, image_width: u32, _image_height: u32) -> bool {
    is_band_shape_with(polygon, image_width, &BandDetectOptions::default())
}

/// Check whether a polygon is elongated and wide enough to be a band
///
/// Non-finite measurements fail both tests. Height is never a divisor.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn is_band_shape_with(polygon: &Quad, image_width: u32, options: &BandDetectOptions) -> bool {
    let (width, height) = edge_lengths(polygon);

    // Elongation
    if !(width >= height * options.min_aspect_ratio) {
        return false;
    }

    // Coverage of the cover width
    if !(width >= image_width as f64 * options.min_width_fraction) {
        return false;
    }

    true
}

/// Mean of the four y-coordinates
pub fn vertical_center(polygon: &Quad) -> f64 {
    polygon.iter().map(|p| p.y).sum::<f64>() / polygon.len() as f64
}

/// Build an axis-aligned quad in top-left, top-right, bottom-right,
/// bottom-left order
pub fn axis_aligned_quad(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Quad {
    [
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ]
}

/// Axis-aligned bounds over every vertex of the given polygons
///
/// Returns `None` for an empty input.
pub fn merge_bounds<'a, I>(polygons: I) -> Option<Quad>
where
    I: IntoIterator<Item = &'a Quad>,
{
    let mut bounds: Option<(f64, f64, f64, f64)> = None;

    for p in polygons.into_iter().flatten() {
        bounds = Some(match bounds {
            None => (p.x, p.y, p.x, p.y),
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(p.x),
                min_y.min(p.y),
                max_x.max(p.x),
                max_y.max(p.y),
            ),
        });
    }

    bounds.map(|(min_x, min_y, max_x, max_y)| axis_aligned_quad(min_x, min_y, max_x, max_y))
}

/// Vertical center of a box as a fraction of the image height (not clamped)
pub fn relative_position(bbox: &Quad, image_height: u32) -> f64 {
    vertical_center(bbox) / image_height as f64
}
