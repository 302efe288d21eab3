//! Belly band overlay rendering
//!
//! Outlines the selected band in green and the other accepted candidates in
//! yellow on a copy of the cover image. With a font loaded, the selected
//! band's text is written above its box; without one the label is skipped.

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::belly_band::{BandAnalysis, Point, Quad};

/// Selected band outline color
pub const BEST_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Other candidate outline color
pub const CANDIDATE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Selected band outline thickness (pixels)
pub const BEST_THICKNESS: u32 = 3;

/// Other candidate outline thickness (pixels)
pub const CANDIDATE_THICKNESS: u32 = 2;

/// Label prefix written above the selected band
pub const LABEL_PREFIX: &str = "Belly Band: ";

/// Band text characters kept in the label
pub const LABEL_MAX_CHARS: usize = 50;

/// Label font size (pixels)
pub const LABEL_SCALE: f32 = 24.0;

/// Label left margin (pixels)
const LABEL_X: i32 = 10;

/// Gap between label and box top (pixels)
const LABEL_GAP: i32 = 10;

/// Error type for overlay rendering
#[derive(Debug, Error)]
pub enum VisualizeError {
    #[error("Image loading failed: {0}")]
    ImageLoad(#[source] image::ImageError),

    #[error("Image saving failed: {0}")]
    Save(#[source] image::ImageError),

    #[error("Font {path} could not be read: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Font {0} is not a valid TrueType/OpenType font")]
    FontParse(PathBuf),
}

/// Load a label font from a TrueType/OpenType file
pub fn load_font(path: &Path) -> Result<FontVec, VisualizeError> {
    let data = std::fs::read(path).map_err(|source| VisualizeError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    let font =
        FontVec::try_from_vec(data).map_err(|_| VisualizeError::FontParse(path.to_path_buf()))?;
    tracing::debug!(path = %path.display(), "loaded label font");
    Ok(font)
}

/// Overlay label for a band text, truncated to `LABEL_MAX_CHARS` characters
pub fn band_label(text: &str) -> String {
    let kept: String = text.chars().take(LABEL_MAX_CHARS).collect();
    format!("{LABEL_PREFIX}{kept}")
}

/// Draw the analysis onto a copy of `image`
pub fn render_overlay(
    image: &DynamicImage,
    analysis: &BandAnalysis,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for (i, candidate) in analysis.candidates.iter().enumerate() {
        if Some(i) == analysis.best_index {
            continue;
        }
        draw_quad_outline(&mut canvas, &candidate.bbox, CANDIDATE_COLOR, CANDIDATE_THICKNESS);
    }

    // Winner last so it stays on top
    if let Some(best) = analysis.best() {
        let drawn = draw_quad_outline(&mut canvas, &best.bbox, BEST_COLOR, BEST_THICKNESS);
        if let (Some(rect), Some(font)) = (drawn, font) {
            let y = (rect.top() - LABEL_GAP - LABEL_SCALE as i32).max(0);
            draw_text_mut(
                &mut canvas,
                BEST_COLOR,
                LABEL_X,
                y,
                PxScale::from(LABEL_SCALE),
                font,
                &band_label(&best.text),
            );
        }
    }

    canvas
}

/// Render the overlay for `image_path` and save it to `output_path`
pub fn save_overlay(
    image_path: &Path,
    analysis: &BandAnalysis,
    output_path: &Path,
    font: Option<&FontVec>,
) -> Result<(), VisualizeError> {
    let image = image::open(image_path).map_err(VisualizeError::ImageLoad)?;
    render_overlay(&image, analysis, font)
        .save(output_path)
        .map_err(VisualizeError::Save)
}

/// Outline the bounds of `quad` on the canvas, growing outward by `thickness`
///
/// Returns the drawn rectangle, or `None` when the quad lies off the canvas.
fn draw_quad_outline(
    canvas: &mut RgbImage,
    quad: &Quad,
    color: Rgb<u8>,
    thickness: u32,
) -> Option<Rect> {
    let rect = quad_to_rect(quad, canvas.width(), canvas.height())?;

    for t in 0..thickness {
        let grown = Rect::at(
            rect.left().saturating_sub(t as i32),
            rect.top().saturating_sub(t as i32),
        )
        .of_size(
            rect.width().saturating_add(2 * t),
            rect.height().saturating_add(2 * t),
        );
        draw_hollow_rect_mut(canvas, grown, color);
    }

    Some(rect)
}

/// Pixel rectangle covering `quad`, clipped to a `width` x `height` canvas
///
/// `None` for non-finite input or a quad entirely outside the canvas.
fn quad_to_rect(quad: &Quad, width: u32, height: u32) -> Option<Rect> {
    if !quad.iter().all(Point::is_finite) {
        return None;
    }

    let min_x = quad.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = quad.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_x = quad.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let max_y = quad.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let (w, h) = (f64::from(width), f64::from(height));
    let left = min_x.floor().max(0.0);
    let top = min_y.floor().max(0.0);
    let right = max_x.ceil().min(w);
    let bottom = max_y.ceil().min(h);

    if left >= w || top >= h || right < 0.0 || bottom < 0.0 {
        return None;
    }

    // Rect panics on zero size
    let rect_width = ((right - left) as u32).max(1);
    let rect_height = ((bottom - top) as u32).max(1);
    Some(Rect::at(left as i32, top as i32).of_size(rect_width, rect_height))
}
