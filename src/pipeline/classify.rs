//! Formula-vs-illustration classification by aspect ratio.
//!
//! Equations that a Markdown exporter could not turn into LaTeX survive as
//! pictures, and Word renders those as thin strips one text line tall. An
//! aspect ratio beyond the threshold in either direction is therefore taken
//! to mean "formula". There is no ground truth here; the heuristic only has
//! to be cheap and deterministic.

use crate::error::ImageError;
use image::ImageReader;
use std::io::Cursor;

/// Default ratio used by [`crate::config::PublishConfig`].
pub const DEFAULT_FORMULA_RATIO: f64 = 5.0;

/// Classify an image from its pixel dimensions.
///
/// Returns `Err(ImageError::ZeroDimension)` instead of dividing by zero;
/// callers fall back to `false`.
pub fn classify(width: u32, height: u32, ratio: f64) -> Result<bool, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroDimension { width, height });
    }
    let (w, h) = (f64::from(width), f64::from(height));
    Ok(w / h > ratio || h / w > ratio)
}

/// Read `(width, height)` from encoded image bytes without decoding pixels.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::DecodeFailed {
            detail: e.to_string(),
        })?
        .into_dimensions()
        .map_err(|e| ImageError::DecodeFailed {
            detail: e.to_string(),
        })
}

/// Probe and classify in one step.
pub fn classify_bytes(bytes: &[u8], ratio: f64) -> Result<bool, ImageError> {
    let (width, height) = probe_dimensions(bytes)?;
    classify(width, height, ratio)
}
