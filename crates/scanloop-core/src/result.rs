use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{BarcodeFormat, Thumbnail};

/// Finder/alignment point of a symbol, in frame pixels.
pub type ResultPoint = Point2<f32>;

/// A decoded symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodeResult {
    pub text: String,
    pub format: BarcodeFormat,
    /// Finder/alignment points in the order the decoder reported them.
    pub points: Vec<ResultPoint>,
    /// Rendered source region; present only when thumbnails were requested.
    #[serde(skip)]
    pub thumbnail: Option<Thumbnail>,
}

impl DecodeResult {
    pub fn new(text: impl Into<String>, format: BarcodeFormat, points: Vec<ResultPoint>) -> Self {
        Self {
            text: text.into(),
            format,
            points,
            thumbnail: None,
        }
    }

    /// Shift every point by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            p.x += dx;
            p.y += dy;
        }
    }

    /// Scale factor of the attached thumbnail, `1.0` without one.
    pub fn scale_factor(&self) -> f32 {
        self.thumbnail.as_ref().map_or(1.0, |t| t.scale_factor)
    }
}
