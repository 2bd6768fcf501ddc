//! Contract for the external symbol decoder.

use std::fmt;
use std::sync::Arc;

use scanloop_core::{default_formats, BarcodeFormat, DecodeResult, FormatSet, ResultPoint};

use crate::BinaryBitmap;

/// Callback invoked with candidate finder points while a decode is running.
pub type PointCallback = Arc<dyn Fn(ResultPoint) + Send + Sync>;

/// Why a single decode attempt produced nothing.
///
/// The strategy chain treats every variant the same way ("this attempt
/// failed"); the distinction only reaches the logs.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("no symbol found")]
    NotFound,
    #[error("symbol checksum mismatch")]
    Checksum,
    #[error("malformed symbol: {0}")]
    Format(String),
}

/// Options handed to the decoder with every bitmap.
#[derive(Clone)]
pub struct DecodeHints {
    pub possible_formats: FormatSet,
    pub character_set: Option<String>,
    /// Spend more time looking for a symbol.
    pub try_harder: bool,
    pub point_callback: Option<PointCallback>,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self {
            possible_formats: default_formats(),
            character_set: None,
            try_harder: false,
            point_callback: None,
        }
    }
}

impl DecodeHints {
    /// Whether `format` may be reported.
    pub fn allows(&self, format: BarcodeFormat) -> bool {
        self.possible_formats.contains(&format)
    }

    /// Report a candidate point through the callback, if any.
    pub fn found_point(&self, point: ResultPoint) {
        if let Some(cb) = &self.point_callback {
            cb(point);
        }
    }

    /// Copy whose point callback shifts every point by `(dx, dy)` before
    /// passing it on.
    pub fn with_point_offset(&self, dx: f32, dy: f32) -> DecodeHints {
        let mut hints = self.clone();
        if let Some(inner) = self.point_callback.clone() {
            if dx != 0.0 || dy != 0.0 {
                hints.point_callback = Some(Arc::new(move |p: ResultPoint| {
                    inner(ResultPoint::new(p.x + dx, p.y + dy))
                }));
            }
        }
        hints
    }
}

impl fmt::Debug for DecodeHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeHints")
            .field("possible_formats", &self.possible_formats)
            .field("character_set", &self.character_set)
            .field("try_harder", &self.try_harder)
            .field("point_callback", &self.point_callback.is_some())
            .finish()
    }
}

/// A barcode symbol decoder.
///
/// Implementations are assumed non-reentrant: [`Decoder::reset`] is called
/// after every attempt so no state leaks from one bitmap to the next.
/// Reported points are relative to the bitmap's luminance view.
pub trait Decoder {
    fn decode(
        &mut self,
        bitmap: &BinaryBitmap,
        hints: &DecodeHints,
    ) -> Result<DecodeResult, DecodeFailure>;

    fn reset(&mut self) {}
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(
        &mut self,
        bitmap: &BinaryBitmap,
        hints: &DecodeHints,
    ) -> Result<DecodeResult, DecodeFailure> {
        (**self).decode(bitmap, hints)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
