//! QR-only [`Decoder`] backed by `rqrr`.

use nalgebra::Point2;
use scanloop_core::{BarcodeFormat, DecodeResult, ResultPoint};

use crate::{BinaryBitmap, DecodeFailure, DecodeHints, Decoder};

/// Decodes QR codes from the bitmap's black matrix.
///
/// The binarizer chosen by the strategy chain decides which pixels are dark,
/// so inverted and global-histogram attempts really differ. Points are the
/// symbol corners ordered bottom-left, top-left, top-right, bottom-right.
#[derive(Clone, Copy, Debug, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn decode(
        &mut self,
        bitmap: &BinaryBitmap,
        hints: &DecodeHints,
    ) -> Result<DecodeResult, DecodeFailure> {
        if !hints.allows(BarcodeFormat::QrCode) {
            return Err(DecodeFailure::NotFound);
        }
        let matrix = bitmap.black_matrix().ok_or(DecodeFailure::NotFound)?;
        let mut prepared =
            rqrr::PreparedImage::prepare_from_bitmap(matrix.width(), matrix.height(), |x, y| {
                matrix.get(x, y)
            });
        let grids = prepared.detect_grids();

        let mut last_err = DecodeFailure::NotFound;
        for grid in &grids {
            let corner = |i: usize| -> ResultPoint {
                Point2::new(grid.bounds[i].x as f32, grid.bounds[i].y as f32)
            };
            let points = vec![corner(3), corner(0), corner(1), corner(2)];
            for p in &points {
                hints.found_point(*p);
            }
            match grid.decode() {
                Ok((_meta, text)) => {
                    return Ok(DecodeResult::new(text, BarcodeFormat::QrCode, points));
                }
                Err(err) => last_err = DecodeFailure::Format(format!("{err:?}")),
            }
        }
        Err(last_err)
    }
}
