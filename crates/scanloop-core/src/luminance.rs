//! Luminance grid views over preview buffers.

use std::borrow::Cow;
use std::sync::Arc;

use crate::{rotate_clockwise, Frame, FrameError, Roi, Size};

/// Thumbnails are rendered at half resolution.
pub const THUMBNAIL_SCALE_FACTOR: usize = 2;

/// Gray-scale view over a shared sample buffer.
///
/// Views are cheap to clone: cropping and inversion only change the window
/// and the polarity flag, never the shared buffer. All coordinates passed to
/// accessors are relative to the view's ROI.
#[derive(Clone, Debug)]
pub struct LuminanceFrame {
    data: Arc<[u8]>,
    data_width: usize,
    data_height: usize,
    roi: Roi,
    inverted: bool,
}

impl LuminanceFrame {
    /// Wrap `data` (row-major, at least `width * height` bytes) as a full-frame view.
    pub fn new(data: Arc<[u8]>, width: usize, height: usize) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyFrame { width, height });
        }
        let expected = width * height;
        if data.len() < expected {
            return Err(FrameError::BufferTooSmall {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            data_width: width,
            data_height: height,
            roi: Roi::full(Size::new(width, height)),
            inverted: false,
        })
    }

    /// Build the full-frame view of a preview frame, optionally rotated 90°
    /// clockwise (width and height swap).
    pub fn from_frame(frame: &Frame, rotate: bool) -> Result<Self, FrameError> {
        Self::from_samples(&frame.data, frame.size(), rotate)
    }

    /// Like [`LuminanceFrame::from_frame`] but for a bare sample buffer.
    pub fn from_samples(samples: &[u8], size: Size, rotate: bool) -> Result<Self, FrameError> {
        let expected = size.area();
        if samples.len() < expected {
            return Err(FrameError::BufferTooSmall {
                expected,
                got: samples.len(),
            });
        }
        if rotate {
            let rotated = rotate_clockwise(samples, size.width, size.height);
            Self::new(Arc::from(rotated), size.height, size.width)
        } else {
            Self::new(Arc::from(&samples[..expected]), size.width, size.height)
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.roi.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.roi.height
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.roi.size()
    }

    /// Dimensions of the underlying buffer.
    #[inline]
    pub fn data_size(&self) -> Size {
        Size::new(self.data_width, self.data_height)
    }

    /// Window into the underlying buffer, in buffer coordinates.
    #[inline]
    pub fn roi(&self) -> Roi {
        self.roi
    }

    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    #[inline]
    fn sample(&self, v: u8) -> u8 {
        if self.inverted {
            255 - v
        } else {
            v
        }
    }

    /// Sample at `(x, y)` inside the view.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        debug_assert!(x < self.roi.width && y < self.roi.height);
        let idx = (self.roi.top + y) * self.data_width + self.roi.left + x;
        self.sample(self.data[idx])
    }

    /// Copy row `y` of the view into `buf` and return it.
    pub fn row<'b>(&self, y: usize, buf: &'b mut Vec<u8>) -> &'b [u8] {
        let start = (self.roi.top + y) * self.data_width + self.roi.left;
        let src = &self.data[start..start + self.roi.width];
        buf.clear();
        if self.inverted {
            buf.extend(src.iter().map(|&v| 255 - v));
        } else {
            buf.extend_from_slice(src);
        }
        buf.as_slice()
    }

    /// All samples of the view, row-major.
    ///
    /// Borrows the buffer when the view covers it whole and is not inverted;
    /// otherwise copies.
    pub fn matrix(&self) -> Cow<'_, [u8]> {
        let full = self.roi == Roi::full(self.data_size());
        if full && !self.inverted {
            return Cow::Borrowed(&self.data[..self.data_width * self.data_height]);
        }
        let mut out = Vec::with_capacity(self.roi.width * self.roi.height);
        let mut row = Vec::with_capacity(self.roi.width);
        for y in 0..self.roi.height {
            out.extend_from_slice(self.row(y, &mut row));
        }
        Cow::Owned(out)
    }

    /// Narrow the view to `roi`, given relative to the current view.
    pub fn crop(&self, roi: Roi) -> Result<Self, FrameError> {
        if roi.is_empty() {
            return Err(FrameError::EmptyRoi);
        }
        if !roi.fits_in(self.size()) {
            return Err(FrameError::RoiOutOfBounds {
                roi,
                size: self.size(),
            });
        }
        Ok(Self {
            roi: Roi::new(
                self.roi.left + roi.left,
                self.roi.top + roi.top,
                roi.width,
                roi.height,
            ),
            ..self.clone()
        })
    }

    /// View with every sample replaced by `255 - v`; the source is untouched.
    pub fn invert(&self) -> Self {
        Self {
            inverted: !self.inverted,
            ..self.clone()
        }
    }

    /// Half-resolution rendering of the view.
    pub fn render_thumbnail(&self) -> Thumbnail {
        let width = self.roi.width / THUMBNAIL_SCALE_FACTOR;
        let height = self.roi.height / THUMBNAIL_SCALE_FACTOR;
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(self.get(x * THUMBNAIL_SCALE_FACTOR, y * THUMBNAIL_SCALE_FACTOR));
            }
        }
        let scale_factor = if self.roi.width == 0 {
            1.0
        } else {
            width as f32 / self.roi.width as f32
        };
        Thumbnail {
            width,
            height,
            pixels,
            scale_factor,
        }
    }
}

/// Downsampled gray rendering of the frame region a symbol was decoded from.
#[derive(Clone, Debug, PartialEq)]
pub struct Thumbnail {
    pub width: usize,
    pub height: usize,
    /// Row-major gray samples.
    pub pixels: Vec<u8>,
    /// `width / source_width`; multiply frame coordinates by it to land on the thumbnail.
    pub scale_factor: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(width: usize, height: usize) -> LuminanceFrame {
        let data: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
        LuminanceFrame::new(Arc::from(data), width, height).expect("frame")
    }

    #[test]
    fn full_view_borrows_matrix() {
        let lum = ramp(4, 3);
        assert!(matches!(lum.matrix(), Cow::Borrowed(_)));
        assert_eq!(lum.get(3, 2), 11);
    }

    #[test]
    fn crop_offsets_accessors() {
        let lum = ramp(4, 4).crop(Roi::new(1, 2, 2, 2)).expect("crop");
        assert_eq!(lum.size(), Size::new(2, 2));
        assert_eq!(lum.get(0, 0), 9);
        assert_eq!(&*lum.matrix(), &[9, 10, 13, 14]);
        let mut buf = Vec::new();
        assert_eq!(lum.row(1, &mut buf), &[13, 14]);
    }

    #[test]
    fn crop_rejects_out_of_bounds() {
        let lum = ramp(4, 4);
        assert!(matches!(
            lum.crop(Roi::new(3, 0, 2, 1)),
            Err(FrameError::RoiOutOfBounds { .. })
        ));
        assert!(matches!(lum.crop(Roi::new(0, 0, 0, 1)), Err(FrameError::EmptyRoi)));
    }

    #[test]
    fn invert_leaves_source_intact() {
        let lum = ramp(2, 2);
        let inv = lum.invert();
        assert!(inv.is_inverted());
        assert_eq!(inv.get(1, 1), 252);
        assert_eq!(lum.get(1, 1), 3);
        assert_eq!(&*inv.invert().matrix(), &*lum.matrix());
    }

    #[test]
    fn rotated_view_swaps_dimensions() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 3, 2, false).expect("frame");
        let lum = LuminanceFrame::from_frame(&frame, true).expect("lum");
        assert_eq!(lum.size(), Size::new(2, 3));
        assert_eq!(&*lum.matrix(), &[4, 1, 5, 2, 6, 3]);
    }

    #[test]
    fn thumbnail_halves_resolution() {
        let lum = ramp(8, 6).crop(Roi::new(0, 0, 6, 6)).expect("crop");
        let thumb = lum.render_thumbnail();
        assert_eq!((thumb.width, thumb.height), (3, 3));
        assert_eq!(thumb.pixels[0], 0);
        assert_eq!(thumb.pixels[4], 18);
        assert_relative_eq!(thumb.scale_factor, 0.5);
    }
}
