//! Region-of-interest computation for preview frames.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::Size;

/// Axis-aligned rectangle in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    #[inline]
    pub const fn new(left: usize, top: usize, width: usize, height: usize) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The rectangle covering the whole frame.
    #[inline]
    pub const fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    #[inline]
    pub fn right(&self) -> usize {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rectangle lies entirely inside a frame of `size`.
    #[inline]
    pub fn fits_in(&self, size: Size) -> bool {
        self.right() <= size.width && self.bottom() <= size.height
    }
}

/// Screen-relative description of the scanning window.
///
/// The window is a centred square whose side is `ratio` times the shorter
/// frame side, shifted by the two offsets. With `full_screen` the whole frame
/// is scanned and the other fields are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingRect {
    pub full_screen: bool,
    /// Side of the window relative to `min(width, height)`; `0.625..=1.0` works well.
    pub ratio: f32,
    pub horizontal_offset: i32,
    pub vertical_offset: i32,
}

impl Default for FramingRect {
    fn default() -> Self {
        Self {
            full_screen: false,
            ratio: 0.9,
            horizontal_offset: 0,
            vertical_offset: 0,
        }
    }
}

impl FramingRect {
    /// Compute the ROI for a frame of `size`.
    ///
    /// Offsets that would push the window outside the frame are clamped so
    /// the window stays inside; a window that collapses to nothing falls back
    /// to the full frame.
    pub fn roi_for(&self, size: Size) -> Roi {
        if self.full_screen {
            return Roi::full(size);
        }
        let shorter = size.width.min(size.height);
        let side = ((shorter as f32) * self.ratio.clamp(0.0, 1.0)) as usize;
        if side == 0 {
            warn!(
                "framing ratio {} leaves an empty window on {}x{}; scanning full frame",
                self.ratio, size.width, size.height
            );
            return Roi::full(size);
        }
        let left = offset_origin(size.width, side, self.horizontal_offset);
        let top = offset_origin(size.height, side, self.vertical_offset);
        Roi::new(left, top, side, side)
    }
}

fn offset_origin(extent: usize, side: usize, offset: i32) -> usize {
    let centred = ((extent - side) / 2) as i64 + offset as i64;
    centred.clamp(0, (extent - side) as i64) as usize
}

/// Caches the ROI for the most recent frame dimensions.
///
/// The cache is keyed by frame size, so a resolution change (or the swapped
/// dimensions of a rotated retry) recomputes it.
#[derive(Clone, Debug, Default)]
pub struct RoiCache {
    framing: FramingRect,
    cached: Option<(Size, Roi)>,
}

impl RoiCache {
    pub fn new(framing: FramingRect) -> Self {
        Self {
            framing,
            cached: None,
        }
    }

    pub fn framing(&self) -> &FramingRect {
        &self.framing
    }

    /// ROI for `size`, computed on first use for that size.
    pub fn roi_for(&mut self, size: Size) -> Roi {
        match self.cached {
            Some((cached_size, roi)) if cached_size == size => roi,
            _ => {
                let roi = self.framing.roi_for(size);
                self.cached = Some((size, roi));
                roi
            }
        }
    }

    /// Drop the cached ROI, e.g. after the camera resolution changed.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_square_uses_ratio_of_short_side() {
        let framing = FramingRect {
            ratio: 0.75,
            ..FramingRect::default()
        };
        let roi = framing.roi_for(Size::new(640, 480));
        assert_eq!(roi, Roi::new(140, 60, 360, 360));
        assert!(roi.fits_in(Size::new(640, 480)));
    }

    #[test]
    fn full_screen_covers_frame() {
        let framing = FramingRect {
            full_screen: true,
            ..FramingRect::default()
        };
        assert_eq!(framing.roi_for(Size::new(320, 240)), Roi::new(0, 0, 320, 240));
    }

    #[test]
    fn offsets_shift_and_clamp() {
        let framing = FramingRect {
            ratio: 0.5,
            horizontal_offset: 20,
            vertical_offset: -1000,
            ..FramingRect::default()
        };
        let roi = framing.roi_for(Size::new(200, 100));
        assert_eq!(roi, Roi::new(95, 0, 50, 50));
    }

    #[test]
    fn zero_ratio_falls_back_to_full_frame() {
        let framing = FramingRect {
            ratio: 0.0,
            ..FramingRect::default()
        };
        assert_eq!(framing.roi_for(Size::new(10, 20)), Roi::full(Size::new(10, 20)));
    }

    #[test]
    fn cache_recomputes_on_size_change() {
        let mut cache = RoiCache::new(FramingRect {
            ratio: 0.75,
            ..FramingRect::default()
        });
        let landscape = cache.roi_for(Size::new(640, 480));
        let portrait = cache.roi_for(Size::new(480, 640));
        assert_eq!(landscape.size(), portrait.size());
        assert_eq!(portrait, Roi::new(60, 140, 360, 360));
        cache.invalidate();
        assert_eq!(cache.roi_for(Size::new(640, 480)), landscape);
    }

    #[test]
    fn framing_deserializes_with_defaults() {
        let framing: FramingRect = serde_json::from_str(r#"{"ratio": 0.75}"#).expect("json");
        assert_eq!(framing.ratio, 0.75);
        assert!(!framing.full_screen);
        assert_eq!(framing.vertical_offset, 0);
    }
}
