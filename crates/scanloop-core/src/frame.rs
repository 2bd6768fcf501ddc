use serde::{Deserialize, Serialize};

use crate::FrameError;

/// Width/height pair in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    #[inline]
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Same extent with the axes exchanged.
    #[inline]
    pub const fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    #[inline]
    pub fn area(self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_portrait(self) -> bool {
        self.width < self.height
    }
}

/// One preview frame as handed over by a camera provider.
///
/// `data` is a row-major single-channel buffer whose first `width * height`
/// bytes are luminance samples (the Y plane of a YUV preview frame satisfies
/// this). `portrait` records the screen orientation at capture time: sensor
/// data is landscape, so portrait captures are decoded rotated.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub portrait: bool,
}

impl Frame {
    /// Build a frame, checking that the buffer covers `width * height` samples.
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        portrait: bool,
    ) -> Result<Self, FrameError> {
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
            width,
            height,
            portrait,
        })
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}
