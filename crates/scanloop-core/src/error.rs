use crate::{Roi, Size};

/// Errors raised while wrapping raw buffers as frames or views.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer too small (expected {expected} bytes, got {got})")]
    BufferTooSmall { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    EmptyFrame { width: usize, height: usize },

    #[error("region of interest is empty")]
    EmptyRoi,

    #[error("region of interest {roi:?} exceeds {}x{}", size.width, size.height)]
    RoiOutOfBounds { roi: Roi, size: Size },
}
