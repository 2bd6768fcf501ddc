//! Core data model of the scanloop capture/decode core.
//!
//! Preview frames, regions of interest, luminance views with the transforms
//! the decode chain needs (crop, invert, quarter-turn rotation), symbology
//! tags and decoded results. Nothing here knows about cameras, threads or a
//! concrete symbol decoder.

mod error;
mod format;
mod frame;
mod logger;
mod luminance;
mod result;
mod roi;
mod rotate;

pub use error::FrameError;
pub use format::{
    default_formats, parse_decode_formats, BarcodeFormat, FormatGroup, FormatSet, UnknownFormat,
};
pub use frame::{Frame, Size};
pub use luminance::{LuminanceFrame, Thumbnail, THUMBNAIL_SCALE_FACTOR};
pub use result::{DecodeResult, ResultPoint};
pub use roi::{FramingRect, Roi, RoiCache};
pub use rotate::{rotate_clockwise, rotate_counter_clockwise};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_env, LOG_ENV};
