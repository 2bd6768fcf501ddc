//! High-level facade crate for the `scanloop-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core data model and the decode crate,
//! - the [`CameraProvider`] contract and a shared [`CameraHandle`],
//! - the [`CaptureCoordinator`] state machine with its decode worker thread,
//! - [`CaptureConfig`], loadable from JSON,
//! - (feature `image`) a still-image camera fed from files on disk.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::time::Duration;
//! use scanloop::{CameraHandle, CaptureConfig, CaptureCoordinator, StillCamera};
//! # use scanloop::decode::{BinaryBitmap, DecodeFailure, DecodeHints, Decoder};
//! # struct MyDecoder;
//! # impl Decoder for MyDecoder {
//! #     fn decode(&mut self, _: &BinaryBitmap, _: &DecodeHints)
//! #         -> Result<scanloop::core::DecodeResult, DecodeFailure> { Err(DecodeFailure::NotFound) }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let frames = Vec::new();
//! let camera = CameraHandle::new(StillCamera::new(frames));
//! let mut session = CaptureCoordinator::new(
//!     CaptureConfig::default(),
//!     camera,
//!     MyDecoder,
//!     |result: &scanloop::core::DecodeResult| {
//!         println!("{}", result.text);
//!         false
//!     },
//! )?;
//! session.start()?;
//! let end = session.run_until_done(Duration::from_secs(1))?;
//! println!("session ended: {end:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `scanloop::core`: frames, ROI framing, luminance views, formats, results.
//! - `scanloop::decode`: binarizers, decoder contract, strategy chain, auto-zoom.
//! - [`CaptureCoordinator`]: session lifecycle and message pump.

pub use scanloop_core as core;
pub use scanloop_decode as decode;

pub use scanloop_core::{BarcodeFormat, DecodeResult, Frame, FramingRect, ResultPoint, Size};
pub use scanloop_decode::{AutoZoomConfig, DecodeAttempt, DecodeStrategy, Decoder};

mod camera;
mod config;
mod coordinator;
mod error;
mod inactivity;
mod still;
mod worker;

pub use camera::{CameraHandle, CameraProvider, FrameSink};
pub use config::{CaptureConfig, DecodeFormatsConfig, MAX_DELAY_MS, MAX_INACTIVITY_TIMEOUT_SECS};
pub use coordinator::{
    camera_to_screen, CaptureCoordinator, CaptureState, Overlay, ResultListener, SessionEnd,
};
pub use error::{CameraError, CaptureError, ConfigError};
pub use inactivity::InactivityTimer;
pub use still::StillCamera;

#[cfg(feature = "image")]
pub use still::{frame_from_gray, StillImageError};
