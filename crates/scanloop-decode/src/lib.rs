//! Decode side of scanloop: binarizers, the fallback strategy chain and
//! auto-zoom advice.
//!
//! The symbol decoder itself is pluggable through [`Decoder`]. With the
//! `rqrr` feature a QR-only implementation is provided.
//!
//! ```
//! use scanloop_core::{Frame, FramingRect};
//! use scanloop_decode::{
//!     BinaryBitmap, DecodeFailure, DecodeHints, DecodeStrategyExecutor, Decoder, StrategyOptions,
//! };
//!
//! struct Nothing;
//! impl Decoder for Nothing {
//!     fn decode(
//!         &mut self,
//!         _: &BinaryBitmap,
//!         _: &DecodeHints,
//!     ) -> Result<scanloop_core::DecodeResult, DecodeFailure> {
//!         Err(DecodeFailure::NotFound)
//!     }
//! }
//!
//! let frame = Frame::new(vec![128; 64 * 48], 64, 48, false).unwrap();
//! let mut exec = DecodeStrategyExecutor::new(Nothing, DecodeHints::default(), FramingRect::default());
//! let outcome = exec.execute(&frame, &StrategyOptions::default());
//! assert!(outcome.result.is_none());
//! assert_eq!(outcome.attempts.len(), 2);
//! ```

mod binarizer;
mod decoder;
#[cfg(feature = "rqrr")]
mod rqrr_decoder;
mod strategy;
mod zoom;

pub use binarizer::{Binarizer, BinaryBitmap, BitMatrix};
pub use decoder::{DecodeFailure, DecodeHints, Decoder, PointCallback};
#[cfg(feature = "rqrr")]
pub use rqrr_decoder::RqrrDecoder;
pub use strategy::{
    DecodeAttempt, DecodeOutcome, DecodeStrategy, DecodeStrategyExecutor, StrategyOptions,
};
pub use zoom::{AutoZoomAdvisor, AutoZoomConfig, ZoomAdvice, ZoomControl, ZoomError};
