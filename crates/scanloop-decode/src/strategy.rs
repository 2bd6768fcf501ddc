//! Fallback chain of binarization/decode attempts for one preview frame.
//!
//! Order is fixed: hybrid on the natural orientation, hybrid on the
//! inverted view (optional), global histogram, hybrid on the other
//! orientation (optional). The first success wins.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use scanloop_core::{DecodeResult, Frame, FramingRect, LuminanceFrame, Roi, RoiCache};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Binarizer, BinaryBitmap, DecodeHints, Decoder};

/// One step of the fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    Adaptive,
    AdaptiveInverted,
    GlobalHistogram,
    RotatedAdaptive,
}

impl DecodeStrategy {
    pub fn binarizer(self) -> Binarizer {
        match self {
            DecodeStrategy::GlobalHistogram => Binarizer::GlobalHistogram,
            _ => Binarizer::Hybrid,
        }
    }
}

/// Record of one attempt within a decode cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeAttempt {
    pub strategy: DecodeStrategy,
    /// Whether the luminance grid was rotated 90° relative to the raw frame.
    pub rotated: bool,
    pub success: bool,
}

/// Result of running the chain over one frame.
#[derive(Clone, Debug, Default)]
pub struct DecodeOutcome {
    pub result: Option<DecodeResult>,
    pub attempts: Vec<DecodeAttempt>,
}

impl DecodeOutcome {
    /// Strategy of the successful attempt, if any.
    pub fn strategy(&self) -> Option<DecodeStrategy> {
        self.attempts
            .iter()
            .find(|a| a.success)
            .map(|a| a.strategy)
    }
}

/// Per-frame switches of the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyOptions {
    /// Try the inverted view (light symbols on dark background).
    pub support_luminance_invert: bool,
    /// Retry with the other orientation.
    pub support_vertical_code: bool,
    /// Attach a thumbnail of the decoded region.
    pub return_thumbnail: bool,
}

/// Runs the fallback chain with a reused decoder.
pub struct DecodeStrategyExecutor<D> {
    decoder: D,
    hints: DecodeHints,
    roi: RoiCache,
}

impl<D: Decoder> DecodeStrategyExecutor<D> {
    pub fn new(decoder: D, hints: DecodeHints, framing: FramingRect) -> Self {
        Self {
            decoder,
            hints,
            roi: RoiCache::new(framing),
        }
    }

    pub fn hints(&self) -> &DecodeHints {
        &self.hints
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Forget the cached ROI, e.g. after a resolution change.
    pub fn invalidate_roi(&mut self) {
        self.roi.invalidate();
    }

    /// Decode `frame`, trying strategies in order until one succeeds.
    ///
    /// Points in the returned result are in the coordinates of the
    /// (possibly rotated) grid that was decoded.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame, options), fields(width = frame.width, height = frame.height))
    )]
    pub fn execute(&mut self, frame: &Frame, options: &StrategyOptions) -> DecodeOutcome {
        let mut outcome = DecodeOutcome::default();

        // Sensor data is landscape; a portrait capture decodes rotated first.
        let natural_rotation = frame.portrait;
        let Some(upright) = self.view(frame, natural_rotation) else {
            return outcome;
        };

        let mut chain = vec![(DecodeStrategy::Adaptive, upright.clone())];
        if options.support_luminance_invert {
            chain.push((DecodeStrategy::AdaptiveInverted, upright.invert()));
        }
        chain.push((DecodeStrategy::GlobalHistogram, upright.clone()));

        for (strategy, view) in chain {
            if let Some(result) =
                self.attempt(strategy, natural_rotation, view, &upright, options, &mut outcome)
            {
                outcome.result = Some(result);
                return outcome;
            }
        }

        if options.support_vertical_code {
            let rotation = !natural_rotation;
            if let Some(view) = self.view(frame, rotation) {
                let source = view.clone();
                outcome.result = self.attempt(
                    DecodeStrategy::RotatedAdaptive,
                    rotation,
                    view,
                    &source,
                    options,
                    &mut outcome,
                );
            }
        }
        outcome
    }

    /// ROI-cropped luminance view of `frame`.
    fn view(&mut self, frame: &Frame, rotate: bool) -> Option<LuminanceFrame> {
        let full = match LuminanceFrame::from_frame(frame, rotate) {
            Ok(full) => full,
            Err(err) => {
                warn!("unusable frame: {err}");
                return None;
            }
        };
        let roi = self.roi.roi_for(full.size());
        match full.crop(roi) {
            Ok(view) => Some(view),
            Err(err) => {
                warn!("scanning window {roi:?} rejected: {err}; using full frame");
                Some(full)
            }
        }
    }

    fn attempt(
        &mut self,
        strategy: DecodeStrategy,
        rotated: bool,
        view: LuminanceFrame,
        source: &LuminanceFrame,
        options: &StrategyOptions,
        outcome: &mut DecodeOutcome,
    ) -> Option<DecodeResult> {
        let roi: Roi = view.roi();
        let hints = self
            .hints
            .with_point_offset(roi.left as f32, roi.top as f32);
        let bitmap = BinaryBitmap::new(view, strategy.binarizer());
        let decoded = self.decoder.decode(&bitmap, &hints);
        self.decoder.reset();

        let success = decoded.is_ok();
        outcome.attempts.push(DecodeAttempt {
            strategy,
            rotated,
            success,
        });

        match decoded {
            Ok(mut result) => {
                result.translate(roi.left as f32, roi.top as f32);
                if options.return_thumbnail {
                    result.thumbnail = Some(source.render_thumbnail());
                }
                debug!("{strategy:?} decoded a {} symbol", result.format);
                Some(result)
            }
            Err(err) => {
                debug!("{strategy:?} attempt failed: {err}");
                None
            }
        }
    }
}
