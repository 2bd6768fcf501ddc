//! Auto-zoom advice for small QR codes.
//!
//! A QR code whose finder pattern spans less than a fifth of the frame width
//! is probably far away. The advisor bumps the camera zoom by a fifth of its
//! range and asks the caller to hold the result back briefly, so the zoomed
//! preview is visible before the result is delivered.

use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use scanloop_core::{BarcodeFormat, DecodeResult, ResultPoint};

/// Camera zoom as seen by the advisor.
pub trait ZoomControl {
    /// Highest zoom level, `None` when the camera cannot zoom.
    fn max_zoom(&self) -> Option<u32>;

    fn current_zoom(&self) -> u32;

    fn set_zoom(&mut self, level: u32) -> Result<(), ZoomError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoomError {
    #[error("zoom is not supported by this camera")]
    Unsupported,
    #[error("camera rejected zoom change: {0}")]
    Rejected(String),
}

/// Tunables of the advisor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoZoomConfig {
    pub enabled: bool,
    /// Symbols smaller than `frame_width / min_size_divisor` trigger a zoom.
    pub min_size_divisor: u32,
    /// Minimum time between two zoom actions.
    pub debounce_ms: u64,
    /// Each zoom action adds `max_zoom / zoom_step_divisor`.
    pub zoom_step_divisor: u32,
    /// How long a result is held back after zooming.
    pub defer_ms: u64,
}

impl Default for AutoZoomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size_divisor: 5,
            debounce_ms: 1000,
            zoom_step_divisor: 5,
            defer_ms: 300,
        }
    }
}

/// What to do with a just-decoded result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomAdvice {
    DeliverNow,
    /// Zoom was applied; deliver after the given delay.
    Defer(Duration),
}

#[derive(Debug)]
pub struct AutoZoomAdvisor {
    config: AutoZoomConfig,
    last_zoom: Option<Instant>,
}

impl AutoZoomAdvisor {
    pub fn new(config: AutoZoomConfig) -> Self {
        Self {
            config,
            last_zoom: None,
        }
    }

    pub fn config(&self) -> &AutoZoomConfig {
        &self.config
    }

    /// Decide whether `result` is small enough to zoom in on.
    ///
    /// `frame_width` is the width of the grid the points are expressed in.
    pub fn advise(
        &mut self,
        result: &DecodeResult,
        frame_width: usize,
        now: Instant,
        camera: &mut dyn ZoomControl,
    ) -> ZoomAdvice {
        if !self.config.enabled || result.format != BarcodeFormat::QrCode {
            return ZoomAdvice::DeliverNow;
        }
        let Some(size) = symbol_size(&result.points) else {
            return ZoomAdvice::DeliverNow;
        };
        // Compared in whole pixels.
        let threshold = frame_width / self.config.min_size_divisor.max(1) as usize;
        if size as usize >= threshold {
            return ZoomAdvice::DeliverNow;
        }
        if let Some(last) = self.last_zoom {
            if now.saturating_duration_since(last) < Duration::from_millis(self.config.debounce_ms)
            {
                return ZoomAdvice::DeliverNow;
            }
        }

        let max = match camera.max_zoom() {
            Some(max) if max > 0 => max,
            _ => return ZoomAdvice::DeliverNow,
        };
        let current = camera.current_zoom();
        if current >= max {
            return ZoomAdvice::DeliverNow;
        }
        let step = (max / self.config.zoom_step_divisor.max(1)).max(1);
        let target = current.saturating_add(step).min(max);
        if let Err(err) = camera.set_zoom(target) {
            warn!("auto-zoom to {target} failed: {err}");
            return ZoomAdvice::DeliverNow;
        }

        debug!("symbol spans {size:.1}px < {threshold}px, zoom {current} -> {target}");
        self.last_zoom = Some(now);
        ZoomAdvice::Defer(Duration::from_millis(self.config.defer_ms))
    }
}

/// Largest pairwise distance among the first three points.
fn symbol_size(points: &[ResultPoint]) -> Option<f32> {
    if points.len() < 3 {
        return None;
    }
    let (a, b, c) = (points[0], points[1], points[2]);
    let ab = nalgebra::distance(&a, &b);
    let bc = nalgebra::distance(&b, &c);
    let ac = nalgebra::distance(&a, &c);
    Some(ab.max(bc).max(ac))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    struct FakeZoom {
        max: Option<u32>,
        zoom: u32,
        fail: bool,
        calls: usize,
    }

    impl FakeZoom {
        fn new(max: Option<u32>) -> Self {
            Self {
                max,
                zoom: 0,
                fail: false,
                calls: 0,
            }
        }
    }

    impl ZoomControl for FakeZoom {
        fn max_zoom(&self) -> Option<u32> {
            self.max
        }

        fn current_zoom(&self) -> u32 {
            self.zoom
        }

        fn set_zoom(&mut self, level: u32) -> Result<(), ZoomError> {
            self.calls += 1;
            if self.fail {
                return Err(ZoomError::Rejected("busy".into()));
            }
            self.zoom = level;
            Ok(())
        }
    }

    /// QR with finder points spanning `side` pixels.
    fn qr(side: f32) -> DecodeResult {
        DecodeResult::new(
            "x",
            BarcodeFormat::QrCode,
            vec![
                Point2::new(10.0, 10.0 + side),
                Point2::new(10.0, 10.0),
                Point2::new(10.0 + side, 10.0),
            ],
        )
    }

    #[test]
    fn symbol_size_is_longest_side() {
        let size = symbol_size(&qr(30.0).points).unwrap();
        approx::assert_relative_eq!(size, 30.0 * std::f32::consts::SQRT_2, epsilon = 1e-4);
        assert!(symbol_size(&[Point2::new(0.0, 0.0)]).is_none());
    }

    #[test]
    fn small_qr_zooms_and_defers() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig::default());
        let mut cam = FakeZoom::new(Some(60));
        let advice = advisor.advise(&qr(20.0), 640, Instant::now(), &mut cam);
        assert_eq!(advice, ZoomAdvice::Defer(Duration::from_millis(300)));
        assert_eq!(cam.zoom, 12);
    }

    #[test]
    fn large_qr_delivered_immediately() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig::default());
        let mut cam = FakeZoom::new(Some(60));
        // 640 / 5 = 128; diagonal of a 100px symbol exceeds it.
        let advice = advisor.advise(&qr(100.0), 640, Instant::now(), &mut cam);
        assert_eq!(advice, ZoomAdvice::DeliverNow);
        assert_eq!(cam.calls, 0);
    }

    #[test]
    fn threshold_compares_whole_pixels() {
        let spanning = |len: f32| {
            DecodeResult::new(
                "x",
                BarcodeFormat::QrCode,
                vec![
                    Point2::new(10.0, 10.0),
                    Point2::new(10.0 + len, 10.0),
                    Point2::new(10.0, 10.0),
                ],
            )
        };
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig {
            debounce_ms: 0,
            ..AutoZoomConfig::default()
        });
        // 642 / 5 = 128 and 128.3 truncates to 128: large enough.
        let mut cam = FakeZoom::new(Some(60));
        assert_eq!(
            advisor.advise(&spanning(128.3), 642, Instant::now(), &mut cam),
            ZoomAdvice::DeliverNow
        );
        assert_eq!(cam.calls, 0);

        // 645 / 5 = 129.
        assert!(matches!(
            advisor.advise(&spanning(128.3), 645, Instant::now(), &mut cam),
            ZoomAdvice::Defer(_)
        ));
    }

    #[test]
    fn second_zoom_within_debounce_is_skipped() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig::default());
        let mut cam = FakeZoom::new(Some(60));
        let t0 = Instant::now();

        assert!(matches!(
            advisor.advise(&qr(20.0), 640, t0, &mut cam),
            ZoomAdvice::Defer(_)
        ));
        let soon = t0 + Duration::from_millis(400);
        assert_eq!(
            advisor.advise(&qr(20.0), 640, soon, &mut cam),
            ZoomAdvice::DeliverNow
        );
        assert_eq!(cam.zoom, 12);

        let later = t0 + Duration::from_millis(1000);
        assert!(matches!(
            advisor.advise(&qr(20.0), 640, later, &mut cam),
            ZoomAdvice::Defer(_)
        ));
        assert_eq!(cam.zoom, 24);
    }

    #[test]
    fn zoom_clamps_then_stops_at_max() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig {
            debounce_ms: 0,
            ..AutoZoomConfig::default()
        });
        let mut cam = FakeZoom::new(Some(10));
        cam.zoom = 9;
        let t0 = Instant::now();
        assert!(matches!(
            advisor.advise(&qr(20.0), 640, t0, &mut cam),
            ZoomAdvice::Defer(_)
        ));
        assert_eq!(cam.zoom, 10);
        assert_eq!(
            advisor.advise(&qr(20.0), 640, t0, &mut cam),
            ZoomAdvice::DeliverNow
        );
    }

    #[test]
    fn non_qr_formats_are_ignored() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig::default());
        let mut cam = FakeZoom::new(Some(60));
        let mut result = qr(20.0);
        result.format = BarcodeFormat::DataMatrix;
        assert_eq!(
            advisor.advise(&result, 640, Instant::now(), &mut cam),
            ZoomAdvice::DeliverNow
        );
        assert_eq!(cam.calls, 0);
    }

    #[test]
    fn unsupported_or_failing_zoom_delivers_now() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig::default());
        let mut fixed = FakeZoom::new(None);
        assert_eq!(
            advisor.advise(&qr(20.0), 640, Instant::now(), &mut fixed),
            ZoomAdvice::DeliverNow
        );

        let mut failing = FakeZoom::new(Some(60));
        failing.fail = true;
        assert_eq!(
            advisor.advise(&qr(20.0), 640, Instant::now(), &mut failing),
            ZoomAdvice::DeliverNow
        );
        assert_eq!(failing.calls, 1);
    }

    #[test]
    fn disabled_advisor_never_zooms() {
        let mut advisor = AutoZoomAdvisor::new(AutoZoomConfig {
            enabled: false,
            ..AutoZoomConfig::default()
        });
        let mut cam = FakeZoom::new(Some(60));
        assert_eq!(
            advisor.advise(&qr(20.0), 640, Instant::now(), &mut cam),
            ZoomAdvice::DeliverNow
        );
    }

    #[test]
    fn config_deserializes_partial_json() {
        let cfg: AutoZoomConfig = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
        assert_eq!(cfg.debounce_ms, 250);
        assert_eq!(cfg.min_size_divisor, 5);
        assert!(cfg.enabled);
    }
}
