//! Capture session configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use scanloop_core::{default_formats, parse_decode_formats, FormatSet, FramingRect, Size};
use scanloop_decode::{AutoZoomConfig, DecodeHints, StrategyOptions};

use crate::ConfigError;

/// Longest accepted inactivity timeout (one day).
pub const MAX_INACTIVITY_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Longest accepted result deferral or shutdown wait.
pub const MAX_DELAY_MS: u64 = 60_000;

/// Which symbologies to decode.
///
/// `formats` is a comma separated list such as `"QR_CODE,EAN_13"`; when it
/// contains an unknown name it is ignored and `mode` (e.g. `"PRODUCT_MODE"`)
/// is used instead. With neither set the default product, industrial, QR and
/// Data Matrix set applies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeFormatsConfig {
    pub formats: Option<String>,
    pub mode: Option<String>,
    pub character_set: Option<String>,
    pub try_harder: bool,
}

impl DecodeFormatsConfig {
    pub fn format_set(&self) -> FormatSet {
        parse_decode_formats(self.formats.as_deref(), self.mode.as_deref())
            .unwrap_or_else(default_formats)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub framing: FramingRect,
    pub auto_zoom: AutoZoomConfig,
    pub decode_formats: DecodeFormatsConfig,
    /// Also try light-on-dark symbols.
    pub support_luminance_invert: bool,
    /// Retry each frame in the other orientation.
    pub support_vertical_code: bool,
    /// Keep scanning after a result instead of finishing.
    pub continuous_scan: bool,
    /// In continuous mode, request the next frame right after a result.
    pub auto_restart: bool,
    pub return_thumbnail: bool,
    /// Orientation of the screen the preview is shown on.
    pub screen_portrait: bool,
    /// Screen size used to map overlay points; `None` passes them through.
    pub screen_resolution: Option<Size>,
    /// Upper bound on waiting for the decode worker at shutdown.
    pub shutdown_wait_ms: u64,
    /// Idle time before the session ends itself; `0` disables.
    pub inactivity_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            framing: FramingRect::default(),
            auto_zoom: AutoZoomConfig::default(),
            decode_formats: DecodeFormatsConfig::default(),
            support_luminance_invert: false,
            support_vertical_code: false,
            continuous_scan: false,
            auto_restart: true,
            return_thumbnail: false,
            screen_portrait: false,
            screen_resolution: None,
            shutdown_wait_ms: 500,
            inactivity_timeout_secs: 300,
        }
    }
}

impl CaptureConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.framing.ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "framing.ratio must be in (0, 1], got {ratio}"
            )));
        }
        if self.auto_zoom.min_size_divisor == 0 || self.auto_zoom.zoom_step_divisor == 0 {
            return Err(ConfigError::Invalid(
                "auto_zoom divisors must be positive".to_string(),
            ));
        }
        if self.inactivity_timeout_secs > MAX_INACTIVITY_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "inactivity_timeout_secs must be at most {MAX_INACTIVITY_TIMEOUT_SECS}, got {}",
                self.inactivity_timeout_secs
            )));
        }
        if self.auto_zoom.defer_ms > MAX_DELAY_MS || self.shutdown_wait_ms > MAX_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "auto_zoom.defer_ms and shutdown_wait_ms must be at most {MAX_DELAY_MS}"
            )));
        }
        if let Some(screen) = self.screen_resolution {
            if screen.area() == 0 {
                return Err(ConfigError::Invalid(format!(
                    "screen_resolution {}x{} is empty",
                    screen.width, screen.height
                )));
            }
        }
        Ok(())
    }

    pub fn strategy_options(&self) -> StrategyOptions {
        StrategyOptions {
            support_luminance_invert: self.support_luminance_invert,
            support_vertical_code: self.support_vertical_code,
            return_thumbnail: self.return_thumbnail,
        }
    }

    /// Decoder hints without a point callback; the worker installs its own.
    pub fn decode_hints(&self) -> DecodeHints {
        DecodeHints {
            possible_formats: self.decode_formats.format_set(),
            character_set: self.decode_formats.character_set.clone(),
            try_harder: self.decode_formats.try_harder,
            point_callback: None,
        }
    }

    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_wait_ms)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanloop_core::BarcodeFormat;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CaptureConfig::default();
        assert!(cfg.auto_zoom.enabled);
        assert!(!cfg.support_luminance_invert);
        assert!(!cfg.support_vertical_code);
        assert!(!cfg.continuous_scan);
        assert!(cfg.auto_restart);
        assert!(!cfg.return_thumbnail);
        assert!(!cfg.framing.full_screen);
        approx::assert_relative_eq!(cfg.framing.ratio, 0.9);
        assert_eq!(cfg.shutdown_wait(), Duration::from_millis(500));
        assert_eq!(cfg.inactivity_timeout(), Duration::from_secs(300));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_round_trip() {
        let mut cfg = CaptureConfig::default();
        cfg.continuous_scan = true;
        cfg.screen_resolution = Some(Size::new(1080, 1920));
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back = CaptureConfig::from_json_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CaptureConfig::from_json_str(
            r#"{ "support_vertical_code": true, "framing": { "ratio": 0.625 } }"#,
        )
        .unwrap();
        assert!(cfg.support_vertical_code);
        approx::assert_relative_eq!(cfg.framing.ratio, 0.625);
        assert_eq!(cfg.framing.horizontal_offset, 0);
        assert!(cfg.auto_restart);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CaptureConfig::from_json_str(r#"{ "framing": { "ratio": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err =
            CaptureConfig::from_json_str(r#"{ "auto_zoom": { "min_size_divisor": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CaptureConfig::from_json_str(
            r#"{ "inactivity_timeout_secs": 18446744073709551615 }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("inactivity_timeout_secs"));

        let err = CaptureConfig::from_json_str(r#"{ "auto_zoom": { "defer_ms": 18446744073709551615 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("defer_ms"));

        let err = CaptureConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CaptureConfig::from_json_file("/nonexistent/scanloop.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scanloop.json"));
    }

    #[test]
    fn decode_formats_fall_back_to_mode() {
        let cfg = DecodeFormatsConfig {
            formats: Some("QR_CODE,NOT_A_FORMAT".into()),
            mode: Some("PRODUCT_MODE".into()),
            ..Default::default()
        };
        let set = cfg.format_set();
        assert!(set.contains(&BarcodeFormat::Ean13));
        assert!(!set.contains(&BarcodeFormat::QrCode));

        let hints = CaptureConfig::default().decode_hints();
        assert!(hints.allows(BarcodeFormat::QrCode));
        assert!(hints.point_callback.is_none());
    }
}
