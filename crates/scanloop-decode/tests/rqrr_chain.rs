#![cfg(feature = "rqrr")]

use qrcode::{Color, QrCode};
use scanloop_core::{BarcodeFormat, Frame, FramingRect};
use scanloop_decode::{DecodeHints, DecodeStrategyExecutor, RqrrDecoder, StrategyOptions};

const MODULE: usize = 4;
const QUIET: usize = 4;

/// Paint `text` as a QR code into a `width x height` frame with its symbol
/// (quiet zone excluded) starting at `origin`.
fn paint_qr(text: &str, width: usize, height: usize, origin: (usize, usize), inverted: bool) -> Vec<u8> {
    let code = QrCode::new(text.as_bytes()).unwrap();
    let modules = code.width();
    let colors = code.to_colors();
    let (light, dark) = if inverted { (0u8, 255u8) } else { (255u8, 0u8) };

    let mut data = vec![light; width * height];
    let (ox, oy) = origin;
    assert!(ox >= QUIET * MODULE && oy >= QUIET * MODULE);
    for my in 0..modules {
        for mx in 0..modules {
            if colors[my * modules + mx] != Color::Dark {
                continue;
            }
            for dy in 0..MODULE {
                for dx in 0..MODULE {
                    let x = ox + mx * MODULE + dx;
                    let y = oy + my * MODULE + dy;
                    data[y * width + x] = dark;
                }
            }
        }
    }
    data
}

fn executor() -> DecodeStrategyExecutor<RqrrDecoder> {
    DecodeStrategyExecutor::new(RqrrDecoder::new(), DecodeHints::default(), FramingRect::default())
}

#[test]
fn decodes_qr_inside_scanning_window() {
    let data = paint_qr("scanloop://hello", 320, 240, (100, 60), false);
    let frame = Frame::new(data, 320, 240, false).unwrap();

    let outcome = executor().execute(&frame, &StrategyOptions::default());
    let result = outcome.result.expect("qr decoded");
    assert_eq!(result.text, "scanloop://hello");
    assert_eq!(result.format, BarcodeFormat::QrCode);
    assert_eq!(result.points.len(), 4);

    // Top-left corner, back in frame coordinates.
    let top_left = result.points[1];
    assert!((top_left.x - 100.0).abs() < 8.0, "x = {}", top_left.x);
    assert!((top_left.y - 60.0).abs() < 8.0, "y = {}", top_left.y);
}

#[test]
fn light_on_dark_qr_needs_inversion() {
    let data = paint_qr("inverted", 320, 240, (110, 70), true);
    let frame = Frame::new(data, 320, 240, false).unwrap();
    let options = StrategyOptions {
        support_luminance_invert: true,
        ..StrategyOptions::default()
    };

    let outcome = executor().execute(&frame, &options);
    assert_eq!(outcome.result.map(|r| r.text).as_deref(), Some("inverted"));
}

#[test]
fn qr_disabled_in_hints_is_never_reported() {
    let data = paint_qr("skip me", 320, 240, (100, 60), false);
    let frame = Frame::new(data, 320, 240, false).unwrap();
    let hints = DecodeHints {
        possible_formats: [BarcodeFormat::Ean13].into_iter().collect(),
        ..DecodeHints::default()
    };
    let mut exec = DecodeStrategyExecutor::new(RqrrDecoder::new(), hints, FramingRect::default());

    let outcome = exec.execute(&frame, &StrategyOptions::default());
    assert!(outcome.result.is_none());
    assert!(outcome.attempts.iter().all(|a| !a.success));
}
