//! Symbologies and the decode-format groups scanners are usually configured with.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Barcode symbology tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "CODE_93")]
    Code93,
    #[serde(rename = "CODE_128")]
    Code128,
    DataMatrix,
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "EAN_13")]
    Ean13,
    Itf,
    #[serde(rename = "MAXICODE")]
    MaxiCode,
    #[serde(rename = "PDF_417")]
    Pdf417,
    QrCode,
    #[serde(rename = "RSS_14")]
    Rss14,
    RssExpanded,
    UpcA,
    UpcE,
    UpcEanExtension,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 17] = [
        Self::Aztec,
        Self::Codabar,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::DataMatrix,
        Self::Ean8,
        Self::Ean13,
        Self::Itf,
        Self::MaxiCode,
        Self::Pdf417,
        Self::QrCode,
        Self::Rss14,
        Self::RssExpanded,
        Self::UpcA,
        Self::UpcE,
        Self::UpcEanExtension,
    ];

    /// Canonical upper-case name, e.g. `QR_CODE`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Aztec => "AZTEC",
            Self::Codabar => "CODABAR",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::Itf => "ITF",
            Self::MaxiCode => "MAXICODE",
            Self::Pdf417 => "PDF_417",
            Self::QrCode => "QR_CODE",
            Self::Rss14 => "RSS_14",
            Self::RssExpanded => "RSS_EXPANDED",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::UpcEanExtension => "UPC_EAN_EXTENSION",
        }
    }

    /// True for linear (one-dimensional) symbologies.
    pub fn is_one_d(self) -> bool {
        FormatGroup::OneD.formats().contains(&self)
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised format or mode name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown barcode format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for BarcodeFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownFormat(wanted.to_string()))
    }
}

/// Named sets of formats selectable as a scan mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatGroup {
    Product,
    Industrial,
    OneD,
    QrCode,
    DataMatrix,
    Aztec,
    Pdf417,
}

impl FormatGroup {
    pub fn formats(self) -> &'static [BarcodeFormat] {
        use BarcodeFormat::*;
        match self {
            Self::Product => &[UpcA, UpcE, Ean13, Ean8, Rss14, RssExpanded],
            Self::Industrial => &[Code39, Code93, Code128, Itf, Codabar],
            Self::OneD => &[
                UpcA,
                UpcE,
                Ean13,
                Ean8,
                Rss14,
                RssExpanded,
                Code39,
                Code93,
                Code128,
                Itf,
                Codabar,
            ],
            Self::QrCode => &[QrCode],
            Self::DataMatrix => &[DataMatrix],
            Self::Aztec => &[Aztec],
            Self::Pdf417 => &[Pdf417],
        }
    }

    /// Parse a scan mode name such as `QR_CODE_MODE`.
    pub fn from_mode(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_uppercase().as_str() {
            "PRODUCT_MODE" => Some(Self::Product),
            "ONE_D_MODE" => Some(Self::OneD),
            "QR_CODE_MODE" => Some(Self::QrCode),
            "DATA_MATRIX_MODE" => Some(Self::DataMatrix),
            "AZTEC_MODE" => Some(Self::Aztec),
            "PDF417_MODE" => Some(Self::Pdf417),
            _ => None,
        }
    }
}

/// Ordered, de-duplicated set of formats to decode.
pub type FormatSet = BTreeSet<BarcodeFormat>;

/// Formats scanned when nothing is configured: product, industrial, QR and
/// Data Matrix codes (Aztec and PDF417 stay off).
pub fn default_formats() -> FormatSet {
    [
        FormatGroup::Product,
        FormatGroup::Industrial,
        FormatGroup::QrCode,
        FormatGroup::DataMatrix,
    ]
    .into_iter()
    .flat_map(|g| g.formats().iter().copied())
    .collect()
}

/// Resolve a comma-separated format list, falling back to a scan mode.
///
/// Any unknown name in `formats` discards the whole list (it is treated as
/// absent). Returns `None` when neither the list nor the mode resolves.
pub fn parse_decode_formats(formats: Option<&str>, mode: Option<&str>) -> Option<FormatSet> {
    if let Some(list) = formats {
        let parsed: Result<FormatSet, _> = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(BarcodeFormat::from_str)
            .collect();
        match parsed {
            Ok(set) if !set.is_empty() => return Some(set),
            Ok(_) => {}
            Err(err) => log::debug!("ignoring format list: {err}"),
        }
    }
    let group = FormatGroup::from_mode(mode?)?;
    Some(group.formats().iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for f in BarcodeFormat::ALL {
            assert_eq!(f.name().parse::<BarcodeFormat>(), Ok(f));
        }
        assert_eq!("qr_code".parse::<BarcodeFormat>(), Ok(BarcodeFormat::QrCode));
    }

    #[test]
    fn serde_uses_upper_snake_names() {
        let json = serde_json::to_string(&BarcodeFormat::DataMatrix).expect("json");
        assert_eq!(json, "\"DATA_MATRIX\"");
    }

    #[test]
    fn serde_names_match_canonical_names() {
        for f in BarcodeFormat::ALL {
            let json = serde_json::to_string(&f).expect("json");
            assert_eq!(json, format!("\"{}\"", f.name()), "{f:?}");
            let back: BarcodeFormat = serde_json::from_str(&json).expect("parse");
            assert_eq!(back, f);
            let name: String = serde_json::from_str(&json).expect("string");
            assert_eq!(name.parse::<BarcodeFormat>(), Ok(f));
        }
    }

    #[test]
    fn list_takes_precedence_over_mode() {
        let set = parse_decode_formats(Some("QR_CODE, EAN_13"), Some("PRODUCT_MODE")).expect("set");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec![BarcodeFormat::Ean13, BarcodeFormat::QrCode]
        );
    }

    #[test]
    fn bad_list_falls_back_to_mode() {
        let set = parse_decode_formats(Some("QR_CODE,NOPE"), Some("AZTEC_MODE")).expect("set");
        assert_eq!(set.len(), 1);
        assert!(set.contains(&BarcodeFormat::Aztec));
        assert_eq!(parse_decode_formats(Some("NOPE"), None), None);
        assert_eq!(parse_decode_formats(None, Some("UNKNOWN_MODE")), None);
    }

    #[test]
    fn default_set_excludes_aztec_and_pdf417() {
        let set = default_formats();
        assert!(set.contains(&BarcodeFormat::QrCode));
        assert!(set.contains(&BarcodeFormat::Code128));
        assert!(!set.contains(&BarcodeFormat::Aztec));
        assert!(!set.contains(&BarcodeFormat::Pdf417));
        assert_eq!(set.len(), 13);
    }

    #[test]
    fn one_d_is_product_plus_industrial() {
        let union: FormatSet = FormatGroup::Product
            .formats()
            .iter()
            .chain(FormatGroup::Industrial.formats())
            .copied()
            .collect();
        let one_d: FormatSet = FormatGroup::OneD.formats().iter().copied().collect();
        assert_eq!(union, one_d);
        assert!(BarcodeFormat::Itf.is_one_d());
        assert!(!BarcodeFormat::QrCode.is_one_d());
    }
}
