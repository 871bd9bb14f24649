//! Code symbologies and detector records.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use crate::geometry::Rect;

/// Machine-readable code type reported by the detector.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbology {
    Qr,
    Ean13,
    Ean8,
    Code128,
    Code39,
    Code93,
    Codabar,
    Itf,
    UpcE,
    UpcA,
    Pdf417,
    Aztec,
    DataMatrix,
}

impl Symbology {
    /// Every supported symbology.
    pub const ALL: [Self; 13] = [
        Self::Qr,
        Self::Ean13,
        Self::Ean8,
        Self::Code128,
        Self::Code39,
        Self::Code93,
        Self::Codabar,
        Self::Itf,
        Self::UpcE,
        Self::UpcA,
        Self::Pdf417,
        Self::Aztec,
        Self::DataMatrix,
    ];

    /// Detector name, e.g. `"qr"` or `"code-128"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Ean13 => "ean-13",
            Self::Ean8 => "ean-8",
            Self::Code128 => "code-128",
            Self::Code39 => "code-39",
            Self::Code93 => "code-93",
            Self::Codabar => "codabar",
            Self::Itf => "itf",
            Self::UpcE => "upc-e",
            Self::UpcA => "upc-a",
            Self::Pdf417 => "pdf-417",
            Self::Aztec => "aztec",
            Self::DataMatrix => "data-matrix",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbology name the detector reported but this crate does not know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownSymbology(pub String);

impl fmt::Display for UnknownSymbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown symbology {:?}", self.0)
    }
}

impl core::error::Error for UnknownSymbology {}

impl FromStr for Symbology {
    type Err = UnknownSymbology;

    /// Case-insensitive; accepts the detector's hyphenated names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|sym| sym.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownSymbology(String::from(name)))
    }
}

/// One code from a detector callback.
///
/// Only `frame` takes part in overlay mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedCode {
    /// Bounding box in sensor space.
    pub frame: Rect,
    /// Decoded payload.
    pub value: String,
    pub symbology: Symbology,
}

impl DetectedCode {
    pub fn new(frame: Rect, value: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            frame,
            value: value.into(),
            symbology,
        }
    }
}
