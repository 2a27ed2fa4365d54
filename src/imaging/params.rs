//! Parameter types for conversions.
//!
//! These types describe *what* to encode, not *how*. They are the interface
//! between the [`controller`](crate::controller) (which owns the current
//! snapshot) and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`OutputFormat`]: One of the five target encodings. Knows its extension,
//!   MIME type and whether it honours a quality setting.
//! - [`Quality`]: Lossy encoding quality (1–100, default 92). Clamped on construction.
//! - [`ConversionParams`]: Full snapshot: format, quality, resize flag, target size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
    Gif,
}

impl OutputFormat {
    /// Every output format, in the order they are offered to the user.
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Bmp,
        OutputFormat::Gif,
    ];

    /// Whether the encoder exposes a lossy quality control.
    pub fn supports_quality(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Webp)
    }

    /// File extension without the dot. JPEG output uses `jpeg`, matching the
    /// format name the user picked.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Gif => "image/gif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown output format '{0}' (expected jpeg, png, webp, bmp or gif)")]
pub struct ParseFormatError(pub String);

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "bmp" => Ok(OutputFormat::Bmp),
            "gif" => Ok(OutputFormat::Gif),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Clamp to `[floor, 100]`. Front ends use a floor above 1 to keep the
    /// slider out of the unusable range.
    pub fn with_floor(value: u32, floor: u32) -> Self {
        Self(value.clamp(floor.clamp(1, 100), 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// One snapshot of the user's conversion settings.
///
/// `width` and `height` only take effect when `resize` is set; otherwise the
/// natural dimensions of the source are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionParams {
    pub format: OutputFormat,
    pub quality: Quality,
    pub resize: bool,
    pub width: u32,
    pub height: u32,
}

impl ConversionParams {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Quality handed to the encoder: `None` for formats that ignore it.
    pub fn effective_quality(&self) -> Option<Quality> {
        self.format.supports_quality().then_some(self.quality)
    }

    /// True when `other` differs from `self` in nothing an encoder of
    /// `other.format` would notice.
    pub fn encodes_same_as(&self, other: &ConversionParams) -> bool {
        self.format == other.format
            && self.resize == other.resize
            && (!other.resize || (self.width == other.width && self.height == other.height))
            && self.effective_quality() == other.effective_quality()
    }
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::default(),
            resize: false,
            width: 1,
            height: 1,
        }
    }
}
