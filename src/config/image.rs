//! # Image Configuration
//!
//! Resize limits, encoder qualities and the optional target format used by
//! the reformatting pipeline.
//!
//! An [`ImageConfig`] is built once at startup and shared read-only by every
//! request.
//!
//! # Example
//! ```rust
//! use img_reformat_proxy::config::image::{ConvertFormat, ImageConfig};
//!
//! let cfg = ImageConfig {
//!     max_narrow_side: 400,
//!     convert_to: ConvertFormat::parse("webp"),
//!     ..ImageConfig::default()
//! };
//! assert_eq!(cfg.max_width, 1920);
//! assert_eq!(cfg.convert_to, ConvertFormat::Webp);
//! ```

use std::fmt;

use tracing::warn;

use crate::config::env::{process_env, read_u32_in_from};

pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_WEBP_QUALITY: u8 = 85;

/// Output format requested for converted uploads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConvertFormat {
    /// Keep the source format; only resize.
    #[default]
    Disabled,
    Jpeg,
    Webp,
}

impl ConvertFormat {
    /// Parses a configured value, case-insensitively.
    ///
    /// Unrecognized values collapse to [`ConvertFormat::Disabled`].
    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or_default()
    }

    fn try_parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" => Some(Self::Disabled),
            "JPEG" => Some(Self::Jpeg),
            "WEBP" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    /// Canonical uppercase name, `""` when disabled.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "",
            Self::Jpeg => "JPEG",
            Self::Webp => "WEBP",
        }
    }
}

impl fmt::Display for ConvertFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings snapshot consumed by the dimension calculator and the
/// conversion decision engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageConfig {
    /// Bounding-box limit for the width (orientation-agnostic).
    pub max_width: u32,
    /// Bounding-box limit for the height (orientation-agnostic).
    pub max_height: u32,
    /// Limit for the shorter side. `0` disables the narrow-side strategy.
    pub max_narrow_side: u32,
    pub jpeg_quality: u8,
    pub webp_quality: u8,
    pub convert_to: ConvertFormat,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            max_narrow_side: 0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            webp_quality: DEFAULT_WEBP_QUALITY,
            convert_to: ConvertFormat::Disabled,
        }
    }
}

impl ImageConfig {
    /// Builds an [`ImageConfig`] from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `IMG_MAX_WIDTH` | `1920` |
    /// | `IMG_MAX_HEIGHT` | `1080` |
    /// | `IMG_MAX_NARROW_SIDE` | `0` (disabled) |
    /// | `JPEG_QUALITY` | `90` |
    /// | `WEBP_QUALITY` | `85` |
    /// | `CONVERT_TO_FORMAT` | disabled |
    pub fn from_env() -> Self {
        Self::from_provider(process_env)
    }

    /// Builds an [`ImageConfig`] from an arbitrary key/value provider.
    pub fn from_provider<F>(provider: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let convert_to = match provider("CONVERT_TO_FORMAT") {
            Some(raw) => ConvertFormat::try_parse(&raw).unwrap_or_else(|| {
                warn!(
                    "Invalid CONVERT_TO_FORMAT={raw:?}, using {:?} (valid values: \"\", \"JPEG\", \"WEBP\")",
                    d.convert_to.as_str()
                );
                d.convert_to
            }),
            None => d.convert_to,
        };

        Self {
            max_width: read_u32_in_from(&provider, "IMG_MAX_WIDTH", d.max_width, 1..),
            max_height: read_u32_in_from(&provider, "IMG_MAX_HEIGHT", d.max_height, 1..),
            max_narrow_side: read_u32_in_from(&provider, "IMG_MAX_NARROW_SIDE", 0, 0..),
            jpeg_quality: read_quality(&provider, "JPEG_QUALITY", d.jpeg_quality),
            webp_quality: read_quality(&provider, "WEBP_QUALITY", d.webp_quality),
            convert_to,
        }
    }

    /// Encoder quality for the configured target format.
    pub fn quality_for(&self, format: ConvertFormat) -> u8 {
        match format {
            ConvertFormat::Webp => self.webp_quality,
            ConvertFormat::Jpeg | ConvertFormat::Disabled => self.jpeg_quality,
        }
    }
}

fn read_quality<F>(provider: F, name: &str, default: u8) -> u8
where
    F: Fn(&str) -> Option<String>,
{
    // bounded to 1..=100, so the narrowing is lossless
    read_u32_in_from(provider, name, u32::from(default), 1..=100) as u8
}
