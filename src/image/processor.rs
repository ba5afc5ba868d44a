//! # Image Codec Abstractions
//!
//! Defines the boundary between the reformatting pipeline and the library
//! that actually decodes, rotates, resizes and encodes pixels.
//!
//! This module provides:
//! - [`Dimensions`]: an image size in pixels.
//! - [`ImageMetadata`]: what the codec reports about an encoded buffer.
//! - [`EncodeFormat`] / [`TransformOpts`]: parameters of a resize/encode call.
//! - [`ImageCodec`]: the trait the pipeline talks to, so the image backend
//!   can be swapped (or stubbed in tests) without touching decision logic.
//!
//! # Example
//! ```rust
//! use img_reformat_proxy::image::processor::{
//!     Dimensions, EncodeFormat, ImageCodec, ImageMetadata, TransformOpts,
//! };
//! use anyhow::Result;
//!
//! struct EchoCodec;
//!
//! impl ImageCodec for EchoCodec {
//!     fn decode_metadata(&self, _bytes: &[u8]) -> Result<ImageMetadata> {
//!         Ok(ImageMetadata::new(Dimensions::new(640, 480)))
//!     }
//!
//!     fn transform_encode(&self, bytes: &[u8], _opts: &TransformOpts) -> Result<Vec<u8>> {
//!         Ok(bytes.to_vec())
//!     }
//!
//!     fn auto_rotate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
//!         Ok(bytes.to_vec())
//!     }
//! }
//!
//! let codec = EchoCodec;
//! let meta = codec.decode_metadata(b"abc").unwrap();
//! assert_eq!(meta.dimensions, Dimensions::new(640, 480));
//! assert!(!meta.needs_rotation());
//!
//! let opts = TransformOpts::new(Dimensions::new(320, 240), 90, EncodeFormat::Jpeg);
//! assert_eq!(codec.transform_encode(b"abc", &opts).unwrap(), b"abc");
//! ```

use std::fmt;

use anyhow::Result;

/// EXIF orientation value meaning "stored upright".
pub const ORIENTATION_NORMAL: u32 = 1;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The shorter of the two sides.
    pub fn narrow_side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// `true` when width ≥ height. Squares count as landscape.
    pub fn is_landscape(&self) -> bool {
        self.width >= self.height
    }

    /// Swaps width and height.
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Metadata reported by [`ImageCodec::decode_metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Stored pixel size, before any orientation is applied.
    pub dimensions: Dimensions,
    /// Whether the encoded image carries an alpha channel.
    pub has_alpha: bool,
    /// EXIF orientation tag (1–8); [`ORIENTATION_NORMAL`] when absent.
    pub orientation: u32,
    /// Lossy encoder the stored image came from: `Jpeg` or `Webp`, `None`
    /// for everything else.
    pub source_format: Option<EncodeFormat>,
}

impl ImageMetadata {
    /// Opaque, upright image of the given size.
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            has_alpha: false,
            orientation: ORIENTATION_NORMAL,
            source_format: None,
        }
    }

    pub fn with_alpha(mut self, has_alpha: bool) -> Self {
        self.has_alpha = has_alpha;
        self
    }

    pub fn with_orientation(mut self, orientation: u32) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_source_format(mut self, format: Option<EncodeFormat>) -> Self {
        self.source_format = format;
        self
    }

    /// `true` when the orientation tag asks for a non-identity transform.
    pub fn needs_rotation(&self) -> bool {
        self.orientation > ORIENTATION_NORMAL
    }
}

/// Output encoding of a transform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    /// Re-encode in whatever format the input was in.
    Preserve,
    Jpeg,
    Webp,
}

impl EncodeFormat {
    /// MIME type of the encoder output, `None` for [`EncodeFormat::Preserve`].
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Preserve => None,
            Self::Jpeg => Some("image/jpeg"),
            Self::Webp => Some("image/webp"),
        }
    }
}

/// Parameters of [`ImageCodec::transform_encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOpts {
    /// Exact output size.
    pub size: Dimensions,
    /// Encoder quality (1–100), used by lossy encoders.
    pub quality: u8,
    pub format: EncodeFormat,
}

impl TransformOpts {
    pub fn new(size: Dimensions, quality: u8, format: EncodeFormat) -> Self {
        Self {
            size,
            quality,
            format,
        }
    }
}

/// Pixel-level operations the reformatting pipeline delegates to an image
/// library.
///
/// Every method fails with an error when the input is not a decodable image.
pub trait ImageCodec: Send + Sync {
    /// Reads size, alpha presence and EXIF orientation.
    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageMetadata>;

    /// Resizes to exactly `opts.size` and encodes in `opts.format`.
    fn transform_encode(&self, bytes: &[u8], opts: &TransformOpts) -> Result<Vec<u8>>;

    /// Applies the EXIF orientation to the pixels and re-encodes in the
    /// source format, leaving an upright image.
    fn auto_rotate(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}
