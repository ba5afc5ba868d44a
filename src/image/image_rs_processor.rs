//! # Image Codec Implementation (image-rs)
//!
//! Provides an [`ImageCodec`] implementation using the [`image`] crate for
//! decoding/resizing/JPEG, [`exif`] (kamadak-exif) for the orientation tag
//! and [`webp`] (libwebp) for lossy WebP output.
//!
//! Any format `image` can decode is accepted as input. "Preserve" encodes
//! write back in the detected source format.
//!
//! # Example
//! ```rust,no_run
//! use img_reformat_proxy::image::image_rs_processor::ImageRsCodec;
//! use img_reformat_proxy::image::processor::{EncodeFormat, ImageCodec, TransformOpts};
//!
//! let codec = ImageRsCodec::default();
//! let bytes = std::fs::read("input.png").unwrap();
//!
//! let meta = codec.decode_metadata(&bytes).expect("decodable image");
//! let half = img_reformat_proxy::image::processor::Dimensions::new(
//!     meta.dimensions.width / 2,
//!     meta.dimensions.height / 2,
//! );
//! let webp = codec
//!     .transform_encode(&bytes, &TransformOpts::new(half, 85, EncodeFormat::Webp))
//!     .expect("encode ok");
//! std::fs::write("output.webp", webp).unwrap();
//! ```
//!
//! # Errors
//! Returns an [`anyhow::Error`] if:
//! - the format cannot be guessed or the pixels cannot be decoded,
//! - the source format has no encoder available,
//! - encoding the output fails.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::{
    codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ExtendedColorType,
    GenericImageView, ImageDecoder, ImageFormat, ImageReader,
};

use super::processor::{
    Dimensions, EncodeFormat, ImageCodec, ImageMetadata, TransformOpts, ORIENTATION_NORMAL,
};

/// Quality used when an auto-rotated JPEG/WebP has to be re-encoded.
const ROTATION_QUALITY: u8 = 95;

/// libwebp refuses anything larger on either side.
const WEBP_MAX_DIMENSION: u32 = 16383;

/// A concrete implementation of [`ImageCodec`] using the `image` crate.
#[derive(Clone, Debug, Default)]
pub struct ImageRsCodec;

impl ImageRsCodec {
    /// Reader positioned at the start of the buffer with its format guessed.
    fn reader(bytes: &[u8]) -> Result<(ImageReader<Cursor<&[u8]>>, ImageFormat)> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .context("guess format")?;
        let Some(format) = reader.format() else {
            bail!("unrecognized image format");
        };
        Ok((reader, format))
    }

    /// Parses the container header only; no pixel data is read.
    fn header(bytes: &[u8]) -> Result<(impl ImageDecoder + '_, ImageFormat)> {
        let (reader, format) = Self::reader(bytes)?;
        let decoder = reader.into_decoder().context("read image header")?;
        Ok((decoder, format))
    }

    /// Decodes the buffer, returning the pixels and the detected format.
    fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageFormat)> {
        let (reader, format) = Self::reader(bytes)?;
        let img = reader.decode().context("decode image")?;
        Ok((img, format))
    }
}

impl ImageCodec for ImageRsCodec {
    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageMetadata> {
        let (decoder, format) = Self::header(bytes)?;
        let (w, h) = decoder.dimensions();
        Ok(ImageMetadata::new(Dimensions::new(w, h))
            .with_alpha(decoder.color_type().has_alpha())
            .with_orientation(read_exif_orientation(bytes))
            .with_source_format(lossy_family(format)))
    }

    fn transform_encode(&self, bytes: &[u8], opts: &TransformOpts) -> Result<Vec<u8>> {
        let (img, source) = Self::decode(bytes)?;
        let resized = resize_exact(img, opts.size);

        match opts.format {
            EncodeFormat::Jpeg => encode_jpeg(&resized, opts.quality),
            EncodeFormat::Webp => encode_webp(&resized, opts.quality),
            EncodeFormat::Preserve => encode_as(&resized, source, opts.quality),
        }
    }

    fn auto_rotate(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let orientation = read_exif_orientation(bytes);
        if orientation == ORIENTATION_NORMAL {
            Self::header(bytes)?;
            return Ok(bytes.to_vec());
        }
        let (img, source) = Self::decode(bytes)?;
        let upright = apply_orientation(img, orientation);
        encode_as(&upright, source, ROTATION_QUALITY)
    }
}

fn lossy_family(format: ImageFormat) -> Option<EncodeFormat> {
    match format {
        ImageFormat::Jpeg => Some(EncodeFormat::Jpeg),
        ImageFormat::WebP => Some(EncodeFormat::Webp),
        _ => None,
    }
}

/// Reads the EXIF orientation tag from the raw container bytes.
///
/// Returns [`ORIENTATION_NORMAL`] when there is no EXIF block or no tag.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
        return ORIENTATION_NORMAL;
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(ORIENTATION_NORMAL)
}

/// Applies an EXIF orientation transform to decoded pixels.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Resizes to exactly `size`. Same-size requests skip resampling.
///
/// Uses [`FilterType::Triangle`] for quality-speed balance.
fn resize_exact(img: DynamicImage, size: Dimensions) -> DynamicImage {
    if img.dimensions() == (size.width, size.height) {
        return img;
    }
    img.resize_exact(size.width, size.height, FilterType::Triangle)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .context("encode jpeg")?;
    Ok(out)
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = img.dimensions();
    if w > WEBP_MAX_DIMENSION || h > WEBP_MAX_DIMENSION {
        bail!("{w}x{h} exceeds the WebP size limit");
    }

    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(&rgba, w, h).encode(f32::from(quality))
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(&rgb, w, h).encode(f32::from(quality))
    };
    Ok(encoded.to_vec())
}

/// Encodes in `format`, converting the pixel layout to one the encoder
/// accepts.
fn encode_as(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(img, quality),
        ImageFormat::WebP => encode_webp(img, quality),
        ImageFormat::Gif => write_with(&DynamicImage::ImageRgba8(img.to_rgba8()), format),
        _ if img.color().has_alpha() => {
            write_with(&DynamicImage::ImageRgba8(img.to_rgba8()), format)
        }
        _ => write_with(&DynamicImage::ImageRgb8(img.to_rgb8()), format),
    }
}

fn write_with(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut cur = Cursor::new(Vec::new());
    img.write_to(&mut cur, format)
        .with_context(|| format!("encode {format:?}"))?;
    Ok(cur.into_inner())
}
