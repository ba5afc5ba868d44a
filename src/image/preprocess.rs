//! Transparency detection and EXIF orientation correction.
//!
//! Both steps are advisory: a metadata or rotation failure never stops the
//! pipeline.

use std::borrow::Cow;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::processor::ImageCodec;

/// Reports whether the image carries an alpha channel.
///
/// An error means the metadata could not be read. Callers that proceed
/// optimistically treat it as "no transparency".
pub fn detect_transparency(codec: &dyn ImageCodec, bytes: &[u8]) -> Result<bool> {
    Ok(codec.decode_metadata(bytes)?.has_alpha)
}

/// Returns upright bytes: rotated when the EXIF orientation asks for it,
/// otherwise (or when anything fails) the input unchanged.
///
/// The returned buffer is the baseline for every later size query and
/// byte-length comparison.
pub fn correct_orientation<'a>(codec: &dyn ImageCodec, bytes: &'a [u8]) -> Cow<'a, [u8]> {
    let meta = match codec.decode_metadata(bytes) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("orientation check skipped: {e:#}");
            return Cow::Borrowed(bytes);
        }
    };
    if !meta.needs_rotation() {
        return Cow::Borrowed(bytes);
    }

    info!(orientation = meta.orientation, "EXIF orientation detected, applying rotation");
    match codec.auto_rotate(bytes) {
        Ok(rotated) => Cow::Owned(rotated),
        Err(e) => {
            warn!("EXIF rotation failed: {e:#}");
            Cow::Borrowed(bytes)
        }
    }
}
