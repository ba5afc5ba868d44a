//! Final filename and MIME type of the rewritten file part.
//!
//! The emitted MIME type must describe the bytes actually sent. Only a kept
//! conversion changes it; every other outcome carries the client's values.

use crate::config::image::ConvertFormat;
use crate::image::pipeline::{encode_format, ProcessingResult};
use crate::image::processor::EncodeFormat;

/// MIME type used when the client declared none.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

pub const JPEG_EXTENSION: &str = ".JPG";
pub const WEBP_EXTENSION: &str = ".WEBP";

/// Name and type written into the file part's headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub mime_type: String,
}

/// Picks the filename and MIME type for the processed upload.
///
/// `original_mime` may be empty; it then falls back to
/// [`DEFAULT_MIME_TYPE`].
pub fn reconcile(
    original_filename: &str,
    original_mime: &str,
    result: &ProcessingResult,
    format: ConvertFormat,
    normalize_extensions: bool,
) -> FilePart {
    let converted = result.is_ok() && result.was_compressed;
    let encoded = encode_format(format);
    let target = match encoded {
        EncodeFormat::Jpeg => Some(JPEG_EXTENSION),
        EncodeFormat::Webp => Some(WEBP_EXTENSION),
        EncodeFormat::Preserve => None,
    }
    .filter(|_| converted)
    .zip(encoded.mime_type());

    match target {
        Some((ext, mime)) => FilePart {
            filename: if normalize_extensions {
                normalize_extension(original_filename, ext)
            } else {
                original_filename.to_string()
            },
            mime_type: mime.to_string(),
        },
        None => FilePart {
            filename: original_filename.to_string(),
            mime_type: if original_mime.trim().is_empty() {
                DEFAULT_MIME_TYPE.to_string()
            } else {
                original_mime.to_string()
            },
        },
    }
}

/// Replaces the extension of `filename` with `ext` (which includes its
/// leading dot), or appends `ext` when there is none.
///
/// Only dots in the last path segment count.
///
/// ```
/// use img_reformat_proxy::web::upload::reconcile::normalize_extension;
///
/// assert_eq!(normalize_extension("photo.png", ".JPG"), "photo.JPG");
/// assert_eq!(normalize_extension("document.pdf.png", ".WEBP"), "document.pdf.WEBP");
/// assert_eq!(normalize_extension("IMG_001", ".JPG"), "IMG_001.JPG");
/// assert_eq!(normalize_extension("", ".WEBP"), ".WEBP");
/// ```
pub fn normalize_extension(filename: &str, ext: &str) -> String {
    let segment_start = filename.rfind('/').map_or(0, |i| i + 1);
    let stem = match filename[segment_start..].rfind('.') {
        Some(dot) => &filename[..segment_start + dot],
        None => filename,
    };
    format!("{stem}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use crate::image::processor::Dimensions;

    fn result(was_compressed: bool, error: Option<ProcessError>) -> ProcessingResult {
        ProcessingResult {
            processed: vec![1, 2, 3],
            was_compressed,
            was_resized: false,
            new_dimensions: Some(Dimensions::new(10, 10)),
            error,
        }
    }

    fn part(filename: &str, mime_type: &str) -> FilePart {
        FilePart {
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    #[test]
    fn extension_normalization() {
        let cases = [
            ("photo.png", "photo"),
            ("document.pdf.png", "document.pdf"),
            ("IMG_001", "IMG_001"),
            ("", ""),
            (".hidden", ""),
            ("trailing.", "trailing"),
            ("dir.v2/picture", "dir.v2/picture"),
            ("dir.v2/picture.heic", "dir.v2/picture"),
        ];
        for (input, stem) in cases {
            assert_eq!(normalize_extension(input, JPEG_EXTENSION), format!("{stem}.JPG"), "{input:?}");
            assert_eq!(normalize_extension(input, WEBP_EXTENSION), format!("{stem}.WEBP"), "{input:?}");
        }
    }

    #[test]
    fn compressed_conversion_takes_target_type() {
        let ok = result(true, None);

        assert_eq!(
            reconcile("photo.png", "image/png", &ok, ConvertFormat::Jpeg, true),
            part("photo.JPG", "image/jpeg")
        );
        assert_eq!(
            reconcile("photo.png", "image/png", &ok, ConvertFormat::Webp, true),
            part("photo.WEBP", "image/webp")
        );
        assert_eq!(
            reconcile("photo.png", "image/png", &ok, ConvertFormat::Webp, false),
            part("photo.png", "image/webp")
        );
    }

    #[test]
    fn converted_label_matches_encoder_output() {
        let ok = result(true, None);
        for format in [ConvertFormat::Jpeg, ConvertFormat::Webp] {
            let part = reconcile("a.heic", "image/heic", &ok, format, true);
            assert_eq!(Some(part.mime_type.as_str()), encode_format(format).mime_type(), "{format:?}");
        }
    }

    #[test]
    fn uncompressed_keeps_client_values() {
        let kept = result(false, None);
        for format in [ConvertFormat::Disabled, ConvertFormat::Jpeg, ConvertFormat::Webp] {
            assert_eq!(
                reconcile("photo.png", "image/png", &kept, format, true),
                part("photo.png", "image/png"),
                "{format:?}"
            );
        }
    }

    #[test]
    fn failure_keeps_client_values() {
        let failed = result(false, Some(ProcessError::Decode(anyhow::anyhow!("text"))));
        assert_eq!(
            reconcile("notes.txt", "text/plain", &failed, ConvertFormat::Jpeg, true),
            part("notes.txt", "text/plain")
        );

        let transform = result(
            true,
            Some(ProcessError::Transform {
                format: EncodeFormat::Jpeg,
                source: anyhow::anyhow!("boom"),
            }),
        );
        assert_eq!(
            reconcile("photo.png", "image/png", &transform, ConvertFormat::Jpeg, true),
            part("photo.png", "image/png")
        );
    }

    #[test]
    fn missing_mime_uses_binary_default() {
        let failed = result(false, Some(ProcessError::Decode(anyhow::anyhow!("?"))));
        assert_eq!(
            reconcile("blob", "", &failed, ConvertFormat::Webp, true),
            part("blob", DEFAULT_MIME_TYPE)
        );
        assert_eq!(
            reconcile("photo.png", "  ", &result(false, None), ConvertFormat::Disabled, true),
            part("photo.png", DEFAULT_MIME_TYPE)
        );
    }

    #[test]
    fn disabled_format_never_relabels() {
        // resize-only results never set the flag, but a stray one must not
        // change the label either
        assert_eq!(
            reconcile("a.png", "image/png", &result(true, None), ConvertFormat::Disabled, true),
            part("a.png", "image/png")
        );
    }
}
