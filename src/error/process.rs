use thiserror::Error;

use crate::image::processor::EncodeFormat;

/// Why the pipeline fell back to untransformed bytes.
///
/// Never fatal for a request: it travels inside a
/// [`ProcessingResult`](crate::image::pipeline::ProcessingResult) next to
/// bytes that are always safe to send.
///
/// # Example
/// ```
/// use img_reformat_proxy::error::ProcessError;
///
/// let err = ProcessError::Decode(anyhow::anyhow!("unrecognized image format"));
/// assert!(err.is_not_an_image());
/// assert_eq!(err.to_string(), "not a decodable image: unrecognized image format");
/// ```
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The input could not be read as an image.
    #[error("not a decodable image: {0}")]
    Decode(#[source] anyhow::Error),

    /// The codec failed to resize or encode an image it had decoded.
    #[error("{format:?} transform failed: {source}")]
    Transform {
        format: EncodeFormat,
        #[source]
        source: anyhow::Error,
    },
}

impl ProcessError {
    pub fn is_not_an_image(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
