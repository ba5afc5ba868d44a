//! # Format Conversion Decision Engine
//!
//! Decides, per upload, whether to resize, whether to convert and whether
//! the transformed bytes are worth keeping.
//!
//! 1. With a conversion configured, transparent images are passed through
//!    untouched.
//! 2. EXIF orientation is applied; the upright bytes become the baseline.
//! 3. The baseline is measured and a target size computed
//!    ([`dimensions::calculate`]).
//! 4. Without conversion: resize in the source format when needed.
//!    With conversion: encode, and keep the result only if it is strictly
//!    smaller than the baseline.
//!
//! [`ReformatPipeline::process`] never fails. Problems are reported in
//! [`ProcessingResult::error`] next to bytes that are always safe to send.

use std::{borrow::Cow, sync::Arc};

use tracing::{debug, info, warn};

use crate::config::image::{ConvertFormat, ImageConfig};
use crate::error::ProcessError;

use super::{
    dimensions,
    preprocess::{correct_orientation, detect_transparency},
    processor::{Dimensions, EncodeFormat, ImageCodec, TransformOpts},
};

/// Outcome of [`ReformatPipeline::process`].
#[derive(Debug)]
pub struct ProcessingResult {
    /// Bytes to transmit: either fully transformed or untransformed input.
    pub processed: Vec<u8>,
    /// `true` only when `processed` is a format conversion that was smaller.
    pub was_compressed: bool,
    /// `true` when the target size differs from the decoded size. Computed
    /// independently of which buffer was kept.
    pub was_resized: bool,
    /// Pixel size of `processed`; `None` when it was never measured.
    pub new_dimensions: Option<Dimensions>,
    /// Set when the input was not an image or the codec failed. `processed`
    /// then holds the (orientation-corrected) input.
    pub error: Option<ProcessError>,
}

impl ProcessingResult {
    fn untouched(bytes: Vec<u8>, dimensions: Option<Dimensions>) -> Self {
        Self {
            processed: bytes,
            was_compressed: false,
            was_resized: false,
            new_dimensions: dimensions,
            error: None,
        }
    }

    fn failed(bytes: Vec<u8>, dimensions: Option<Dimensions>, error: ProcessError) -> Self {
        Self {
            error: Some(error),
            ..Self::untouched(bytes, dimensions)
        }
    }

    /// `true` when processing completed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the resize/convert decision for single uploads.
///
/// Holds no per-request state; one instance is shared by all requests.
///
/// # Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use img_reformat_proxy::config::image::{ConvertFormat, ImageConfig};
/// use img_reformat_proxy::image::image_rs_processor::ImageRsCodec;
/// use img_reformat_proxy::image::pipeline::ReformatPipeline;
///
/// let pipeline = ReformatPipeline::new(Arc::new(ImageRsCodec::default()));
/// let settings = ImageConfig { convert_to: ConvertFormat::Webp, ..ImageConfig::default() };
///
/// let upload = std::fs::read("photo.png").unwrap();
/// let result = pipeline.process(&upload, &settings);
/// if result.was_compressed {
///     println!("converted: {} -> {} bytes", upload.len(), result.processed.len());
/// }
/// ```
#[derive(Clone)]
pub struct ReformatPipeline {
    codec: Arc<dyn ImageCodec>,
}

impl ReformatPipeline {
    pub fn new(codec: Arc<dyn ImageCodec>) -> Self {
        Self { codec }
    }

    pub fn process(&self, original: &[u8], settings: &ImageConfig) -> ProcessingResult {
        let format = settings.convert_to;
        let codec = self.codec.as_ref();

        if format.is_enabled() {
            match detect_transparency(codec, original) {
                Ok(true) => {
                    info!("Skipping {format} conversion - image has transparency");
                    return ProcessingResult::untouched(original.to_vec(), None);
                }
                Ok(false) => {}
                Err(e) => debug!("transparency check failed, assuming opaque: {e:#}"),
            }
        }

        let working = correct_orientation(codec, original);

        let meta = match codec.decode_metadata(&working) {
            Ok(meta) => meta,
            Err(e) => {
                info!("Not an image, passing through: {e:#}");
                return ProcessingResult::failed(working.into_owned(), None, ProcessError::Decode(e));
            }
        };

        let decoded = meta.dimensions;
        let target = dimensions::calculate(decoded, settings);

        match format {
            ConvertFormat::Disabled => {
                let quality = resize_quality(meta.source_format, settings);
                self.resize_only(working, decoded, target, quality)
            }
            ConvertFormat::Jpeg | ConvertFormat::Webp => {
                self.convert(working, decoded, target, format, settings)
            }
        }
    }

    fn resize_only(
        &self,
        working: Cow<'_, [u8]>,
        decoded: Dimensions,
        target: Dimensions,
        quality: u8,
    ) -> ProcessingResult {
        if target == decoded {
            debug!("{decoded} within limits, no resize needed");
            return ProcessingResult::untouched(working.into_owned(), Some(decoded));
        }

        let opts = TransformOpts::new(target, quality, EncodeFormat::Preserve);
        match self.codec.transform_encode(&working, &opts) {
            Ok(resized) => {
                info!("Image resized {decoded} → {target}, format conversion disabled");
                ProcessingResult {
                    processed: resized,
                    was_compressed: false,
                    was_resized: true,
                    new_dimensions: Some(target),
                    error: None,
                }
            }
            Err(source) => {
                warn!("Resize failed, keeping original: {source:#}");
                ProcessingResult::failed(
                    working.into_owned(),
                    Some(decoded),
                    ProcessError::Transform {
                        format: opts.format,
                        source,
                    },
                )
            }
        }
    }

    fn convert(
        &self,
        working: Cow<'_, [u8]>,
        decoded: Dimensions,
        target: Dimensions,
        format: ConvertFormat,
        settings: &ImageConfig,
    ) -> ProcessingResult {
        let opts = TransformOpts::new(target, settings.quality_for(format), encode_format(format));

        let encoded = match self.codec.transform_encode(&working, &opts) {
            Ok(encoded) => encoded,
            Err(source) => {
                warn!("Conversion to {format} failed, keeping original: {source:#}");
                return ProcessingResult::failed(
                    working.into_owned(),
                    Some(decoded),
                    ProcessError::Transform {
                        format: opts.format,
                        source,
                    },
                );
            }
        };

        let was_resized = target != decoded;
        let (before, after) = (working.len(), encoded.len());

        if after < before {
            info!("Conversion to {format} successful: {before} → {after} bytes");
            ProcessingResult {
                processed: encoded,
                was_compressed: true,
                was_resized,
                new_dimensions: Some(target),
                error: None,
            }
        } else {
            info!("Conversion to {format} skipped - would increase size: {before} → {after} bytes");
            ProcessingResult {
                processed: working.into_owned(),
                was_compressed: false,
                was_resized,
                new_dimensions: Some(decoded),
                error: None,
            }
        }
    }
}

/// Quality for a re-encode in the source format: WebP sources use the WebP
/// setting, everything else the JPEG one.
fn resize_quality(source: Option<EncodeFormat>, settings: &ImageConfig) -> u8 {
    match source {
        Some(EncodeFormat::Webp) => settings.quality_for(ConvertFormat::Webp),
        _ => settings.quality_for(ConvertFormat::Jpeg),
    }
}

/// Encoder used for a configured conversion target.
pub fn encode_format(format: ConvertFormat) -> EncodeFormat {
    match format {
        ConvertFormat::Disabled => EncodeFormat::Preserve,
        ConvertFormat::Jpeg => EncodeFormat::Jpeg,
        ConvertFormat::Webp => EncodeFormat::Webp,
    }
}
