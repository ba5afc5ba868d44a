//! # Multipart Reconstructor
//!
//! Rebuilds an upload form around the processed file: every plain field is
//! copied as received and exactly one file part is written, carrying the
//! reconciled filename, MIME type and bytes.
//!
//! The HTTP layer reads the inbound form into an [`UploadForm`]; [`reformat`]
//! is synchronous and CPU-bound, so callers run it off the async executor.

use axum::body::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{app::AppConfig, image::ImageConfig, upload::UploadConfig};
use crate::error::ReformatError;
use crate::image::pipeline::ReformatPipeline;

use super::reconcile::{reconcile, FilePart};

/// A file part of the inbound form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub field_name: String,
    pub filename: String,
    /// `Content-Type` of the part, if the client sent one.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Inbound form, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadForm {
    /// Plain fields with their raw values; repeated names are kept.
    pub fields: Vec<(String, Bytes)>,
    pub files: Vec<UploadedFile>,
}

impl UploadForm {
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<Bytes>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn push_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// First file part sent under `field_name`.
    pub fn file(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name == field_name)
    }
}

/// Settings read by [`reformat`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReformatSettings {
    pub image: ImageConfig,
    pub upload: UploadConfig,
}

impl From<&AppConfig> for ReformatSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            image: cfg.image.clone(),
            upload: cfg.upload.clone(),
        }
    }
}

/// Rebuilt multipart body and the `Content-Type` (with boundary) to send it
/// with.
#[derive(Debug, Clone)]
pub struct ReformattedBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Processes the upload field of `form` and writes the outbound body.
///
/// Fails only when the form has no file under the configured field name.
/// Image problems never fail the request; the file is then sent unchanged.
pub fn reformat(
    form: &UploadForm,
    settings: &ReformatSettings,
    pipeline: &ReformatPipeline,
) -> Result<ReformattedBody, ReformatError> {
    let field_name = settings.upload.field_name.as_str();
    let file = form
        .file(field_name)
        .ok_or_else(|| ReformatError::MissingFile(field_name.to_string()))?;

    for extra in form.files.iter().filter(|f| !std::ptr::eq(*f, file)) {
        warn!(
            field = %extra.field_name,
            filename = %extra.filename,
            "dropping additional file part"
        );
    }

    let result = pipeline.process(&file.bytes, &settings.image);
    if let Some(err) = &result.error {
        info!("Image processing error: {err}");
    }

    let format = settings.image.convert_to;
    let part = reconcile(
        &file.filename,
        file.content_type.as_deref().unwrap_or_default(),
        &result,
        format,
        settings.upload.normalize_extensions,
    );
    log_outcome(&file.filename, &part, result.is_ok(), result.was_compressed, format.is_enabled());

    let mut writer = MultipartWriter::new();
    for (name, value) in &form.fields {
        writer.write_field(name, value);
    }
    writer.write_file(field_name, &part, &result.processed);

    Ok(ReformattedBody {
        content_type: writer.content_type(),
        body: writer.finish(),
    })
}

fn log_outcome(original: &str, part: &FilePart, ok: bool, compressed: bool, converting: bool) {
    let FilePart {
        filename,
        mime_type,
    } = part;
    match (ok, compressed) {
        (true, true) if filename != original => {
            info!("Converted to {mime_type} with normalized filename: {original} -> {filename}")
        }
        (true, true) => info!("Converted to {mime_type} but keeping original filename: {filename}"),
        (true, false) if converting => {
            info!("Image processed but original kept (better compression): {filename} ({mime_type})")
        }
        (true, false) => {
            info!("Image resized but format conversion disabled: {filename} ({mime_type})")
        }
        (false, _) => {
            info!("Non-image file or processing failed, keeping original: {filename} ({mime_type})")
        }
    }
}

/// Escapes `\` and `"` for a quoted-string in a part header.
pub fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Writes a `multipart/form-data` body part by part.
pub struct MultipartWriter {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    /// Writer with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(Uuid::new_v4().simple().to_string())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `multipart/form-data; boundary=…`
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Writes a plain field; `value` is copied byte for byte.
    pub fn write_field(&mut self, name: &str, value: &[u8]) {
        let disposition = format!("form-data; name=\"{}\"", escape_quotes(name));
        self.write_part(&disposition, None, value);
    }

    pub fn write_file(&mut self, name: &str, part: &FilePart, bytes: &[u8]) {
        let disposition = format!(
            "form-data; name=\"{}\"; filename=\"{}\"",
            escape_quotes(name),
            escape_quotes(&part.filename)
        );
        self.write_part(&disposition, Some(&part.mime_type), bytes);
    }

    fn write_part(&mut self, disposition: &str, content_type: Option<&str>, content: &[u8]) {
        let mut head = format!("--{}\r\nContent-Disposition: {disposition}\r\n", self.boundary);
        if let Some(ct) = content_type {
            head.push_str(&format!("Content-Type: {ct}\r\n"));
        }
        head.push_str("\r\n");

        self.body.extend_from_slice(head.as_bytes());
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
    }

    /// Closes the body with the final boundary.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}
