//! # Upload Configuration
//!
//! Describes the multipart file part the proxy rewrites: which form field
//! carries the upload and whether converted files get a canonical extension.
//!
//! # Example
//! ```rust
//! use img_reformat_proxy::config::upload::UploadConfig;
//!
//! let cfg = UploadConfig {
//!     field_name: "assetData".into(),
//!     normalize_extensions: true,
//! };
//! assert_eq!(cfg, UploadConfig::default());
//! ```

use crate::config::env::{process_env, read_flag_from, read_string_from};

pub const DEFAULT_UPLOAD_FIELD: &str = "assetData";

/// Configuration for the rewritten file part.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadConfig {
    /// Multipart field name holding the uploaded file.
    pub field_name: String,
    /// Rewrite the extension (`.JPG` / `.WEBP`) when a conversion is kept.
    pub normalize_extensions: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            field_name: DEFAULT_UPLOAD_FIELD.into(),
            normalize_extensions: true,
        }
    }
}

impl UploadConfig {
    /// Reads `FILE_UPLOAD_FIELD` and `NORMALIZE_EXTENSIONS`.
    pub fn from_env() -> Self {
        Self::from_provider(process_env)
    }

    pub fn from_provider<F>(provider: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            field_name: read_string_from(&provider, "FILE_UPLOAD_FIELD", DEFAULT_UPLOAD_FIELD),
            normalize_extensions: read_flag_from(&provider, "NORMALIZE_EXTENSIONS", true),
        }
    }
}
