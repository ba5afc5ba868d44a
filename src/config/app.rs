//! # Application Configuration Loader
//!
//! Assembles every configuration section of the proxy from environment
//! variables.
//!
//! Automatically loads `.env` files for non-production environments.
//! It checks for a custom `DOTENV_FILE` path first, then falls back to
//! `.env.{APP_ENV}` or `.env`.
//!
//! The resulting [`AppConfig`] is built once at startup and shared read-only
//! for the lifetime of the process.
//!
//! # Environment Variables
//! | Variable | Description | Default |
//! |-----------|-------------|----------|
//! | `APP_ENV` | Current environment (`development`, `production`, etc.) | `"development"` |
//! | `DOTENV_FILE` | Optional path to a custom dotenv file | *none* |
//! | `IMG_MAX_WIDTH` / `IMG_MAX_HEIGHT` | Bounding-box limits | `1920` / `1080` |
//! | `IMG_MAX_NARROW_SIDE` | Narrow-side limit, `0` disables | `0` |
//! | `JPEG_QUALITY` / `WEBP_QUALITY` | Encoder qualities (1–100) | `90` / `85` |
//! | `CONVERT_TO_FORMAT` | `""`, `JPEG` or `WEBP` | `""` |
//! | `NORMALIZE_EXTENSIONS` | Rename converted files to `.JPG` / `.WEBP` | `true` |
//! | `FILE_UPLOAD_FIELD` | Multipart field carrying the file | `assetData` |
//! | `UPLOAD_MAX_SIZE` | Maximum request body (bytes) | `104857600` |
//! | `LISTEN_ADDR` | Socket address to bind | `0.0.0.0:6743` |
//! | `LISTEN_PATH` | Path whose uploads are rewritten | `/api/assets` |
//! | `FORWARD_DESTINATION` | Downstream URL | `https://httpbin.org/anything` |
//! | `FORWARD_TIMEOUT_SECS` | Downstream request timeout | `10` |
//!
//! # Example
//! ```rust,no_run
//! use img_reformat_proxy::config::app::AppConfig;
//!
//! let cfg = AppConfig::from_env();
//! println!("rewriting uploads on {}", cfg.http.listen_path);
//! ```

use std::env;

use tracing::info;

use crate::config::{image::ImageConfig, upload::UploadConfig, web::HttpConfig};

/// Top-level application configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    /// Resize and conversion settings.
    pub image: ImageConfig,
    /// Upload field and filename handling.
    pub upload: UploadConfig,
    /// Listener and downstream settings.
    pub http: HttpConfig,
}

impl AppConfig {
    /// Loads application configuration from environment variables.
    ///
    /// ## Behavior
    /// - Reads `APP_ENV` (defaults to `"development"`).
    /// - Loads `.env` or `.env.{APP_ENV}` for non-production environments.
    /// - Parses all supported environment variables and falls back to defaults.
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        if app_env != "production" {
            if let Ok(path) = env::var("DOTENV_FILE") {
                let _ = dotenvy::from_filename(path);
            } else {
                let candidate = format!(".env.{}", app_env);
                dotenvy::from_filename(&candidate)
                    .or_else(|_| dotenvy::dotenv())
                    .ok();
            }
        }

        AppConfig {
            image: ImageConfig::from_env(),
            upload: UploadConfig::from_env(),
            http: HttpConfig::from_env(),
        }
    }

    /// Logs the effective settings once at startup.
    pub fn log_summary(&self) {
        let img = &self.image;
        info!(
            max_width = img.max_width,
            max_height = img.max_height,
            max_narrow_side = img.max_narrow_side,
            jpeg_quality = img.jpeg_quality,
            webp_quality = img.webp_quality,
            convert_to = %img.convert_to,
            "image settings"
        );
        info!(
            field = %self.upload.field_name,
            normalize_extensions = self.upload.normalize_extensions,
            "upload settings"
        );
        info!(
            listen_addr = %self.http.listen_addr,
            listen_path = %self.http.listen_path,
            forward_destination = %self.http.forward_destination,
            max_body_bytes = self.http.max_body_bytes,
            "http settings"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::image::ConvertFormat;
    use temp_env;

    #[test]
    fn from_env_reads_all_sections() {
        temp_env::with_vars(
            vec![
                ("APP_ENV", Some("production")),
                ("IMG_MAX_WIDTH", Some("800")),
                ("IMG_MAX_HEIGHT", Some("600")),
                ("JPEG_QUALITY", Some("75")),
                ("CONVERT_TO_FORMAT", Some("webp")),
                ("FILE_UPLOAD_FIELD", Some("assetData")),
                ("LISTEN_PATH", Some("/api/assets")),
                ("FORWARD_DESTINATION", Some("http://test.example.com/api/assets")),
            ],
            || {
                let cfg = AppConfig::from_env();
                assert_eq!(cfg.image.max_width, 800);
                assert_eq!(cfg.image.max_height, 600);
                assert_eq!(cfg.image.jpeg_quality, 75);
                assert_eq!(cfg.image.convert_to, ConvertFormat::Webp);
                assert_eq!(cfg.upload.field_name, "assetData");
                assert_eq!(cfg.http.listen_path, "/api/assets");
                assert_eq!(
                    cfg.http.forward_destination,
                    "http://test.example.com/api/assets"
                );
            },
        );
    }

    #[test]
    fn from_env_uses_defaults_for_unset_values() {
        temp_env::with_vars(
            vec![
                ("APP_ENV", Some("production")),
                ("IMG_MAX_WIDTH", None::<&str>),
                ("IMG_MAX_NARROW_SIDE", None),
                ("WEBP_QUALITY", None),
                ("NORMALIZE_EXTENSIONS", None),
                ("UPLOAD_MAX_SIZE", None),
            ],
            || {
                let cfg = AppConfig::from_env();
                assert_eq!(cfg.image.max_width, 1920);
                assert_eq!(cfg.image.max_narrow_side, 0);
                assert_eq!(cfg.image.webp_quality, 85);
                assert!(cfg.upload.normalize_extensions);
                assert_eq!(cfg.http.max_body_bytes, 100 << 20);
            },
        );
    }
}
