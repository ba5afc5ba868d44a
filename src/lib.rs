//! # img_reformat_proxy
//!
//! Reverse proxy that rewrites image uploads before they reach the
//! destination server.
//!
//! Multipart uploads on the listen path have their file field resized,
//! EXIF-rotated and optionally converted to JPEG or WebP. The rewritten
//! file is only kept when it is smaller. Every other request is relayed
//! unchanged.
//!
//! - [`image`]: dimension rules, preprocessing and the conversion decision
//! - [`web::upload`]: filename/MIME reconciliation and multipart rebuilding
//! - [`web::proxy`]: the axum router and request dispatch
//! - [`config`]: environment-driven settings
//!
//! ## Example usage
//!
//! ```rust,no_run
//! use img_reformat_proxy::config::app::AppConfig;
//! use img_reformat_proxy::web::proxy::{build_router, ProxyState};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let cfg = AppConfig::from_env();
//! let app = build_router(ProxyState::from_config(&cfg)?, cfg.http.max_body_bytes);
//! let listener = tokio::net::TcpListener::bind(cfg.http.listen_addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

// ===============================
// Re-exports of external crates
// ===============================

pub use anyhow;
pub use axum;
pub use axum_extra;
pub use dotenvy;
pub use reqwest;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use uuid;

// ===============================
// Public modules
// ===============================
pub mod config;
pub mod error;
pub mod image;
pub mod web;
