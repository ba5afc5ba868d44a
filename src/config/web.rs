//! # HTTP Configuration
//!
//! Listener, request-body ceiling and downstream destination of the proxy.
//!
//! # Examples
//! ```rust
//! use img_reformat_proxy::config::web::HttpConfig;
//!
//! let http = HttpConfig {
//!     max_body_bytes: 10 * 1024 * 1024,
//!     ..HttpConfig::default()
//! };
//! assert_eq!(http.listen_path, "/api/assets");
//! assert!(http.max_body_bytes > 1_000_000);
//! ```

use std::{net::SocketAddr, time::Duration};

use crate::config::env::{process_env, read_parsed_from, read_string_from, read_u32_in_from};

pub const DEFAULT_MAX_BODY_BYTES: usize = 100 << 20;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:6743";
pub const DEFAULT_LISTEN_PATH: &str = "/api/assets";
pub const DEFAULT_FORWARD_DESTINATION: &str = "https://httpbin.org/anything";
pub const DEFAULT_FORWARD_TIMEOUT_SECS: u32 = 10;

/// HTTP-related configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpConfig {
    /// Upper bound on an inbound request body; larger uploads are rejected.
    pub max_body_bytes: usize,
    pub listen_addr: SocketAddr,
    /// Path whose multipart requests are rewritten. Everything else is relayed.
    pub listen_path: String,
    /// Downstream URL that receives rewritten uploads. Its scheme and host
    /// also receive passthrough traffic.
    pub forward_destination: String,
    pub forward_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 6743)),
            listen_path: DEFAULT_LISTEN_PATH.into(),
            forward_destination: DEFAULT_FORWARD_DESTINATION.into(),
            forward_timeout: Duration::from_secs(u64::from(DEFAULT_FORWARD_TIMEOUT_SECS)),
        }
    }
}

impl HttpConfig {
    /// Reads `UPLOAD_MAX_SIZE`, `LISTEN_ADDR`, `LISTEN_PATH`,
    /// `FORWARD_DESTINATION` and `FORWARD_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_provider(process_env)
    }

    pub fn from_provider<F>(provider: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let timeout_secs = read_u32_in_from(
            &provider,
            "FORWARD_TIMEOUT_SECS",
            DEFAULT_FORWARD_TIMEOUT_SECS,
            1..,
        );

        Self {
            max_body_bytes: read_parsed_from(&provider, "UPLOAD_MAX_SIZE", d.max_body_bytes, |v| {
                *v > 0
            }),
            listen_addr: read_parsed_from(&provider, "LISTEN_ADDR", d.listen_addr, |_| true),
            listen_path: read_string_from(&provider, "LISTEN_PATH", DEFAULT_LISTEN_PATH),
            forward_destination: read_string_from(
                &provider,
                "FORWARD_DESTINATION",
                DEFAULT_FORWARD_DESTINATION,
            ),
            forward_timeout: Duration::from_secs(u64::from(timeout_secs)),
        }
    }
}
