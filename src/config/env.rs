//! # Environment Variable Utilities
//!
//! Helpers for reading environment variables with type conversion,
//! validation and fallback defaults.
//!
//! Every reader has a `*_from` variant that takes a provider closure, so the
//! parsing rules can be exercised without touching the process environment.
//! Values that are present but invalid fall back to the default and emit a
//! `warn!` naming the variable.
//!
//! # Examples
//! ```rust,no_run
//! use img_reformat_proxy::config::env::{process_env, read_flag_from, read_u32_in_from};
//!
//! let normalize = read_flag_from(process_env, "NORMALIZE_EXTENSIONS", true);
//! let quality = read_u32_in_from(process_env, "JPEG_QUALITY", 90, 1..=100);
//! ```

use std::ops::RangeBounds;

use tracing::warn;

/// Provider backed by the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Strips surrounding whitespace and a single layer of quotes.
fn clean(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Reads a boolean flag using a custom provider function.
///
/// Accepts `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`
/// (case-insensitive). Anything else keeps the default.
///
/// # Example
/// ```rust
/// use img_reformat_proxy::config::env::read_flag_from;
///
/// assert!(read_flag_from(|_| Some("yes".into()), "NORMALIZE_EXTENSIONS", false));
/// assert!(!read_flag_from(|_| Some("0".into()), "NORMALIZE_EXTENSIONS", true));
/// ```
pub fn read_flag_from<F>(provider: F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = provider(name) else {
        return default;
    };
    match clean(&raw).to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        "" => default,
        _ => {
            warn!("Invalid {name}={raw:?}, using {default}");
            default
        }
    }
}

/// Reads a `u32` constrained to `range`, returning `default` when the
/// variable is missing, unparsable or out of range.
///
/// # Example
/// ```rust
/// use img_reformat_proxy::config::env::read_u32_in_from;
///
/// assert_eq!(read_u32_in_from(|_| Some("75".into()), "JPEG_QUALITY", 90, 1..=100), 75);
/// assert_eq!(read_u32_in_from(|_| Some("101".into()), "JPEG_QUALITY", 90, 1..=100), 90);
/// ```
pub fn read_u32_in_from<F, R>(provider: F, name: &str, default: u32, range: R) -> u32
where
    F: Fn(&str) -> Option<String>,
    R: RangeBounds<u32>,
{
    read_parsed_from(provider, name, default, |v: &u32| range.contains(v))
}

/// Reads a non-empty string, trimmed. Empty or missing values keep the default.
pub fn read_string_from<F>(provider: F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .map(|v| clean(&v).to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses any `FromStr` value and applies `valid`; falls back to `default`
/// with a warning when the value is present but rejected.
pub fn read_parsed_from<F, T, V>(provider: F, name: &str, default: T, valid: V) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
    V: Fn(&T) -> bool,
{
    let Some(raw) = provider(name) else {
        return default;
    };
    let value = clean(&raw);
    if value.is_empty() {
        return default;
    }
    match value.parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            warn!("Invalid {name}={raw:?}, using {default}");
            default
        }
    }
}
