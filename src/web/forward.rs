//! # Downstream Forwarding
//!
//! Sends rebuilt uploads and untouched passthrough requests to the
//! configured destination and relays the answer.
//!
//! - Uploads go to the full destination URL; inbound headers are copied
//!   except for hop-by-hop, CDN and body-describing ones, which are replaced.
//! - Passthrough requests keep their path and query and go to the
//!   destination's scheme and authority, with `X-Forwarded-Host` set.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method},
    response::Response,
};
use tracing::debug;

use super::upload::multipart::ReformattedBody;

/// Inbound headers never copied onto a rebuilt upload.
pub const IGNORED_UPLOAD_HEADERS: [&str; 20] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "accept-encoding",
    "host",
    "cf-ipcountry",
    "cf-connecting-ip",
    "x-forwarded-proto",
    "x-forwarded-for",
    "cf-ray",
    "cf-visitor",
    "cf-warp-tag-id",
    "content-type",
    "origin",
    "x-amzn-trace-id",
];

/// Connection-scoped headers, dropped in both directions.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Copies `src` into a new map, leaving out every name in `ignored`.
pub fn filter_headers(src: &HeaderMap, ignored: &[&str]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(src.len());
    for (name, value) in src {
        if !ignored.iter().any(|i| name.as_str().eq_ignore_ascii_case(i)) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// HTTP client bound to one destination.
#[derive(Clone, Debug)]
pub struct Forwarder {
    client: reqwest::Client,
    destination: reqwest::Url,
    origin: reqwest::Url,
}

impl Forwarder {
    /// Builds a client with a per-request `timeout`.
    pub fn new(destination: &str, timeout: Duration) -> Result<Self> {
        let destination = reqwest::Url::parse(destination)
            .with_context(|| format!("invalid forward destination {destination:?}"))?;
        if !destination.has_host() {
            anyhow::bail!("forward destination {destination} has no host");
        }

        let mut origin = destination.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            destination,
            origin,
        })
    }

    pub fn destination(&self) -> &reqwest::Url {
        &self.destination
    }

    /// Sends a rebuilt upload with the inbound method and headers.
    pub async fn send_upload(
        &self,
        method: Method,
        inbound: &HeaderMap,
        body: ReformattedBody,
    ) -> reqwest::Result<Response> {
        let mut headers = filter_headers(inbound, &IGNORED_UPLOAD_HEADERS);
        if let Ok(ct) = HeaderValue::from_str(&body.content_type) {
            headers.insert(header::CONTENT_TYPE, ct);
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.body.len()));

        debug!(%method, url = %self.destination, bytes = body.body.len(), "forwarding upload");
        let resp = self
            .client
            .request(method, self.destination.clone())
            .headers(headers)
            .body(body.body)
            .send()
            .await?;

        Ok(relay(resp))
    }

    /// Sends an arbitrary request to the destination's origin.
    ///
    /// Both bodies are streamed. Bodiless requests go out without one.
    pub async fn passthrough(&self, req: Request) -> Result<Response> {
        let (parts, body) = req.into_parts();
        let url = self.passthrough_url(parts.uri.path(), parts.uri.query());

        let mut headers = filter_headers(&parts.headers, &HOP_BY_HOP_HEADERS);
        headers.remove(header::HOST);
        let forwarded_host = parts
            .headers
            .get(header::HOST)
            .cloned()
            .or_else(|| parts.uri.authority().and_then(|a| HeaderValue::from_str(a.as_str()).ok()));
        if let Some(host) = forwarded_host {
            headers.insert("x-forwarded-host", host);
        }

        debug!(method = %parts.method, %url, "passthrough");
        let mut outbound = self.client.request(parts.method, url).headers(headers);
        if !body.is_end_stream() {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        let resp = outbound.send().await.context("passthrough request failed")?;

        Ok(relay(resp))
    }

    fn passthrough_url(&self, path: &str, query: Option<&str>) -> reqwest::Url {
        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }
}

/// Converts a downstream response into ours, streaming the body.
fn relay(resp: reqwest::Response) -> Response {
    let status = resp.status();
    let headers = filter_headers(resp.headers(), &HOP_BY_HOP_HEADERS);

    let mut out = Response::new(Body::from_stream(resp.bytes_stream()));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}
