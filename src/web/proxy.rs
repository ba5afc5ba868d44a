//! # Proxy Router
//!
//! Every request lands in one fallback handler:
//! - `multipart/form-data` on the listen path → [`upload_handler`];
//! - anything else → passed through to the destination untouched.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Request},
    handler::Handler,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

use crate::config::app::AppConfig;
use crate::image::{image_rs_processor::ImageRsCodec, pipeline::ReformatPipeline};

use super::{
    forward::Forwarder,
    upload::{multipart::ReformatSettings, upload_handler},
};

/// Shared, read-only state of the proxy.
#[derive(Clone)]
pub struct ProxyState {
    pub pipeline: ReformatPipeline,
    pub settings: Arc<ReformatSettings>,
    pub forwarder: Arc<Forwarder>,
    pub listen_path: Arc<str>,
}

impl ProxyState {
    /// Wires the image-rs codec and a forwarding client from `cfg`.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let forwarder = Forwarder::new(&cfg.http.forward_destination, cfg.http.forward_timeout)?;
        Ok(Self {
            pipeline: ReformatPipeline::new(Arc::new(ImageRsCodec::default())),
            settings: Arc::new(ReformatSettings::from(cfg)),
            forwarder: Arc::new(forwarder),
            listen_path: cfg.http.listen_path.as_str().into(),
        })
    }
}

/// Builds the proxy router.
///
/// `max_body_bytes` bounds multipart uploads only; passthrough bodies are
/// streamed without a limit.
pub fn build_router(state: ProxyState, max_body_bytes: usize) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .fallback(dispatch)
        .layer(Extension(state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(trace_layer)
}

/// `true` for requests whose upload field gets rewritten.
pub fn is_upload(req: &Request, listen_path: &str) -> bool {
    req.uri().path() == listen_path
        && req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn dispatch(Extension(state): Extension<ProxyState>, req: Request) -> Response {
    if is_upload(&req, &state.listen_path) {
        return upload_handler.call(req, ()).await;
    }

    info!("Forwarding {} request on {}", req.method(), req.uri().path());
    match state.forwarder.passthrough(req).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("Passthrough failed: {e:#}");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
