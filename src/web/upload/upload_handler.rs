//! # Upload Handler
//!
//! Axum endpoint for multipart uploads: reads the form, rewrites the upload
//! field through the reformatting pipeline and forwards the rebuilt body to
//! the downstream destination. The downstream response is relayed as is.
//!
//! ## Returns
//! - the downstream status, headers and body on success
//! - `400 BAD REQUEST` if the upload field is missing or the body is malformed
//! - `413 PAYLOAD TOO LARGE` if the body exceeds the configured ceiling
//! - `424 FAILED DEPENDENCY` if the destination cannot be reached
//!
//! ## Example
//! ```rust,ignore
//! use axum::{routing::post, Extension, Router};
//! use img_reformat_proxy::web::{proxy::ProxyState, upload::upload_handler};
//!
//! let app = Router::new()
//!     .route("/api/assets", post(upload_handler))
//!     .layer(Extension(state));
//! ```

use axum::{
    http::{HeaderMap, Method},
    response::Response,
    Extension,
};
use axum_extra::extract::Multipart;
use tracing::{info, warn};

use crate::error::ReformatError;
use crate::web::proxy::ProxyState;

use super::multipart::{reformat, UploadForm, UploadedFile};

/// Axum handler for multipart uploads on the listen path.
///
/// Form parsing happens on the async executor; image work runs on the
/// blocking pool.
pub async fn upload_handler(
    Extension(state): Extension<ProxyState>,
    method: Method,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ReformatError> {
    info!("Incoming file upload");
    let form = read_form(multipart).await?;

    let settings = state.settings.clone();
    let pipeline = state.pipeline.clone();
    let body = tokio::task::spawn_blocking(move || reformat(&form, &settings, &pipeline))
        .await
        .map_err(|e| ReformatError::Internal(format!("reformat task failed: {e}")))??;

    state
        .forwarder
        .send_upload(method, &headers, body)
        .await
        .map_err(|e| {
            warn!("Forwarding upload failed: {e}");
            ReformatError::Forward(e)
        })
}

/// Collects every part of the inbound form, in order.
///
/// Parts with a filename are files; everything else is a plain field. Both
/// are kept as raw bytes.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ReformatError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.push_file(UploadedFile {
                    field_name: name,
                    filename,
                    content_type,
                    bytes,
                });
            }
            None => {
                let value = field.bytes().await?;
                form.push_field(name, value);
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::image::{ConvertFormat, ImageConfig};
    use crate::config::upload::UploadConfig;
    use crate::image::{image_rs_processor::ImageRsCodec, pipeline::ReformatPipeline};
    use crate::web::{forward::Forwarder, upload::multipart::ReformatSettings};
    use axum::{
        body::{Body, Bytes},
        http::{header, Request, StatusCode},
        routing::post,
        Json, Router,
    };
    use http_body_util::BodyExt;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use serde_json::{json, Value};
    use std::{io::Cursor, net::SocketAddr, sync::Arc, time::Duration};
    use tower::ServiceExt;

    /// Downstream stand-in: answers with what it received.
    async fn echo(headers: HeaderMap, mut multipart: Multipart) -> Json<Value> {
        let mut fields = Vec::new();
        let mut files = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.unwrap();
                    files.push(json!({
                        "field": name,
                        "filename": filename,
                        "content_type": content_type,
                        "len": bytes.len(),
                        "text": String::from_utf8_lossy(&bytes),
                    }));
                }
                None => fields.push(json!([name, field.text().await.unwrap()])),
            }
        }
        let header = |n: &str| headers.get(n).and_then(|v| v.to_str().ok()).map(str::to_string);
        Json(json!({
            "fields": fields,
            "files": files,
            "x_test": header("x-test"),
            "cf_ray": header("cf-ray"),
        }))
    }

    async fn spawn_downstream() -> SocketAddr {
        let app = Router::new().fallback(echo);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn state(destination: &str, convert_to: ConvertFormat) -> ProxyState {
        ProxyState {
            pipeline: ReformatPipeline::new(Arc::new(ImageRsCodec::default())),
            settings: Arc::new(ReformatSettings {
                image: ImageConfig {
                    convert_to,
                    ..ImageConfig::default()
                },
                upload: UploadConfig::default(),
            }),
            forwarder: Arc::new(Forwarder::new(destination, Duration::from_secs(5)).unwrap()),
            listen_path: "/api/assets".into(),
        }
    }

    fn build_router(state: ProxyState) -> Router {
        Router::new()
            .route("/api/assets", post(super::upload_handler))
            .layer(Extension(state))
    }

    enum Part<'a> {
        Field(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn build_multipart(boundary: &str, parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match part {
                Part::Field(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                    );
                }
                Part::File(name, filename, content_type, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/assets")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUND")
            .header("x-test", "hello")
            .header("cf-ray", "8a1b2c")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let body = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn noisy_png(w: u32, h: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, _> = ImageBuffer::from_fn(w, h, |x, y| {
            let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(2_246_822_519)).wrapping_mul(3_266_489_917);
            Rgb([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8])
        });
        let mut cur = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cur, ImageFormat::Png)
            .unwrap();
        cur.into_inner()
    }

    #[tokio::test]
    async fn non_image_is_forwarded_unchanged() {
        let addr = spawn_downstream().await;
        let app = build_router(state(&format!("http://{addr}/api/assets"), ConvertFormat::Jpeg));

        let body = build_multipart(
            "XBOUND",
            &[
                Part::Field("deviceId", "TEST"),
                Part::Field("createdAt", "2023-01-01T00:00:00.000Z"),
                Part::File("assetData", "hello.txt", "text/plain", b"world"),
            ],
        );
        let res = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = json_body(res).await;
        assert_eq!(json["fields"], json!([["deviceId", "TEST"], ["createdAt", "2023-01-01T00:00:00.000Z"]]));
        let file = &json["files"][0];
        assert_eq!(file["filename"], "hello.txt");
        assert_eq!(file["content_type"], "text/plain");
        assert_eq!(file["text"], "world");

        assert_eq!(json["x_test"], "hello");
        assert!(json["cf_ray"].is_null());
    }

    #[tokio::test]
    async fn png_is_converted_before_forwarding() {
        let addr = spawn_downstream().await;
        let app = build_router(state(&format!("http://{addr}/upload"), ConvertFormat::Jpeg));

        let png = noisy_png(300, 200);
        let body = build_multipart("XBOUND", &[Part::File("assetData", "photo.png", "image/png", &png)]);
        let res = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = json_body(res).await;
        let file = &json["files"][0];
        assert_eq!(file["field"], "assetData");
        assert_eq!(file["filename"], "photo.JPG");
        assert_eq!(file["content_type"], "image/jpeg");
        assert!(file["len"].as_u64().unwrap() < png.len() as u64);
    }

    #[tokio::test]
    async fn missing_upload_field_returns_400() {
        let app = build_router(state("http://127.0.0.1:9/", ConvertFormat::Disabled));

        let body = build_multipart("XBOUND", &[Part::File("file", "hello.txt", "text/plain", b"world")]);
        let res = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let json = json_body(res).await;
        assert!(json["error"].as_str().unwrap().contains("assetData"));
    }

    #[tokio::test]
    async fn malformed_body_returns_400() {
        let app = build_router(state("http://127.0.0.1:9/", ConvertFormat::Disabled));

        let res = app
            .oneshot(upload_request(b"not a valid multipart body".to_vec()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_destination_returns_424() {
        // bind then drop to get a port nobody listens on
        let addr = {
            let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let app = build_router(state(&format!("http://{addr}/"), ConvertFormat::Disabled));

        let body = build_multipart("XBOUND", &[Part::File("assetData", "a.txt", "text/plain", b"x")]);
        let res = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::FAILED_DEPENDENCY);
    }

    #[tokio::test]
    async fn non_utf8_field_reaches_downstream_unchanged() {
        use axum::extract::FromRequest;

        let raw: &[u8] = b"\xff\xfeAB";
        let mut body = b"--XBOUND\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\n".to_vec();
        body.extend_from_slice(raw);
        body.extend_from_slice(b"\r\n");
        body.extend(build_multipart("XBOUND", &[Part::File("assetData", "a.txt", "text/plain", b"x")]));

        let multipart = Multipart::from_request(upload_request(body), &()).await.unwrap();
        let form = read_form(multipart).await.unwrap();
        assert_eq!(&form.fields[0].1[..], raw);

        let settings = ReformatSettings::default();
        let pipeline = ReformatPipeline::new(Arc::new(ImageRsCodec::default()));
        let out = reformat(&form, &settings, &pipeline).unwrap();
        assert!(out.body.windows(raw.len() + 4).any(|w| w == [&b"\r\n\r\n"[..], raw].concat()));
    }

    #[tokio::test]
    async fn read_form_splits_fields_and_files() {
        use axum::extract::FromRequest;

        let body = build_multipart(
            "XBOUND",
            &[
                Part::Field("a", "1"),
                Part::File("assetData", "x.bin", "application/octet-stream", b"\x00\x01"),
                Part::Field("a", "2"),
            ],
        );
        let multipart = Multipart::from_request(upload_request(body), &()).await.unwrap();
        let form = read_form(multipart).await.unwrap();

        assert_eq!(
            form.fields,
            vec![
                ("a".to_string(), Bytes::from_static(b"1")),
                ("a".to_string(), Bytes::from_static(b"2")),
            ]
        );
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].filename, "x.bin");
        assert_eq!(&form.files[0].bytes[..], b"\x00\x01");
    }
}
