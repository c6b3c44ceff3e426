use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::PdfError;
use crate::orchestrator::{self, PdfOptions};

use super::AppState;

fn default_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    url: String,
    #[serde(default = "default_timeout")]
    timeout: u64,
    #[serde(default)]
    compress: bool,
    #[serde(default)]
    options: Value,
    max_size: Option<u64>,
    load_timeout: Option<u64>,
    status_timeout: Option<u64>,
    print_timeout: Option<u64>,
    loaded_event: Option<String>,
}

pub async fn render_pdf(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // Parsed by hand rather than via the `Json` extractor so malformed JSON
    // and a missing `url` both land on this route as 400, not axum's
    // default 422/415 rejections.
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid JSON body"),
    };

    let req: RenderRequest = match serde_json::from_value(raw.clone()) {
        Ok(req) => req,
        Err(_) => {
            return error_response(StatusCode::BAD_REQUEST, "invalid JSON body, or missing \"url\"")
        }
    };

    if req.url.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "\"url\" must not be empty");
    }

    let print_options = if req.options.is_null() {
        Value::Object(Default::default())
    } else {
        req.options.clone()
    };
    let mut options = PdfOptions {
        print_options,
        ..PdfOptions::default()
    };
    if let Some(v) = req.max_size {
        options.max_size = v;
    }
    if let Some(v) = req.load_timeout {
        options.load_timeout = Duration::from_secs(v);
    }
    if let Some(v) = req.status_timeout {
        options.status_timeout = Duration::from_secs(v);
    }
    if let Some(v) = req.print_timeout {
        options.print_timeout = Duration::from_secs(v);
    }
    if let Some(v) = req.loaded_event.clone() {
        options.loaded_event = v;
    }

    let outer_timeout = Duration::from_secs(req.timeout);
    let result = tokio::time::timeout(
        outer_timeout,
        orchestrator::get_pdf(
            &state.browser,
            &state.concurrency,
            &state.cdp_host,
            &req.url,
            &options,
        ),
    )
    .await;

    let pdf = match result {
        Ok(Ok(pdf)) => pdf,
        Ok(Err(e)) => return pdf_error_response(&e),
        Err(_elapsed) => return error_response(StatusCode::GATEWAY_TIMEOUT, "request timed out"),
    };

    let pdf = if req.compress { compress(&pdf) } else { pdf };

    // Echo every field the caller supplied (not just the ones this route
    // reads) alongside the rendered pdf, rather than a hand-picked subset.
    let mut body = raw;
    body["pdf"] = json!(pdf);

    (StatusCode::OK, Json(body)).into_response()
}

pub async fn healthcheck(State(state): State<Arc<AppState>>) -> Response {
    if state.browser.is_alive(&state.cdp_host).await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "browser unreachable").into_response()
    }
}

/// `base64(deflate(base64_decode(pdf)))`, raw DEFLATE per the API contract.
fn compress(pdf_b64: &str) -> String {
    let raw = BASE64.decode(pdf_b64).unwrap_or_default();
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(&raw);
    BASE64.encode(encoder.finish().unwrap_or_default())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn pdf_error_response(e: &PdfError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({ "error": e.to_string() });
    if let Some(url) = e.failed_url() {
        body["failed_url"] = json!(url);
    }
    if let Some(code) = e.status_code_of_failure() {
        body["status_code"] = json!(code);
    }
    (status, Json(body)).into_response()
}
</content>
