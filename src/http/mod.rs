//! HTTP front end: a small typed request/response pair, a `tower-http`
//! tracing layer, and orchestrator errors mapped to status codes at the
//! edge rather than threaded through as HTTP concerns.

mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::browser_client::BrowserClient;
use crate::config::Config;

pub struct AppState {
    pub browser: BrowserClient,
    pub concurrency: Arc<tokio::sync::Semaphore>,
    pub cdp_host: String,
}

impl AppState {
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            browser: BrowserClient::new(),
            concurrency: Arc::new(tokio::sync::Semaphore::new(config.pdf_concurrency)),
            cdp_host: config.cdp_host.clone(),
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(routes::render_pdf))
        .route("/healthcheck/", get(routes::healthcheck))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
</content>
