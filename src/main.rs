//! Process entrypoint: load configuration, initialize structured logging,
//! bind the HTTP front end, serve until a shutdown signal arrives.

use pdfcdp::config::Config;
use pdfcdp::http::{self, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        cdp_host = %config.cdp_host,
        pdf_concurrency = config.pdf_concurrency,
        "starting"
    );

    let state = AppState::new(&config);
    let app = http::app(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Composes the three independently configured log targets into a single
/// filter: `server=<SERVER_LOG_LEVEL>,pdfcdp::orchestrator=<PDF_LOG_LEVEL>,
/// pdfcdp::session=<CDP_LOG_LEVEL>,pdfcdp::transport=<CDP_LOG_LEVEL>`.
fn init_tracing(config: &Config) {
    let directives = format!(
        "pdfcdp::http={server},pdfcdp::orchestrator={pdf},pdfcdp::frame_listener={pdf},pdfcdp::session={cdp},pdfcdp::transport={cdp},pdfcdp::browser_client={cdp}",
        server = config.server_log_level,
        pdf = config.pdf_log_level,
        cdp = config.cdp_log_level,
    );
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
</content>
