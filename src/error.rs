//! Error taxonomy for the transport/session layer and the orchestration
//! layer, kept as two separate enums rather than one flat type.

use std::sync::Arc;

use cdp_types::CommandError;

/// Errors raised by the [`crate::transport`] and [`crate::session`] layers.
#[derive(Debug, thiserror::Error)]
pub enum CdpError {
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("inbound frame exceeded the maximum payload size")]
    PayloadTooBig,
    #[error("the websocket connection is closed")]
    Closed,
    #[error("timed out waiting for a command response")]
    Timeout,
    #[error("the receive loop has stopped{}", .0.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    ReceiveLoopStopped(Option<Arc<CdpError>>),
}

impl CdpError {
    /// True for errors that represent a bounded wait expiring, directly or
    /// because the receive loop died due to one.
    pub fn is_timeout(&self) -> bool {
        match self {
            CdpError::Timeout => true,
            CdpError::ReceiveLoopStopped(Some(cause)) => cause.is_timeout(),
            _ => false,
        }
    }
}

/// The navigation/orchestration outcome taxonomy from the data model.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("navigation error: {message}")]
    Navigation {
        message: String,
        url: Option<String>,
        code: Option<i64>,
    },
    #[error("timed out waiting for the page to load")]
    PageLoadTimeout,
    #[error("timed out waiting for the main document's response status")]
    StatusTimeout,
    #[error("timed out waiting for Page.printToPDF")]
    PdfPrintTimeout,
    #[error("the rendered payload exceeded the configured maximum size")]
    PayloadTooBig,
    #[error(transparent)]
    Session(#[from] CdpError),
    #[error("request to the browser's JSON control endpoint failed: {0}")]
    BrowserControl(#[from] reqwest::Error),
}

impl PdfError {
    /// Maps this error to the HTTP status code the front end should report.
    pub fn status_code(&self) -> u16 {
        match self {
            PdfError::Navigation { .. } => 424,
            PdfError::PageLoadTimeout | PdfError::StatusTimeout | PdfError::PdfPrintTimeout => 504,
            PdfError::PayloadTooBig => 413,
            PdfError::Session(CdpError::PayloadTooBig) => 413,
            PdfError::Session(e) if e.is_timeout() => 504,
            PdfError::Session(_) => 500,
            PdfError::BrowserControl(_) => 500,
        }
    }

    pub fn failed_url(&self) -> Option<&str> {
        match self {
            PdfError::Navigation { url, .. } => url.as_deref(),
            _ => None,
        }
    }

    pub fn status_code_of_failure(&self) -> Option<i64> {
        match self {
            PdfError::Navigation { code, .. } => *code,
            _ => None,
        }
    }
}
</content>
