//! The PDF orchestrator: opens a tab, drives navigation and load detection,
//! prints, and always tears the tab down. The single entrypoint this crate
//! exists to provide. Each bounded wait is expressed as a
//! `tokio::time::timeout` race against the relevant command or
//! subscription.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use cdp_protocol::{dom, network, page};

use crate::browser_client::BrowserClient;
use crate::error::PdfError;
use crate::frame_listener::FrameRequestListener;
use crate::session::Session;
use crate::transport::DEFAULT_MAX_FRAME_SIZE;

/// The selector the cooperative-load gate looks for. An application-level
/// contract: a page that wants the renderer to wait past `load` sets
/// `input.pdfloading[value='loading']` and flips it to `'loaded'` once its
/// own async work (charts, fonts, whatever) has settled.
const COOPERATIVE_LOADING_SELECTOR: &str = "input.pdfloading[value='loading']";

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub max_size: u64,
    pub load_timeout: Duration,
    pub status_timeout: Duration,
    pub print_timeout: Duration,
    pub loaded_event: String,
    /// Opt-in toggle for the cooperative `input.pdfloading` gate (step 11).
    /// Default `true`; set `false` to fall back to the simpler
    /// `Page.loadEventFired`-only behavior.
    pub cooperative_load: bool,
    /// Passed through unmodified to `Page.printToPDF`.
    pub print_options: Value,
    /// Prefixes every log record this orchestration emits as a structured
    /// `trace` field rather than literal string concatenation.
    pub trace: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            max_size: 20 * 1024 * 1024,
            load_timeout: Duration::from_secs(30),
            status_timeout: Duration::from_secs(5),
            print_timeout: Duration::from_secs(10),
            loaded_event: "Page.loadEventFired".to_string(),
            cooperative_load: true,
            print_options: Value::Object(Default::default()),
            trace: None,
        }
    }
}

/// Renders `url` into a base64-encoded PDF.
///
/// Step 1: acquires a permit from `concurrency`, the process-wide
/// semaphore, held for the duration of the whole operation. Released by
/// `Drop` on every exit path, including early returns from steps below.
pub async fn get_pdf(
    browser: &BrowserClient,
    concurrency: &Arc<tokio::sync::Semaphore>,
    cdp_host: &str,
    url: &str,
    options: &PdfOptions,
) -> Result<String, PdfError> {
    let trace = options.trace.as_deref().unwrap_or("");

    let _permit = concurrency
        .acquire()
        .await
        .expect("concurrency semaphore is never closed");

    // Step 2: open tab. The finalizer (step 13) is armed from here on —
    // every exit path below must still close this tab.
    let tab = browser.new_tab(cdp_host).await?;
    info!(trace, tab_id = %tab.id, url, "opened tab");

    let result = render(&tab.ws_url, url, options, trace).await;

    browser.close_tab(cdp_host, &tab.id).await;
    info!(trace, tab_id = %tab.id, "closed tab");

    result
}

async fn render(
    ws_url: &str,
    url: &str,
    options: &PdfOptions,
    trace: &str,
) -> Result<String, PdfError> {
    // Step 3: connect session, ping disabled (the transport never pings).
    let session = Session::connect(ws_url, DEFAULT_MAX_FRAME_SIZE).await?;

    let outcome = run_steps(&session, url, options, trace).await;

    // Step 13 (session half): always disconnect, regardless of outcome.
    session.disconnect().await;

    outcome
}

async fn run_steps(
    session: &Arc<Session>,
    url: &str,
    options: &PdfOptions,
    trace: &str,
) -> Result<String, PdfError> {
    // Step 4: enable domains.
    session.execute(page::EnableParams::default()).await?;
    session.execute(network::EnableParams::default()).await?;

    // Step 5: discover the main frame.
    let frame_tree = session.execute(page::GetFrameTreeParams::default()).await?;
    let frame_id = frame_tree.frame_tree.frame.id;

    // Step 6: arm the frame listener before navigating.
    let listener = FrameRequestListener::arm(session.clone(), frame_id.clone());

    // Step 7: open the subscriptions used by steps 9 and 11, before
    // navigation so an event that fires between the navigate command and
    // the orchestrator reaching the corresponding await is never missed.
    let mut attr_sub = session.subscribe(&["DOM.attributeModified"]);
    let mut load_sub = session.subscribe(&[options.loaded_event.as_str()]);

    // Step 8: navigate.
    let nav = session
        .execute(page::NavigateParams::with_frame(url, frame_id.clone()))
        .await?;
    if let Some(error_text) = nav.error_text.filter(|t| !t.is_empty()) {
        return Err(PdfError::Navigation {
            message: error_text,
            url: Some(url.to_string()),
            code: None,
        });
    }

    // Step 9: await load.
    tokio::time::timeout(options.load_timeout, load_sub.next())
        .await
        .map_err(|_elapsed| PdfError::PageLoadTimeout)?
        .map_err(PdfError::Session)?;
    drop(load_sub);
    info!(trace, url, "load event observed");

    // Step 10: verify status.
    let response = tokio::time::timeout(options.status_timeout, listener.response())
        .await
        .map_err(|_elapsed| PdfError::StatusTimeout)?
        .map_err(PdfError::Session)?;
    if !(200..300).contains(&response.status) && response.status != 304 {
        return Err(PdfError::Navigation {
            message: format!("main document returned status {}", response.status),
            url: Some(response.url),
            code: Some(response.status),
        });
    }

    // Step 11: cooperative-load gate.
    if options.cooperative_load {
        cooperative_load_gate(session, &mut attr_sub, options.load_timeout).await?;
    }
    drop(attr_sub);

    // Step 12: print.
    let print_result = tokio::time::timeout(
        options.print_timeout,
        session.execute(page::PrintToPdfParams(options.print_options.clone())),
    )
    .await
    .map_err(|_elapsed| PdfError::PdfPrintTimeout)?
    .map_err(PdfError::Session)?;

    if print_result.data.len() as u64 > options.max_size {
        return Err(PdfError::PayloadTooBig);
    }

    Ok(print_result.data)
}

async fn cooperative_load_gate(
    session: &Arc<Session>,
    attr_sub: &mut crate::session::Subscription,
    load_timeout: Duration,
) -> Result<(), PdfError> {
    let document = session.execute(dom::GetDocumentParams::default()).await?;
    let query = session
        .execute(dom::QuerySelectorAllParams::new(
            document.root.node_id,
            COOPERATIVE_LOADING_SELECTOR,
        ))
        .await?;

    let mut pending: HashSet<i64> = query.node_ids.into_iter().collect();
    if pending.is_empty() {
        return Ok(());
    }

    while !pending.is_empty() {
        let event = match tokio::time::timeout(load_timeout, attr_sub.next()).await {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => {
                // Receive loop stopped; drain whatever is already queued
                // before giving up, per step 11's drain clause.
                match attr_sub.next().await {
                    Ok(event) => event,
                    Err(_) => return Err(PdfError::Session(e)),
                }
            }
            Err(_elapsed) => return Err(PdfError::PageLoadTimeout),
        };

        let Ok(attr) = serde_json::from_value::<dom::AttributeModifiedEvent>(event.params) else {
            continue;
        };
        if attr.name == "value" && attr.value == "loaded" && pending.remove(&attr.node_id) {
            continue;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakePeer;
    use serde_json::json;

    fn no_cooperative_options() -> PdfOptions {
        PdfOptions {
            cooperative_load: false,
            load_timeout: Duration::from_millis(200),
            status_timeout: Duration::from_millis(200),
            print_timeout: Duration::from_millis(200),
            ..PdfOptions::default()
        }
    }

    #[tokio::test]
    async fn happy_path_returns_printed_pdf() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));
        let options = no_cooperative_options();

        let task = tokio::spawn({
            let session = session.clone();
            async move { run_steps(&session, "http://x", &options, "").await }
        });

        peer.reply_next(json!({})).await; // Page.enable
        peer.reply_next(json!({})).await; // Network.enable
        peer.reply_next(json!({"frameTree": {"frame": {"id": "F1", "url": ""}}}))
            .await; // Page.getFrameTree
        peer.reply_next(json!({"frameId": "F1"})).await; // Page.navigate

        peer.push_event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "frameId": "F1"}),
        );
        peer.push_event(
            "Network.responseReceived",
            json!({"requestId": "R1", "response": {"url": "http://x", "status": 200}}),
        );
        peer.push_event("Page.loadEventFired", json!({}));

        peer.reply_next(json!({"data": "UEZG"})).await; // Page.printToPDF

        let pdf = task.await.unwrap().unwrap();
        assert_eq!(pdf, "UEZG");
    }

    #[tokio::test]
    async fn non_2xx_main_document_status_is_a_navigation_error() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));
        let options = no_cooperative_options();

        let task = tokio::spawn({
            let session = session.clone();
            async move { run_steps(&session, "http://x", &options, "").await }
        });

        peer.reply_next(json!({})).await;
        peer.reply_next(json!({})).await;
        peer.reply_next(json!({"frameTree": {"frame": {"id": "F1", "url": ""}}}))
            .await;
        peer.reply_next(json!({"frameId": "F1"})).await;

        peer.push_event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "frameId": "F1"}),
        );
        peer.push_event(
            "Network.responseReceived",
            json!({"requestId": "R1", "response": {"url": "http://x", "status": 404}}),
        );
        peer.push_event("Page.loadEventFired", json!({}));

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.status_code(), 424);
        assert_eq!(err.failed_url(), Some("http://x"));
        assert_eq!(err.status_code_of_failure(), Some(404));
    }

    #[tokio::test]
    async fn load_event_timeout_surfaces_as_504() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));
        let options = no_cooperative_options();

        let task = tokio::spawn({
            let session = session.clone();
            async move { run_steps(&session, "http://x", &options, "").await }
        });

        peer.reply_next(json!({})).await;
        peer.reply_next(json!({})).await;
        peer.reply_next(json!({"frameTree": {"frame": {"id": "F1", "url": ""}}}))
            .await;
        peer.reply_next(json!({"frameId": "F1"})).await;
        // Page.loadEventFired never arrives.

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, PdfError::PageLoadTimeout));
        assert_eq!(err.status_code(), 504);
    }

    #[tokio::test]
    async fn oversized_pdf_is_rejected() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));
        let options = PdfOptions {
            max_size: 4,
            ..no_cooperative_options()
        };

        let task = tokio::spawn({
            let session = session.clone();
            async move { run_steps(&session, "http://x", &options, "").await }
        });

        peer.reply_next(json!({})).await;
        peer.reply_next(json!({})).await;
        peer.reply_next(json!({"frameTree": {"frame": {"id": "F1", "url": ""}}}))
            .await;
        peer.reply_next(json!({"frameId": "F1"})).await;
        peer.push_event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "frameId": "F1"}),
        );
        peer.push_event(
            "Network.responseReceived",
            json!({"requestId": "R1", "response": {"url": "http://x", "status": 200}}),
        );
        peer.push_event("Page.loadEventFired", json!({}));
        peer.reply_next(json!({"data": "UEZGUEZGUEZGUEZG"})).await;

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, PdfError::PayloadTooBig));
        assert_eq!(err.status_code(), 413);
    }

    #[tokio::test]
    async fn cooperative_gate_waits_for_every_node_to_report_loaded() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));
        let options = PdfOptions {
            cooperative_load: true,
            ..no_cooperative_options()
        };

        let task = tokio::spawn({
            let session = session.clone();
            async move { run_steps(&session, "http://x", &options, "").await }
        });

        peer.reply_next(json!({})).await;
        peer.reply_next(json!({})).await;
        peer.reply_next(json!({"frameTree": {"frame": {"id": "F1", "url": ""}}}))
            .await;
        peer.reply_next(json!({"frameId": "F1"})).await;
        peer.push_event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "frameId": "F1"}),
        );
        peer.push_event(
            "Network.responseReceived",
            json!({"requestId": "R1", "response": {"url": "http://x", "status": 200}}),
        );
        peer.push_event("Page.loadEventFired", json!({}));

        peer.reply_next(json!({"root": {"nodeId": 1}})).await; // DOM.getDocument
        peer.reply_next(json!({"nodeIds": [7, 9]})).await; // DOM.querySelectorAll

        peer.push_event(
            "DOM.attributeModified",
            json!({"nodeId": 7, "name": "value", "value": "loaded"}),
        );
        peer.push_event(
            "DOM.attributeModified",
            json!({"nodeId": 9, "name": "value", "value": "loaded"}),
        );

        peer.reply_next(json!({"data": "UEZG"})).await; // Page.printToPDF

        let pdf = task.await.unwrap().unwrap();
        assert_eq!(pdf, "UEZG");
    }
}
</content>
