//! `Page.*` commands and events.

use cdp_types::{Command, Event, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enables the `Page` domain; must be sent before `Page.navigate`.
#[derive(Debug, Default, Serialize)]
pub struct EnableParams {}

impl Method for EnableParams {
    fn identifier(&self) -> &'static str {
        "Page.enable"
    }
}

impl Command for EnableParams {
    type Response = Value;
}

/// Navigates the frame identified by `frame_id` to `url`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
}

impl NavigateParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame_id: None,
        }
    }

    pub fn with_frame(url: impl Into<String>, frame_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            frame_id: Some(frame_id.into()),
        }
    }
}

impl Method for NavigateParams {
    fn identifier(&self) -> &'static str {
        "Page.navigate"
    }
}

impl Command for NavigateParams {
    type Response = NavigateResult;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
    pub frame_id: String,
    #[serde(default)]
    pub loader_id: Option<String>,
    /// Present and non-empty when the browser itself rejected the
    /// navigation (e.g. an invalid URL, a blocked scheme).
    #[serde(default)]
    pub error_text: Option<String>,
}

/// Retrieves the frame tree so the main frame id can be discovered.
#[derive(Debug, Default, Serialize)]
pub struct GetFrameTreeParams {}

impl Method for GetFrameTreeParams {
    fn identifier(&self) -> &'static str {
        "Page.getFrameTree"
    }
}

impl Command for GetFrameTreeParams {
    type Response = GetFrameTreeResult;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeResult {
    pub frame_tree: FrameTree,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: Frame,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

/// Renders the page as a PDF. `params` is passed through unmodified — the
/// core never interprets the options object, it only forwards it.
#[derive(Debug, Serialize)]
pub struct PrintToPdfParams(pub Value);

impl Method for PrintToPdfParams {
    fn identifier(&self) -> &'static str {
        "Page.printToPDF"
    }
}

impl Command for PrintToPdfParams {
    type Response = PrintToPdfResult;
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintToPdfResult {
    /// Base64-encoded PDF bytes.
    pub data: String,
}

/// Fired once the `load` event has fired in the page (or the nearest
/// equivalent the caller configured via `loaded_event`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadEventFiredEvent {
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl Method for LoadEventFiredEvent {
    fn identifier(&self) -> &'static str {
        "Page.loadEventFired"
    }
}

impl Event for LoadEventFiredEvent {}
</content>
