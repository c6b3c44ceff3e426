//! `Network.*` commands and events.

use cdp_types::{Command, Event, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enables the `Network` domain so `requestWillBeSent` / `responseReceived`
/// are emitted.
#[derive(Debug, Default, Serialize)]
pub struct EnableParams {}

impl Method for EnableParams {
    fn identifier(&self) -> &'static str {
        "Network.enable"
    }
}

impl Command for EnableParams {
    type Response = Value;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentEvent {
    pub request_id: String,
    pub frame_id: String,
}

impl Method for RequestWillBeSentEvent {
    fn identifier(&self) -> &'static str {
        "Network.requestWillBeSent"
    }
}

impl Event for RequestWillBeSentEvent {}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedEvent {
    pub request_id: String,
    pub response: Response,
}

impl Method for ResponseReceivedEvent {
    fn identifier(&self) -> &'static str {
        "Network.responseReceived"
    }
}

impl Event for ResponseReceivedEvent {}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: i64,
}

/// Redirect/auth-challenge metadata for a request that is not the final one.
/// The frame request listener deliberately never decodes this — it binds to
/// the first `requestWillBeSent`/`responseReceived` pair only, so
/// intermediary redirects observed through this event are ignored by
/// construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedExtraInfoEvent {
    pub request_id: String,
}

impl Method for ResponseReceivedExtraInfoEvent {
    fn identifier(&self) -> &'static str {
        "Network.responseReceivedExtraInfo"
    }
}

impl Event for ResponseReceivedExtraInfoEvent {}
</content>
