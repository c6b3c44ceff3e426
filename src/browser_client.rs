//! Thin client over the browser's JSON control endpoint: a small typed
//! wrapper around the plain `GET /json/*` HTTP surface Chromium exposes
//! for tab lifecycle, separate from the websocket command channel used
//! once a tab is open.

use serde::Deserialize;
use tracing::{debug, warn};

/// A freshly opened tab.
#[derive(Debug, Clone, Deserialize)]
pub struct Tab {
    pub id: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: String,
}

#[derive(Clone)]
pub struct BrowserClient {
    http: reqwest::Client,
}

impl Default for BrowserClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Opens a new tab via `GET {cdp_host}/json/new`.
    pub async fn new_tab(&self, cdp_host: &str) -> Result<Tab, reqwest::Error> {
        let url = format!("{cdp_host}/json/new");
        let tab = self.http.get(url).send().await?.json::<Tab>().await?;
        debug!(tab_id = %tab.id, "opened tab");
        Ok(tab)
    }

    /// Closes a tab via `GET {cdp_host}/json/close/{id}`. Closing an
    /// already-gone tab is not a failure: transport-level errors are
    /// logged and swallowed so finalizers never fail the caller.
    pub async fn close_tab(&self, cdp_host: &str, id: &str) {
        let url = format!("{cdp_host}/json/close/{id}");
        if let Err(e) = self.http.get(url).send().await {
            warn!(tab_id = id, error = %e, "failed to close tab");
        }
    }

    /// True iff `GET {cdp_host}/json` returns HTTP 200.
    pub async fn is_alive(&self, cdp_host: &str) -> bool {
        let url = format!("{cdp_host}/json");
        matches!(self.http.get(url).send().await, Ok(resp) if resp.status().is_success())
    }
}
</content>
