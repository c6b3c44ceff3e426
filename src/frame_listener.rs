//! Correlates the main frame's navigation request with its response,
//! ignoring redirects. Instantiate before `Page.navigate` is sent so the
//! `Network.requestWillBeSent` for the navigation itself is not missed.

use cdp_protocol::network::{RequestWillBeSentEvent, ResponseReceivedEvent};
use tokio::task::JoinHandle;

use crate::error::CdpError;
use crate::session::Session;
use std::sync::Arc;

/// The response CDP reported for the frame's top-level document request.
#[derive(Debug, Clone)]
pub struct FrameResponse {
    pub status: i64,
    pub url: String,
}

/// A listener armed for one frame's navigation. Spawns a background task
/// that correlates `Network.requestWillBeSent` and `Network.responseReceived`
/// by `requestId`; `responseReceivedExtraInfo` is never subscribed to, so
/// redirect-only frames are ignored by construction rather than filtered.
pub struct FrameRequestListener {
    task: JoinHandle<Result<FrameResponse, CdpError>>,
}

impl FrameRequestListener {
    pub fn arm(session: Arc<Session>, frame_id: String) -> Self {
        let task = tokio::spawn(run(session, frame_id));
        Self { task }
    }

    /// Awaits the frame's response. Consumes the listener: it is meant to
    /// be used once, for the navigation it was armed for.
    pub async fn response(self) -> Result<FrameResponse, CdpError> {
        match self.task.await {
            Ok(result) => result,
            Err(_join_err) => Err(CdpError::Closed),
        }
    }
}

async fn run(session: Arc<Session>, frame_id: String) -> Result<FrameResponse, CdpError> {
    let mut sub = session.subscribe(&[
        "Network.requestWillBeSent",
        "Network.responseReceived",
    ]);

    let mut request_id: Option<String> = None;
    loop {
        let event = sub.next().await?;
        match event.method.as_str() {
            "Network.requestWillBeSent" if request_id.is_none() => {
                let Ok(params) =
                    serde_json::from_value::<RequestWillBeSentEvent>(event.params)
                else {
                    continue;
                };
                if params.frame_id == frame_id {
                    request_id = Some(params.request_id);
                }
            }
            "Network.responseReceived" => {
                let Some(expected) = request_id.as_deref() else {
                    continue;
                };
                let Ok(params) =
                    serde_json::from_value::<ResponseReceivedEvent>(event.params)
                else {
                    continue;
                };
                if params.request_id == expected {
                    return Ok(FrameResponse {
                        status: params.response.status,
                        url: params.response.url,
                    });
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::test_support::FakePeer;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn correlates_response_by_request_id_and_ignores_other_frames() {
        let (peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        let listener = FrameRequestListener::arm(session.clone(), "F1".to_string());

        // a requestWillBeSent for a different frame must be ignored.
        peer.push_event(
            "Network.requestWillBeSent",
            json!({"requestId": "R0", "frameId": "F-other"}),
        );
        peer.push_event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "frameId": "F1"}),
        );
        // a responseReceived for an unrelated request must be ignored.
        peer.push_event(
            "Network.responseReceived",
            json!({"requestId": "R0", "response": {"url": "http://other", "status": 500}}),
        );
        peer.push_event(
            "Network.responseReceived",
            json!({"requestId": "R1", "response": {"url": "http://www.example.com", "status": 200}}),
        );

        let response = tokio::time::timeout(Duration::from_secs(1), listener.response())
            .await
            .expect("should resolve within the deadline")
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.url, "http://www.example.com");
    }
}
</content>
