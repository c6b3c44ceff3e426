//! In-process fake CDP peer, used only by tests. Stands in for the real
//! websocket: the session's receive loop reads from it exactly as it would
//! read from a live connection, so every invariant exercised here holds
//! against the real transport too.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::CdpError;
use crate::transport::{TransportReader, TransportWriter};

pub struct FakeWriter {
    sent: mpsc::UnboundedSender<Value>,
}

pub struct FakeReader {
    inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl TransportWriter for FakeWriter {
    async fn send(&mut self, text: String) -> Result<(), CdpError> {
        let value: Value = serde_json::from_str(&text).expect("fake peer only sends valid JSON");
        let _ = self.sent.send(value);
        Ok(())
    }

    async fn close(&mut self, _timeout: std::time::Duration) -> Result<(), CdpError> {
        Ok(())
    }
}

#[async_trait]
impl TransportReader for FakeReader {
    async fn receive(&mut self) -> Result<String, CdpError> {
        self.inbound.recv().await.ok_or(CdpError::Closed)
    }
}

/// The test's handle on a fake peer: records every outbound command and
/// lets the test script canned replies and unsolicited events onto the
/// same inbound stream the session's receive loop reads from.
pub struct FakePeer {
    sent: mpsc::UnboundedReceiver<Value>,
    inbound_tx: mpsc::UnboundedSender<String>,
}

impl FakePeer {
    pub fn new() -> (Self, FakeWriter, FakeReader) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        (
            Self {
                sent: sent_rx,
                inbound_tx,
            },
            FakeWriter { sent: sent_tx },
            FakeReader { inbound: inbound_rx },
        )
    }

    /// Waits for the next outbound command, returning its `id` and `method`.
    pub async fn recv_command(&mut self) -> (u64, String) {
        let value = self.sent.recv().await.expect("peer channel closed");
        let id = value["id"].as_u64().expect("command must carry an id");
        let method = value["method"]
            .as_str()
            .expect("command must carry a method")
            .to_string();
        (id, method)
    }

    pub fn reply(&self, id: u64, result: Value) {
        let frame = serde_json::json!({ "id": id, "result": result });
        let _ = self.inbound_tx.send(frame.to_string());
    }

    pub fn push_event(&self, method: &str, params: Value) {
        let frame = serde_json::json!({ "method": method, "params": params });
        let _ = self.inbound_tx.send(frame.to_string());
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.inbound_tx.send(text.to_string());
    }

    /// Replies to the next outbound command whatever its method is, with
    /// `result`. Convenient when a test only cares about a later step.
    pub async fn reply_next(&mut self, result: Value) -> String {
        let (id, method) = self.recv_command().await;
        self.reply(id, result);
        method
    }
}
</content>
