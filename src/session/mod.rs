//! One websocket, one tab: the session multiplexer. A single dedicated
//! connection per tab rather than a handler juggling many targets over
//! one shared websocket.
//!
//! Exactly one task reads the transport (`receive_loop`); every other caller
//! only ever writes to it or waits on a channel the loop feeds. This is the
//! single-writer-single-reader rule the whole module is built around.

mod stop;
mod subscription;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cdp_types::{CallId, Command, Event, Frame, MethodCall};
use rand::Rng;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::CdpError;
use crate::transport::{TransportReader, TransportWriter};

pub use subscription::{Subscription, WILDCARD};
use subscription::Subscriptions;

/// How long the receive loop will block on one read before re-checking
/// whether it has been asked to stop.
const READ_DEADLINE: Duration = Duration::from_secs(1);

/// Default bound on how long [`Session::execute`] will wait for a reply.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = Arc<Mutex<HashMap<u32, oneshot::Sender<cdp_types::Response>>>>;

/// A live CDP connection to one tab.
pub struct Session {
    writer: AsyncMutex<Box<dyn TransportWriter>>,
    used_ids: Mutex<std::collections::HashSet<u32>>,
    pending: PendingMap,
    subscriptions: Arc<Mutex<Subscriptions>>,
    stopped: Arc<stop::StopSignal>,
    cancelled: Arc<stop::CancelSignal>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Connects to a tab's `webSocketDebuggerUrl` and spawns its receive loop.
    pub async fn connect(ws_url: &str, max_frame_size: usize) -> Result<Arc<Self>, CdpError> {
        let (writer, reader) = crate::transport::connect(ws_url, max_frame_size).await?;
        Ok(Self::with_transport(Box::new(writer), Box::new(reader)))
    }

    /// Builds a session over an already-established transport. The seam
    /// tests use to drive the multiplexer against an in-process fake peer
    /// instead of a real websocket.
    pub fn with_transport(
        writer: Box<dyn TransportWriter>,
        reader: Box<dyn TransportReader>,
    ) -> Arc<Self> {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let subscriptions = Arc::new(Mutex::new(Subscriptions::default()));
        let stopped = Arc::new(stop::StopSignal::default());
        let cancelled = Arc::new(stop::CancelSignal::default());

        let task_pending = pending.clone();
        let task_subscriptions = subscriptions.clone();
        let task_stopped = stopped.clone();
        let task_cancelled = cancelled.clone();
        let receive_task = tokio::spawn(receive_loop(
            reader,
            task_pending,
            task_subscriptions,
            task_stopped,
            task_cancelled,
        ));

        Arc::new(Self {
            writer: AsyncMutex::new(writer),
            used_ids: Mutex::new(std::collections::HashSet::new()),
            pending,
            subscriptions,
            stopped,
            cancelled,
            receive_task: Mutex::new(Some(receive_task)),
        })
    }

    /// Draws a fresh 31-bit command id, redrawing on collision with any id
    /// ever drawn by this session. The used-set only ever grows: an id is
    /// never returned to the pool once its command completes.
    fn next_call_id(&self) -> u32 {
        let mut used = self.used_ids.lock().unwrap();
        loop {
            let candidate: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
            if used.insert(candidate) {
                return candidate;
            }
        }
    }

    /// Sends `cmd` and awaits its typed reply, bounded by
    /// [`DEFAULT_COMMAND_TIMEOUT`].
    pub async fn execute<C: Command>(&self, cmd: C) -> Result<C::Response, CdpError> {
        self.execute_with_timeout(cmd, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends `cmd` and awaits its typed reply, racing the reply against
    /// `timeout` and against the receive loop stopping.
    pub async fn execute_with_timeout<C: Command>(
        &self,
        cmd: C,
        timeout: Duration,
    ) -> Result<C::Response, CdpError> {
        let (id, method, text) = self.frame_for(&cmd)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        if let Err(e) = self.write_frame(text).await {
            self.pending.lock().unwrap().remove(&id);
            return Err(e);
        }

        trace!(id, method, "sent command");

        let result = tokio::select! {
            biased;
            reply = rx => {
                match reply {
                    Ok(resp) => cdp_types::to_command_response::<C>(resp, method)
                        .map(|r| r.result)
                        .map_err(CdpError::from),
                    Err(_) => Err(CdpError::ReceiveLoopStopped(self.stopped.cause())),
                }
            }
            _ = self.stopped.wait() => {
                self.pending.lock().unwrap().remove(&id);
                Err(CdpError::ReceiveLoopStopped(self.stopped.cause()))
            }
            _ = tokio::time::sleep(timeout) => {
                self.pending.lock().unwrap().remove(&id);
                Err(CdpError::Timeout)
            }
        };

        result
    }

    /// Sends `cmd` without registering a completion slot, returning as soon
    /// as the frame is written. Equivalent to `execute` with
    /// `await_response=false`: there is no slot to race against a timeout or
    /// the receive loop stopping, and none to clean up afterward, since none
    /// was ever registered. Any reply CDP later sends for this id has no
    /// pending slot to resolve and is logged and dropped by the receive loop.
    pub async fn notify<C: Command>(&self, cmd: C) -> Result<(), CdpError> {
        let (id, method, text) = self.frame_for(&cmd)?;
        self.write_frame(text).await?;
        trace!(id, method, "sent command without awaiting a reply");
        Ok(())
    }

    fn frame_for<C: Command>(&self, cmd: &C) -> Result<(u32, &'static str, String), CdpError> {
        let id = self.next_call_id();
        let method = cmd.identifier();
        let params = serde_json::to_value(cmd)?;
        let call = MethodCall {
            id: CallId::new(id),
            method,
            params,
        };
        let text = serde_json::to_string(&call)?;
        Ok((id, method, text))
    }

    async fn write_frame(&self, text: String) -> Result<(), CdpError> {
        let mut writer = self.writer.lock().await;
        writer.send(text).await
    }

    /// Opens a scoped subscription to one or more event methods. Use
    /// [`WILDCARD`] to receive every event. The subscription is torn down
    /// (removed from the dispatch directory) when the returned guard drops.
    pub fn subscribe(self: &Arc<Self>, methods: &[&str]) -> Subscription {
        Subscription::new(self.subscriptions.clone(), self.stopped.clone(), methods)
    }

    /// Waits for a single occurrence of `method`, decoded as `E`.
    pub async fn wait_for<E: Event>(&self, method: &'static str) -> Result<E, CdpError> {
        let directory = self.subscriptions.clone();
        let stopped = self.stopped.clone();
        let mut sub = Subscription::new(directory, stopped, &[method]);
        loop {
            let event = sub.next().await?;
            match serde_json::from_value::<E>(event.params) {
                Ok(decoded) => return Ok(decoded),
                Err(e) => {
                    warn!(method, error = %e, "failed to decode event, ignoring");
                    continue;
                }
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_stopped()
    }

    /// Cleanly shuts the session down: signals the receive loop to stop,
    /// waits for it to exit, then closes the transport. Consuming `self`
    /// guarantees no caller still holds a reference once disconnected.
    pub async fn disconnect(self: Arc<Self>) {
        self.cancelled.cancel();
        let task = self.receive_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        let _ = self.writer.lock().await.close(Duration::from_secs(2)).await;
    }
}

/// The single reader of the transport. Classifies every inbound frame,
/// resolves the matching pending command slot on a reply, and fans an event
/// out to its method-keyed and wildcard subscribers. Exits exactly once,
/// always through [`stop::StopSignal::stop`], so every blocked caller
/// observes the same terminal cause.
async fn receive_loop(
    mut reader: Box<dyn TransportReader>,
    pending: PendingMap,
    subscriptions: Arc<Mutex<Subscriptions>>,
    stopped: Arc<stop::StopSignal>,
    cancelled: Arc<stop::CancelSignal>,
) {
    let cause = loop {
        if cancelled.is_cancelled() {
            break None;
        }

        match tokio::time::timeout(READ_DEADLINE, reader.receive()).await {
            Ok(Ok(text)) => match cdp_types::parse_frame(&text) {
                Some(Frame { reply, event }) => {
                    if let Some(resp) = reply {
                        let sender = pending.lock().unwrap().remove(&resp.id.get());
                        if let Some(sender) = sender {
                            let _ = sender.send(resp);
                        } else {
                            debug!(id = resp.id.get(), "reply for unknown or expired command id");
                        }
                    }
                    if let Some(event) = event {
                        subscriptions.lock().unwrap().dispatch(&event);
                    }
                }
                None => trace!("ignored malformed or non-object frame"),
            },
            Ok(Err(e)) => break Some(e),
            Err(_elapsed) => continue,
        }
    };

    stopped.stop(cause);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakePeer;
    use cdp_protocol::page::{EnableParams, GetFrameTreeParams};
    use serde_json::json;

    #[tokio::test]
    async fn ids_stay_marked_used_for_the_life_of_the_session() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.execute(EnableParams::default()).await }
        });
        let (id_a, _) = peer.recv_command().await;
        peer.reply(id_a, json!({}));
        first.await.unwrap().unwrap();

        // the used-set grows monotonically: completion discards the slot,
        // never the id, so a later command can't redraw it.
        assert!(session.used_ids.lock().unwrap().contains(&(id_a as u32)));

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.execute(EnableParams::default()).await }
        });
        let (id_b, _) = peer.recv_command().await;
        assert_ne!(id_a, id_b, "a fresh command must draw a fresh id");
        peer.reply(id_b, json!({}));
        second.await.unwrap().unwrap();

        assert!(session.used_ids.lock().unwrap().contains(&(id_b as u32)));
    }

    #[tokio::test]
    async fn notify_returns_once_the_frame_is_written_without_a_reply() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        session.notify(EnableParams::default()).await.unwrap();
        let (id, method) = peer.recv_command().await;
        assert_eq!(method, "Page.enable");

        // no slot was ever registered for this id, so a reply to it is
        // logged and dropped rather than resolving anything.
        peer.reply(id, json!({}));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!session.is_stopped());
        assert!(session.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_is_removed_when_dropped() {
        let (_peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        {
            let _sub = session.subscribe(&["Page.loadEventFired"]);
            assert!(session
                .subscriptions
                .lock()
                .unwrap()
                .contains_method("Page.loadEventFired"));
        }
        assert!(!session
            .subscriptions
            .lock()
            .unwrap()
            .contains_method("Page.loadEventFired"));
    }

    #[tokio::test]
    async fn malformed_frames_do_not_stop_the_receive_loop() {
        let (peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        peer.push_raw("not json");
        peer.push_raw("[]");
        peer.push_event("finished", json!({}));

        let mut sub = session.subscribe(&["finished"]);
        let event = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .expect("should not time out")
            .unwrap();
        assert_eq!(event.method, "finished");
        assert!(!session.is_stopped());
    }

    #[tokio::test]
    async fn an_event_fans_out_to_every_matching_and_wildcard_subscriber() {
        let (peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        let mut specific_a = session.subscribe(&["Page.loadEventFired"]);
        let mut specific_b = session.subscribe(&["Page.loadEventFired"]);
        let mut wildcard = session.subscribe(&[WILDCARD]);

        peer.push_event("Page.loadEventFired", json!({}));

        for sub in [&mut specific_a, &mut specific_b, &mut wildcard] {
            let event = tokio::time::timeout(Duration::from_secs(1), sub.next())
                .await
                .expect("should not time out")
                .unwrap();
            assert_eq!(event.method, "Page.loadEventFired");
        }
    }

    #[tokio::test]
    async fn a_completion_slot_resolves_at_most_once() {
        let (mut peer, writer, reader) = FakePeer::new();
        let session = Session::with_transport(Box::new(writer), Box::new(reader));

        let call = tokio::spawn({
            let session = session.clone();
            async move { session.execute(GetFrameTreeParams::default()).await }
        });
        let (id, _) = peer.recv_command().await;
        peer.reply(
            id,
            json!({"frameTree": {"frame": {"id": "F1", "url": ""}}}),
        );
        let result = call.await.unwrap().unwrap();
        assert_eq!(result.frame_tree.frame.id, "F1");

        // A second reply for the same id has no pending slot to resolve;
        // it must not panic or resurrect the first call's result and,
        // carrying no `method`, is dropped rather than treated as an event.
        peer.reply(id, json!({"frameTree": {"frame": {"id": "F2", "url": ""}}}));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!session.is_stopped());
    }
}
</content>
