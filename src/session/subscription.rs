//! Scoped topic subscriptions. Acquired in a guarded block (here: RAII),
//! released on all exit paths — including early return or panic unwind —
//! by removing the queue from the method directory on `Drop`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cdp_types::EventFrame;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::CdpError;
use crate::session::stop::StopSignal;

/// `*` is the wildcard topic: every event is delivered to it regardless of
/// `method`.
pub const WILDCARD: &str = "*";

type SubscriberId = u64;

#[derive(Default)]
pub(super) struct Subscriptions {
    by_method: HashMap<String, Vec<(SubscriberId, UnboundedSender<EventFrame>)>>,
    next_id: AtomicU64,
}

impl Subscriptions {
    fn next_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Delivers `event` once to every queue subscribed to `event.method`
    /// and once to every wildcard queue.
    pub fn dispatch(&self, event: &EventFrame) {
        if let Some(subs) = self.by_method.get(event.method.as_str()) {
            for (_, tx) in subs {
                let _ = tx.send(event.clone());
            }
        }
        if event.method != WILDCARD {
            if let Some(subs) = self.by_method.get(WILDCARD) {
                for (_, tx) in subs {
                    let _ = tx.send(event.clone());
                }
            }
        }
    }

    fn add(&mut self, method: &str, id: SubscriberId, tx: UnboundedSender<EventFrame>) {
        self.by_method
            .entry(method.to_string())
            .or_default()
            .push((id, tx));
    }

    #[cfg(test)]
    pub(crate) fn contains_method(&self, method: &str) -> bool {
        self.by_method.contains_key(method)
    }

    fn remove(&mut self, method: &str, id: SubscriberId) {
        if let Some(subs) = self.by_method.get_mut(method) {
            subs.retain(|(sid, _)| *sid != id);
            if subs.is_empty() {
                self.by_method.remove(method);
            }
        }
    }
}

/// An acquired, scoped subscription to one or more event methods. Dropping
/// it unregisters the queue from every method it was registered against.
pub struct Subscription {
    directory: Arc<Mutex<Subscriptions>>,
    methods: Vec<String>,
    id: SubscriberId,
    receiver: UnboundedReceiver<EventFrame>,
    stopped: Arc<StopSignal>,
}

impl Subscription {
    pub(super) fn new(
        directory: Arc<Mutex<Subscriptions>>,
        stopped: Arc<StopSignal>,
        methods: &[&str],
    ) -> Self {
        let (tx, receiver) = mpsc::unbounded_channel();
        let id = directory.lock().unwrap().next_id();
        {
            let mut dir = directory.lock().unwrap();
            for method in methods {
                dir.add(method, id, tx.clone());
            }
        }
        Self {
            directory,
            methods: methods.iter().map(|m| m.to_string()).collect(),
            id,
            receiver,
            stopped,
        }
    }

    /// Awaits the next event delivered to this subscription.
    ///
    /// Drains any already-queued events before reporting that the receive
    /// loop has stopped: a scoped subscriber should never lose events that
    /// arrived before the loop died.
    pub async fn next(&mut self) -> Result<EventFrame, CdpError> {
        tokio::select! {
            biased;
            Some(event) = self.receiver.recv() => Ok(event),
            _ = self.stopped.wait() => match self.receiver.try_recv() {
                Ok(event) => Ok(event),
                Err(_) => Err(CdpError::ReceiveLoopStopped(self.stopped.cause())),
            },
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut dir = self.directory.lock().unwrap();
        for method in &self.methods {
            dir.remove(method, self.id);
        }
    }
}
</content>
