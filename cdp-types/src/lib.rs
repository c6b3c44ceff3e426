//! Essential wire types shared between the session multiplexer and the
//! hand-written slice of the Chrome DevTools Protocol this service drives.
//!
//! A `Method` / `Command` / `Event` split, without committing to a single
//! generated protocol crate: `cdp-protocol` supplies the concrete
//! command/event structs.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command identifier, unique for the lifetime of one [`Session`].
///
/// [`Session`]: a type defined in the `pdfcdp` crate; not depended on here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u32);

impl CallId {
    pub fn new(id: u32) -> Self {
        CallId(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Implemented by every CDP command and event type. Identifies the method
/// the payload belongs to, e.g. `"Page.navigate"`.
pub trait Method {
    /// The full dotted identifier, e.g. `DOM.removeNode`.
    fn identifier(&self) -> &'static str;

    /// The domain name component, e.g. `DOM`.
    fn domain_name(&self) -> &'static str {
        self.split().0
    }

    /// The method name component, e.g. `removeNode`.
    fn method_name(&self) -> &'static str {
        self.split().1
    }

    /// `(domain_name, method_name)`.
    fn split(&self) -> (&'static str, &'static str) {
        let id = self.identifier();
        let mut iter = id.split('.');
        (iter.next().unwrap_or(id), iter.next().unwrap_or(""))
    }
}

/// A command that can be sent over the websocket and has a typed response.
pub trait Command: Method + Serialize {
    type Response: DeserializeOwned + fmt::Debug;
}

/// An event CDP can push unsolicited; decoded from the `params` object of an
/// inbound frame whose `method` matches [`Method::identifier`].
pub trait Event: Method + DeserializeOwned + fmt::Debug {}

/// Outbound frame: `{"id": ..., "method": ..., "params": ...}`.
#[derive(Debug, Serialize)]
pub struct MethodCall {
    pub id: CallId,
    pub method: &'static str,
    pub params: Value,
}

/// The wire-level error object CDP embeds in a failed command reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CDP error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for WireError {}

/// A command reply: `{"id": ..., "result": ...}` or `{"id": ..., "error": ...}`.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: CallId,
    pub result: Option<Value>,
    pub error: Option<WireError>,
}

/// An event frame: `{"method": ..., "params": ...}`.
#[derive(Debug, Clone)]
pub struct EventFrame {
    pub method: String,
    pub params: Value,
}

/// The result of classifying one inbound websocket text frame. The `id` and
/// `method` checks are independent, not mutually exclusive: a frame can
/// carry both (a reply that also happens to carry a `method`, or a stale
/// reply whose `id` no longer has a registered slot but whose `method`
/// still identifies it as worth fanning out as an event), and the caller
/// must act on whichever facts are present rather than assume exactly one.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub reply: Option<Response>,
    pub event: Option<EventFrame>,
}

/// Parse one inbound text frame into a [`Frame`].
///
/// Returns `None` for anything that is not a JSON object carrying an `id` or
/// a `method` field — unparseable text, JSON arrays, JSON scalars, and
/// objects with neither field. Callers must treat `None` as "ignore and keep
/// reading", never as an error: a hostile or buggy browser must not be able
/// to kill the receive loop by sending malformed frames.
pub fn parse_frame(text: &str) -> Option<Frame> {
    let value: Value = serde_json::from_str(text).ok()?;
    let obj = value.as_object()?;

    let reply = obj.get("id").and_then(Value::as_u64).map(|id| {
        let result = obj.get("result").cloned();
        let error = obj
            .get("error")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        Response {
            id: CallId::new(id as u32),
            result,
            error,
        }
    });

    let event = obj.get("method").and_then(Value::as_str).map(|method| {
        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        EventFrame {
            method: method.to_string(),
            params,
        }
    });

    if reply.is_none() && event.is_none() {
        return None;
    }

    Some(Frame { reply, event })
}

/// Turn a raw [`Response`] into a typed [`CommandResponse`] for `T`.
pub fn to_command_response<T: Command>(
    resp: Response,
    method: &'static str,
) -> Result<CommandResponse<T::Response>, CommandError> {
    if let Some(result) = resp.result {
        let result = serde_json::from_value(result).map_err(CommandError::Decode)?;
        Ok(CommandResponse {
            id: resp.id,
            result,
            method,
        })
    } else if let Some(err) = resp.error {
        Err(CommandError::Wire(err))
    } else {
        Err(CommandError::EmptyResponse)
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse<T> {
    pub id: CallId,
    pub result: T,
    pub method: &'static str,
}

impl<T> std::ops::Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Wire(#[from] WireError),
    #[error("failed to decode command response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("received an empty response with neither result nor error")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_reply() {
        let frame = parse_frame(r#"{"id":7,"result":{"ok":true}}"#).unwrap();
        let resp = frame.reply.expect("expected a reply");
        assert_eq!(resp.id, CallId::new(7));
        assert_eq!(resp.result.unwrap()["ok"], true);
        assert!(frame.event.is_none());
    }

    #[test]
    fn parses_event() {
        let frame = parse_frame(r#"{"method":"Page.loadEventFired","params":{}}"#).unwrap();
        let event = frame.event.expect("expected an event");
        assert_eq!(event.method, "Page.loadEventFired");
        assert!(frame.reply.is_none());
    }

    #[test]
    fn a_reply_carrying_a_method_is_dispatched_both_ways() {
        let frame = parse_frame(
            r#"{"id":3,"result":{},"method":"Page.loadEventFired","params":{}}"#,
        )
        .unwrap();
        assert_eq!(frame.reply.unwrap().id, CallId::new(3));
        assert_eq!(frame.event.unwrap().method, "Page.loadEventFired");
    }

    #[test]
    fn ignores_non_object_and_unparseable_frames() {
        assert!(parse_frame("not json").is_none());
        assert!(parse_frame("[]").is_none());
        assert!(parse_frame("42").is_none());
        assert!(parse_frame("null").is_none());
        assert!(parse_frame("{}").is_none());
    }
}
</content>
