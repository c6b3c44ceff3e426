//! Wraps the websocket to one browser tab as a split writer/reader pair,
//! so the session multiplexer can hand the reader to a single background
//! task while callers share the writer.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::CdpError;

/// Default maximum inbound frame size: PDFs arrive in one frame as base64
/// and routinely approach this bound.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 20 * 1024 * 1024;

/// The write half of a transport. Only `Session::send` writes to it.
#[async_trait]
pub trait TransportWriter: Send {
    async fn send(&mut self, text: String) -> Result<(), CdpError>;
    async fn close(&mut self, timeout: Duration) -> Result<(), CdpError>;
}

/// The read half of a transport. Only the session's receive loop reads
/// from it.
#[async_trait]
pub trait TransportReader: Send {
    async fn receive(&mut self) -> Result<String, CdpError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, Message>,
}

pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
    max_frame_size: usize,
}

/// Connects to a tab's `webSocketDebuggerUrl`.
///
/// Keepalive pings are never sent: `tokio-tungstenite` does not ping
/// automatically, which is exactly what's required here — a ping timeout
/// during a long `Page.printToPDF` reply would tear the session down
/// spuriously.
pub async fn connect(
    ws_url: &str,
    max_frame_size: usize,
) -> Result<(WsWriter, WsReader), CdpError> {
    let config = WebSocketConfig::default()
        .max_frame_size(Some(max_frame_size))
        .max_message_size(Some(max_frame_size));
    let (stream, _response) =
        tokio_tungstenite::connect_async_with_config(ws_url, Some(config), false).await?;
    let (sink, stream) = stream.split();
    Ok((
        WsWriter { sink },
        WsReader {
            stream,
            max_frame_size,
        },
    ))
}

#[async_trait]
impl TransportWriter for WsWriter {
    async fn send(&mut self, text: String) -> Result<(), CdpError> {
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self, timeout: Duration) -> Result<(), CdpError> {
        match tokio::time::timeout(timeout, self.sink.close()).await {
            Ok(result) => result.map_err(CdpError::from),
            Err(_elapsed) => Ok(()),
        }
    }
}

#[async_trait]
impl TransportReader for WsReader {
    async fn receive(&mut self) -> Result<String, CdpError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > self.max_frame_size {
                        return Err(CdpError::PayloadTooBig);
                    }
                    return Ok(text.to_string());
                }
                Some(Ok(Message::Binary(data))) => {
                    if data.len() > self.max_frame_size {
                        return Err(CdpError::PayloadTooBig);
                    }
                    return Ok(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err(CdpError::Closed),
                Some(Err(tokio_tungstenite::tungstenite::Error::Capacity(_))) => {
                    return Err(CdpError::PayloadTooBig)
                }
                Some(Err(e)) => return Err(CdpError::from(e)),
            }
        }
    }
}
</content>
