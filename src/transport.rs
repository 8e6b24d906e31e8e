// file: src/transport.rs
// description: event channel transport seam and its tokio-tungstenite implementation

use crate::{
    callbacks::CloseReason,
    error::{Result, SurveillanceError},
};
use futures_util::{SinkExt, StreamExt};
use std::{future::Future, time::Duration};
use tokio::{net::TcpStream, sync::mpsc, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};
use url::Url;

/// What an open transport reports back to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Error(String),
    /// Always the last event of a transport.
    Closed(CloseReason),
}

/// An open connection. Dropping `outbound` closes it.
#[derive(Debug)]
pub struct Transport {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// The far side of an in-memory [`Transport`].
#[derive(Debug)]
pub struct TransportPeer {
    pub sent: mpsc::UnboundedReceiver<String>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl Transport {
    /// A transport wired to a [`TransportPeer`] instead of a socket.
    pub fn in_memory() -> (Transport, TransportPeer) {
        let (outbound, sent) = mpsc::unbounded_channel();
        let (events, inbound) = mpsc::unbounded_channel();
        (Transport { outbound, inbound }, TransportPeer { sent, events })
    }
}

impl TransportPeer {
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.events.send(TransportEvent::Message(text.into())).is_ok()
    }

    pub fn close(&self, reason: CloseReason) -> bool {
        self.events.send(TransportEvent::Closed(reason)).is_ok()
    }
}

/// Opens transports for the event channel.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &Url) -> impl Future<Output = Result<Transport>> + Send;
}

/// WebSocket connector; each transport gets a pump task bridging the socket to channels.
#[derive(Debug, Clone)]
pub struct WsConnector {
    pub connect_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Transport> {
        let (ws_stream, _) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| SurveillanceError::Timeout)??;

        debug!(%url, "WebSocket handshake completed");

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        tokio::spawn(pump(ws_stream, outbound_rx, inbound_tx));

        Ok(Transport { outbound, inbound })
    }
}

async fn pump(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(text) => {
                    trace!("Sending text message: {}", text);
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        warn!("WebSocket send failed: {}", e);
                        let _ = inbound.send(TransportEvent::Error(e.to_string()));
                        let _ = inbound.send(TransportEvent::Closed(CloseReason::Failed(e.to_string())));
                        break;
                    }
                }
                // owner released the transport
                None => {
                    debug!("Transport released, closing WebSocket");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(TransportEvent::Message(text.as_str().to_owned())).is_err() {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => {
                        let _ = inbound.send(TransportEvent::Message(text));
                    }
                    Err(_) => debug!("Ignoring non-UTF-8 binary message of {} bytes", data.len()),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Received close frame: {:?}", frame);
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|reason| !reason.is_empty());
                    let _ = inbound.send(TransportEvent::Closed(CloseReason::Remote(reason)));
                    break;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket stream error: {}", e);
                    let _ = inbound.send(TransportEvent::Error(e.to_string()));
                    let _ = inbound.send(TransportEvent::Closed(CloseReason::Failed(e.to_string())));
                    break;
                }
                None => {
                    let _ = inbound.send(TransportEvent::Closed(CloseReason::Remote(None)));
                    break;
                }
            }
        }
    }

    let _ = write.close().await;
}
