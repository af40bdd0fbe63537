//! WebSocket dialer implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    CLOSE_ABNORMAL, Incoming, Link, LinkId, Transport, TransportError,
    validate_url,
};

/// Counter for generating unique link IDs.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A WebSocket-based [`Transport`] that dials `ws://` endpoints.
///
/// `wss://` URLs pass validation but need a TLS feature enabled on
/// `tokio-tungstenite` to actually connect.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates a new WebSocket transport.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    type Link = WebSocketLink;

    async fn dial(&self, url: &str) -> Result<Self::Link, TransportError> {
        validate_url(url)?;

        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = LinkId::new(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, url, "WebSocket link open");

        // Split so a reader parked on the stream never blocks a writer.
        let (sink, stream) = ws.split();
        Ok(WebSocketLink {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        })
    }
}

/// A single WebSocket link.
pub struct WebSocketLink {
    id: LinkId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    /// Set by [`Link::close`]; later sends fail with `Closed`.
    closed: AtomicBool,
}

impl Link for WebSocketLink {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let msg = Message::Text(text.to_owned().into());
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Incoming, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Incoming::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Ok(Incoming::Text(text)),
                        Err(_) => {
                            tracing::debug!(id = %self.id, "skipping non-UTF-8 binary frame");
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => {
                            (u16::from(frame.code), frame.reason.as_str().to_owned())
                        }
                        None => (1005, String::new()),
                    };
                    return Ok(Incoming::Closed { code, reason });
                }
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
                None => {
                    return Ok(Incoming::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: "connection dropped".to_string(),
                    });
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> LinkId {
        self.id
    }
}
