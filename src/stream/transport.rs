use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::StreamError;

/// Close code reported when the peer vanished without a close frame.
const NO_CLOSE_FRAME: u16 = 1006;

/// What the connection produced next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A complete UTF-8 text message.
    Message(String),
    /// The connection ended with the given close code.
    Closed { code: u16 },
}

/// Dials the transcription endpoint. Implemented for WebSockets in
/// production and scripted in tests.
#[async_trait::async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    type Conn: Connection;

    async fn connect(&self, endpoint: &str) -> Result<Self::Conn, StreamError>;
}

/// One established duplex connection.
#[async_trait::async_trait]
pub trait Connection: Send {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), StreamError>;

    async fn send_text(&mut self, text: &str) -> Result<(), StreamError>;

    /// Wait for the next inbound event. After `Closed` is returned the
    /// connection must not be polled again.
    async fn next_event(&mut self) -> ConnectionEvent;

    /// Close with the normal-closure code. Best effort.
    async fn close(&mut self);
}

/// WebSocket transport backed by tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

#[async_trait::async_trait]
impl Transport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&self, endpoint: &str) -> Result<WsConnection, StreamError> {
        debug!("Dialing transcription server: {}", endpoint);

        let (stream, _response) = connect_async(endpoint)
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        Ok(WsConnection { inner: stream })
    }
}

pub struct WsConnection {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Connection for WsConnection {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), StreamError> {
        self.inner
            .send(Message::Binary(data))
            .await
            .map_err(|e| StreamError::Send(e.to_string()))
    }

    async fn send_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.inner
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| StreamError::Send(e.to_string()))
    }

    async fn next_event(&mut self) -> ConnectionEvent {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return ConnectionEvent::Message(text),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(NO_CLOSE_FRAME);
                    return ConnectionEvent::Closed { code };
                }
                // The server speaks JSON text only; pings are answered by
                // tungstenite internally.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket read error: {}", e);
                    return ConnectionEvent::Closed {
                        code: NO_CLOSE_FRAME,
                    };
                }
                None => {
                    return ConnectionEvent::Closed {
                        code: NO_CLOSE_FRAME,
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnecting".into(),
        };
        if let Err(e) = self.inner.close(Some(frame)).await {
            debug!("WebSocket close handshake failed: {}", e);
        }
    }
}
