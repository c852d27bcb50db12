//! Streaming connection to the transcription server
//!
//! One [`StreamingSession`] lives per recording. It pushes binary PCM
//! frames to the server, parses transcript and summary records coming
//! back, queues frames while disconnected, and reconnects with bounded
//! exponential backoff after an abnormal close.

pub mod messages;
pub mod session;
pub mod transport;

pub use messages::{ServerMessage, WireSegment, STOP_COMMAND};
pub use session::{
    reconnect_delay, ConnectionState, SessionCommand, SessionEvent, SessionHandle,
    StreamConfig, StreamingSession, NORMAL_CLOSURE,
};
pub use transport::{Connection, ConnectionEvent, Transport, WsTransport};
