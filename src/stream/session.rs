use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::AudioFrame;
use crate::error::StreamError;
use crate::transcript::TranscriptSegment;

use super::messages::{ServerMessage, STOP_COMMAND};
use super::transport::{Connection, ConnectionEvent, Transport};

/// WebSocket normal-closure code; anything else is abnormal and triggers
/// a reconnect.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code used when the link broke without a close handshake.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Connection lifecycle of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Commands the session accepts from the recording pipeline.
#[derive(Debug)]
pub enum SessionCommand {
    /// Transmit a frame, or queue it while not connected.
    Send(AudioFrame),
    /// Transmit the end-of-utterance marker; no-op unless connected.
    SendStop,
    /// Close with the normal-closure code and discard queued audio.
    Disconnect,
}

/// Events emitted by the session task.
#[derive(Debug)]
pub enum SessionEvent {
    State(ConnectionState),
    Segments(Vec<TranscriptSegment>),
    Summary(String),
    Error(StreamError),
}

/// Connection policy for a streaming session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Full WebSocket URL, e.g. `ws://localhost:8765/ws/transcribe`.
    pub endpoint: String,
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// First backoff delay; doubles per attempt.
    pub reconnect_base_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8765/ws/transcribe".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(1000),
        }
    }
}

/// Backoff before reconnect attempt `attempt` (1-based): `base * 2^(attempt-1)`.
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Handle to a spawned session task.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue or transmit one audio frame. Silently dropped once the
    /// session has fully closed.
    pub async fn send(&self, frame: AudioFrame) {
        let _ = self.commands.send(SessionCommand::Send(frame)).await;
    }

    pub async fn send_stop(&self) {
        let _ = self.commands.send(SessionCommand::SendStop).await;
    }

    /// Idempotent; further commands after this are ignored.
    pub async fn disconnect(&self) {
        let _ = self.commands.send(SessionCommand::Disconnect).await;
    }

    /// Separate sender for the frame pump.
    pub fn sender(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    /// Wait for the session task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// One logical connection to the transcription endpoint.
///
/// Owns the connection state, the pending-audio queue, and the reconnect
/// attempt counter; all three die with the session, so nothing leaks
/// across recordings.
pub struct StreamingSession<T: Transport> {
    transport: T,
    config: StreamConfig,
    state: ConnectionState,
    pending: VecDeque<AudioFrame>,
    reconnect_attempts: u32,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Sender<SessionEvent>,
}

enum ConnectedOutcome {
    /// Caller asked to disconnect; pending audio is discarded.
    ClientClosed,
    /// Server closed with the normal code; no reconnect.
    ServerClosed,
    /// Abnormal close; schedule a reconnect.
    Abnormal { code: u16 },
}

impl<T: Transport> StreamingSession<T> {
    /// Spawn the session task; it starts connecting immediately.
    pub fn spawn(
        transport: T,
        config: StreamConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);

        let session = Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            pending: VecDeque::new(),
            reconnect_attempts: 0,
            commands: cmd_rx,
            events,
        };

        SessionHandle {
            commands: cmd_tx,
            task: tokio::spawn(session.run()),
        }
    }

    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting).await;

            let result = match self.dial().await {
                Some(result) => result,
                None => return,
            };

            match result {
                Ok(mut conn) => {
                    info!("Connected to transcription server");
                    self.reconnect_attempts = 0;
                    self.set_state(ConnectionState::Connected).await;

                    match self.drive_connected(&mut conn).await {
                        ConnectedOutcome::ClientClosed => {
                            conn.close().await;
                            self.pending.clear();
                            self.set_state(ConnectionState::Closed).await;
                            return;
                        }
                        ConnectedOutcome::ServerClosed => {
                            info!("Server closed the connection normally");
                            self.set_state(ConnectionState::Disconnected).await;
                            return;
                        }
                        ConnectedOutcome::Abnormal { code } => {
                            warn!("Connection closed abnormally (code {})", code);
                        }
                    }
                }
                Err(e) => {
                    warn!("Connection attempt failed: {}", e);
                }
            }

            if !self.backoff().await {
                return;
            }
        }
    }

    /// Drive one connect attempt while still accepting commands, so a
    /// disconnect issued mid-dial closes the session immediately instead
    /// of waiting out the attempt. Returns `None` on disconnect.
    async fn dial(&mut self) -> Option<Result<T::Conn, StreamError>> {
        let transport = self.transport.clone();
        let endpoint = self.config.endpoint.clone();
        let connect = async move { transport.connect(&endpoint).await };
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => return Some(result),
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Send(frame)) => self.pending.push_back(frame),
                    Some(SessionCommand::SendStop) => {}
                    Some(SessionCommand::Disconnect) | None => {
                        self.pending.clear();
                        self.set_state(ConnectionState::Closed).await;
                        return None;
                    }
                },
            }
        }
    }

    /// Flush queued audio, then serve commands and inbound messages until
    /// the connection ends one way or another.
    async fn drive_connected(&mut self, conn: &mut T::Conn) -> ConnectedOutcome {
        if !self.pending.is_empty() {
            info!("Flushing {} queued audio frames", self.pending.len());
        }
        while let Some(frame) = self.pending.pop_front() {
            if let Err(e) = conn.send_binary(frame.to_pcm_bytes()).await {
                warn!("Failed to flush queued frame: {}", e);
                self.pending.push_front(frame);
                return ConnectedOutcome::Abnormal {
                    code: ABNORMAL_CLOSURE,
                };
            }
        }

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Send(frame)) => {
                        if let Err(e) = conn.send_binary(frame.to_pcm_bytes()).await {
                            warn!("Failed to send audio frame: {}", e);
                            // Keep the frame; it leads the queue for the
                            // next connection so capture order holds.
                            self.pending.push_front(frame);
                            return ConnectedOutcome::Abnormal {
                                code: ABNORMAL_CLOSURE,
                            };
                        }
                    }
                    Some(SessionCommand::SendStop) => {
                        if let Err(e) = conn.send_text(STOP_COMMAND).await {
                            warn!("Failed to send stop marker: {}", e);
                            return ConnectedOutcome::Abnormal {
                                code: ABNORMAL_CLOSURE,
                            };
                        }
                    }
                    Some(SessionCommand::Disconnect) | None => {
                        return ConnectedOutcome::ClientClosed;
                    }
                },
                event = conn.next_event() => match event {
                    ConnectionEvent::Message(text) => self.handle_message(&text).await,
                    ConnectionEvent::Closed { code } if code == NORMAL_CLOSURE => {
                        return ConnectedOutcome::ServerClosed;
                    }
                    ConnectionEvent::Closed { code } => {
                        return ConnectedOutcome::Abnormal { code };
                    }
                },
            }
        }
    }

    /// Wait out the backoff delay while still accepting commands. Returns
    /// `false` when the session should stop retrying.
    async fn backoff(&mut self) -> bool {
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            error!(
                "Giving up after {} reconnect attempts",
                self.reconnect_attempts
            );
            let _ = self
                .events
                .send(SessionEvent::Error(StreamError::Exhausted {
                    attempts: self.reconnect_attempts,
                }))
                .await;
            self.set_state(ConnectionState::Disconnected).await;
            self.drive_detached().await;
            return false;
        }

        self.reconnect_attempts += 1;
        let delay = reconnect_delay(self.config.reconnect_base_delay, self.reconnect_attempts);
        info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay, self.reconnect_attempts, self.config.max_reconnect_attempts
        );
        self.set_state(ConnectionState::Reconnecting).await;

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Send(frame)) => self.pending.push_back(frame),
                    Some(SessionCommand::SendStop) => {}
                    Some(SessionCommand::Disconnect) | None => {
                        self.pending.clear();
                        self.set_state(ConnectionState::Closed).await;
                        return false;
                    }
                },
            }
        }
    }

    /// After reconnects are exhausted the session no longer talks to the
    /// server but keeps draining commands so the pipeline can shut down
    /// cleanly.
    async fn drive_detached(&mut self) {
        loop {
            match self.commands.recv().await {
                Some(SessionCommand::Send(frame)) => self.pending.push_back(frame),
                Some(SessionCommand::SendStop) => {}
                Some(SessionCommand::Disconnect) | None => break,
            }
        }
        self.pending.clear();
        self.set_state(ConnectionState::Closed).await;
    }

    async fn handle_message(&mut self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::Transcription { segments }) => {
                let segments: Vec<TranscriptSegment> = segments
                    .into_iter()
                    .map(|wire| wire.into_segment())
                    .collect();
                if !segments.is_empty() {
                    let _ = self.events.send(SessionEvent::Segments(segments)).await;
                }
            }
            Ok(ServerMessage::Summary { text }) => {
                let _ = self.events.send(SessionEvent::Summary(text)).await;
            }
            Err(e) => {
                // Malformed input is reported but never tears the
                // connection down.
                warn!("Malformed server message: {}", e);
                let _ = self
                    .events
                    .send(SessionEvent::Error(StreamError::Protocol(e.to_string())))
                    .await;
            }
        }
    }

    async fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        self.state = state;
        let _ = self.events.send(SessionEvent::State(state)).await;
    }
}
