// Scripted fakes for the transport and capture-device seams.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use meeting_scribe::error::{DeviceError, StreamError};
use meeting_scribe::stream::{Connection, ConnectionEvent, Transport};
use meeting_scribe::CaptureDevice;
use tokio::sync::mpsc;

/// What a scripted connection recorded being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Binary(Vec<u8>),
    Text(String),
    Close,
}

/// Outcome of the next `connect` call.
pub enum ConnectOutcome {
    Fail(&'static str),
    Connect,
    /// The dial never resolves.
    Hang,
}

#[derive(Default)]
struct TransportState {
    outcomes: VecDeque<ConnectOutcome>,
    /// tokio-time instants of each connect call, for backoff assertions.
    connect_times: Vec<tokio::time::Instant>,
    /// Inbound-event senders, one per established connection.
    conn_inputs: Vec<mpsc::UnboundedSender<ConnectionEvent>>,
    sent: Vec<Sent>,
}

/// Transport whose connect attempts follow a fixed script. Established
/// connections record everything sent and replay events pushed by the
/// test.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<TransportState>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<ConnectOutcome>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                outcomes: outcomes.into(),
                ..Default::default()
            })),
        }
    }

    /// Everything sent over every connection so far, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connect_times.len()
    }

    pub fn connect_times(&self) -> Vec<tokio::time::Instant> {
        self.state.lock().unwrap().connect_times.clone()
    }

    /// Push an inbound event into connection number `index` (0-based).
    pub fn push_event(&self, index: usize, event: ConnectionEvent) {
        let state = self.state.lock().unwrap();
        state.conn_inputs[index]
            .send(event)
            .expect("scripted connection gone");
    }

    /// Push a server text message into the most recent connection.
    pub fn push_message(&self, text: &str) {
        let index = self
            .state
            .lock()
            .unwrap()
            .conn_inputs
            .len()
            .checked_sub(1)
            .expect("no scripted connection yet");
        self.push_event(index, ConnectionEvent::Message(text.to_string()));
    }

    /// Close the most recent connection with the given code.
    pub fn push_close(&self, code: u16) {
        let index = self
            .state
            .lock()
            .unwrap()
            .conn_inputs
            .len()
            .checked_sub(1)
            .expect("no scripted connection yet");
        self.push_event(index, ConnectionEvent::Closed { code });
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    type Conn = ScriptedConnection;

    async fn connect(&self, _endpoint: &str) -> Result<ScriptedConnection, StreamError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.connect_times.push(tokio::time::Instant::now());
            state.outcomes.pop_front()
        };

        match outcome {
            Some(ConnectOutcome::Connect) => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.state.lock().unwrap().conn_inputs.push(tx);
                Ok(ScriptedConnection {
                    shared: Arc::clone(&self.state),
                    events: rx,
                })
            }
            Some(ConnectOutcome::Fail(reason)) => Err(StreamError::Connect(reason.to_string())),
            Some(ConnectOutcome::Hang) => std::future::pending().await,
            None => Err(StreamError::Connect("no scripted outcome left".to_string())),
        }
    }
}

pub struct ScriptedConnection {
    shared: Arc<Mutex<TransportState>>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

#[async_trait::async_trait]
impl Connection for ScriptedConnection {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), StreamError> {
        self.shared.lock().unwrap().sent.push(Sent::Binary(data));
        Ok(())
    }

    async fn send_text(&mut self, text: &str) -> Result<(), StreamError> {
        self.shared
            .lock()
            .unwrap()
            .sent
            .push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn next_event(&mut self) -> ConnectionEvent {
        match self.events.recv().await {
            Some(event) => event,
            // Test dropped its handle without closing; stay quiet.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.shared.lock().unwrap().sent.push(Sent::Close);
    }
}

/// Capture device driven by the test: samples are pushed through the
/// handle returned by `acquire`, held in `input()`.
pub struct ScriptedDevice {
    input: Arc<Mutex<Option<mpsc::Sender<Vec<i16>>>>>,
    fail_with: Option<DeviceError>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self {
            input: Arc::new(Mutex::new(None)),
            fail_with: None,
        }
    }

    /// Next `acquire` fails with this error.
    pub fn failing(error: DeviceError) -> Self {
        Self {
            input: Arc::new(Mutex::new(None)),
            fail_with: Some(error),
        }
    }

    /// Handle for pushing sample blocks once acquired.
    pub fn input(&self) -> Arc<Mutex<Option<mpsc::Sender<Vec<i16>>>>> {
        Arc::clone(&self.input)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<i16>>, DeviceError> {
        if let Some(error) = self.fail_with.take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel(64);
        *self.input.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn release(&mut self) {
        // Dropping the sender ends the sample stream.
        self.input.lock().unwrap().take();
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Push one block of samples into a scripted device.
pub async fn push_samples(input: &Arc<Mutex<Option<mpsc::Sender<Vec<i16>>>>>, block: Vec<i16>) {
    let tx = input
        .lock()
        .unwrap()
        .clone()
        .expect("device not acquired");
    tx.send(block).await.expect("capture channel closed");
}
