//! Command connection client
//!
//! One live WebSocket connection to the song request endpoint at a time.
//! Each connection runs in its own task and reports open, close, error and
//! text-frame events into the player's event channel, tagged with its
//! generation number. Closing never triggers a reconnect by itself: the
//! health check in [`ConnectionManager::ensure_open`] replaces closed
//! connections wholesale, and the old instance is dropped with its task.
//!
//! After the server's close frame the client waits at most
//! [`CLOSE_HANDSHAKE_TIMEOUT`] for the server to drop the socket. A peer
//! that never finishes the handshake would otherwise leave the connection
//! in `Closing`, which the health check does not replace.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use songq_common::events::ConnectionState;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::events::{EventSender, PlayerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Wait for the server to drop the socket after its close frame
pub const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A single connection instance
pub trait Connection: Send {
    /// Sequence number of this instance; the first connection is 1
    fn generation(&self) -> u64;

    fn ready_state(&self) -> ConnectionState;
}

/// Opens connection instances
pub trait Connector: Send + Sync {
    /// Start connecting; progress is reported through `events`
    fn connect(&self, generation: u64, events: EventSender) -> Box<dyn Connection>;
}

/// Ready state shared between a connection task and its handle
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub fn new(state: ConnectionState) -> Self {
        Self(Arc::new(AtomicU8::new(state.as_u8())))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// Connects to a fixed WebSocket endpoint
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
    close_timeout: Duration,
}

impl WsConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            close_timeout: CLOSE_HANDSHAKE_TIMEOUT,
        }
    }

    /// Override how long a closing connection waits for the server
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Connector for WsConnector {
    fn connect(&self, generation: u64, events: EventSender) -> Box<dyn Connection> {
        debug!("Connecting to {} (generation {})", self.endpoint, generation);

        let state = SharedReadyState::new(ConnectionState::Connecting);
        let task = tokio::spawn(run_connection(
            self.endpoint.clone(),
            generation,
            self.close_timeout,
            state.clone(),
            events,
        ));

        Box::new(WsConnection {
            generation,
            state,
            task,
        })
    }
}

/// Handle to a running WebSocket connection task
///
/// Dropping the handle aborts the task, which closes the socket.
pub struct WsConnection {
    generation: u64,
    state: SharedReadyState,
    task: JoinHandle<()>,
}

impl Connection for WsConnection {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn ready_state(&self) -> ConnectionState {
        self.state.get()
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open(endpoint: &str) -> Result<WsStream> {
    let (stream, _response) = tokio_tungstenite::connect_async(endpoint).await?;
    Ok(stream)
}

/// Connection task body: connect, forward text frames, report close
async fn run_connection(
    endpoint: String,
    generation: u64,
    close_timeout: Duration,
    state: SharedReadyState,
    events: EventSender,
) {
    match open(&endpoint).await {
        Ok(stream) => {
            state.set(ConnectionState::Open);
            let _ = events.send(PlayerEvent::ConnectionOpened { generation });
            read_messages(stream, generation, close_timeout, &state, &events).await;
        }
        Err(e) => {
            let _ = events.send(PlayerEvent::ConnectionError {
                generation,
                reason: e.to_string(),
            });
        }
    }

    state.set(ConnectionState::Closed);
    let _ = events.send(PlayerEvent::ConnectionClosed { generation });
}

async fn read_messages(
    mut stream: WsStream,
    generation: u64,
    close_timeout: Duration,
    state: &SharedReadyState,
    events: &EventSender,
) {
    loop {
        let next = if state.get() == ConnectionState::Closing {
            match tokio::time::timeout(close_timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    debug!(
                        "Server did not finish close handshake in {:?}, dropping socket",
                        close_timeout
                    );
                    break;
                }
            }
        } else {
            stream.next().await
        };

        let Some(message) = next else {
            break;
        };

        match message {
            Ok(Message::Text(text)) => {
                trace!("Received text frame: {}", text);
                let _ = events.send(PlayerEvent::MessageReceived { generation, text });
            }
            Ok(Message::Close(frame)) => {
                info!("Server closed connection: {:?}", frame);
                state.set(ConnectionState::Closing);
            }
            Ok(other) => {
                trace!("Ignoring non-text frame: {:?}", other);
            }
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => break,
            Err(e) => {
                let _ = events.send(PlayerEvent::ConnectionError {
                    generation,
                    reason: Error::from(e).to_string(),
                });
                break;
            }
        }
    }
}

/// Owns the current connection and replaces it when closed
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    events: EventSender,
    current: Box<dyn Connection>,
}

impl ConnectionManager {
    /// Open the first connection immediately
    pub fn open(connector: Arc<dyn Connector>, events: EventSender) -> Self {
        let current = connector.connect(1, events.clone());
        Self {
            connector,
            events,
            current,
        }
    }

    pub fn generation(&self) -> u64 {
        self.current.generation()
    }

    pub fn ready_state(&self) -> ConnectionState {
        self.current.ready_state()
    }

    /// True if `generation` belongs to the live connection
    pub fn is_current(&self, generation: u64) -> bool {
        self.current.generation() == generation
    }

    /// Health check: replace the connection if it is closed
    ///
    /// Returns true when a new connection was started.
    pub fn ensure_open(&mut self) -> bool {
        if self.current.ready_state() != ConnectionState::Closed {
            return false;
        }

        let generation = self.current.generation() + 1;
        info!("Connection closed, reconnecting (generation {})", generation);
        // Old instance (and its observers) dropped here
        self.current = self.connector.connect(generation, self.events.clone());
        true
    }
}
