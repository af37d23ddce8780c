//! Event types for the SongQ event system
//!
//! `QueueEvent`s describe what the player did (enqueued, started, ended,
//! errored, skipped) and how the connection is doing. They are broadcast on
//! an [`EventBus`] and streamed to status API clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// SongQ event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// Identifier appended to the queue
    Enqueued {
        identifier: String,
        queue_len: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Widget mounted for an identifier
    PlaybackStarted {
        session_id: Uuid,
        identifier: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Widget reached its natural end
    PlaybackEnded {
        session_id: Uuid,
        identifier: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Widget failed (or could not be created); the item is skipped
    PlaybackErrored {
        session_id: Option<Uuid>,
        identifier: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// `SKIP` command received
    SkipRequested {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue exhausted; display cleared
    PlaybackIdle {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Connection state transition
    ConnectionChanged {
        generation: u64,
        state: ConnectionState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl QueueEvent {
    /// Variant name, used as the SSE event field
    pub fn event_type(&self) -> &'static str {
        match self {
            QueueEvent::Enqueued { .. } => "Enqueued",
            QueueEvent::PlaybackStarted { .. } => "PlaybackStarted",
            QueueEvent::PlaybackEnded { .. } => "PlaybackEnded",
            QueueEvent::PlaybackErrored { .. } => "PlaybackErrored",
            QueueEvent::SkipRequested { .. } => "SkipRequested",
            QueueEvent::PlaybackIdle { .. } => "PlaybackIdle",
            QueueEvent::ConnectionChanged { .. } => "ConnectionChanged",
        }
    }
}

/// Ready state of the command connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Open => 1,
            ConnectionState::Closing => 2,
            ConnectionState::Closed => 3,
        }
    }

    /// Inverse of [`ConnectionState::as_u8`]; unknown values read as closed
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// One-to-many broadcast of [`QueueEvent`]s
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// the emitter.
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use songq_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: QueueEvent,
    ) -> Result<usize, broadcast::error::SendError<QueueEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: QueueEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
