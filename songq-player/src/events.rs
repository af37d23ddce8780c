//! Internal player events (not exposed via SSE)
//!
//! Every input the player reacts to arrives as a `PlayerEvent` on one mpsc
//! channel: connection tasks, widget watchers and poll timers only send,
//! the [`QueuePlayer`](crate::QueuePlayer) only receives. For events visible
//! to status clients, see `songq_common::events::QueueEvent`.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::widget::WidgetEvent;

/// Sending half of the player's event channel
pub type EventSender = mpsc::UnboundedSender<PlayerEvent>;

/// Receiving half of the player's event channel
pub type EventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

/// Which poll timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Connection health check
    Health,
    /// Start-next-item-if-idle check
    Playback,
}

/// Input events for the queue player
///
/// Connection events carry the generation of the connection that produced
/// them; widget events carry the session of the widget that produced them.
/// Events from replaced connections or torn-down widgets are discarded.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    ConnectionOpened {
        generation: u64,
    },

    ConnectionClosed {
        generation: u64,
    },

    ConnectionError {
        generation: u64,
        reason: String,
    },

    /// Text frame received
    MessageReceived {
        generation: u64,
        text: String,
    },

    /// Lifecycle callback from a mounted widget
    Widget {
        session: Uuid,
        event: WidgetEvent,
    },

    TimerTick(TimerKind),
}

/// Create the player's event channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
