//! Queue player: the single owner of all player state
//!
//! Holds the queue, playing flag and display slot (via
//! [`PlaybackController`]) and the command connection (via
//! [`ConnectionManager`]). Every input arrives as a [`PlayerEvent`] on one
//! channel and is handled to completion before the next, so no state is
//! shared across tasks.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use songq_common::events::{ConnectionState, EventBus, QueueEvent};
use songq_common::Command;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::connection::{ConnectionManager, Connector};
use crate::events::{self, EventReceiver, EventSender, PlayerEvent, TimerKind};
use crate::playback::{NowPlaying, PlaybackController, WidgetLayout};
use crate::widget::WidgetFactory;

/// Snapshot of player state for status clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub connection: ConnectionState,
    pub generation: u64,
    pub playing: bool,
    pub now_playing: Option<NowPlaying>,
    pub queue: Vec<String>,
}

pub struct QueuePlayer {
    playback: PlaybackController,
    connection: ConnectionManager,
    events_tx: EventSender,
    events_rx: EventReceiver,
    bus: Arc<EventBus>,
    status_tx: watch::Sender<PlayerStatus>,
}

impl QueuePlayer {
    /// Create the player and open the first connection
    ///
    /// Must be called inside a tokio runtime; connectors spawn their I/O
    /// tasks immediately.
    pub fn new(
        connector: Arc<dyn Connector>,
        factory: Arc<dyn WidgetFactory>,
        layout: WidgetLayout,
        bus: Arc<EventBus>,
    ) -> Self {
        let (events_tx, events_rx) = events::channel();
        let connection = ConnectionManager::open(connector, events_tx.clone());
        let playback = PlaybackController::new(factory, layout, events_tx.clone(), bus.clone());

        let status = PlayerStatus {
            connection: connection.ready_state(),
            generation: connection.generation(),
            playing: false,
            now_playing: None,
            queue: Vec::new(),
        };
        let (status_tx, _) = watch::channel(status);

        Self {
            playback,
            connection,
            events_tx,
            events_rx,
            bus,
            status_tx,
        }
    }

    /// Sender for timers and other event sources
    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    /// Watch the status snapshot published after every handled event
    pub fn subscribe_status(&self) -> watch::Receiver<PlayerStatus> {
        self.status_tx.subscribe()
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            connection: self.connection.ready_state(),
            generation: self.connection.generation(),
            playing: self.playback.is_playing(),
            now_playing: self.playback.now_playing().cloned(),
            queue: self.playback.queue().snapshot(),
        }
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::ConnectionOpened { generation } => {
                if self.is_stale(generation) {
                    return;
                }
                info!("Connection open (generation {})", generation);
                self.publish_connection(generation, ConnectionState::Open);
            }
            PlayerEvent::ConnectionClosed { generation } => {
                if self.is_stale(generation) {
                    return;
                }
                info!("Connection closed (generation {})", generation);
                self.publish_connection(generation, ConnectionState::Closed);
            }
            PlayerEvent::ConnectionError { generation, reason } => {
                if self.is_stale(generation) {
                    return;
                }
                warn!("{} (generation {})", reason, generation);
            }
            PlayerEvent::MessageReceived { generation, text } => {
                if self.is_stale(generation) {
                    return;
                }
                self.on_message(&text);
            }
            PlayerEvent::Widget { session, event } => {
                self.playback.handle_widget_event(session, event);
            }
            PlayerEvent::TimerTick(TimerKind::Health) => {
                if self.connection.ensure_open() {
                    self.publish_connection(self.connection.generation(), ConnectionState::Connecting);
                }
            }
            PlayerEvent::TimerTick(TimerKind::Playback) => {
                self.playback.playback_tick();
            }
        }

        self.status_tx.send_replace(self.status());
    }

    /// Handle every event already queued, without waiting
    ///
    /// Returns the number of events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event and handle it
    ///
    /// Returns false if the event channel is closed.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Dispatch loop; returns once `shutdown` resolves
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Queue player running");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Queue player shutting down");
                    break;
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }

        self.playback.stop();
        self.status_tx.send_replace(self.status());
    }

    fn on_message(&mut self, text: &str) {
        match Command::parse(text) {
            Some(Command::Play(identifier)) => self.playback.enqueue(identifier),
            Some(Command::Skip) => self.playback.skip(),
            None => trace!("Ignoring unrecognized message: {:?}", text),
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        let stale = !self.connection.is_current(generation);
        if stale {
            debug!("Ignoring event from replaced connection (generation {})", generation);
        }
        stale
    }

    fn publish_connection(&self, generation: u64, state: ConnectionState) {
        self.bus.emit_lossy(QueueEvent::ConnectionChanged {
            generation,
            state,
            timestamp: chrono::Utc::now(),
        });
    }
}
