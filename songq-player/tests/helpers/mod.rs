//! Shared test doubles for songq-player integration tests
//!
//! - `MockConnector`: connections whose ready state the test sets directly
//! - `MockWidgetFactory`: widgets that record construction and play calls

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use songq_common::events::{ConnectionState, EventBus};
use songq_player::connection::{Connection, Connector, SharedReadyState};
use songq_player::events::{EventSender, PlayerEvent, TimerKind};
use songq_player::playback::WidgetLayout;
use songq_player::widget::{Widget, WidgetFactory, WidgetObserver, WidgetSpec};
use songq_player::{Error, QueuePlayer, Result};

#[derive(Default)]
pub struct MockConnector {
    states: Mutex<Vec<SharedReadyState>>,
}

struct MockConnection {
    generation: u64,
    state: SharedReadyState,
}

impl Connection for MockConnection {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn ready_state(&self) -> ConnectionState {
        self.state.get()
    }
}

impl Connector for MockConnector {
    fn connect(&self, generation: u64, _events: EventSender) -> Box<dyn Connection> {
        let state = SharedReadyState::new(ConnectionState::Open);
        self.states.lock().unwrap().push(state.clone());
        Box::new(MockConnection { generation, state })
    }
}

impl MockConnector {
    /// Number of connections opened so far
    pub fn connect_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    /// Mark connection `generation` (1-based) as closed
    pub fn close(&self, generation: u64) {
        self.states.lock().unwrap()[(generation - 1) as usize].set(ConnectionState::Closed);
    }
}

#[derive(Default)]
pub struct MockWidgetFactory {
    pub created: Mutex<Vec<String>>,
    pub played: Arc<Mutex<Vec<String>>>,
    /// Identifiers whose construction fails
    pub reject: Vec<String>,
}

struct MockWidget {
    identifier: String,
    played: Arc<Mutex<Vec<String>>>,
}

impl Widget for MockWidget {
    fn play_video(&mut self) -> Result<()> {
        self.played.lock().unwrap().push(self.identifier.clone());
        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl WidgetFactory for MockWidgetFactory {
    fn create(&self, spec: WidgetSpec, observer: WidgetObserver) -> Result<Box<dyn Widget>> {
        if self.reject.contains(&spec.identifier) {
            return Err(Error::Widget(format!("rejected {}", spec.identifier)));
        }
        self.created.lock().unwrap().push(spec.identifier.clone());
        observer.ready();
        Ok(Box::new(MockWidget {
            identifier: spec.identifier,
            played: self.played.clone(),
        }))
    }
}

impl MockWidgetFactory {
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }
}

/// Player wired to mocks
pub struct TestPlayer {
    pub player: QueuePlayer,
    pub connector: Arc<MockConnector>,
    pub factory: Arc<MockWidgetFactory>,
    pub bus: Arc<EventBus>,
}

impl TestPlayer {
    pub fn new() -> Self {
        Self::with_factory(MockWidgetFactory::default())
    }

    pub fn with_factory(factory: MockWidgetFactory) -> Self {
        let connector = Arc::new(MockConnector::default());
        let factory = Arc::new(factory);
        let bus = Arc::new(EventBus::new(64));
        let player = QueuePlayer::new(
            connector.clone(),
            factory.clone(),
            WidgetLayout::default(),
            bus.clone(),
        );
        Self {
            player,
            connector,
            factory,
            bus,
        }
    }

    /// Deliver a text frame on the live connection, then settle
    pub fn message(&mut self, text: &str) {
        let generation = self.player.connection().generation();
        self.message_on(generation, text);
    }

    /// Deliver a text frame tagged with a specific connection generation
    pub fn message_on(&mut self, generation: u64, text: &str) {
        self.player.handle(PlayerEvent::MessageReceived {
            generation,
            text: text.to_string(),
        });
        self.player.process_pending();
    }

    pub fn tick(&mut self, kind: TimerKind) {
        self.player.handle(PlayerEvent::TimerTick(kind));
        self.player.process_pending();
    }

    pub fn current(&self) -> Option<String> {
        self.player
            .playback()
            .now_playing()
            .map(|n| n.identifier.clone())
    }

    pub fn queue(&self) -> Vec<String> {
        self.player.playback().queue().snapshot()
    }

    pub fn is_playing(&self) -> bool {
        self.player.playback().is_playing()
    }
}
