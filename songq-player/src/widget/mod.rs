//! Video widget contract and providers
//!
//! The player does not own a video implementation. It constructs a widget
//! for one identifier (anchor id, size, identifier, observers), calls
//! `play_video()` once the widget reports ready, and reacts to its lifecycle
//! callbacks. Providers:
//! - [`ProcessWidgetFactory`]: runs an external player process
//! - [`DryRunWidgetFactory`]: no output, ends after a fixed duration

pub mod dry_run;
pub mod process;

use std::sync::Arc;

use songq_common::config::{WidgetBackend, WidgetConfig};
use uuid::Uuid;

use crate::error::Result;
use crate::events::{EventSender, PlayerEvent};

pub use dry_run::DryRunWidgetFactory;
pub use process::ProcessWidgetFactory;

/// Construction parameters for one widget instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSpec {
    /// Anchor id the widget binds to
    pub anchor: String,
    pub width: u32,
    pub height: u32,
    /// Item to play
    pub identifier: String,
}

/// Player states a widget can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

/// Lifecycle callbacks a widget delivers to its observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// Widget constructed and ready for `play_video()`
    Ready,
    StateChange(WidgetState),
    /// Playback failed; the item cannot be played
    Error(String),
}

/// Observer handle given to a widget at construction
///
/// Tags each callback with the session id of the widget it was created for,
/// so the player can tell live callbacks from those of torn-down widgets.
#[derive(Debug, Clone)]
pub struct WidgetObserver {
    session: Uuid,
    tx: EventSender,
}

impl WidgetObserver {
    pub fn new(session: Uuid, tx: EventSender) -> Self {
        Self { session, tx }
    }

    pub fn ready(&self) {
        self.notify(WidgetEvent::Ready);
    }

    pub fn state_change(&self, state: WidgetState) {
        self.notify(WidgetEvent::StateChange(state));
    }

    pub fn error(&self, reason: impl Into<String>) {
        self.notify(WidgetEvent::Error(reason.into()));
    }

    fn notify(&self, event: WidgetEvent) {
        // Player already gone during shutdown
        let _ = self.tx.send(PlayerEvent::Widget {
            session: self.session,
            event,
        });
    }
}

/// A mounted widget instance
///
/// Dropping the widget discards it; providers stop any output on drop and
/// deliver no further callbacks that matter (the session is gone).
pub trait Widget: Send {
    /// Begin playback
    fn play_video(&mut self) -> Result<()>;

    /// Identifier this widget was constructed for
    fn identifier(&self) -> &str;
}

/// Constructs widgets for the playback controller
pub trait WidgetFactory: Send + Sync {
    /// Build a widget bound to `spec.anchor` for `spec.identifier`
    ///
    /// Implementations report `Ready` through the observer once the widget
    /// can accept `play_video()`.
    fn create(&self, spec: WidgetSpec, observer: WidgetObserver) -> Result<Box<dyn Widget>>;
}

/// Build the widget provider selected by configuration
pub fn factory_from_config(config: &WidgetConfig) -> Arc<dyn WidgetFactory> {
    match config.backend {
        WidgetBackend::Process => Arc::new(ProcessWidgetFactory::new(config)),
        WidgetBackend::DryRun => Arc::new(DryRunWidgetFactory::new(std::time::Duration::from_millis(
            config.dry_run_ms,
        ))),
    }
}
