//! Playback controller
//!
//! Drives one widget at a time through its lifecycle, using the queue as
//! its work source.
//!
//! The playing flag and the display slot always agree: the flag is true
//! exactly when a widget is mounted. `advance()` sets the flag to playing
//! whenever it mounts a widget and to idle when the queue runs out, so an
//! error-driven skip leaves a well-defined state.

use std::sync::Arc;

use songq_common::config::WidgetConfig;
use songq_common::events::{EventBus, QueueEvent};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::display::{DisplaySlot, NowPlaying};
use crate::error::Result;
use crate::events::EventSender;
use crate::queue::SongQueue;
use crate::widget::{WidgetEvent, WidgetFactory, WidgetObserver, WidgetSpec, WidgetState};

/// Fixed anchor and size every widget is constructed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetLayout {
    pub anchor: String,
    pub width: u32,
    pub height: u32,
}

impl WidgetLayout {
    pub fn from_config(config: &WidgetConfig) -> Self {
        Self {
            anchor: config.anchor.clone(),
            width: config.width,
            height: config.height,
        }
    }

    fn spec_for(&self, identifier: String) -> WidgetSpec {
        WidgetSpec {
            anchor: self.anchor.clone(),
            width: self.width,
            height: self.height,
            identifier,
        }
    }
}

impl Default for WidgetLayout {
    fn default() -> Self {
        Self::from_config(&WidgetConfig::default())
    }
}

pub struct PlaybackController {
    queue: SongQueue,
    playing: bool,
    display: DisplaySlot,
    factory: Arc<dyn WidgetFactory>,
    layout: WidgetLayout,
    /// Handed to each widget's observer
    events: EventSender,
    bus: Arc<EventBus>,
}

impl PlaybackController {
    pub fn new(
        factory: Arc<dyn WidgetFactory>,
        layout: WidgetLayout,
        events: EventSender,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            queue: SongQueue::new(),
            playing: false,
            display: DisplaySlot::new(),
            factory,
            layout,
            events,
            bus,
        }
    }

    pub fn queue(&self) -> &SongQueue {
        &self.queue
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.display.now_playing()
    }

    /// Append an identifier to the queue
    pub fn enqueue(&mut self, identifier: String) {
        debug!("Enqueued {}", identifier);
        self.queue.enqueue(identifier.clone());
        self.bus.emit_lossy(QueueEvent::Enqueued {
            identifier,
            queue_len: self.queue.len(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Skip command: advance now, whatever the playing flag says
    pub fn skip(&mut self) {
        info!("Skip requested");
        self.bus.emit_lossy(QueueEvent::SkipRequested {
            timestamp: chrono::Utc::now(),
        });
        self.advance();
    }

    /// Playback timer: start the next item only when idle
    pub fn playback_tick(&mut self) {
        if self.queue.has_next() && !self.playing {
            self.advance();
        }
    }

    /// Start the next queued item, or clear the display if there is none
    ///
    /// Items whose widget cannot be constructed are dropped and the next
    /// one is tried.
    pub fn advance(&mut self) {
        while let Some(identifier) = self.queue.dequeue() {
            self.teardown();
            match self.start_widget(identifier.clone()) {
                Ok(()) => {
                    self.playing = true;
                    self.check_invariant();
                    return;
                }
                Err(e) => {
                    warn!("Could not create widget for {}: {}", identifier, e);
                    self.bus.emit_lossy(QueueEvent::PlaybackErrored {
                        session_id: None,
                        identifier,
                        reason: e.to_string(),
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        }

        self.teardown();
        if self.playing {
            info!("Queue empty, playback idle");
        }
        self.playing = false;
        self.bus.emit_lossy(QueueEvent::PlaybackIdle {
            timestamp: chrono::Utc::now(),
        });
        self.check_invariant();
    }

    /// Lifecycle callback from a widget
    ///
    /// Callbacks from any session other than the mounted one are ignored.
    pub fn handle_widget_event(&mut self, session: Uuid, event: WidgetEvent) {
        if self.display.session() != Some(session) {
            trace!("Ignoring {:?} from stale widget session {}", event, session);
            return;
        }

        match event {
            WidgetEvent::Ready => {
                let result = match self.display.widget_mut() {
                    Some(widget) => widget.play_video(),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.fail_current(session, e.to_string());
                }
            }
            WidgetEvent::StateChange(WidgetState::Ended) => {
                if let Some(ended) = self.display.clear() {
                    info!("Finished {}", ended.identifier);
                    self.bus.emit_lossy(QueueEvent::PlaybackEnded {
                        session_id: ended.session_id,
                        identifier: ended.identifier,
                        timestamp: chrono::Utc::now(),
                    });
                }
                self.playing = false;
                self.check_invariant();
            }
            WidgetEvent::StateChange(state) => {
                debug!("Widget state changed: {:?}", state);
            }
            WidgetEvent::Error(reason) => {
                self.fail_current(session, reason);
            }
        }
    }

    /// Tear down the display on shutdown
    pub fn stop(&mut self) {
        self.teardown();
        self.playing = false;
    }

    /// Skip the mounted item after a widget failure
    fn fail_current(&mut self, session: Uuid, reason: String) {
        let identifier = self
            .display
            .now_playing()
            .map(|n| n.identifier.clone())
            .unwrap_or_default();
        warn!("Playback of {} failed: {}", identifier, reason);
        self.bus.emit_lossy(QueueEvent::PlaybackErrored {
            session_id: Some(session),
            identifier,
            reason,
            timestamp: chrono::Utc::now(),
        });
        self.advance();
    }

    fn start_widget(&mut self, identifier: String) -> Result<()> {
        let session = Uuid::new_v4();
        let observer = WidgetObserver::new(session, self.events.clone());
        let widget = self
            .factory
            .create(self.layout.spec_for(identifier), observer)?;

        let started = self.display.mount(session, widget);
        info!("Now playing {} (session {})", started.identifier, session);
        self.bus.emit_lossy(QueueEvent::PlaybackStarted {
            session_id: session,
            identifier: started.identifier.clone(),
            timestamp: started.started_at,
        });
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(cleared) = self.display.clear() {
            debug!("Cleared widget for {}", cleared.identifier);
        }
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.playing,
            self.display.is_mounted(),
            "playing flag out of sync with display slot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::events::{self, EventReceiver, PlayerEvent};
    use crate::widget::Widget;
    use std::sync::Mutex;

    /// Records constructions and play calls; fails for identifiers it is told to
    #[derive(Default)]
    struct RecordingFactory {
        created: Mutex<Vec<String>>,
        played: Arc<Mutex<Vec<String>>>,
        reject: Vec<String>,
        fail_play: Vec<String>,
    }

    struct RecordingWidget {
        identifier: String,
        played: Arc<Mutex<Vec<String>>>,
        fail_play: bool,
    }

    impl Widget for RecordingWidget {
        fn play_video(&mut self) -> Result<()> {
            if self.fail_play {
                return Err(Error::Widget("play failed".to_string()));
            }
            self.played.lock().unwrap().push(self.identifier.clone());
            Ok(())
        }

        fn identifier(&self) -> &str {
            &self.identifier
        }
    }

    impl WidgetFactory for RecordingFactory {
        fn create(&self, spec: WidgetSpec, observer: WidgetObserver) -> Result<Box<dyn Widget>> {
            if self.reject.contains(&spec.identifier) {
                return Err(Error::Widget(format!("cannot embed {}", spec.identifier)));
            }
            self.created.lock().unwrap().push(spec.identifier.clone());
            observer.ready();
            Ok(Box::new(RecordingWidget {
                fail_play: self.fail_play.contains(&spec.identifier),
                identifier: spec.identifier,
                played: self.played.clone(),
            }))
        }
    }

    fn controller(factory: RecordingFactory) -> (PlaybackController, Arc<RecordingFactory>, EventReceiver) {
        let factory = Arc::new(factory);
        let (tx, rx) = events::channel();
        let controller = PlaybackController::new(
            factory.clone(),
            WidgetLayout::default(),
            tx,
            Arc::new(EventBus::new(64)),
        );
        (controller, factory, rx)
    }

    /// Feed queued widget callbacks back into the controller
    fn pump(controller: &mut PlaybackController, rx: &mut EventReceiver) {
        while let Ok(event) = rx.try_recv() {
            if let PlayerEvent::Widget { session, event } = event {
                controller.handle_widget_event(session, event);
            }
        }
    }

    fn current(controller: &PlaybackController) -> Option<String> {
        controller.now_playing().map(|n| n.identifier.clone())
    }

    #[test]
    fn test_tick_starts_head_when_idle() {
        let (mut c, factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.enqueue("b".to_string());

        c.playback_tick();
        pump(&mut c, &mut rx);

        assert!(c.is_playing());
        assert_eq!(current(&c).as_deref(), Some("a"));
        assert_eq!(c.queue().snapshot(), vec!["b".to_string()]);
        assert_eq!(*factory.played.lock().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_tick_does_nothing_while_playing() {
        let (mut c, factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.playback_tick();
        c.enqueue("b".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);

        assert_eq!(current(&c).as_deref(), Some("a"));
        assert_eq!(factory.created.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_tick_with_empty_queue_stays_idle() {
        let (mut c, factory, _rx) = controller(RecordingFactory::default());
        c.playback_tick();
        assert!(!c.is_playing());
        assert!(factory.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ended_clears_display_and_idles() {
        let (mut c, _factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.enqueue("b".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);

        let session = c.now_playing().unwrap().session_id;
        c.handle_widget_event(session, WidgetEvent::StateChange(WidgetState::Ended));
        assert!(!c.is_playing());
        assert!(c.now_playing().is_none());

        c.playback_tick();
        assert_eq!(current(&c).as_deref(), Some("b"));
        assert!(c.is_playing());
    }

    #[test]
    fn test_other_state_changes_are_ignored() {
        let (mut c, _factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);

        let session = c.now_playing().unwrap().session_id;
        c.handle_widget_event(session, WidgetEvent::StateChange(WidgetState::Paused));
        assert!(c.is_playing());
        assert_eq!(current(&c).as_deref(), Some("a"));
    }

    #[test]
    fn test_error_advances_and_keeps_playing_flag() {
        let (mut c, _factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.enqueue("b".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);

        let session = c.now_playing().unwrap().session_id;
        c.handle_widget_event(session, WidgetEvent::Error("unavailable".to_string()));

        assert_eq!(current(&c).as_deref(), Some("b"));
        assert!(c.is_playing());
    }

    #[test]
    fn test_error_on_last_item_goes_idle() {
        let (mut c, _factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);

        let session = c.now_playing().unwrap().session_id;
        c.handle_widget_event(session, WidgetEvent::Error("unavailable".to_string()));

        assert!(!c.is_playing());
        assert!(c.now_playing().is_none());
    }

    #[test]
    fn test_stale_session_events_ignored() {
        let (mut c, _factory, mut rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.enqueue("b".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);
        let old_session = c.now_playing().unwrap().session_id;

        c.skip();
        pump(&mut c, &mut rx);
        assert_eq!(current(&c).as_deref(), Some("b"));

        // Late callback from the torn-down widget for "a"
        c.handle_widget_event(old_session, WidgetEvent::StateChange(WidgetState::Ended));
        assert!(c.is_playing());
        assert_eq!(current(&c).as_deref(), Some("b"));
    }

    #[test]
    fn test_skip_while_idle_with_empty_queue() {
        let (mut c, _factory, _rx) = controller(RecordingFactory::default());
        c.skip();
        assert!(!c.is_playing());
        assert!(c.now_playing().is_none());
    }

    #[test]
    fn test_skip_while_idle_starts_next() {
        let (mut c, _factory, _rx) = controller(RecordingFactory::default());
        c.enqueue("a".to_string());
        c.skip();
        assert!(c.is_playing());
        assert_eq!(current(&c).as_deref(), Some("a"));
    }

    #[test]
    fn test_rejected_widget_is_skipped() {
        let (mut c, factory, _rx) = controller(RecordingFactory {
            reject: vec!["bad".to_string()],
            ..Default::default()
        });
        c.enqueue("bad".to_string());
        c.enqueue("good".to_string());

        c.playback_tick();
        assert_eq!(current(&c).as_deref(), Some("good"));
        assert_eq!(*factory.created.lock().unwrap(), vec!["good".to_string()]);
    }

    #[test]
    fn test_only_rejected_widgets_leaves_idle() {
        let (mut c, _factory, _rx) = controller(RecordingFactory {
            reject: vec!["bad".to_string()],
            ..Default::default()
        });
        c.enqueue("bad".to_string());
        c.playback_tick();
        assert!(!c.is_playing());
        assert!(c.queue().is_empty());
    }

    #[test]
    fn test_play_failure_is_treated_as_error() {
        let (mut c, factory, mut rx) = controller(RecordingFactory {
            fail_play: vec!["a".to_string()],
            ..Default::default()
        });
        c.enqueue("a".to_string());
        c.enqueue("b".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);

        assert_eq!(current(&c).as_deref(), Some("b"));
        assert_eq!(*factory.played.lock().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_events_published_on_bus() {
        let (mut c, _factory, mut rx) = controller(RecordingFactory::default());
        let mut bus_rx = c.bus.subscribe();

        c.enqueue("a".to_string());
        c.playback_tick();
        pump(&mut c, &mut rx);
        let session = c.now_playing().unwrap().session_id;
        c.handle_widget_event(session, WidgetEvent::StateChange(WidgetState::Ended));

        let mut kinds = Vec::new();
        while let Ok(event) = bus_rx.try_recv() {
            kinds.push(event.event_type());
        }
        assert_eq!(kinds, vec!["Enqueued", "PlaybackStarted", "PlaybackEnded"]);
    }
}
