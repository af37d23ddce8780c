//! Dry-run widget: no output, each item ends after a fixed duration

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::info;

use super::{Widget, WidgetFactory, WidgetObserver, WidgetSpec, WidgetState};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct DryRunWidgetFactory {
    duration: Duration,
}

impl DryRunWidgetFactory {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl WidgetFactory for DryRunWidgetFactory {
    fn create(&self, spec: WidgetSpec, observer: WidgetObserver) -> Result<Box<dyn Widget>> {
        observer.ready();
        Ok(Box::new(DryRunWidget {
            identifier: spec.identifier,
            duration: self.duration,
            observer,
            cancel: None,
        }))
    }
}

pub struct DryRunWidget {
    identifier: String,
    duration: Duration,
    observer: WidgetObserver,
    cancel: Option<oneshot::Sender<()>>,
}

impl Widget for DryRunWidget {
    fn play_video(&mut self) -> Result<()> {
        if self.cancel.is_some() {
            return Ok(());
        }

        info!(
            "Dry run: playing {} for {}ms",
            self.identifier,
            self.duration.as_millis()
        );

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.cancel = Some(cancel_tx);
        self.observer.state_change(WidgetState::Playing);

        let observer = self.observer.clone();
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => observer.state_change(WidgetState::Ended),
                _ = cancel_rx => {}
            }
        });

        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
