//! External process widget
//!
//! Plays each identifier with an external player command (mpv by default).
//! The child's exit status drives the lifecycle: exit 0 reports `Ended`,
//! anything else reports `Error`. Dropping the widget kills the child.

use std::process::Stdio;

use songq_common::config::WidgetConfig;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::{Widget, WidgetFactory, WidgetObserver, WidgetSpec, WidgetState};
use crate::error::{Error, Result};

/// Builds [`ProcessWidget`]s from the configured command and argument templates
#[derive(Debug, Clone)]
pub struct ProcessWidgetFactory {
    command: String,
    args: Vec<String>,
    url_template: String,
}

impl ProcessWidgetFactory {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            url_template: config.url_template.clone(),
        }
    }

    /// Substitute per-item placeholders into the argument templates
    pub fn render_args(&self, spec: &WidgetSpec) -> Vec<String> {
        let url = self.url_template.replace("{id}", &spec.identifier);
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &url)
                    .replace("{id}", &spec.identifier)
                    .replace("{width}", &spec.width.to_string())
                    .replace("{height}", &spec.height.to_string())
                    .replace("{anchor}", &spec.anchor)
            })
            .collect()
    }
}

impl WidgetFactory for ProcessWidgetFactory {
    fn create(&self, spec: WidgetSpec, observer: WidgetObserver) -> Result<Box<dyn Widget>> {
        let args = self.render_args(&spec);
        debug!("Process widget for {}: {} {:?}", spec.identifier, self.command, args);

        // Nothing to load up front; ready immediately
        observer.ready();

        Ok(Box::new(ProcessWidget {
            identifier: spec.identifier,
            command: self.command.clone(),
            args,
            observer,
            cancel: None,
        }))
    }
}

/// One external player process
pub struct ProcessWidget {
    identifier: String,
    command: String,
    args: Vec<String>,
    observer: WidgetObserver,
    /// Dropped with the widget, which tells the watcher to kill the child
    cancel: Option<oneshot::Sender<()>>,
}

impl Widget for ProcessWidget {
    fn play_video(&mut self) -> Result<()> {
        if self.cancel.is_some() {
            debug!("Process widget for {} already started", self.identifier);
            return Ok(());
        }

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Widget(format!("failed to spawn {}: {}", self.command, e)))?;

        info!(
            "Started {} for {} (pid {:?})",
            self.command,
            self.identifier,
            child.id()
        );

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.cancel = Some(cancel_tx);
        self.observer.state_change(WidgetState::Playing);

        let observer = self.observer.clone();
        let identifier = self.identifier.clone();
        tokio::spawn(async move {
            let exit = tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel_rx => None,
            };

            match exit {
                Some(Ok(status)) if status.success() => {
                    debug!("Player for {} exited cleanly", identifier);
                    observer.state_change(WidgetState::Ended);
                }
                Some(Ok(status)) => {
                    observer.error(format!("player exited with {}", status));
                }
                Some(Err(e)) => {
                    observer.error(format!("failed to wait for player: {}", e));
                }
                None => {
                    debug!("Widget for {} torn down, stopping player", identifier);
                    if let Err(e) = child.kill().await {
                        debug!("Player for {} already gone: {}", identifier, e);
                    }
                }
            }
        });

        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
