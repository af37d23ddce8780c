//! Poll loop timers
//!
//! Two independent fixed-period timers feed ticks into the player's event
//! channel for the life of the process:
//! - health timer: replace the connection if it is closed
//! - playback timer: start the next item if idle
//!
//! The first tick of each fires one full period after start.

use std::time::Duration;

use songq_common::config::PollConfig;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::events::{EventSender, PlayerEvent, TimerKind};

/// Running poll timers; dropping stops both
pub struct PollLoop {
    health: JoinHandle<()>,
    playback: JoinHandle<()>,
}

impl PollLoop {
    pub fn start(events: EventSender, config: &PollConfig) -> Self {
        info!(
            "Poll loop started (health {}ms, playback {}ms)",
            config.health_interval_ms, config.playback_interval_ms
        );

        Self {
            health: tokio::spawn(tick_task(
                events.clone(),
                config.health_interval(),
                TimerKind::Health,
            )),
            playback: tokio::spawn(tick_task(
                events,
                config.playback_interval(),
                TimerKind::Playback,
            )),
        }
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.health.abort();
        self.playback.abort();
    }
}

async fn tick_task(events: EventSender, period: Duration, kind: TimerKind) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if events.send(PlayerEvent::TimerTick(kind)).is_err() {
            debug!("Player gone, stopping {:?} timer", kind);
            break;
        }
    }
}
