//! # SongQ Player Library (songq-player)
//!
//! Song request queue player.
//!
//! **Purpose:** Receive `PLAY`/`SKIP` commands over a WebSocket, queue the
//! identifiers, and play them one at a time through a video widget,
//! advancing on completion, error, or skip.
//!
//! **Architecture:** One owning [`QueuePlayer`] handles typed events from a
//! single channel (connection I/O, widget lifecycle, poll timers), so all
//! state changes run to completion in order without locks.

pub mod api;
pub mod connection;
pub mod error;
pub mod events;
pub mod playback;
pub mod player;
pub mod poll;
pub mod queue;
pub mod widget;

pub use error::{Error, Result};
pub use player::{PlayerStatus, QueuePlayer};
pub use queue::SongQueue;
