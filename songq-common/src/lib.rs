//! # SongQ Common Library
//!
//! Shared code for the SongQ song request player:
//! - Wire protocol for song request commands (`PLAY`, `SKIP`)
//! - Event types (QueueEvent enum) and the EventBus
//! - Configuration loading and config file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::Command;
