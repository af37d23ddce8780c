//! Playback controller and display slot

pub mod controller;
pub mod display;

pub use controller::{PlaybackController, WidgetLayout};
pub use display::{DisplaySlot, NowPlaying};
