//! Song request wire protocol
//!
//! Commands travel as single text frames:
//! - `PLAY <identifier>` enqueues `<identifier>`. The identifier is everything
//!   after the first space, so identifiers may themselves contain spaces.
//! - `SKIP` (exact match) advances playback immediately.
//!
//! Any other payload is not a command and is ignored by receivers.

use std::fmt;

/// Command word that enqueues an identifier
pub const PLAY_WORD: &str = "PLAY";

/// Command word that skips the current item
pub const SKIP_WORD: &str = "SKIP";

/// A parsed song request command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append the identifier to the tail of the queue
    Play(String),
    /// Advance playback now, whether or not something is playing
    Skip,
}

impl Command {
    /// Parse an inbound text payload
    ///
    /// Returns `None` for anything that is not a recognized command,
    /// including `PLAY` with an empty identifier.
    pub fn parse(payload: &str) -> Option<Self> {
        if let Some(identifier) = extract_identifier(payload) {
            return Some(Command::Play(identifier.to_string()));
        }

        if payload == SKIP_WORD {
            return Some(Command::Skip);
        }

        None
    }
}

/// Extract the identifier from a `PLAY` payload
///
/// Splitting on single spaces and rejoining the tail with single spaces is
/// the same as taking everything after the first space, which is what this
/// does. Runs of spaces inside the identifier are preserved.
pub fn extract_identifier(payload: &str) -> Option<&str> {
    let (word, rest) = payload.split_once(' ')?;
    if word != PLAY_WORD || rest.is_empty() {
        return None;
    }
    Some(rest)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Play(identifier) => write!(f, "{} {}", PLAY_WORD, identifier),
            Command::Skip => write!(f, "{}", SKIP_WORD),
        }
    }
}
