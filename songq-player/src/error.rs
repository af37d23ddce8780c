//! Error types for songq-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for songq-player
#[derive(Error, Debug)]
pub enum Error {
    /// Command connection errors
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    /// Widget construction or control errors
    #[error("Widget error: {0}")]
    Widget(String),

    /// HTTP status server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O and process errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using songq-player Error
pub type Result<T> = std::result::Result<T, Error>;
