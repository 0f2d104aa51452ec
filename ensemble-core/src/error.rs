//! Error types for the ensemble core library.
//!
//! Most kernel operations deliberately return `Option`/empty instead of
//! erroring: an unknown id or type name from the theme adapter is caller
//! misuse, and nothing is allowed to abort a tick over it. `CoreError`
//! exists for the places where a real error is the honest answer —
//! configuration loading, chiefly.

use thiserror::Error;

/// Top-level error type for ensemble core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration parse or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic I/O error (config file loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CoreError>;
