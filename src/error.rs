//! Error types for shell-socket.

use thiserror::Error;

/// Main error type for shell-socket operations.
#[derive(Error, Debug)]
pub enum ShellSocketError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The shell process could not be started.
    #[error("failed to spawn shell: {0}")]
    Spawn(String),

    /// The requested listening port is taken.
    #[error("port {0} already in use")]
    PortInUse(u16),

    /// The process lacks the rights to bind the requested port.
    #[error("no permission to listen on port {0}")]
    PortPermissionDenied(u16),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Invalid runtime configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience Result type for shell-socket operations.
pub type Result<T> = std::result::Result<T, ShellSocketError>;
