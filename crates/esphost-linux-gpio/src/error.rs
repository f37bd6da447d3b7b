//! Error types for Linux GPIO handshake operations

use thiserror::Error;

/// Linux GPIO handshake specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request the handshake line
    #[error("Failed to request GPIO line {line} on '{chip}': {source}")]
    LineRequestFailed {
        chip: String,
        line: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to reconfigure the handshake line
    #[error("Failed to reconfigure GPIO line {line}: {source}")]
    ReconfigureFailed {
        line: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to start the edge watcher thread
    #[error("Failed to start edge watcher: {0}")]
    WatcherSpawnFailed(#[source] std::io::Error),
}

/// Result type for Linux GPIO handshake operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
