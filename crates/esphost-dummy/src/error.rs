//! Error types for the dummy board

use esphost_core::transport::Step;
use std::io;
use thiserror::Error;

/// Failures the dummy board and adapter can be told to produce
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DummyError {
    /// Acquisition step configured to fail
    #[error("injected failure at {0}")]
    Injected(Step),

    /// Exchange configured to fail
    #[error("injected bus fault")]
    BusFault,

    /// The handshake ticker thread could not be started
    #[error("failed to spawn handshake ticker: {0}")]
    TickerSpawnFailed(io::ErrorKind),
}

impl From<io::Error> for DummyError {
    fn from(e: io::Error) -> Self {
        Self::TickerSpawnFailed(e.kind())
    }
}

/// Result type for dummy operations
pub type Result<T> = std::result::Result<T, DummyError>;
