//! Error types for board backends

use thiserror::Error;

/// Board backend error
#[derive(Debug, Error)]
pub enum BoardError {
    /// SPI device failure
    #[cfg(feature = "linux")]
    #[error(transparent)]
    Spi(#[from] esphost_linux_spi::LinuxSpiError),

    /// Handshake line failure
    #[cfg(feature = "linux")]
    #[error(transparent)]
    Gpio(#[from] esphost_linux_gpio::LinuxGpioError),

    /// Board name not known or not compiled in
    #[error("unknown board: {0}")]
    UnknownBoard(String),
}

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;
