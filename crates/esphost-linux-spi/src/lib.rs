//! esphost-linux-spi - Linux spidev bus
//!
//! This crate binds the ESP32 peer through a `/dev/spidevX.Y` character
//! device and performs the transport's full-duplex exchanges on it.
//!
//! # Example
//!
//! ```no_run
//! use esphost_core::config::BOARD;
//! use esphost_core::platform::SpiBus;
//! use esphost_linux_spi::{LinuxSpi, LinuxSpiConfig};
//!
//! let config = LinuxSpiConfig::from_board(&BOARD);
//! let mut spi = LinuxSpi::open(&config)?;
//! spi.setup(&config)?;
//!
//! let tx = [0u8; 1600];
//! let mut rx = [0u8; 1600];
//! spi.transfer(&tx, &mut rx)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - A device tree overlay exposing the ESP32 as `spidev0.0`
//! - Read/write access to the device node

pub mod device;
pub mod error;

// Re-exports
pub use device::{LinuxSpi, LinuxSpiConfig};
pub use error::{LinuxSpiError, Result};
