//! esphost-linux-gpio - Linux GPIO handshake line
//!
//! The ESP32 raises a dedicated GPIO line when it is ready for the next SPI
//! exchange. This crate claims that line through the GPIO character device
//! interface (gpiocdev) and turns its rising edges into transport triggers.
//!
//! # Example
//!
//! ```ignore
//! use esphost_core::config::HANDSHAKE;
//! use esphost_linux_gpio::{EdgeWatcher, HandshakeLine};
//!
//! let line = HandshakeLine::request(&HANDSHAKE)?;
//! line.set_input()?;
//! let watcher = EdgeWatcher::spawn(&line, &HANDSHAKE, trigger)?;
//! // ... edges now schedule exchanges ...
//! watcher.stop();
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel 5.10+ with GPIO character device support
//! - Access to `/dev/gpiochipN` (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{EdgeWatcher, HandshakeLine};
pub use error::{LinuxGpioError, Result};
