//! esphost-dummy - In-memory peer and board for testing
//!
//! This crate provides a board that needs no hardware: the ESP32 is replaced
//! by an in-memory peer that either echoes every exchange (loopback) or
//! answers with scripted frames. Every acquisition step can be made to fail
//! and is logged, which makes it useful for exercising the transport
//! lifecycle as well as the data path.

pub mod adapter;
pub mod board;
pub mod bus;
pub mod error;

pub use adapter::RecordingAdapter;
pub use board::{DummyBoard, DummyConfig, DummyIrq, DummyPin, Event, EventLog};
pub use bus::{DummyBus, PeerHandle, PeerMode};
pub use error::{DummyError, Result};
