//! esphost-core - SPI frame transport engine
//!
//! This crate turns a half-duplex, handshake-signalled SPI link to an ESP32
//! co-processor into a reliable bidirectional packet channel. It contains the
//! frame codec, the TX/RX frame queues, the coalescing deferred worker, the
//! handshake trigger and the transaction scheduler, plus the lifecycle that
//! binds them to a board.
//!
//! # Architecture
//!
//! ```text
//!  upper layer ── Link::write ──> encode ──> TX queue ─┐
//!                                                      │
//!  handshake edge ──> HandshakeTrigger ──> DeferredWork (one pending run max)
//!                                                      │
//!                                                      ▼
//!                                Scheduler: pop TX (or padding), full-duplex
//!                                exchange, decode RX, push RX queue, notify
//!                                                      │
//!  upper layer <── Link::read <── RX queue <───────────┘
//! ```
//!
//! Hardware access goes through the [`platform::Platform`] trait; the owning
//! adapter (network card, serial console, HCI) is reached through
//! [`platform::Adapter`].
//!
//! # Example
//!
//! ```ignore
//! use esphost_core::transport::Transport;
//!
//! let transport = Transport::init(board, adapter)?;
//! let link = transport.link();
//! link.write(b"hello")?;
//! while let Some(frame) = link.read()? {
//!     println!("{} bytes", frame.payload().len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod platform;
pub mod queue;
pub mod scheduler;
pub mod transport;
pub mod work;

pub use error::{Error, FrameError, Result};
pub use frame::FrameBuffer;
pub use transport::{Link, Transport, TransportStats};
