//! Board backends for the esphost transport
//!
//! The CLI only picks a board by name here and hands the resulting
//! [`Platform`](esphost_core::platform::Platform) to
//! [`Transport::init`](esphost_core::Transport::init). Which backends exist
//! depends on the enabled features.
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────── esphost (CLI) ────────────────┐
//!          │   BoardKind::from_name("linux" | "dummy")     │
//!          └───────────────────────┬───────────────────────┘
//!                                  ▼
//!          ┌──────────── esphost-board (this crate) ───────┐
//!          │  LinuxBoard: Platform  │  DummyBoard (re-exp) │
//!          └──────┬──────────┬──────┴──────────┬───────────┘
//!                 ▼          ▼                 ▼
//!         linux-spi     linux-gpio        esphost-dummy
//! ```

pub mod error;
#[cfg(feature = "linux")]
mod linux;
mod registry;

pub use error::{BoardError, Result};
pub use registry::{available_boards, board_names_short, BackendInfo, BoardKind};

#[cfg(feature = "linux")]
pub use linux::LinuxBoard;

#[cfg(feature = "dummy")]
pub use esphost_dummy::{DummyBoard, DummyConfig, PeerMode};
