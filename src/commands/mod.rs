//! CLI command implementations
//!
//! Every command that talks to a board is generic over
//! [`Platform`](esphost_core::platform::Platform), so the same code runs on
//! the Linux backend and on the in-memory peer.

mod list;
pub mod listen;
#[cfg(feature = "dummy")]
pub mod loopback;
pub mod send;

pub use list::list_boards;

use esphost_core::TransportStats;
use indicatif::{ProgressBar, ProgressStyle};

/// Dummy board as used from the command line: a loopback peer that raises
/// the handshake every few milliseconds
#[cfg(feature = "dummy")]
pub fn dummy_board() -> esphost_board::DummyBoard {
    use esphost_board::{DummyBoard, DummyConfig, PeerMode};
    use std::time::Duration;

    DummyBoard::new(DummyConfig {
        mode: PeerMode::Loopback,
        handshake_interval: Some(Duration::from_millis(10)),
        ..Default::default()
    })
}

/// Render bytes as space-separated hex
fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Create a frame counting progress bar
fn frame_progress_bar(total: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn print_stats(stats: &TransportStats) {
    println!(
        "{} exchanges, {} sent, {} received, {} dropped, {} bus errors",
        stats.exchanges,
        stats.frames_sent,
        stats.frames_received,
        stats.frames_dropped,
        stats.bus_errors
    );
}
