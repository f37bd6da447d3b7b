//! Loopback self-test on the in-memory peer

use crate::adapter::ConsoleAdapter;

use crossbeam_channel::RecvTimeoutError;
use esphost_board::DummyBoard;
use esphost_core::frame::MAX_PAYLOAD_SIZE;
use esphost_core::Transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(30);

fn pattern(index: usize, size: usize) -> Vec<u8> {
    (0..size).map(|j| (index * 31 + j) as u8).collect()
}

/// Push `frames` payloads of `size` bytes through a loopback transport and
/// check that each comes back intact and in order
pub fn run(frames: usize, size: usize) -> Result<(), Box<dyn std::error::Error>> {
    if size == 0 || size > MAX_PAYLOAD_SIZE {
        return Err(format!("Payload size must be 1..={} bytes", MAX_PAYLOAD_SIZE).into());
    }

    let board = DummyBoard::loopback();
    let peer = board.peer();
    let (adapter, packets) = ConsoleAdapter::new();
    let transport = Transport::init(board, Arc::new(adapter))?;
    let link = transport.link();

    for i in 0..frames {
        link.write(&pattern(i, size))?;
    }

    let pb = super::frame_progress_bar(frames as u64)?;
    let deadline = Instant::now() + TIMEOUT;
    let mut mismatches = 0usize;
    let mut received = 0usize;

    while received < frames {
        if Instant::now() >= deadline {
            pb.abandon();
            transport.teardown();
            return Err(format!("Timed out after {} of {} frames", received, frames).into());
        }

        transport.kick();
        match packets.recv_timeout(Duration::from_millis(100)) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        while let Some(frame) = link.read()? {
            if frame.payload() != pattern(received, size).as_slice() {
                log::error!("Frame {} came back corrupted or out of order", received);
                mismatches += 1;
            }
            received += 1;
            pb.inc(1);
        }
    }
    pb.finish();

    let stats = transport.stats();
    transport.teardown();

    println!(
        "Loopback: {} frames of {} bytes over {} exchanges",
        received,
        size,
        peer.exchanges()
    );
    super::print_stats(&stats);

    if mismatches > 0 {
        return Err(format!("{} frame(s) failed verification", mismatches).into());
    }
    println!("All frames intact and in order");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_self_test_passes() {
        run(16, 100).unwrap();
    }

    #[test]
    fn test_rejects_bad_size() {
        assert!(run(1, 0).is_err());
        assert!(run(1, MAX_PAYLOAD_SIZE + 1).is_err());
    }
}
