//! In-memory SPI peer
//!
//! `DummyBus` stands in for the ESP32 on the other end of the wire. In
//! loopback mode MISO is tied to MOSI, so every exchange returns exactly what
//! was sent. In scripted mode the peer answers with queued replies and
//! zeros once they run out.

use crate::error::{DummyError, Result};

use esphost_core::platform::SpiBus;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How the dummy peer answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerMode {
    /// Echo every transmitted byte back in the same exchange
    #[default]
    Loopback,
    /// Answer with queued replies
    Scripted,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct PeerState {
    replies: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    fail: AtomicBool,
    exchanges: AtomicU64,
}

/// Handle for driving and inspecting the dummy peer from outside the bus
#[derive(Debug, Clone, Default)]
pub struct PeerHandle {
    state: Arc<PeerState>,
}

impl PeerHandle {
    /// Queue raw bytes for the peer to clock back on a later exchange
    pub fn push_reply(&self, raw: Vec<u8>) {
        lock(&self.state.replies).push_back(raw);
    }

    /// Make subsequent exchanges report a bus error
    pub fn set_failing(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::Release);
    }

    /// Everything transmitted so far, one entry per exchange
    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.state.sent).clone()
    }

    /// Number of exchanges performed
    pub fn exchanges(&self) -> u64 {
        self.state.exchanges.load(Ordering::Acquire)
    }
}

/// The dummy peer as seen from the transport
#[derive(Debug)]
pub struct DummyBus {
    mode: PeerMode,
    peer: PeerHandle,
}

impl DummyBus {
    /// Create a peer answering in `mode`
    pub fn new(mode: PeerMode) -> Self {
        Self {
            mode,
            peer: PeerHandle::default(),
        }
    }

    /// Create a peer sharing state with an existing handle
    pub fn with_handle(mode: PeerMode, peer: PeerHandle) -> Self {
        Self { mode, peer }
    }

    /// Handle onto this peer
    pub fn handle(&self) -> PeerHandle {
        self.peer.clone()
    }
}

impl SpiBus for DummyBus {
    type Error = DummyError;

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        let state = &self.peer.state;
        lock(&state.sent).push(tx.to_vec());

        match self.mode {
            PeerMode::Loopback => rx.copy_from_slice(tx),
            PeerMode::Scripted => {
                rx.fill(0);
                if let Some(reply) = lock(&state.replies).pop_front() {
                    let len = reply.len().min(rx.len());
                    rx[..len].copy_from_slice(&reply[..len]);
                }
            }
        }
        state.exchanges.fetch_add(1, Ordering::AcqRel);

        if state.fail.load(Ordering::Acquire) {
            Err(DummyError::BusFault)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_echoes() {
        let mut bus = DummyBus::new(PeerMode::Loopback);
        let tx = [1u8, 2, 3, 4];
        let mut rx = [0u8; 4];
        bus.transfer(&tx, &mut rx).unwrap();
        assert_eq!(rx, tx);
        assert_eq!(bus.handle().sent(), vec![tx.to_vec()]);
    }

    #[test]
    fn test_scripted_replies_then_zeros() {
        let mut bus = DummyBus::new(PeerMode::Scripted);
        let peer = bus.handle();
        peer.push_reply(vec![9, 9]);

        let mut rx = [0xFFu8; 4];
        bus.transfer(&[0; 4], &mut rx).unwrap();
        assert_eq!(rx, [9, 9, 0, 0]);

        bus.transfer(&[0; 4], &mut rx).unwrap();
        assert_eq!(rx, [0; 4]);
        assert_eq!(peer.exchanges(), 2);
    }

    #[test]
    fn test_injected_fault_still_fills_rx() {
        let mut bus = DummyBus::new(PeerMode::Loopback);
        bus.handle().set_failing(true);
        let mut rx = [0u8; 2];
        assert_eq!(bus.transfer(&[5, 6], &mut rx), Err(DummyError::BusFault));
        assert_eq!(rx, [5, 6]);
    }
}
