//! Handshake trigger
//!
//! The peer raises the handshake line when it is ready for the next exchange.
//! Whatever delivers that edge (an interrupt, a GPIO event thread, a test)
//! calls [`HandshakeTrigger::fire`], which only schedules the scheduler. All
//! bus I/O happens on the worker.

use crate::work::WorkHandle;

/// Interrupt-side entry point into the transport
#[derive(Debug, Clone)]
pub struct HandshakeTrigger {
    work: WorkHandle,
}

impl HandshakeTrigger {
    /// Bind a trigger to the scheduler's deferred work
    pub fn new(work: WorkHandle) -> Self {
        Self { work }
    }

    /// Peer is ready for the next transaction
    ///
    /// Non-blocking. Returns `false` when the edge was coalesced into an
    /// already pending run, or when the transport is gone.
    #[inline]
    pub fn fire(&self) -> bool {
        self.work.schedule()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::DeferredWork;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_fire_schedules_work() {
        let (tx, rx) = unbounded();
        let work = DeferredWork::spawn("test-handshake", move || {
            tx.send(()).unwrap();
        })
        .unwrap();

        let trigger = HandshakeTrigger::new(work.handle());
        assert!(trigger.fire());
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        work.destroy();
        assert!(!trigger.fire());
    }
}
