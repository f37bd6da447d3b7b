//! Transaction scheduler
//!
//! One [`Scheduler::run`] is one full-duplex exchange of `MAX_FRAME_SIZE`
//! bytes: the oldest outbound frame (or zero padding) goes out while the
//! receive buffer fills. The received frame is validated and queued, and the
//! consumed outbound frame is released whatever the outcome.
//!
//! Runs are serialized by the deferred worker. The TX/RX queues are
//! lock-free, and no lock is held across the exchange: the bus is leased out
//! of its [`BusSlot`] for the transfer and teardown waits for it to return.

use crate::config::MAX_FRAME_SIZE;
use crate::error::{self, Error};
use crate::frame::FrameBuffer;
use crate::platform::{Adapter, SpiBus};
use crate::transport::Shared;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Transmitted when there is no outbound frame
static PADDING: [u8; MAX_FRAME_SIZE] = [0; MAX_FRAME_SIZE];

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
enum SlotState<B> {
    Empty,
    Ready(B),
    Leased,
}

/// Bus handle shared between the lifecycle and the worker
#[derive(Debug)]
pub(crate) struct BusSlot<B> {
    state: Mutex<SlotState<B>>,
    returned: Condvar,
}

impl<B> BusSlot<B> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
            returned: Condvar::new(),
        }
    }

    /// Put a freshly registered bus in the slot
    pub(crate) fn install(&self, bus: B) {
        *lock(&self.state) = SlotState::Ready(bus);
    }

    /// Take the bus for one exchange; `None` if unbound or already leased
    pub(crate) fn lease(&self) -> Option<BusLease<'_, B>> {
        let mut state = lock(&self.state);
        match std::mem::replace(&mut *state, SlotState::Leased) {
            SlotState::Ready(bus) => Some(BusLease {
                slot: self,
                bus: Some(bus),
            }),
            other => {
                *state = other;
                None
            }
        }
    }

    /// Take the bus out for good, waiting for an outstanding lease
    pub(crate) fn remove(&self) -> Option<B> {
        let mut state = lock(&self.state);
        while matches!(*state, SlotState::Leased) {
            state = self
                .returned
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match std::mem::replace(&mut *state, SlotState::Empty) {
            SlotState::Ready(bus) => Some(bus),
            _ => None,
        }
    }

    fn give_back(&self, bus: B) {
        *lock(&self.state) = SlotState::Ready(bus);
        self.returned.notify_all();
    }
}

/// Bus on loan to the worker; returned to its slot on drop, unwinding included
pub(crate) struct BusLease<'a, B> {
    slot: &'a BusSlot<B>,
    bus: Option<B>,
}

impl<B: SpiBus> BusLease<'_, B> {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> std::result::Result<(), B::Error> {
        match self.bus.as_mut() {
            Some(bus) => bus.transfer(tx, rx),
            None => Ok(()),
        }
    }
}

impl<B> Drop for BusLease<'_, B> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.take() {
            self.slot.give_back(bus);
        }
    }
}

/// Worker-side state: bus, queues and the adapter to notify
pub struct Scheduler<B: SpiBus, A: Adapter> {
    bus: Arc<BusSlot<B>>,
    shared: Arc<Shared>,
    adapter: Arc<A>,
    /// Exchange-length copy of the outbound frame, allocated on first use
    tx_stage: Vec<u8>,
}

impl<B: SpiBus, A: Adapter> Scheduler<B, A> {
    pub(crate) fn new(bus: Arc<BusSlot<B>>, shared: Arc<Shared>, adapter: Arc<A>) -> Self {
        Self {
            bus,
            shared,
            adapter,
            tx_stage: Vec::new(),
        }
    }

    fn reserve_stage(&mut self) -> error::Result<()> {
        if self.tx_stage.len() < MAX_FRAME_SIZE {
            self.tx_stage
                .try_reserve_exact(MAX_FRAME_SIZE - self.tx_stage.len())
                .map_err(|_| Error::AllocationFailure {
                    size: MAX_FRAME_SIZE,
                })?;
            self.tx_stage.resize(MAX_FRAME_SIZE, 0);
        }
        Ok(())
    }

    /// Perform one transaction
    ///
    /// A bus error is returned after the received data has been processed;
    /// the dequeued outbound frame is not retried.
    pub fn run(&mut self) -> error::Result<()> {
        let slot = Arc::clone(&self.bus);
        let Some(mut bus) = slot.lease() else {
            log::debug!("No SPI device bound, skipping transaction");
            return Ok(());
        };

        // Obtained before dequeuing so a failed allocation loses nothing
        self.reserve_stage()?;
        let mut rx = FrameBuffer::zeroed(MAX_FRAME_SIZE)?;

        let tx = self.shared.tx_q.pop();
        let tx_bytes = match tx.as_ref() {
            Some(frame) => {
                // Only trailing pad of the longest frame is cut here
                let bytes = frame.as_bytes();
                let len = bytes.len().min(MAX_FRAME_SIZE);
                self.tx_stage[..len].copy_from_slice(&bytes[..len]);
                self.tx_stage[len..].fill(0);
                &self.tx_stage[..]
            }
            None => &PADDING[..],
        };

        let result = bus.transfer(tx_bytes, rx.as_mut_bytes());
        drop(bus);

        let stats = &self.shared.stats;
        stats.exchanges.fetch_add(1, Ordering::Relaxed);
        let result = match result {
            Ok(()) => {
                if tx.is_some() {
                    stats.frames_sent.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }
            Err(e) => {
                stats.bus_errors.fetch_add(1, Ordering::Relaxed);
                Err(Error::BusTransactionFailure(Box::new(e)))
            }
        };

        let header = rx.header();
        let idle = header.offset() == 0 && header.len() == 0;

        match FrameBuffer::decode(rx) {
            Ok(frame) => {
                log::trace!("Received {} byte frame", frame.payload().len());
                stats.frames_received.fetch_add(1, Ordering::Relaxed);
                self.shared.rx_q.push(frame);
                self.adapter.process_new_packet();
            }
            Err(_) if idle => log::trace!("Peer had nothing to send"),
            Err(e) => {
                stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Discarding inbound frame: {}", e);
            }
        }

        // The dequeued frame is released here, sent or not
        drop(tx);
        result
    }
}
