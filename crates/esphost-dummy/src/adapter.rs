//! Recording adapter

use crate::board::{Event, EventLog};
use crate::error::DummyError;

use esphost_core::error::BoxError;
use esphost_core::platform::Adapter;
use esphost_core::transport::{Link, Step};

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Adapter that counts packet notifications and logs its lifecycle hooks
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    log: EventLog,
    fail_at: Option<Step>,
    packets: Mutex<u64>,
    arrived: Condvar,
}

impl RecordingAdapter {
    /// Create an adapter with its own event log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter recording into `log`, failing at `fail_at`
    pub fn with_log(log: EventLog, fail_at: Option<Step>) -> Self {
        Self {
            log,
            fail_at,
            ..Default::default()
        }
    }

    /// Number of `process_new_packet` calls so far
    pub fn packets(&self) -> u64 {
        *self.packets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until at least `count` notifications arrived or `timeout` passed
    pub fn wait_for_packets(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut packets = self.packets.lock().unwrap_or_else(PoisonError::into_inner);
        while *packets < count {
            let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            packets = self
                .arrived
                .wait_timeout(packets, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn step(&self, step: Step) -> Result<(), BoxError> {
        if self.fail_at == Some(step) {
            return Err(DummyError::Injected(step).into());
        }
        self.log.record(Event::Acquired(step));
        Ok(())
    }
}

impl Adapter for RecordingAdapter {
    fn process_new_packet(&self) {
        let mut packets = self.packets.lock().unwrap_or_else(PoisonError::into_inner);
        *packets += 1;
        self.arrived.notify_all();
    }

    fn add_card(&self, _link: &Link) -> Result<(), BoxError> {
        self.step(Step::Card)
    }

    fn remove_card(&self) {
        self.log.record(Event::Released(Step::Card));
    }

    fn serial_init(&self, _link: &Link) -> Result<(), BoxError> {
        self.step(Step::Serial)
    }

    fn serial_cleanup(&self) {
        self.log.record(Event::Released(Step::Serial));
    }

    fn init_bt(&self, _link: &Link) -> Result<(), BoxError> {
        self.step(Step::Bluetooth)
    }

    fn deinit_bt(&self) {
        self.log.record(Event::Released(Step::Bluetooth));
    }
}
