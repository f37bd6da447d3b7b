//! Dummy board
//!
//! Implements [`Platform`] without hardware. Every acquisition and release is
//! appended to an [`EventLog`], and any acquisition step can be told to fail,
//! which is how lifecycle rollback is exercised.

use crate::bus::{DummyBus, PeerHandle, PeerMode};
use crate::error::{DummyError, Result};

use esphost_core::config::{BoardInfo, HandshakeConfig};
use esphost_core::handshake::HandshakeTrigger;
use esphost_core::platform::Platform;
use esphost_core::transport::Step;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something the board or the adapter did during bring-up or teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Step completed
    Acquired(Step),
    /// Resource acquired at this step was handed back
    Released(Step),
    /// Settle delay requested
    Delay(u32),
}

/// Ordered record of [`Event`]s, shareable between board and adapter
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&self, event: Event) {
        log::trace!("dummy: {:?}", event);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Steps acquired, in order
    pub fn acquired(&self) -> Vec<Step> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Acquired(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    /// Steps released, in order
    pub fn released(&self) -> Vec<Step> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Released(step) => Some(step),
                _ => None,
            })
            .collect()
    }
}

/// Configuration for the dummy board
#[derive(Debug, Clone, Default)]
pub struct DummyConfig {
    /// How the peer answers exchanges
    pub mode: PeerMode,
    /// Acquisition step that fails, if any
    pub fail_at: Option<Step>,
    /// Fire the handshake on this period, emulating a peer that keeps
    /// signalling readiness
    pub handshake_interval: Option<Duration>,
}

/// The claimed dummy handshake pin
#[derive(Debug)]
pub struct DummyPin {
    line: u32,
    input: bool,
}

impl DummyPin {
    /// Line number requested
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Whether the pin was configured as input
    pub fn is_input(&self) -> bool {
        self.input
    }
}

/// The attached dummy interrupt
///
/// With a handshake interval configured it owns a ticker thread that fires
/// the trigger periodically.
#[derive(Debug)]
pub struct DummyIrq {
    stop: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl DummyIrq {
    /// Whether a ticker thread is firing the trigger
    pub fn has_ticker(&self) -> bool {
        self.ticker.is_some()
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                log::error!("dummy: Handshake ticker panicked");
            }
        }
    }
}

impl Drop for DummyIrq {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Platform backed by an in-memory peer
#[derive(Debug)]
pub struct DummyBoard {
    config: DummyConfig,
    peer: PeerHandle,
    log: EventLog,
}

impl DummyBoard {
    /// Create a board with `config` and a fresh event log
    pub fn new(config: DummyConfig) -> Self {
        Self::with_log(config, EventLog::new())
    }

    /// Create a board recording into an existing log
    pub fn with_log(config: DummyConfig, log: EventLog) -> Self {
        Self {
            config,
            peer: PeerHandle::default(),
            log,
        }
    }

    /// Loopback board with no failures and no automatic handshake
    pub fn loopback() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Handle onto the peer on the other end of the bus
    pub fn peer(&self) -> PeerHandle {
        self.peer.clone()
    }

    /// The board's event log
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    fn step(&self, step: Step) -> Result<()> {
        if self.config.fail_at == Some(step) {
            log::debug!("dummy: Failing {} on request", step);
            return Err(DummyError::Injected(step));
        }
        self.log.record(Event::Acquired(step));
        Ok(())
    }
}

impl Platform for DummyBoard {
    type Bus = DummyBus;
    type Pin = DummyPin;
    type Irq = DummyIrq;
    type Error = DummyError;

    fn new_device(&mut self, board: &BoardInfo) -> Result<DummyBus> {
        self.step(Step::Device)?;
        log::debug!(
            "dummy: Registered {} on bus {} cs {}",
            board.modalias,
            board.bus_num,
            board.chip_select
        );
        Ok(DummyBus::with_handle(self.config.mode, self.peer.clone()))
    }

    fn setup_device(&mut self, _bus: &mut DummyBus, _board: &BoardInfo) -> Result<()> {
        self.step(Step::Setup)
    }

    fn unregister_device(&mut self, _bus: DummyBus) {
        self.log.record(Event::Released(Step::Device));
    }

    fn request_pin(&mut self, handshake: &HandshakeConfig) -> Result<DummyPin> {
        self.step(Step::Pin)?;
        Ok(DummyPin {
            line: handshake.line,
            input: false,
        })
    }

    fn direction_input(&mut self, pin: &mut DummyPin) -> Result<()> {
        self.step(Step::Direction)?;
        pin.input = true;
        Ok(())
    }

    fn free_pin(&mut self, _pin: DummyPin) {
        self.log.record(Event::Released(Step::Pin));
    }

    fn request_irq(
        &mut self,
        _pin: &DummyPin,
        handshake: &HandshakeConfig,
        trigger: HandshakeTrigger,
    ) -> Result<DummyIrq> {
        let stop = Arc::new(AtomicBool::new(false));
        let ticker = match self.config.handshake_interval {
            Some(interval) => {
                let thread_stop = Arc::clone(&stop);
                let ticker = thread::Builder::new()
                    .name(handshake.irq_name.to_string())
                    .spawn(move || {
                        while !thread_stop.load(Ordering::Acquire) {
                            thread::sleep(interval);
                            trigger.fire();
                        }
                    })?;
                Some(ticker)
            }
            None => None,
        };
        let irq = DummyIrq { stop, ticker };

        // Dropping `irq` on an injected failure stops the ticker again
        self.step(Step::Irq)?;
        Ok(irq)
    }

    fn free_irq(&mut self, mut irq: DummyIrq) {
        irq.shutdown();
        self.log.record(Event::Released(Step::Irq));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.record(Event::Delay(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esphost_core::config::{BOARD, HANDSHAKE};
    use esphost_core::work::DeferredWork;
    use std::io;
    use std::time::Instant;

    #[test]
    fn test_steps_are_logged() {
        let mut board = DummyBoard::loopback();
        let mut bus = board.new_device(&BOARD).unwrap();
        board.setup_device(&mut bus, &BOARD).unwrap();
        let mut pin = board.request_pin(&HANDSHAKE).unwrap();
        board.direction_input(&mut pin).unwrap();
        assert_eq!(pin.line(), 22);
        assert!(pin.is_input());

        board.free_pin(pin);
        board.unregister_device(bus);

        assert_eq!(
            board.log().events(),
            vec![
                Event::Acquired(Step::Device),
                Event::Acquired(Step::Setup),
                Event::Acquired(Step::Pin),
                Event::Acquired(Step::Direction),
                Event::Released(Step::Pin),
                Event::Released(Step::Device),
            ]
        );
    }

    #[test]
    fn test_injected_failure() {
        let mut board = DummyBoard::new(DummyConfig {
            fail_at: Some(Step::Pin),
            ..Default::default()
        });
        assert_eq!(
            board.request_pin(&HANDSHAKE).unwrap_err(),
            DummyError::Injected(Step::Pin)
        );
        assert!(board.log().events().is_empty());
    }

    #[test]
    fn test_ticker_fires_trigger() {
        let work = DeferredWork::spawn("test-ticker", || {}).unwrap();
        let mut board = DummyBoard::new(DummyConfig {
            handshake_interval: Some(Duration::from_millis(1)),
            ..Default::default()
        });
        let pin = board.request_pin(&HANDSHAKE).unwrap();
        let irq = board
            .request_irq(&pin, &HANDSHAKE, HandshakeTrigger::new(work.handle()))
            .unwrap();
        assert!(irq.has_ticker());

        let deadline = Instant::now() + Duration::from_secs(5);
        while work.handle().runs() == 0 {
            assert!(Instant::now() < deadline, "ticker never fired");
            thread::sleep(Duration::from_millis(1));
        }

        board.free_irq(irq);
        board.free_pin(pin);
        work.destroy();
        assert_eq!(board.log().released(), vec![Step::Irq, Step::Pin]);
    }

    #[test]
    fn test_ticker_spawn_failure_is_an_error() {
        let err = DummyError::from(io::Error::from(io::ErrorKind::OutOfMemory));
        assert_eq!(err, DummyError::TickerSpawnFailed(io::ErrorKind::OutOfMemory));
        assert!(err.to_string().contains("handshake ticker"));
    }
}
