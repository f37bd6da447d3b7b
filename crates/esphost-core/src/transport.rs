//! Transport lifecycle and the upper-layer link
//!
//! [`Transport::init`] acquires, in order:
//!
//! 1. the deferred work running the scheduler
//! 2. the SPI device, then its setup
//! 3. the handshake pin, then its input direction
//! 4. the handshake interrupt, followed by a settle delay
//! 5. the serial console (feature `serial`), the card and Bluetooth
//!
//! Any failure rolls back everything acquired so far. Teardown releases in
//! strict reverse order, skips whatever was never acquired, and can be called
//! any number of times. The deferred work is destroyed before the context
//! goes away, and frames left in either queue are released.

use crate::config::{BOARD, HANDSHAKE, SETTLE_DELAY_MS};
use crate::error::{BoxError, Error, Result};
use crate::frame::FrameBuffer;
use crate::handshake::HandshakeTrigger;
use crate::platform::{Adapter, Platform};
use crate::queue::FrameQueue;
use crate::scheduler::{BusSlot, Scheduler};
use crate::work::DeferredWork;

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Scheduler run handed to the deferred worker
pub(crate) type WorkFn = Box<dyn FnMut() + Send>;

/// Name of the worker thread
pub const WORK_QUEUE_NAME: &str = "ESP_SPI_WORK_QUEUE";

/// Bring-up step, in acquisition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Deferred work for the scheduler
    Work,
    /// SPI device registration
    Device,
    /// SPI device setup
    Setup,
    /// Handshake pin request
    Pin,
    /// Handshake pin direction
    Direction,
    /// Handshake interrupt
    Irq,
    /// Serial-console sub-interface
    Serial,
    /// Card registration
    Card,
    /// Bluetooth HCI sub-interface
    Bluetooth,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Work => "work queue",
            Self::Device => "SPI device",
            Self::Setup => "SPI device setup",
            Self::Pin => "handshake GPIO",
            Self::Direction => "handshake GPIO direction",
            Self::Irq => "handshake IRQ",
            Self::Serial => "serial interface",
            Self::Card => "card",
            Self::Bluetooth => "Bluetooth",
        };
        f.write_str(name)
    }
}

/// Tags a backend failure with the bring-up step it happened in
trait AtStep<T> {
    fn at_step(self, step: Step) -> Result<T>;
}

impl<T, E: Into<BoxError>> AtStep<T> for std::result::Result<T, E> {
    fn at_step(self, step: Step) -> Result<T> {
        self.map_err(|source| Error::ResourceAcquisitionFailure {
            step,
            source: source.into(),
        })
    }
}

/// Snapshot of the transport counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Completed bus exchanges
    pub exchanges: u64,
    /// Outbound frames clocked out without a bus error
    pub frames_sent: u64,
    /// Valid inbound frames queued
    pub frames_received: u64,
    /// Inbound frames that failed validation
    pub frames_dropped: u64,
    /// Exchanges that reported an error
    pub bus_errors: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) exchanges: AtomicU64,
    pub(crate) frames_sent: AtomicU64,
    pub(crate) frames_received: AtomicU64,
    pub(crate) frames_dropped: AtomicU64,
    pub(crate) bus_errors: AtomicU64,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            exchanges: self.exchanges.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bus_errors: self.bus_errors.load(Ordering::Relaxed),
        }
    }
}

/// Transport context shared by the link, the scheduler and the lifecycle
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) tx_q: FrameQueue,
    pub(crate) rx_q: FrameQueue,
    pub(crate) stats: Counters,
    attached: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self) {
        self.attached.store(true, Ordering::Release);
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

/// Upper-layer handle: write outbound payloads, read inbound frames
///
/// Safe to use from any thread, concurrently with the worker. Once the
/// transport is torn down every call fails with `InvalidArgument`.
#[derive(Debug, Clone)]
pub struct Link {
    shared: Arc<Shared>,
}

impl Link {
    fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Encode `payload` and queue it for the next exchange
    pub fn write(&self, payload: &[u8]) -> Result<()> {
        if !self.shared.is_attached() {
            log::error!("write: transport not attached");
            return Err(Error::InvalidArgument("transport not attached"));
        }
        let frame = FrameBuffer::encode(payload)?;
        self.shared.tx_q.push(frame);
        Ok(())
    }

    /// Take the oldest inbound frame, if any
    pub fn read(&self) -> Result<Option<FrameBuffer>> {
        if !self.shared.is_attached() {
            log::error!("read: transport not attached");
            return Err(Error::InvalidArgument("transport not attached"));
        }
        Ok(self.shared.rx_q.pop())
    }

    /// Outbound frames waiting for an exchange
    pub fn pending_tx(&self) -> usize {
        self.shared.tx_q.len()
    }

    /// Inbound frames waiting to be read
    pub fn pending_rx(&self) -> usize {
        self.shared.rx_q.len()
    }

    /// Whether the transport behind this link is up
    pub fn is_attached(&self) -> bool {
        self.shared.is_attached()
    }

    /// Transport counters
    pub fn stats(&self) -> TransportStats {
        self.shared.stats.snapshot()
    }
}

/// A transport bound to one peer device
pub struct Transport<P: Platform, A: Adapter> {
    platform: P,
    adapter: Arc<A>,
    shared: Arc<Shared>,
    work: Option<DeferredWork>,
    bus: Arc<BusSlot<P::Bus>>,
    pin: Option<P::Pin>,
    irq: Option<P::Irq>,
    serial: bool,
    card: bool,
    bt: bool,
}

impl<P: Platform, A: Adapter> Transport<P, A> {
    /// Bring the transport up on `platform` for `adapter`
    ///
    /// On failure everything acquired so far is released before the error
    /// is returned.
    pub fn init(platform: P, adapter: Arc<A>) -> Result<Self> {
        Self::init_with(platform, adapter, |name, run| DeferredWork::spawn(name, run))
    }

    /// [`Transport::init`] with the worker created by `spawn_work`
    pub(crate) fn init_with<S>(platform: P, adapter: Arc<A>, spawn_work: S) -> Result<Self>
    where
        S: FnOnce(&str, WorkFn) -> io::Result<DeferredWork>,
    {
        let mut transport = Self {
            platform,
            adapter,
            shared: Arc::new(Shared::new()),
            work: None,
            bus: Arc::new(BusSlot::new()),
            pin: None,
            irq: None,
            serial: false,
            card: false,
            bt: false,
        };

        match transport.bring_up(spawn_work) {
            Ok(()) => Ok(transport),
            Err(e) => {
                log::error!("Failed to bring up transport: {}", e);
                transport.release();
                Err(e)
            }
        }
    }

    fn bring_up<S>(&mut self, spawn_work: S) -> Result<()>
    where
        S: FnOnce(&str, WorkFn) -> io::Result<DeferredWork>,
    {
        self.shared.attach();

        let mut scheduler = Scheduler::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.shared),
            Arc::clone(&self.adapter),
        );
        let run: WorkFn = Box::new(move || {
            if let Err(e) = scheduler.run() {
                log::error!("{}", e);
            }
        });
        let work = spawn_work(WORK_QUEUE_NAME, run).at_step(Step::Work)?;
        let trigger = HandshakeTrigger::new(work.handle());
        self.work = Some(work);

        let mut bus = self
            .platform
            .new_device(&BOARD)
            .at_step(Step::Device)?;
        let setup = self.platform.setup_device(&mut bus, &BOARD);
        // Installed first so a failed setup still unregisters the device
        self.bus.install(bus);
        setup.at_step(Step::Setup)?;
        log::info!(
            "ESP32 device is registered to SPI bus [{}], chip select [{}]",
            BOARD.bus_num,
            BOARD.chip_select
        );

        let pin = self
            .platform
            .request_pin(&HANDSHAKE)
            .at_step(Step::Pin)?;
        let pin = self.pin.insert(pin);
        self.platform
            .direction_input(pin)
            .at_step(Step::Direction)?;

        let irq = self
            .platform
            .request_irq(pin, &HANDSHAKE, trigger)
            .at_step(Step::Irq)?;
        self.irq = Some(irq);
        log::debug!("Handshake interrupt attached on line {}", HANDSHAKE.line);

        self.platform.delay_ms(SETTLE_DELAY_MS);

        let link = self.link();

        #[cfg(feature = "serial")]
        {
            self.adapter
                .serial_init(&link)
                .at_step(Step::Serial)?;
            self.serial = true;
        }

        self.adapter.add_card(&link).at_step(Step::Card)?;
        self.card = true;

        self.adapter
            .init_bt(&link)
            .at_step(Step::Bluetooth)?;
        self.bt = true;

        self.platform.delay_ms(SETTLE_DELAY_MS);

        Ok(())
    }

    /// Upper-layer handle to this transport
    pub fn link(&self) -> Link {
        Link::new(Arc::clone(&self.shared))
    }

    /// Trigger that schedules an exchange, as the handshake interrupt does
    pub fn trigger(&self) -> Option<HandshakeTrigger> {
        self.work
            .as_ref()
            .map(|work| HandshakeTrigger::new(work.handle()))
    }

    /// Schedule one exchange without waiting for a handshake edge
    pub fn kick(&self) -> bool {
        self.work.as_ref().is_some_and(|work| work.schedule())
    }

    /// Completed scheduler runs
    pub fn runs(&self) -> u64 {
        self.work.as_ref().map_or(0, |work| work.handle().runs())
    }

    /// Transport counters
    pub fn stats(&self) -> TransportStats {
        self.shared.stats.snapshot()
    }

    /// The owning adapter
    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// Release everything and consume the transport
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.shared.detach();

        if self.bt {
            self.adapter.deinit_bt();
            self.bt = false;
        }
        if self.card {
            self.adapter.remove_card();
            self.card = false;
        }
        if self.serial {
            self.adapter.serial_cleanup();
            self.serial = false;
        }
        if let Some(irq) = self.irq.take() {
            self.platform.free_irq(irq);
        }
        if let Some(pin) = self.pin.take() {
            self.platform.free_pin(pin);
        }
        // Waits for an in-flight exchange to finish
        if let Some(bus) = self.bus.remove() {
            self.platform.unregister_device(bus);
        }
        if let Some(work) = self.work.take() {
            work.destroy();
        }

        let released = self.shared.tx_q.drain() + self.shared.rx_q.drain();
        if released > 0 {
            log::info!("Released {} queued frames", released);
        }
    }
}

impl<P: Platform, A: Adapter> Drop for Transport<P, A> {
    fn drop(&mut self) {
        self.release();
    }
}
