//! Trait definitions at the transport's seams
//!
//! - [`SpiBus`]: one full-duplex exchange on the bound SPI device
//! - [`Platform`]: acquisition and release of the bus device, the handshake
//!   pin and its interrupt
//! - [`Adapter`]: the owning upper layer, notified of inbound frames and
//!   registered during bring-up

use crate::config::{BoardInfo, HandshakeConfig};
use crate::error::BoxError;
use crate::handshake::HandshakeTrigger;
use crate::transport::Link;

/// A bound SPI device able to perform full-duplex exchanges
pub trait SpiBus: Send {
    /// Backend error
    type Error: std::error::Error + Send + Sync + 'static;

    /// Clock out `tx` while filling `rx`
    ///
    /// Both slices have the same length. Blocks until the exchange is done.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;
}

/// Hardware resources the transport acquires during bring-up
///
/// Every acquisition is its own fallible step and every acquired resource is
/// handed back through the matching release call exactly once.
pub trait Platform {
    /// Bound SPI device
    type Bus: SpiBus + 'static;
    /// Requested handshake pin
    type Pin;
    /// Attached handshake interrupt
    type Irq;
    /// Backend error
    type Error: std::error::Error + Send + Sync + 'static;

    /// Register the peer device on its bus
    fn new_device(&mut self, board: &BoardInfo) -> Result<Self::Bus, Self::Error>;

    /// Apply mode, word size and clock rate to a registered device
    fn setup_device(&mut self, bus: &mut Self::Bus, board: &BoardInfo) -> Result<(), Self::Error>;

    /// Release a registered device
    fn unregister_device(&mut self, bus: Self::Bus);

    /// Claim the handshake pin
    fn request_pin(&mut self, handshake: &HandshakeConfig) -> Result<Self::Pin, Self::Error>;

    /// Configure the claimed pin as an input
    fn direction_input(&mut self, pin: &mut Self::Pin) -> Result<(), Self::Error>;

    /// Release the handshake pin
    fn free_pin(&mut self, pin: Self::Pin);

    /// Attach `trigger` to edges on the handshake pin
    ///
    /// The handler context must do nothing but call `trigger.fire()`.
    fn request_irq(
        &mut self,
        pin: &Self::Pin,
        handshake: &HandshakeConfig,
        trigger: HandshakeTrigger,
    ) -> Result<Self::Irq, Self::Error>;

    /// Detach the handshake interrupt; no edge is delivered afterwards
    fn free_irq(&mut self, irq: Self::Irq);

    /// Sleep for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// The adapter that owns the transport
///
/// Only `process_new_packet` is called in steady state, from the worker
/// context. The remaining hooks run during bring-up and teardown.
pub trait Adapter: Send + Sync + 'static {
    /// A new frame is waiting in the RX queue
    fn process_new_packet(&self);

    /// Register the network card
    fn add_card(&self, link: &Link) -> Result<(), BoxError>;

    /// Unregister the network card
    fn remove_card(&self);

    /// Bring up the serial-console sub-interface
    fn serial_init(&self, _link: &Link) -> Result<(), BoxError> {
        Ok(())
    }

    /// Tear down the serial-console sub-interface
    fn serial_cleanup(&self) {}

    /// Bring up the Bluetooth HCI sub-interface
    fn init_bt(&self, _link: &Link) -> Result<(), BoxError> {
        Ok(())
    }

    /// Tear down the Bluetooth HCI sub-interface
    fn deinit_bt(&self) {}
}
