//! Linux board: spidev bus plus GPIO character device handshake line

use crate::error::{BoardError, Result};

use esphost_core::config::{BoardInfo, HandshakeConfig};
use esphost_core::handshake::HandshakeTrigger;
use esphost_core::platform::Platform;
use esphost_linux_gpio::{EdgeWatcher, HandshakeLine};
use esphost_linux_spi::{LinuxSpi, LinuxSpiConfig};

use std::thread;
use std::time::Duration;

/// Platform for a Linux host with the ESP32 on spidev
///
/// The bus is opened from `/dev/spidev<bus>.<cs>` and the handshake interrupt
/// is an edge watcher thread on the GPIO character device.
#[derive(Debug, Default)]
pub struct LinuxBoard;

impl LinuxBoard {
    /// Create the Linux board
    pub fn new() -> Self {
        Self
    }
}

impl Platform for LinuxBoard {
    type Bus = LinuxSpi;
    type Pin = HandshakeLine;
    type Irq = EdgeWatcher;
    type Error = BoardError;

    fn new_device(&mut self, board: &BoardInfo) -> Result<LinuxSpi> {
        let config = LinuxSpiConfig::from_board(board);
        LinuxSpi::open(&config).map_err(|e| {
            log::error!(
                "Failed to open {}; check that the spidev overlay is loaded \
                 and the node is accessible",
                config.device
            );
            e.into()
        })
    }

    fn setup_device(&mut self, bus: &mut LinuxSpi, board: &BoardInfo) -> Result<()> {
        Ok(bus.setup(&LinuxSpiConfig::from_board(board))?)
    }

    fn unregister_device(&mut self, bus: LinuxSpi) {
        log::debug!("Releasing SPI device {}", bus.device());
        drop(bus);
    }

    fn request_pin(&mut self, handshake: &HandshakeConfig) -> Result<HandshakeLine> {
        Ok(HandshakeLine::request(handshake)?)
    }

    fn direction_input(&mut self, pin: &mut HandshakeLine) -> Result<()> {
        Ok(pin.set_input()?)
    }

    fn free_pin(&mut self, pin: HandshakeLine) {
        log::debug!("Releasing {} line {}", pin.chip(), pin.offset());
        drop(pin);
    }

    fn request_irq(
        &mut self,
        pin: &HandshakeLine,
        handshake: &HandshakeConfig,
        trigger: HandshakeTrigger,
    ) -> Result<EdgeWatcher> {
        Ok(EdgeWatcher::spawn(pin, handshake, trigger)?)
    }

    fn free_irq(&mut self, irq: EdgeWatcher) {
        irq.stop();
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esphost_core::config::HANDSHAKE;

    #[test]
    fn test_missing_pin_maps_to_gpio_error() {
        let mut board = LinuxBoard::new();
        let handshake = HandshakeConfig {
            chip: "/nonexistent/gpiochip7",
            ..HANDSHAKE
        };
        assert!(matches!(
            board.request_pin(&handshake),
            Err(BoardError::Gpio(_))
        ));
    }
}
