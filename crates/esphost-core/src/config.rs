//! Fixed transport configuration
//!
//! The bus binding and handshake line are compile-time constants. Nothing at
//! this layer negotiates or overrides them.

/// Size of every SPI exchange, and upper bound of a decoded frame
pub const MAX_FRAME_SIZE: usize = 1600;

/// Delay after the handshake interrupt is attached, and again after the
/// upper collaborators are registered
pub const SETTLE_DELAY_MS: u32 = 200;

/// SPI clock polarity/phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    Mode0 = 0,
    /// CPOL=0, CPHA=1
    Mode1 = 1,
    /// CPOL=1, CPHA=0
    Mode2 = 2,
    /// CPOL=1, CPHA=1
    Mode3 = 3,
}

impl SpiMode {
    /// Raw mode number as used by spidev
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Static description of the SPI device the peer sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardInfo {
    /// Driver alias of the device
    pub modalias: &'static str,
    /// SPI mode
    pub mode: SpiMode,
    /// Maximum clock rate in Hz
    pub max_speed_hz: u32,
    /// Bits per word
    pub bits_per_word: u8,
    /// SPI bus (controller) number
    pub bus_num: u16,
    /// Chip select on that bus
    pub chip_select: u8,
}

/// Edge on which the handshake line raises its interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high transition
    Rising,
    /// High to low transition
    Falling,
}

/// Static description of the peer-driven handshake line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// GPIO chip the line belongs to
    pub chip: &'static str,
    /// Line offset on that chip
    pub line: u32,
    /// Consumer label attached to the pin request
    pub label: &'static str,
    /// Name attached to the interrupt request
    pub irq_name: &'static str,
    /// Triggering edge
    pub edge: Edge,
    /// Whether the interrupt may be shared with other handlers
    pub shared: bool,
}

/// ESP32 on SPI bus 0, chip select 0, mode 3 at 10 MHz
pub const BOARD: BoardInfo = BoardInfo {
    modalias: "esp_spi",
    mode: SpiMode::Mode3,
    max_speed_hz: 10_000_000,
    bits_per_word: 8,
    bus_num: 0,
    chip_select: 0,
};

/// Handshake on GPIO 22, rising edge
pub const HANDSHAKE: HandshakeConfig = HandshakeConfig {
    chip: "/dev/gpiochip0",
    line: 22,
    label: "SPI_HANDSHAKE_PIN",
    irq_name: "ESP_SPI",
    edge: Edge::Rising,
    shared: true,
};
