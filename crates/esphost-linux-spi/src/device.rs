//! Linux spidev bus implementation
//!
//! This module provides the `LinuxSpi` struct that implements the `SpiBus`
//! trait using Linux's spidev interface. Each exchange is a single
//! `SPI_IOC_MESSAGE(1)` with both TX and RX buffers set, so the kernel clocks
//! the two directions simultaneously.

use crate::error::{LinuxSpiError, Result};

use esphost_core::config::BoardInfo;
use esphost_core::platform::SpiBus;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOW(SPI_IOC_MAGIC, 0, char[size])
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Configuration for binding a spidev device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock speed in Hz
    pub speed_hz: u32,
    /// SPI mode (0-3)
    pub mode: u8,
    /// Bits per word
    pub bits_per_word: u8,
}

impl LinuxSpiConfig {
    /// Derive the spidev node and settings from a board description
    pub fn from_board(board: &BoardInfo) -> Self {
        Self {
            device: format!("/dev/spidev{}.{}", board.bus_num, board.chip_select),
            speed_hz: board.max_speed_hz,
            mode: board.mode.bits(),
            bits_per_word: board.bits_per_word,
        }
    }
}

/// SPI device bound through spidev
pub struct LinuxSpi {
    /// File handle for spidev device
    file: File,
    /// Device path, for logging
    device: String,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Current speed in Hz
    speed_hz: u32,
    /// Current word size
    bits_per_word: u8,
}

impl LinuxSpi {
    /// Open the spidev node for `config`
    ///
    /// No settings are applied yet, see [`LinuxSpi::setup`].
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file,
            device: config.device.clone(),
            max_kernel_buf_size,
            speed_hz: config.speed_hz,
            bits_per_word: config.bits_per_word,
        })
    }

    /// Apply mode, word size and clock rate
    pub fn setup(&mut self, config: &LinuxSpiConfig) -> Result<()> {
        let fd = self.file.as_raw_fd();

        let mode = config.mode;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        let bits = config.bits_per_word;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        self.speed_hz = speed;
        self.bits_per_word = bits;

        log::info!(
            "linux_spi: Configured {} (mode={}, speed={} kHz)",
            self.device,
            mode,
            speed / 1000
        );
        Ok(())
    }

    /// Perform one full-duplex transfer
    fn spi_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if tx.len() != rx.len() {
            return Err(LinuxSpiError::LengthMismatch {
                tx: tx.len(),
                rx: rx.len(),
            });
        }
        if tx.len() > self.max_kernel_buf_size {
            return Err(LinuxSpiError::TransferTooLarge {
                len: tx.len(),
                max: self.max_kernel_buf_size,
            });
        }

        let transfer = SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            ..Default::default()
        };

        let fd = self.file.as_raw_fd();
        let ioctl_num = ioctl::spi_ioc_message(1);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, &transfer as *const SpiIocTransfer) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }

    /// Device path this bus is bound to
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }
}

impl SpiBus for LinuxSpi {
    type Error = LinuxSpiError;

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        self.spi_transfer(tx, rx)
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use esphost_core::config::BOARD;

    #[test]
    fn test_config_from_board() {
        let config = LinuxSpiConfig::from_board(&BOARD);
        assert_eq!(config.device, "/dev/spidev0.0");
        assert_eq!(config.mode, 3);
        assert_eq!(config.speed_hz, 10_000_000);
        assert_eq!(config.bits_per_word, 8);
    }

    #[test]
    fn test_transfer_struct_layout() {
        assert_eq!(
            std::mem::size_of::<SpiIocTransfer>(),
            ioctl::SPI_IOC_TRANSFER_SIZE
        );
    }

    #[test]
    fn test_ioc_message_number() {
        // SPI_IOC_MESSAGE(1) on Linux
        assert_eq!(ioctl::spi_ioc_message(1), 0x4020_6B00);
    }

    #[test]
    fn test_open_missing_device() {
        let config = LinuxSpiConfig {
            device: "/nonexistent/spidev9.9".into(),
            ..LinuxSpiConfig::from_board(&BOARD)
        };
        assert!(matches!(
            LinuxSpi::open(&config),
            Err(LinuxSpiError::OpenFailed { .. })
        ));
    }
}
