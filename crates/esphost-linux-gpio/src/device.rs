//! Handshake line and edge watcher
//!
//! `HandshakeLine` claims the peer-driven GPIO line through the character
//! device interface. `EdgeWatcher` enables edge detection on it and runs a
//! small thread that plays the role of the interrupt handler: every edge
//! event calls `HandshakeTrigger::fire` and nothing else.

use crate::error::{LinuxGpioError, Result};

use esphost_core::config::{Edge, HandshakeConfig};
use esphost_core::handshake::HandshakeTrigger;

use gpiocdev::line::{EdgeDetection, Offset};
use gpiocdev::request::{Config, Request};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the watcher checks for a stop request while no edge arrives
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn edge_detection(edge: Edge) -> EdgeDetection {
    match edge {
        Edge::Rising => EdgeDetection::RisingEdge,
        Edge::Falling => EdgeDetection::FallingEdge,
    }
}

/// The claimed handshake line
pub struct HandshakeLine {
    /// GPIO line request handle, shared with the edge watcher
    request: Arc<Request>,
    /// Line offset on the chip
    offset: Offset,
    /// Chip path, for logging
    chip: String,
}

impl HandshakeLine {
    /// Claim the handshake line described by `config`
    pub fn request(config: &HandshakeConfig) -> Result<Self> {
        log::debug!(
            "linux_gpio: Requesting line {} on {}",
            config.line,
            config.chip
        );

        let mut req_config = Config::default();
        req_config.with_line(config.line).as_input();

        let request = Request::from_config(req_config)
            .on_chip(config.chip)
            .with_consumer(config.label)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                chip: config.chip.to_string(),
                line: config.line,
                source,
            })?;

        log::info!(
            "linux_gpio: Claimed {} line {} as {}",
            config.chip,
            config.line,
            config.label
        );

        Ok(Self {
            request: Arc::new(request),
            offset: config.line,
            chip: config.chip.to_string(),
        })
    }

    /// Configure the line as a plain input, without edge detection
    pub fn set_input(&self) -> Result<()> {
        let mut cfg = Config::default();
        cfg.with_line(self.offset).as_input();
        self.reconfigure(&cfg)
    }

    fn reconfigure(&self, cfg: &Config) -> Result<()> {
        self.request
            .reconfigure(cfg)
            .map_err(|source| LinuxGpioError::ReconfigureFailed {
                line: self.offset,
                source,
            })
    }

    /// Line offset on the chip
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Chip path
    pub fn chip(&self) -> &str {
        &self.chip
    }
}

/// Thread delivering handshake edges to the transport
pub struct EdgeWatcher {
    line: Arc<Request>,
    offset: Offset,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EdgeWatcher {
    /// Enable edge detection on `line` and start firing `trigger`
    pub fn spawn(
        line: &HandshakeLine,
        config: &HandshakeConfig,
        trigger: HandshakeTrigger,
    ) -> Result<Self> {
        let mut cfg = Config::default();
        cfg.with_line(line.offset)
            .as_input()
            .with_edge_detection(edge_detection(config.edge));
        line.reconfigure(&cfg)?;

        let stop = Arc::new(AtomicBool::new(false));
        let request = Arc::clone(&line.request);
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(config.irq_name.to_string())
            .spawn(move || watch(&request, &thread_stop, &trigger));

        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                line.set_input()?;
                return Err(LinuxGpioError::WatcherSpawnFailed(e));
            }
        };

        log::debug!(
            "linux_gpio: Watching {:?} edges on line {}",
            config.edge,
            line.offset
        );

        Ok(Self {
            line: Arc::clone(&line.request),
            offset: line.offset,
            stop,
            thread: Some(thread),
        })
    }

    /// Stop delivering edges and disable edge detection
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            log::error!("linux_gpio: Edge watcher panicked");
        }

        let mut cfg = Config::default();
        cfg.with_line(self.offset).as_input();
        if let Err(e) = self.line.reconfigure(&cfg) {
            log::error!("linux_gpio: Failed to disable edge detection: {}", e);
        }
    }
}

impl Drop for EdgeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch(request: &Request, stop: &AtomicBool, trigger: &HandshakeTrigger) {
    while !stop.load(Ordering::Acquire) {
        match request.wait_edge_event(POLL_INTERVAL) {
            Ok(true) => match request.read_edge_event() {
                Ok(_) => {
                    trigger.fire();
                }
                Err(e) => log::error!("linux_gpio: Failed to read edge event: {}", e),
            },
            Ok(false) => {}
            Err(e) => {
                log::error!("linux_gpio: Failed to wait for edge event: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_mapping() {
        assert_eq!(edge_detection(Edge::Rising), EdgeDetection::RisingEdge);
        assert_eq!(edge_detection(Edge::Falling), EdgeDetection::FallingEdge);
    }

    #[test]
    fn test_request_missing_chip() {
        let config = HandshakeConfig {
            chip: "/nonexistent/gpiochip9",
            ..esphost_core::config::HANDSHAKE
        };
        assert!(matches!(
            HandshakeLine::request(&config),
            Err(LinuxGpioError::LineRequestFailed { line: 22, .. })
        ));
    }
}
