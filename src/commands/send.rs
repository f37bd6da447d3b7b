//! Send command: queue frames and wait for them to go out

use crate::adapter::ConsoleAdapter;

use esphost_core::platform::Platform;
use esphost_core::Transport;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Queue `payload` `repeat` times and wait until the queue is empty
///
/// Frames the peer sent back meanwhile are printed afterwards.
pub fn run<P: Platform>(
    platform: P,
    payload: &[u8],
    repeat: u64,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let (adapter, _packets) = ConsoleAdapter::new();
    let transport = Transport::init(platform, Arc::new(adapter))?;
    let link = transport.link();

    for _ in 0..repeat {
        link.write(payload)?;
    }
    log::info!("Queued {} frame(s) of {} bytes", repeat, payload.len());

    let pb = super::frame_progress_bar(repeat)?;
    transport.kick();

    let deadline = Instant::now() + timeout;
    loop {
        let pending = link.pending_tx() as u64;
        pb.set_position(repeat.saturating_sub(pending));
        if pending == 0 {
            break;
        }
        if Instant::now() >= deadline {
            pb.abandon();
            transport.teardown();
            return Err(format!(
                "Timed out with {} frame(s) still queued; is the peer raising the handshake line?",
                pending
            )
            .into());
        }
        thread::sleep(POLL_INTERVAL);
    }
    pb.finish();

    while let Some(frame) = link.read()? {
        println!(
            "reply: {:>4} bytes  {}",
            frame.payload().len(),
            super::hex(frame.payload())
        );
    }

    let stats = transport.stats();
    transport.teardown();
    super::print_stats(&stats);
    Ok(())
}
