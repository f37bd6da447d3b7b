//! Listen command: print inbound frames

use crate::adapter::ConsoleAdapter;

use esphost_core::platform::Platform;
use esphost_core::Transport;

use std::sync::Arc;

/// Bring the transport up on `platform` and print frames until `count`
/// have arrived, or forever
pub fn run<P: Platform>(platform: P, count: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let (adapter, packets) = ConsoleAdapter::new();
    let transport = Transport::init(platform, Arc::new(adapter))?;
    let link = transport.link();

    // Let a peer that waits for the host see a first exchange
    transport.kick();
    log::info!("Listening for frames...");

    let mut received = 0u64;
    'wait: while packets.recv().is_ok() {
        while let Some(frame) = link.read()? {
            received += 1;
            println!(
                "{:>6}: {:>4} bytes  {}",
                received,
                frame.payload().len(),
                super::hex(frame.payload())
            );
            if count.is_some_and(|count| received >= count) {
                break 'wait;
            }
        }
    }

    let stats = transport.stats();
    transport.teardown();
    super::print_stats(&stats);
    Ok(())
}
