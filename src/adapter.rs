//! Console adapter
//!
//! Stands in for the network card and sub-interfaces: lifecycle hooks are
//! logged, and packet notifications are forwarded to the command loop.

use crossbeam_channel::{bounded, Receiver, Sender};
use esphost_core::error::BoxError;
use esphost_core::platform::Adapter;
use esphost_core::Link;

pub struct ConsoleAdapter {
    notify: Sender<()>,
}

impl ConsoleAdapter {
    /// Create the adapter and the receiving end of its packet notifications
    ///
    /// At most one notification is outstanding; the command loop drains every
    /// queued frame per wakeup.
    pub fn new() -> (Self, Receiver<()>) {
        let (notify, rx) = bounded(1);
        (Self { notify }, rx)
    }
}

impl Adapter for ConsoleAdapter {
    fn process_new_packet(&self) {
        // Full: a wakeup is already outstanding. Disconnected: the command
        // loop is gone.
        let _ = self.notify.try_send(());
    }

    fn add_card(&self, _link: &Link) -> Result<(), BoxError> {
        log::info!("Card registered");
        Ok(())
    }

    fn remove_card(&self) {
        log::info!("Card removed");
    }

    fn serial_init(&self, _link: &Link) -> Result<(), BoxError> {
        log::debug!("Serial interface up");
        Ok(())
    }

    fn serial_cleanup(&self) {
        log::debug!("Serial interface down");
    }

    fn init_bt(&self, _link: &Link) -> Result<(), BoxError> {
        log::debug!("Bluetooth interface up");
        Ok(())
    }

    fn deinit_bt(&self) {
        log::debug!("Bluetooth interface down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_coalesce() {
        let (adapter, packets) = ConsoleAdapter::new();
        for _ in 0..10 {
            adapter.process_new_packet();
        }
        assert!(packets.try_recv().is_ok());
        assert!(packets.try_recv().is_err());

        adapter.process_new_packet();
        assert!(packets.try_recv().is_ok());
    }

    #[test]
    fn test_notify_after_consumer_gone() {
        let (adapter, packets) = ConsoleAdapter::new();
        drop(packets);
        adapter.process_new_packet();
    }
}
