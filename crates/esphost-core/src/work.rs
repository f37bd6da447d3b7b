//! Deferred work with "at most one pending run" semantics
//!
//! A single worker thread executes the work function, so runs never overlap.
//! A pending run is one token in a `bounded(1)` channel: scheduling while the
//! token is there finds the channel full and coalesces into that run. The
//! worker takes the token right before a run starts, so a request that
//! arrives during a run always causes one more run afterwards.
//!
//! [`WorkHandle::schedule`] is a single `try_send`: it never blocks and never
//! allocates.

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cheap clonable handle used to schedule the work
#[derive(Debug, Clone)]
pub struct WorkHandle {
    pending: Sender<()>,
    runs: Arc<AtomicU64>,
}

impl WorkHandle {
    /// Request a run
    ///
    /// Returns `true` if a new run was queued, `false` if one was already
    /// pending or the work has been destroyed.
    pub fn schedule(&self) -> bool {
        match self.pending.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }

    /// Whether a run is queued but not started yet
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Completed runs so far
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }
}

fn worker_loop<F>(pending: Receiver<()>, shutdown: Receiver<()>, runs: &AtomicU64, mut run: F)
where
    F: FnMut(),
{
    loop {
        select! {
            recv(pending) -> msg => {
                if msg.is_err() {
                    break;
                }
                // Shutdown wins over a pending run that has not started
                if let Err(TryRecvError::Disconnected) = shutdown.try_recv() {
                    break;
                }
                run();
                runs.fetch_add(1, Ordering::AcqRel);
            }
            recv(shutdown) -> _ => break,
        }
    }
}

/// Owner of the worker thread
#[derive(Debug)]
pub struct DeferredWork {
    handle: WorkHandle,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DeferredWork {
    /// Spawn the worker thread that will execute `run` on request
    pub fn spawn<F>(name: &str, run: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (pending_tx, pending_rx) = bounded(1);
        // Never sent on; dropping the sender is the stop signal
        let (shutdown_tx, shutdown_rx) = bounded(0);
        let runs = Arc::new(AtomicU64::new(0));

        let worker_runs = Arc::clone(&runs);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(pending_rx, shutdown_rx, &worker_runs, run))?;

        log::debug!("Created work queue {}", name);

        Ok(Self {
            handle: WorkHandle {
                pending: pending_tx,
                runs,
            },
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Handle for scheduling runs
    pub fn handle(&self) -> WorkHandle {
        self.handle.clone()
    }

    /// Request a run, see [`WorkHandle::schedule`]
    pub fn schedule(&self) -> bool {
        self.handle.schedule()
    }

    /// Stop the worker and wait for an in-flight run to finish
    ///
    /// A run that is pending but not started is discarded. Further
    /// `schedule` calls are no-ops.
    pub fn destroy(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.shutdown.take());

        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.thread().id() == thread::current().id() {
            // Destroyed from inside a run; the loop exits on its own.
            return;
        }
        if thread.join().is_err() {
            log::error!("Deferred worker panicked");
        }
    }
}

impl Drop for DeferredWork {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use crossbeam_channel::unbounded;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[test]
    fn test_runs_on_schedule() {
        let (tx, rx) = unbounded();
        let work = DeferredWork::spawn("test-run", move || {
            tx.send(()).unwrap();
        })
        .unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(work.schedule());
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        work.destroy();
    }

    #[test]
    fn test_coalesces_while_pending() {
        const EXTRA: usize = 10;

        let signals = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(Mutex::new(Vec::new()));
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();

        let work = {
            let signals = Arc::clone(&signals);
            let observed = Arc::clone(&observed);
            DeferredWork::spawn("test-coalesce", move || {
                observed.lock().unwrap().push(signals.load(Ordering::SeqCst));
                started_tx.send(()).unwrap();
                let _ = release_rx.recv();
            })
            .unwrap()
        };

        // First run goes in flight and blocks
        signals.fetch_add(1, Ordering::SeqCst);
        assert!(work.schedule());
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // One run queued behind it, the rest coalesce into that one
        signals.fetch_add(1, Ordering::SeqCst);
        assert!(work.schedule());
        for _ in 0..EXTRA {
            signals.fetch_add(1, Ordering::SeqCst);
            assert!(!work.schedule());
        }
        assert!(work.handle().is_pending());

        drop(release_tx);
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(started_rx.recv_timeout(Duration::from_millis(200)).is_err());

        let observed = observed.lock().unwrap().clone();
        let total = signals.load(Ordering::SeqCst);
        assert_eq!(observed.len(), 2);
        assert!(observed.len() <= total);
        // The last run started after the last signal
        assert_eq!(*observed.last().unwrap(), total);
        work.destroy();
    }

    #[test]
    fn test_no_lost_wakeup_under_storm() {
        let signals = Arc::new(AtomicUsize::new(0));
        let last_seen = Arc::new(AtomicUsize::new(0));

        let work = {
            let signals = Arc::clone(&signals);
            let last_seen = Arc::clone(&last_seen);
            DeferredWork::spawn("test-storm", move || {
                last_seen.store(signals.load(Ordering::SeqCst), Ordering::SeqCst);
            })
            .unwrap()
        };

        let handle = work.handle();
        std::thread::scope(|s| {
            for _ in 0..4 {
                let handle = handle.clone();
                let signals = Arc::clone(&signals);
                s.spawn(move || {
                    for _ in 0..2000 {
                        signals.fetch_add(1, Ordering::SeqCst);
                        handle.schedule();
                    }
                });
            }
        });

        let total = signals.load(Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        while last_seen.load(Ordering::SeqCst) != total {
            assert!(Instant::now() < deadline, "final signal never serviced");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.runs() as usize <= total);
        work.destroy();
    }

    #[test]
    fn test_schedule_after_destroy() {
        let work = DeferredWork::spawn("test-destroy", || {}).unwrap();
        let handle = work.handle();
        work.destroy();
        assert!(!handle.schedule());
    }

    #[test]
    fn test_destroy_discards_pending_run() {
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let work = DeferredWork::spawn("test-discard", move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        })
        .unwrap();
        let handle = work.handle();

        assert!(work.schedule());
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(work.schedule());

        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            drop(release_tx);
        });
        work.destroy();
        releaser.join().unwrap();

        assert_eq!(handle.runs(), 1);
        assert!(!handle.schedule());
    }
}
