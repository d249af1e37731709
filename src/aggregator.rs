//! Merge events from many keyboards into one stream.

use crate::cancel::CancelToken;
use crate::event::KeyEvent;
use crate::modifiers::ModifierTracking;
use crate::reader::{EventSource, KeyboardReader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Iter, Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Builder for snooping on one or more keyboards.
#[derive(Debug, Clone)]
pub struct SnoopBuilder {
    poll_interval: Duration,
    tracking: ModifierTracking,
}

impl Default for SnoopBuilder {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            tracking: ModifierTracking::default(),
        }
    }
}

impl SnoopBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// How long an idle reader sleeps before polling its device again.
    /// Also bounds how long [`SnoopHandle::stop`] waits for idle readers.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How modifier keys update each device's modifier state.
    pub fn modifier_tracking(mut self, tracking: ModifierTracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// Start one reader thread per source and merge their events.
    ///
    /// `sources` is consumed as it yields, so a lazy device enumeration
    /// starts reading each keyboard as soon as it is opened.
    pub fn snoop_all<S, I>(self, sources: I) -> SnoopHandle
    where
        S: EventSource + 'static,
        I: IntoIterator<Item = S>,
    {
        let cancel = CancelToken::new();
        let active = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        let workers: Vec<JoinHandle<()>> = sources
            .into_iter()
            .map(|source| {
                let reader = KeyboardReader::new(source, self.tracking);
                let cancel = cancel.clone();
                let active = Arc::clone(&active);
                let tx = tx.clone();
                let poll_interval = self.poll_interval;
                active.fetch_add(1, Ordering::SeqCst);
                thread::spawn(move || {
                    let source = reader.run(&cancel, &tx, poll_interval);
                    drop(source);
                    active.fetch_sub(1, Ordering::SeqCst);
                    // The merged stream closes once the last sender is gone.
                    drop(tx);
                })
            })
            .collect();

        log::info!("Snooping on {} device(s)", workers.len());

        SnoopHandle {
            cancel,
            active,
            rx,
            workers,
        }
    }

    /// Snoop on a single device.
    pub fn snoop<S: EventSource + 'static>(self, source: S) -> SnoopHandle {
        self.snoop_all(std::iter::once(source))
    }
}

/// Snoop on every keyboard attached right now, with default settings.
pub fn snoop_all_keyboards() -> SnoopHandle {
    SnoopBuilder::new().snoop_all(crate::device::open_all_keyboards())
}

/// Snoop on one already opened keyboard, with default settings.
pub fn snoop_keyboard(keyboard: crate::device::KeyboardDevice) -> SnoopHandle {
    SnoopBuilder::new().snoop(keyboard)
}

/// Handle to a running snoop.
///
/// The merged stream ends (receives return a disconnected error) only after
/// every reader thread has stopped. Dropping the handle stops all readers
/// and waits for them.
pub struct SnoopHandle {
    cancel: CancelToken,
    active: Arc<AtomicUsize>,
    rx: Receiver<KeyEvent>,
    workers: Vec<JoinHandle<()>>,
}

impl SnoopHandle {
    /// Block until the next event from any device.
    pub fn recv(&self) -> Result<KeyEvent, RecvError> {
        self.rx.recv()
    }

    /// Wait for the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<KeyEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Result<KeyEvent, TryRecvError> {
        self.rx.try_recv()
    }

    /// Blocking iterator over the merged stream.
    pub fn iter(&self) -> Iter<'_, KeyEvent> {
        self.rx.iter()
    }

    /// Number of reader threads that have not yet stopped.
    pub fn active_readers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Check if any reader is still running and no stop was requested.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.active_readers() > 0
    }

    /// A token that stops this snoop when cancelled, e.g. from a signal
    /// handler thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop every reader and wait until all of them have exited.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("Keyboard reader thread panicked");
            }
        }
    }
}

impl Drop for SnoopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
