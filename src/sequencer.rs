//! Paced, ordered delivery of key sequences to an event sink.

use crate::action::KeySequence;
use crate::cancel::CancelToken;
use crate::error::{KbdError, Result};
use std::io;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Something that accepts raw input events, usually a uinput device.
pub trait EventSink: Send {
    /// Write one raw `(type, code, value)` event.
    fn write_event(&mut self, event_type: u16, code: u16, value: i32) -> io::Result<()>;
}

/// Delivers [`KeySequence`]s to a sink one action at a time.
#[derive(Debug, Clone, Copy)]
pub struct KeySequencer {
    pacing: Duration,
}

impl KeySequencer {
    /// Create a sequencer that sleeps `pacing` after every action.
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// Delay after each action.
    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Deliver `sequences` to `sink`.
    ///
    /// Each sequence keeps its own order. When more than one sequence is
    /// given they run concurrently and their actions may interleave. The
    /// first write error stops every sequence and is returned; cancelling
    /// `cancel` stops them with [`KbdError::Cancelled`].
    pub fn deliver<S: EventSink>(
        &self,
        sink: &Mutex<S>,
        sequences: Vec<KeySequence>,
        cancel: &CancelToken,
    ) -> Result<()> {
        match sequences.len() {
            0 => Ok(()),
            1 => {
                let seq = sequences.into_iter().next().unwrap_or_default();
                self.run(sink, seq, cancel, None)
            }
            _ => self.deliver_concurrent(sink, sequences, cancel),
        }
    }

    fn deliver_concurrent<S: EventSink>(
        &self,
        sink: &Mutex<S>,
        sequences: Vec<KeySequence>,
        cancel: &CancelToken,
    ) -> Result<()> {
        let abort = CancelToken::new();
        let first_error: Mutex<Option<KbdError>> = Mutex::new(None);
        let mut cancelled = false;

        thread::scope(|s| {
            let handles: Vec<_> = sequences
                .into_iter()
                .map(|seq| {
                    let abort = &abort;
                    let first_error = &first_error;
                    s.spawn(move || match self.run(sink, seq, cancel, Some(abort)) {
                        Err(KbdError::Cancelled) => true,
                        Err(e) => {
                            abort.cancel();
                            let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            false
                        }
                        Ok(()) => false,
                    })
                })
                .collect();
            for handle in handles {
                // A panicking sequence counts as stopped.
                cancelled |= handle.join().unwrap_or(true);
            }
        });

        let first_error = first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        match first_error {
            Some(e) => Err(e),
            None if cancelled => Err(KbdError::Cancelled),
            None => Ok(()),
        }
    }

    fn run<S: EventSink>(
        &self,
        sink: &Mutex<S>,
        seq: KeySequence,
        cancel: &CancelToken,
        abort: Option<&CancelToken>,
    ) -> Result<()> {
        for action in seq {
            let (event_type, code, value) = action.raw();
            // Checked under the lock so a cancel seen by one writer is seen
            // by every later one.
            let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
            if cancel.is_cancelled() || abort.is_some_and(CancelToken::is_cancelled) {
                return Err(KbdError::Cancelled);
            }
            guard.write_event(event_type, code, value)
                .map_err(|source| KbdError::WriteFailed {
                    event_type,
                    code,
                    value,
                    source,
                })?;
            drop(guard);
            if !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }
        Ok(())
    }
}
