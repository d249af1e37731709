//! Per-device read loop turning raw events into [`KeyEvent`]s.

use crate::action::EV_KEY;
use crate::cancel::CancelToken;
use crate::event::{KeyEvent, RawEvent};
use crate::modifiers::{ModifierTracking, Modifiers};
use std::io;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

/// A source of raw input events, normally an open evdev node.
pub trait EventSource: Send {
    /// Human readable identity for logging.
    fn name(&self) -> String;

    /// Return whatever events are pending.
    ///
    /// Returns an error of kind [`io::ErrorKind::WouldBlock`] when nothing
    /// is available yet.
    fn fetch(&mut self) -> io::Result<Vec<RawEvent>>;
}

/// Reads one device and keeps that device's modifier state.
pub struct KeyboardReader<S> {
    source: S,
    modifiers: Modifiers,
    tracking: ModifierTracking,
}

impl<S: EventSource> KeyboardReader<S> {
    /// Create a reader with all modifiers released.
    pub fn new(source: S, tracking: ModifierTracking) -> Self {
        Self {
            source,
            modifiers: Modifiers::new(),
            tracking,
        }
    }

    /// Current modifier state of this device.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Update modifier state from `raw`, then build the event from it.
    ///
    /// The modifier state changes first so a modifier's own event does not
    /// reflect the transition; the next key does.
    pub fn decode(&mut self, raw: RawEvent) -> KeyEvent {
        if raw.event_type == EV_KEY {
            self.modifiers.observe(raw.code, raw.value, self.tracking);
        }
        KeyEvent::new(raw, &self.modifiers)
    }

    /// Read until `cancel` fires, the consumer goes away, or the device
    /// fails, sending every decoded event to `tx`.
    ///
    /// Cancellation is checked before each event is delivered and while
    /// idle, so nothing fetched after the signal reaches `tx`. Returns the
    /// source once the loop has stopped.
    pub fn run(mut self, cancel: &CancelToken, tx: &Sender<KeyEvent>, poll_interval: Duration) -> S {
        let name = self.source.name();
        log::debug!("Tracking keys on device {}", name);

        'outer: while !cancel.is_cancelled() {
            let batch = match self.source.fetch() {
                Ok(batch) => batch,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(poll_interval);
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("Keyboard read error on {}: {}", name, e);
                    break;
                }
            };

            for raw in batch {
                if cancel.is_cancelled() {
                    break 'outer;
                }
                let event = self.decode(raw);
                if tx.send(event).is_err() {
                    log::debug!("Event receiver dropped, stopping {}", name);
                    break 'outer;
                }
            }
        }

        log::debug!("Stopped tracking keys on device {}", name);
        self.source
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::action::EV_SYN;
    use crate::runemap::keycode::*;
    use std::collections::VecDeque;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::{Arc, Mutex};

    /// In-memory device; tests push events into `queue` while it runs.
    #[derive(Clone, Default)]
    pub(crate) struct MockSource {
        pub name: String,
        pub queue: Arc<Mutex<VecDeque<RawEvent>>>,
        pub fail: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSource {
        pub fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }

        pub fn push(&self, events: impl IntoIterator<Item = RawEvent>) {
            self.queue.lock().unwrap().extend(events);
        }
    }

    impl EventSource for MockSource {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn fetch(&mut self) -> io::Result<Vec<RawEvent>> {
            if let Some(kind) = *self.fail.lock().unwrap() {
                return Err(io::Error::from(kind));
            }
            let mut queue = self.queue.lock().unwrap();
            if queue.is_empty() {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            Ok(queue.drain(..).collect())
        }
    }

    /// Hands out `batches` one per fetch and cancels `token` while fetching
    /// batch `cancel_at`. Reports no data until a token is installed.
    pub(crate) struct CancellingSource {
        pub batches: VecDeque<Vec<RawEvent>>,
        pub cancel_at: usize,
        pub fetched: usize,
        pub token: Arc<Mutex<Option<CancelToken>>>,
    }

    impl CancellingSource {
        pub fn new(batches: Vec<Vec<RawEvent>>, cancel_at: usize) -> Self {
            Self {
                batches: batches.into(),
                cancel_at,
                fetched: 0,
                token: Arc::default(),
            }
        }
    }

    impl EventSource for CancellingSource {
        fn name(&self) -> String {
            "cancelling".to_string()
        }

        fn fetch(&mut self) -> io::Result<Vec<RawEvent>> {
            let token = self.token.lock().unwrap().clone();
            let (Some(token), Some(batch)) = (token, self.batches.pop_front()) else {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            };
            if self.fetched == self.cancel_at {
                token.cancel();
            }
            self.fetched += 1;
            Ok(batch)
        }
    }

    fn collect(rx: &Receiver<KeyEvent>, n: usize) -> Vec<KeyEvent> {
        (0..n)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect()
    }

    #[test]
    fn test_shift_applies_to_next_key_only() {
        let mut reader = KeyboardReader::new(MockSource::default(), ModifierTracking::Toggle);
        let shift_down = reader.decode(RawEvent::key(KEY_LEFTSHIFT, 1));
        assert!(shift_down.is_modifier());
        assert!(reader.modifiers().shift);

        let a = reader.decode(RawEvent::key(30, 1));
        assert_eq!(a.rune, Some('A'));
        reader.decode(RawEvent::key(30, 0));

        reader.decode(RawEvent::key(KEY_LEFTSHIFT, 0));
        assert!(!reader.modifiers().shift);
        assert_eq!(reader.decode(RawEvent::key(30, 1)).rune, Some('a'));
    }

    #[test]
    fn test_autorepeat_does_not_toggle() {
        let mut reader = KeyboardReader::new(MockSource::default(), ModifierTracking::Toggle);
        reader.decode(RawEvent::key(KEY_LEFTSHIFT, 1));
        reader.decode(RawEvent::key(KEY_LEFTSHIFT, 2));
        reader.decode(RawEvent::key(KEY_LEFTSHIFT, 2));
        assert!(reader.modifiers().shift);
    }

    #[test]
    fn test_non_key_events_leave_modifiers() {
        let mut reader = KeyboardReader::new(MockSource::default(), ModifierTracking::Toggle);
        // MSC_SCAN value that happens to equal the CapsLock code
        reader.decode(RawEvent::new(0x04, 4, KEY_CAPSLOCK as i32));
        reader.decode(RawEvent::new(EV_SYN, 0, 0));
        assert_eq!(reader.modifiers(), Modifiers::new());
    }

    #[test]
    fn test_capslock_latch_uppercases() {
        let mut reader = KeyboardReader::new(MockSource::default(), ModifierTracking::Latch);
        reader.decode(RawEvent::key(KEY_CAPSLOCK, 1));
        reader.decode(RawEvent::key(KEY_CAPSLOCK, 0));
        assert_eq!(reader.decode(RawEvent::key(16, 1)).rune, Some('Q'));
    }

    #[test]
    fn test_run_emits_every_event_in_order() {
        let source = MockSource::named("mock0");
        let expected = [
            RawEvent::key(KEY_LEFTSHIFT, 1),
            RawEvent::new(EV_SYN, 0, 0),
            RawEvent::key(35, 1),
            RawEvent::new(EV_SYN, 0, 0),
        ];
        source.push(expected);
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let handle = {
            let cancel = cancel.clone();
            let source = source.clone();
            thread::spawn(move || {
                KeyboardReader::new(source, ModifierTracking::Toggle).run(
                    &cancel,
                    &tx,
                    Duration::from_millis(1),
                )
            })
        };

        let events = collect(&rx, 4);
        assert_eq!(events[0].event_name, "KEY_LEFTSHIFT");
        assert_eq!(events[0].rune, None);
        assert_eq!(events[2].rune, Some('H'));
        assert_eq!(events.iter().map(|e| e.raw).collect::<Vec<_>>(), expected);

        cancel.cancel();
        handle.join().unwrap();
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_run_stops_on_read_error() {
        let source = MockSource::named("broken");
        *source.fail.lock().unwrap() = Some(io::ErrorKind::NotFound);
        let (tx, rx) = mpsc::channel();
        let returned = KeyboardReader::new(source, ModifierTracking::Toggle).run(
            &CancelToken::new(),
            &tx,
            Duration::from_millis(1),
        );
        assert_eq!(returned.name, "broken");
        drop(tx);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_run_stops_when_receiver_dropped() {
        let source = MockSource::named("orphan");
        source.push([RawEvent::key(30, 1), RawEvent::key(30, 0)]);
        let (tx, rx) = mpsc::channel();
        drop(rx);
        KeyboardReader::new(source, ModifierTracking::Toggle).run(
            &CancelToken::new(),
            &tx,
            Duration::from_millis(1),
        );
    }

    #[test]
    fn test_cancel_during_fetch_drops_rest_of_batch() {
        let first = vec![RawEvent::key(30, 1), RawEvent::new(EV_SYN, 0, 0)];
        let second = vec![RawEvent::key(31, 1), RawEvent::new(EV_SYN, 0, 0)];
        let source = CancellingSource::new(vec![first.clone(), second], 1);
        let cancel = CancelToken::new();
        *source.token.lock().unwrap() = Some(cancel.clone());

        let (tx, rx) = mpsc::channel();
        let source = KeyboardReader::new(source, ModifierTracking::Toggle).run(&cancel, &tx, Duration::from_millis(1));
        drop(tx);

        assert_eq!(source.fetched, 2);
        assert_eq!(rx.iter().map(|e| e.raw).collect::<Vec<_>>(), first);
    }
}
