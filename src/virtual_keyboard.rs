//! A uinput keyboard that types characters and strings.

use crate::action::{KeySequence, EV_KEY, EV_REL, EV_SYN, SYN_REPORT};
use crate::cancel::CancelToken;
use crate::device::{Grabbed, KeyboardDevice};
use crate::error::{KbdError, Result};
use crate::privilege::{with_elevated_privilege, NoElevation, Privilege};
use crate::runemap::{self, keycode};
use crate::sequencer::{EventSink, KeySequencer};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Modifier keys the virtual keyboard can press besides the mapped keys.
const MODIFIER_KEYS: [u16; 4] = [
    keycode::KEY_LEFTSHIFT,
    keycode::KEY_LEFTCTRL,
    keycode::KEY_LEFTALT,
    keycode::KEY_LEFTMETA,
];

/// Event types a virtual keyboard advertises besides `EV_SYN`. `EV_REP` is
/// left out, so held keys are never autorepeated by the kernel.
const ADVERTISED_TYPES: [u16; 2] = [EV_KEY, EV_REL];

/// Sink writing to a uinput device.
///
/// Events are buffered until a `SYN_REPORT` arrives and then emitted as
/// one report, so a rejected event surfaces on the sync that commits it.
pub struct UinputSink {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl UinputSink {
    /// Wrap a created uinput device.
    pub fn new(device: VirtualDevice) -> Self {
        Self {
            device,
            pending: Vec::new(),
        }
    }
}

impl EventSink for UinputSink {
    fn write_event(&mut self, event_type: u16, code: u16, value: i32) -> io::Result<()> {
        if event_type == EV_SYN && code == SYN_REPORT {
            let report = std::mem::take(&mut self.pending);
            // emit() terminates the report with its own SYN_REPORT.
            return self.device.emit(&report);
        }
        self.pending.push(InputEvent::new(EventType(event_type), code, value));
        Ok(())
    }
}

/// Builder for a [`VirtualKeyboard`].
///
/// The device advertises `EV_KEY` for [`supported_codes`] and an empty
/// `EV_REL`. It does not advertise `EV_REP`, so the kernel never
/// autorepeats a key held with [`VirtualKeyboard::press_key`].
#[derive(Debug, Clone)]
pub struct VirtualKeyboardBuilder {
    name: String,
    pacing: Duration,
    settle_delay: Duration,
}

impl VirtualKeyboardBuilder {
    /// Create a builder for a keyboard called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pacing: Duration::from_micros(1),
            settle_delay: Duration::from_millis(500),
        }
    }

    /// Delay after every key action.
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Wait after registering the device so listeners can pick it up
    /// before the first key is sent.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Create the uinput device with the current privileges.
    pub fn build(self) -> Result<VirtualKeyboard> {
        self.build_with_privilege(&NoElevation)
    }

    /// Create the uinput device while holding elevated privileges.
    pub fn build_with_privilege<P: Privilege + ?Sized>(self, privilege: &P) -> Result<VirtualKeyboard> {
        self.check_name()?;
        let mut device = with_elevated_privilege(privilege, || {
            let device = create_device(&self.name)?;
            thread::sleep(self.settle_delay);
            Ok(device)
        })?;

        let dev_node = device
            .enumerate_dev_nodes_blocking()
            .ok()
            .and_then(|mut nodes| nodes.next())
            .and_then(|node| node.ok());
        let sys_path = device.get_syspath().ok();
        log::debug!("Virtual keyboard created at {:?}", dev_node);

        let mut kbd = self.with_sink(UinputSink::new(device))?;
        kbd.dev_node = dev_node;
        kbd.sys_path = sys_path;
        Ok(kbd)
    }

    /// Build a keyboard on top of any sink.
    pub fn with_sink<S: EventSink>(self, sink: S) -> Result<VirtualKeyboard<S>> {
        self.check_name()?;
        Ok(VirtualKeyboard {
            name: self.name,
            dev_node: None,
            sys_path: None,
            sink: Mutex::new(sink),
            sequencer: KeySequencer::new(self.pacing),
        })
    }

    fn check_name(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(KbdError::VirtualDeviceCreateFailed("no name provided".into()));
        }
        Ok(())
    }
}

/// Every key a virtual keyboard declares: the mapped keys plus the left
/// modifiers.
pub fn supported_codes() -> Vec<u16> {
    runemap::codes().chain(MODIFIER_KEYS).collect()
}

fn create_device(name: &str) -> Result<VirtualDevice> {
    let fail = |e: io::Error| KbdError::VirtualDeviceCreateFailed(e.to_string());

    let mut keys = AttributeSet::<Key>::new();
    for code in supported_codes() {
        keys.insert(Key::new(code));
    }
    // Declares EV_REL with no axes.
    let axes = AttributeSet::<RelativeAxisType>::new();
    log::debug!(
        "Creating {} with {:?}",
        name,
        ADVERTISED_TYPES.map(crate::names::type_name)
    );

    VirtualDeviceBuilder::new()
        .map_err(fail)?
        .name(name)
        .with_keys(&keys)
        .map_err(fail)?
        .with_relative_axes(&axes)
        .map_err(fail)?
        .build()
        .map_err(fail)
}

/// Space, or a character that is neither a control, whitespace, an
/// invisible format character nor private use.
fn is_printable(ch: char) -> bool {
    if ch == ' ' {
        return true;
    }
    let format = matches!(
        ch,
        '\u{AD}' | '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
    );
    let private_use = matches!(ch, '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{10FFFF}');
    !(ch.is_control() || ch.is_whitespace() || format || private_use)
}

/// A synthetic keyboard.
///
/// Typing operations take `&self`; concurrent callers are serialised per
/// raw event. [`close`](VirtualKeyboard::close) consumes the keyboard, so
/// typing after close does not compile.
pub struct VirtualKeyboard<S = UinputSink> {
    name: String,
    dev_node: Option<PathBuf>,
    sys_path: Option<PathBuf>,
    sink: Mutex<S>,
    sequencer: KeySequencer,
}

impl<S: EventSink> VirtualKeyboard<S> {
    /// Name the device was registered with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `/dev/input/eventN` node of this keyboard, once known.
    pub fn dev_node(&self) -> Option<&Path> {
        self.dev_node.as_deref()
    }

    /// The device's sysfs path, once known.
    pub fn sys_path(&self) -> Option<&Path> {
        self.sys_path.as_deref()
    }

    /// Write a single raw event.
    pub fn write_raw(&self, event_type: u16, code: u16, value: i32) -> Result<()> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_event(event_type, code, value)
            .map_err(|source| KbdError::WriteFailed {
                event_type,
                code,
                value,
                source,
            })
    }

    /// Commit preceding events as one report.
    pub fn sync(&self) -> Result<()> {
        self.write_raw(EV_SYN, SYN_REPORT, 0)
    }

    /// Deliver sequences through this keyboard's sequencer.
    pub fn send(&self, sequences: Vec<KeySequence>, cancel: &CancelToken) -> Result<()> {
        self.sequencer.deliver(&self.sink, sequences, cancel)
    }

    fn send_one(&self, seq: KeySequence) -> Result<()> {
        self.send(vec![seq], &CancelToken::new())
    }

    /// Press (and hold) a key.
    pub fn press_key(&self, code: u16) -> Result<()> {
        self.send_one(KeySequence::new().press(code))
    }

    /// Release a key.
    pub fn release_key(&self, code: u16) -> Result<()> {
        self.send_one(KeySequence::new().release(code))
    }

    /// Tap a key, optionally while holding the left Shift key.
    pub fn type_key(&self, code: u16, with_shift: bool) -> Result<()> {
        let seq = if with_shift {
            KeySequence::shifted_tap(code)
        } else {
            KeySequence::tap(code)
        };
        self.send_one(seq)
    }

    /// Type one printable character from the US-QWERTY map.
    pub fn type_rune(&self, ch: char) -> Result<()> {
        if !is_printable(ch) {
            return Err(KbdError::UnprintableCharacter(ch));
        }
        let (code, shift) = runemap::resolve(ch)?;
        self.type_key(code, shift)
    }

    /// Tap the space bar.
    pub fn type_space(&self) -> Result<()> {
        self.type_key(keycode::KEY_SPACE, false)
    }

    /// Delete one character.
    pub fn type_backspace(&self) -> Result<()> {
        self.type_key(keycode::KEY_BACKSPACE, false)
    }

    /// Type a string, stopping at the first character that fails.
    ///
    /// Characters typed before the failure stay typed.
    pub fn type_string(&self, s: &str) -> Result<()> {
        for ch in s.chars() {
            match ch {
                ' ' => self.type_space()?,
                _ => self.type_rune(ch)?,
            }
        }
        Ok(())
    }

    /// Open this keyboard's own event node and grab it, so nothing else
    /// sees what it types until the grab is released.
    pub fn grab(&self) -> Result<Grabbed> {
        let node = self.dev_node.as_ref().ok_or_else(|| {
            KbdError::GrabFailed(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no device node known for {}", self.name),
            ))
        })?;
        Grabbed::new(KeyboardDevice::open(node)?)
    }

    /// Destroy the virtual device.
    pub fn close(self) {
        log::debug!("Closing virtual keyboard device {}", self.name);
        drop(self.sink);
    }
}
