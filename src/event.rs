//! Raw and decoded keyboard events.

use crate::action::EV_KEY;
use crate::modifiers::Modifiers;
use crate::names;
use crate::runemap;
use std::fmt;

/// A raw `input_event` record without its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    /// Create a raw event.
    pub fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    /// Shorthand for an `EV_KEY` event.
    pub fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }
}

impl From<evdev::InputEvent> for RawEvent {
    fn from(ev: evdev::InputEvent) -> Self {
        Self::new(ev.event_type().0, ev.code(), ev.value())
    }
}

/// A decoded event as seen by consumers of a keyboard.
///
/// `rune` is resolved when the event is built, from the modifier state the
/// device had at that moment. Only mapped `EV_KEY` codes carry a rune.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub raw: RawEvent,
    /// 0 release, 1 press, 2 autorepeat.
    pub value: i32,
    pub type_name: &'static str,
    pub event_name: String,
    pub rune: Option<char>,
}

impl KeyEvent {
    /// Decode `raw` using the device's current modifier state.
    pub fn new(raw: RawEvent, modifiers: &Modifiers) -> Self {
        let rune = if raw.event_type == EV_KEY {
            runemap::decode(raw.code, modifiers)
        } else {
            None
        };
        Self {
            raw,
            value: raw.value,
            type_name: names::type_name(raw.event_type),
            event_name: names::code_name(raw.event_type, raw.code),
            rune,
        }
    }

    /// Kernel event code, e.g. the scan code of a key.
    pub fn code(&self) -> u16 {
        self.raw.code
    }

    /// Key went down.
    pub fn is_key_press(&self) -> bool {
        self.value == 1 && self.raw.event_type == EV_KEY
    }

    /// Key came up.
    pub fn is_key_release(&self) -> bool {
        self.value == 0 && self.raw.event_type == EV_KEY
    }

    /// Key held down long enough to autorepeat.
    pub fn is_key_hold(&self) -> bool {
        self.value == 2 && self.raw.event_type == EV_KEY
    }

    /// Event is for the Backspace key.
    pub fn is_backspace(&self) -> bool {
        self.event_name == "KEY_BACKSPACE"
    }

    /// Ctrl, Alt, Meta or Shift on either side.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self.event_name.as_str(),
            "KEY_LEFTCTRL"
                | "KEY_RIGHTCTRL"
                | "KEY_LEFTALT"
                | "KEY_RIGHTALT"
                | "KEY_LEFTMETA"
                | "KEY_RIGHTMETA"
                | "KEY_LEFTSHIFT"
                | "KEY_RIGHTSHIFT"
        )
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.type_name, self.event_name, self.value)?;
        match self.rune {
            Some(r) if !r.is_control() => write!(f, " '{}'", r),
            Some(r) => write!(f, " {:?}", r),
            None => Ok(()),
        }
    }
}
