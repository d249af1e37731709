//! Modifier key state tracked per physical keyboard.

use crate::runemap::keycode::*;

/// State of the modifier keys on one keyboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub caps_lock: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Which modifier a key code belongs to. Left and right keys are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    CapsLock,
    Shift,
    Ctrl,
    Alt,
    Meta,
}

impl ModifierKey {
    /// Classify a `EV_KEY` code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            KEY_CAPSLOCK => Some(ModifierKey::CapsLock),
            KEY_LEFTSHIFT | KEY_RIGHTSHIFT => Some(ModifierKey::Shift),
            KEY_LEFTCTRL | KEY_RIGHTCTRL => Some(ModifierKey::Ctrl),
            KEY_LEFTALT | KEY_RIGHTALT => Some(ModifierKey::Alt),
            KEY_LEFTMETA | KEY_RIGHTMETA => Some(ModifierKey::Meta),
            _ => None,
        }
    }
}

/// How key transitions update [`Modifiers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModifierTracking {
    /// Every press and every release flips the flag. A clean tap flips it
    /// twice and leaves it unchanged; only a lost or reordered event leaves
    /// the state out of step with the hardware.
    #[default]
    Toggle,
    /// Press sets and release clears Shift/Ctrl/Alt/Meta. CapsLock flips on
    /// press only, like the keyboard LED.
    Latch,
}

impl Modifiers {
    /// All modifiers released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the CapsLock flag.
    pub fn toggle_caps_lock(&mut self) {
        self.caps_lock = !self.caps_lock;
    }

    /// Flip the Shift flag.
    pub fn toggle_shift(&mut self) {
        self.shift = !self.shift;
    }

    /// Flip the Ctrl flag.
    pub fn toggle_ctrl(&mut self) {
        self.ctrl = !self.ctrl;
    }

    /// Flip the Alt flag.
    pub fn toggle_alt(&mut self) {
        self.alt = !self.alt;
    }

    /// Flip the Meta flag.
    pub fn toggle_meta(&mut self) {
        self.meta = !self.meta;
    }

    fn toggle(&mut self, key: ModifierKey) {
        match key {
            ModifierKey::CapsLock => self.toggle_caps_lock(),
            ModifierKey::Shift => self.toggle_shift(),
            ModifierKey::Ctrl => self.toggle_ctrl(),
            ModifierKey::Alt => self.toggle_alt(),
            ModifierKey::Meta => self.toggle_meta(),
        }
    }

    fn flag_mut(&mut self, key: ModifierKey) -> &mut bool {
        match key {
            ModifierKey::CapsLock => &mut self.caps_lock,
            ModifierKey::Shift => &mut self.shift,
            ModifierKey::Ctrl => &mut self.ctrl,
            ModifierKey::Alt => &mut self.alt,
            ModifierKey::Meta => &mut self.meta,
        }
    }

    /// Feed one `EV_KEY` transition through the tracking policy.
    ///
    /// Autorepeat (value 2) never changes state. Returns true if the code
    /// was a modifier.
    pub fn observe(&mut self, code: u16, value: i32, tracking: ModifierTracking) -> bool {
        let Some(key) = ModifierKey::from_code(code) else {
            return false;
        };
        if value == 2 {
            return true;
        }
        match tracking {
            ModifierTracking::Toggle => self.toggle(key),
            ModifierTracking::Latch => match (key, value) {
                (ModifierKey::CapsLock, 1) => self.toggle_caps_lock(),
                (ModifierKey::CapsLock, _) => {}
                (key, 1) => *self.flag_mut(key) = true,
                (key, 0) => *self.flag_mut(key) = false,
                _ => {}
            },
        }
        true
    }
}
