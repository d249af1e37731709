//! Atomic key actions and ordered sequences of them.

use crate::runemap::keycode::KEY_LEFTSHIFT;

/// `EV_SYN` event type.
pub const EV_SYN: u16 = 0x00;
/// `EV_KEY` event type.
pub const EV_KEY: u16 = 0x01;
/// `EV_REL` event type.
pub const EV_REL: u16 = 0x02;
/// `EV_REP` event type.
pub const EV_REP: u16 = 0x14;
/// `SYN_REPORT` code.
pub const SYN_REPORT: u16 = 0;

/// One low-level step sent to a virtual keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Press(u16),
    Release(u16),
    Sync,
}

impl KeyAction {
    /// The raw `(type, code, value)` triple for this action.
    pub fn raw(self) -> (u16, u16, i32) {
        match self {
            KeyAction::Press(code) => (EV_KEY, code, 1),
            KeyAction::Release(code) => (EV_KEY, code, 0),
            KeyAction::Sync => (EV_SYN, SYN_REPORT, 0),
        }
    }
}

/// An ordered list of actions delivered as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySequence {
    actions: Vec<KeyAction>,
}

impl KeySequence {
    /// Empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key press followed by a sync.
    pub fn press(mut self, code: u16) -> Self {
        self.actions.push(KeyAction::Press(code));
        self.actions.push(KeyAction::Sync);
        self
    }

    /// Append a key release followed by a sync.
    pub fn release(mut self, code: u16) -> Self {
        self.actions.push(KeyAction::Release(code));
        self.actions.push(KeyAction::Sync);
        self
    }

    /// Append a bare action.
    pub fn push(mut self, action: KeyAction) -> Self {
        self.actions.push(action);
        self
    }

    /// press, sync, release, sync
    pub fn tap(code: u16) -> Self {
        Self::new().press(code).release(code)
    }

    /// A tap bracketed by the left Shift key.
    pub fn shifted_tap(code: u16) -> Self {
        Self::new()
            .press(KEY_LEFTSHIFT)
            .press(code)
            .release(code)
            .release(KEY_LEFTSHIFT)
    }

    /// The actions in delivery order.
    pub fn actions(&self) -> &[KeyAction] {
        &self.actions
    }

    /// Number of actions, syncs included.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl IntoIterator for KeySequence {
    type Item = KeyAction;
    type IntoIter = std::vec::IntoIter<KeyAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use KeyAction::*;

    #[test]
    fn test_tap() {
        assert_eq!(KeySequence::tap(30).actions(), &[Press(30), Sync, Release(30), Sync]);
    }

    #[test]
    fn test_shifted_tap_order() {
        let seq = KeySequence::shifted_tap(35);
        assert_eq!(
            seq.actions(),
            &[
                Press(KEY_LEFTSHIFT),
                Sync,
                Press(35),
                Sync,
                Release(35),
                Sync,
                Release(KEY_LEFTSHIFT),
                Sync,
            ]
        );
        assert_eq!(seq.len(), 8);
    }

    #[test]
    fn test_raw_triples() {
        assert_eq!(Press(30).raw(), (EV_KEY, 30, 1));
        assert_eq!(Release(30).raw(), (EV_KEY, 30, 0));
        assert_eq!(Sync.raw(), (EV_SYN, SYN_REPORT, 0));
    }
}
