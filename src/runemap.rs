//! US-QWERTY scan code <-> character map.

use crate::error::{KbdError, Result};
use crate::modifiers::Modifiers;

/// Kernel key codes the crate refers to by name.
pub mod keycode {
    pub const KEY_BACKSPACE: u16 = 14;
    pub const KEY_LEFTCTRL: u16 = 29;
    pub const KEY_LEFTSHIFT: u16 = 42;
    pub const KEY_RIGHTSHIFT: u16 = 54;
    pub const KEY_LEFTALT: u16 = 56;
    pub const KEY_SPACE: u16 = 57;
    pub const KEY_CAPSLOCK: u16 = 58;
    pub const KEY_RIGHTCTRL: u16 = 97;
    pub const KEY_RIGHTALT: u16 = 100;
    pub const KEY_LEFTMETA: u16 = 125;
    pub const KEY_RIGHTMETA: u16 = 126;
}

/// Lower and upper case characters produced by one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharVariants {
    pub lower: char,
    pub upper: char,
}

const fn cv(lower: char, upper: char) -> CharVariants {
    CharVariants { lower, upper }
}

static RUNE_MAP: [(u16, CharVariants); 51] = [
    (2, cv('1', '!')),
    (3, cv('2', '@')),
    (4, cv('3', '#')),
    (5, cv('4', '$')),
    (6, cv('5', '%')),
    (7, cv('6', '^')),
    (8, cv('7', '&')),
    (9, cv('8', '*')),
    (10, cv('9', '(')),
    (11, cv('0', ')')),
    (12, cv('-', '_')),
    (13, cv('=', '+')),
    (14, cv('\u{8}', '\u{8}')),
    (15, cv('\t', '\t')),
    (16, cv('q', 'Q')),
    (17, cv('w', 'W')),
    (18, cv('e', 'E')),
    (19, cv('r', 'R')),
    (20, cv('t', 'T')),
    (21, cv('y', 'Y')),
    (22, cv('u', 'U')),
    (23, cv('i', 'I')),
    (24, cv('o', 'O')),
    (25, cv('p', 'P')),
    (26, cv('[', '{')),
    (27, cv(']', '}')),
    (28, cv('\n', '\n')),
    (30, cv('a', 'A')),
    (31, cv('s', 'S')),
    (32, cv('d', 'D')),
    (33, cv('f', 'F')),
    (34, cv('g', 'G')),
    (35, cv('h', 'H')),
    (36, cv('j', 'J')),
    (37, cv('k', 'K')),
    (38, cv('l', 'L')),
    (39, cv(';', ':')),
    (40, cv('\'', '"')),
    (41, cv('`', '~')),
    (43, cv('\\', '|')),
    (44, cv('z', 'Z')),
    (45, cv('x', 'X')),
    (46, cv('c', 'C')),
    (47, cv('v', 'V')),
    (48, cv('b', 'B')),
    (49, cv('n', 'N')),
    (50, cv('m', 'M')),
    (51, cv(',', '<')),
    (52, cv('.', '>')),
    (53, cv('/', '?')),
    (57, cv(' ', ' ')),
];

fn entries() -> impl Iterator<Item = &'static (u16, CharVariants)> {
    RUNE_MAP.iter()
}

/// Every scan code that has a character mapping.
pub fn codes() -> impl Iterator<Item = u16> {
    entries().map(|(code, _)| *code)
}

/// Character variants for a scan code, if it is mapped.
pub fn variants(code: u16) -> Option<CharVariants> {
    entries().find(|(c, _)| *c == code).map(|(_, v)| *v)
}

/// Find the scan code for a character and whether Shift is needed to type it.
pub fn resolve(ch: char) -> Result<(u16, bool)> {
    for (code, v) in entries() {
        if ch == v.lower {
            return Ok((*code, false));
        }
        if ch == v.upper {
            return Ok((*code, true));
        }
    }
    Err(KbdError::CharacterNotMapped(ch))
}

/// Character produced by a scan code under the given modifier state.
///
/// Shift or CapsLock select the upper case variant. Unmapped codes have no
/// character.
pub fn decode(code: u16, modifiers: &Modifiers) -> Option<char> {
    let v = variants(code)?;
    if modifiers.shift || modifiers.caps_lock {
        Some(v.upper)
    } else {
        Some(v.lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_round_trip() {
        let none = Modifiers::default();
        for code in codes() {
            let ch = decode(code, &none).unwrap();
            assert_eq!(resolve(ch).unwrap(), (code, false), "code {}", code);
        }
    }

    #[test]
    fn test_shift_and_capslock_select_upper() {
        let shift = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        let caps = Modifiers {
            caps_lock: true,
            ..Modifiers::default()
        };
        for code in codes() {
            let upper = variants(code).unwrap().upper;
            assert_eq!(decode(code, &shift), Some(upper));
            assert_eq!(decode(code, &caps), Some(upper));
        }
    }

    #[test]
    fn test_resolve_upper_needs_shift() {
        assert_eq!(resolve('H').unwrap(), (35, true));
        assert_eq!(resolve('h').unwrap(), (35, false));
        assert_eq!(resolve('!').unwrap(), (2, true));
        assert_eq!(resolve(' ').unwrap(), (keycode::KEY_SPACE, false));
        assert_eq!(resolve('\u{8}').unwrap(), (keycode::KEY_BACKSPACE, false));
    }

    #[test]
    fn test_resolve_unmapped() {
        assert!(matches!(resolve('é'), Err(KbdError::CharacterNotMapped('é'))));
        assert!(matches!(resolve('€'), Err(KbdError::CharacterNotMapped(_))));
    }

    #[test]
    fn test_decode_unmapped_code() {
        assert_eq!(decode(0, &Modifiers::default()), None);
        assert_eq!(decode(keycode::KEY_CAPSLOCK, &Modifiers::default()), None);
    }

    #[test]
    fn test_each_char_maps_to_one_code() {
        let lowers: Vec<char> = codes().map(|c| variants(c).unwrap().lower).collect();
        let mut dedup = lowers.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(lowers.len(), dedup.len());
    }
}
