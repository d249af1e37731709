//! Errors returned by keyboard reading and synthesis.

use std::io;
use std::path::PathBuf;

/// Everything that can go wrong talking to keyboards.
#[derive(Debug, thiserror::Error)]
pub enum KbdError {
    #[error("failed to open input device {path:?}: {source}")]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("device {0:?} does not look like a keyboard")]
    NotAKeyboard(PathBuf),

    #[error("failed to initialise evdev on {path:?}: {source}")]
    DriverInitFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to grab device: {0}")]
    GrabFailed(#[source] io::Error),

    #[error("failed to ungrab device: {0}")]
    UngrabFailed(#[source] io::Error),

    #[error("failed to create virtual keyboard: {0}")]
    VirtualDeviceCreateFailed(String),

    #[error("failed to send event type: {event_type} code: {code} value: {value}: {source}")]
    WriteFailed {
        event_type: u16,
        code: u16,
        value: i32,
        #[source]
        source: io::Error,
    },

    #[error("character {0:?} (U+{code:04X}) is not printable", code = u32::from(*.0))]
    UnprintableCharacter(char),

    #[error("character {0:?} (U+{code:04X}) is not in the key map", code = u32::from(*.0))]
    CharacterNotMapped(char),

    #[error("privilege change failed: {0}")]
    PrivilegeFailed(String),

    #[error("key sequence delivery was cancelled")]
    Cancelled,
}

pub type Result<T, E = KbdError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_errors_show_codepoint() {
        let err = KbdError::CharacterNotMapped('é');
        assert_eq!(
            err.to_string(),
            "character 'é' (U+00E9) is not in the key map"
        );
        let err = KbdError::UnprintableCharacter('\n');
        assert!(err.to_string().contains("U+000A"));
    }

    #[test]
    fn test_write_failed_keeps_source() {
        let err = KbdError::WriteFailed {
            event_type: 1,
            code: 30,
            value: 1,
            source: io::Error::new(io::ErrorKind::InvalidInput, "bad code"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("failed to send event type: 1 code: 30 value: 1"));
    }
}
