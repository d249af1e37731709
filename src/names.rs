//! Kernel names for event types and codes, e.g. `EV_KEY` / `KEY_A`.

use crate::action::{EV_KEY, EV_REL, EV_REP, EV_SYN};

const EV_ABS: u16 = 0x03;
const EV_MSC: u16 = 0x04;
const EV_SW: u16 = 0x05;
const EV_LED: u16 = 0x11;
const EV_SND: u16 = 0x12;
const EV_FF: u16 = 0x15;
const EV_PWR: u16 = 0x16;
const EV_FF_STATUS: u16 = 0x17;

/// Name of an event type, `"EV_UNKNOWN"` if it is not one the kernel defines.
pub fn type_name(event_type: u16) -> &'static str {
    match event_type {
        EV_SYN => "EV_SYN",
        EV_KEY => "EV_KEY",
        EV_REL => "EV_REL",
        EV_ABS => "EV_ABS",
        EV_MSC => "EV_MSC",
        EV_SW => "EV_SW",
        EV_LED => "EV_LED",
        EV_SND => "EV_SND",
        EV_REP => "EV_REP",
        EV_FF => "EV_FF",
        EV_PWR => "EV_PWR",
        EV_FF_STATUS => "EV_FF_STATUS",
        _ => "EV_UNKNOWN",
    }
}

/// Name of an event code within its type.
///
/// Codes the kernel headers do not name come back as `"UNKNOWN"`; codes of
/// unnamed types as their number.
pub fn code_name(event_type: u16, code: u16) -> String {
    let name = match event_type {
        EV_SYN => format!("{:?}", evdev::Synchronization(code)),
        EV_KEY => format!("{:?}", evdev::Key::new(code)),
        EV_REL => format!("{:?}", evdev::RelativeAxisType(code)),
        EV_ABS => format!("{:?}", evdev::AbsoluteAxisType(code)),
        EV_MSC => format!("{:?}", evdev::MiscType(code)),
        EV_SW => format!("{:?}", evdev::SwitchType(code)),
        EV_LED => format!("{:?}", evdev::LedType(code)),
        EV_SND => format!("{:?}", evdev::SoundType(code)),
        _ => return format!("{}", code),
    };
    if is_kernel_token(&name) {
        name
    } else {
        "UNKNOWN".to_string()
    }
}

/// evdev falls back to text like `unknown key: 767` for unnamed codes.
fn is_kernel_token(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(EV_KEY), "EV_KEY");
        assert_eq!(type_name(EV_SYN), "EV_SYN");
        assert_eq!(type_name(EV_MSC), "EV_MSC");
        assert_eq!(type_name(0x1f), "EV_UNKNOWN");
    }

    #[test]
    fn test_code_names() {
        assert_eq!(code_name(EV_KEY, 30), "KEY_A");
        assert_eq!(code_name(EV_KEY, 14), "KEY_BACKSPACE");
        assert_eq!(code_name(EV_KEY, 42), "KEY_LEFTSHIFT");
        assert_eq!(code_name(EV_SYN, 0), "SYN_REPORT");
        assert_eq!(code_name(EV_MSC, 4), "MSC_SCAN");
    }

    #[test]
    fn test_unnamed_codes() {
        assert_eq!(code_name(EV_KEY, 767), "UNKNOWN");
        assert_eq!(code_name(0x1f, 3), "3");
        assert!(!is_kernel_token("unknown key: 767"));
        assert!(is_kernel_token("BTN_LEFT"));
    }
}
