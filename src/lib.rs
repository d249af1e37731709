//! Linux keyboard toolkit built on evdev and uinput.
//!
//! This crate reads physical keyboards under `/dev/input` and decodes their
//! events into key presses, releases and holds with the character each key
//! produces. It can also create a virtual keyboard and type characters and
//! strings through it.
//!
//! # Features
//!
//! - **Multi-keyboard snooping** - One reader thread per device, merged into a single stream
//! - **Modifier-aware decoding** - Shift and CapsLock pick the upper case character
//! - **Virtual keyboard** - Type keys, characters and strings via uinput
//! - **Exclusive access** - Grab a device so nothing else sees its events
//! - **Scoped privileges** - Raise privileges only while creating the uinput device
//!
//! Only a fixed US-QWERTY map is supported.
//!
//! # Example
//!
//! ```no_run
//! use evkbd::{snoop_all_keyboards, VirtualKeyboardBuilder};
//! use std::time::Duration;
//!
//! fn main() -> anyhow::Result<()> {
//!     let kbd = VirtualKeyboardBuilder::new("evkbd demo").build()?;
//!     kbd.type_string("Hello there!")?;
//!     kbd.close();
//!
//!     let handle = snoop_all_keyboards();
//!     while let Ok(event) = handle.recv_timeout(Duration::from_secs(5)) {
//!         if event.is_key_press() {
//!             println!("{}", event);
//!         }
//!     }
//!     // Readers stop when `handle` is dropped
//!     Ok(())
//! }
//! ```
//!
//! # Linux Requirements
//!
//! Reading `/dev/input/event*` needs root or membership of the `input`
//! group. Creating a virtual keyboard needs write access to `/dev/uinput`;
//! see [`SetIdPrivilege`] for raising privileges just for that step.

mod action;
mod cancel;
mod error;
mod modifiers;
pub mod runemap;
mod sequencer;

#[cfg(target_os = "linux")]
mod aggregator;
#[cfg(target_os = "linux")]
mod device;
#[cfg(target_os = "linux")]
mod event;
#[cfg(target_os = "linux")]
mod names;
#[cfg(target_os = "linux")]
mod privilege;
#[cfg(target_os = "linux")]
mod reader;
#[cfg(target_os = "linux")]
mod virtual_keyboard;

pub use action::{KeyAction, KeySequence, EV_KEY, EV_REL, EV_REP, EV_SYN, SYN_REPORT};
pub use cancel::CancelToken;
pub use error::{KbdError, Result};
pub use modifiers::{ModifierKey, ModifierTracking, Modifiers};
pub use runemap::{keycode, CharVariants};
pub use sequencer::{EventSink, KeySequencer};

#[cfg(target_os = "linux")]
pub use aggregator::{snoop_all_keyboards, snoop_keyboard, SnoopBuilder, SnoopHandle};
#[cfg(target_os = "linux")]
pub use device::{
    find_keyboards, input_device_paths, open_all_keyboards, open_keyboards, Grabbed,
    KeyboardDevice,
};
#[cfg(target_os = "linux")]
pub use event::{KeyEvent, RawEvent};
#[cfg(target_os = "linux")]
pub use names::{code_name, type_name};
#[cfg(target_os = "linux")]
pub use privilege::{with_elevated_privilege, Identity, NoElevation, Privilege, SetIdPrivilege};
#[cfg(target_os = "linux")]
pub use reader::{EventSource, KeyboardReader};
#[cfg(target_os = "linux")]
pub use virtual_keyboard::{supported_codes, UinputSink, VirtualKeyboard, VirtualKeyboardBuilder};
