//! Physical keyboard devices under `/dev/input`.

use crate::error::{KbdError, Result};
use crate::event::RawEvent;
use crate::reader::EventSource;
use anyhow::{anyhow, Context};
use evdev::Device;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

const DEVICE_DIR: &str = "/dev/input";

/// An open evdev node, with its fd in non-blocking mode.
pub struct KeyboardDevice {
    device: Device,
    path: PathBuf,
}

impl KeyboardDevice {
    /// Open an input device node. No capability check is made.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Separate "can't open the node" from "evdev rejected it".
        std::fs::File::open(&path).map_err(|source| KbdError::DeviceOpenFailed {
            path: path.clone(),
            source,
        })?;
        let device = Device::open(&path).map_err(|source| KbdError::DriverInitFailed {
            path: path.clone(),
            source,
        })?;
        set_nonblocking(&device).map_err(|source| KbdError::DriverInitFailed {
            path: path.clone(),
            source,
        })?;
        log::debug!("Opened {:?} ({:?})", path, device.name());
        Ok(Self { device, path })
    }

    /// Open a device node and reject it if it is not a keyboard.
    pub fn open_keyboard(path: impl AsRef<Path>) -> Result<Self> {
        let kbd = Self::open(path)?;
        if kbd.is_keyboard() {
            Ok(kbd)
        } else {
            let path = kbd.path.clone();
            kbd.close();
            Err(KbdError::NotAKeyboard(path))
        }
    }

    /// A keyboard is anything that reports a CapsLock key.
    pub fn is_keyboard(&self) -> bool {
        self.device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_CAPSLOCK))
            .unwrap_or(false)
    }

    /// Path of the device node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the device reports, if any.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Take exclusive access; no other reader sees events until [`ungrab`].
    ///
    /// [`ungrab`]: KeyboardDevice::ungrab
    pub fn grab(&mut self) -> Result<()> {
        self.device.grab().map_err(KbdError::GrabFailed)
    }

    /// Give up exclusive access taken by [`grab`](KeyboardDevice::grab).
    pub fn ungrab(&mut self) -> Result<()> {
        self.device.ungrab().map_err(KbdError::UngrabFailed)
    }

    /// Close the device node.
    pub fn close(self) {
        log::debug!("Closing {:?}", self.path);
        drop(self.device);
    }
}

impl std::fmt::Debug for KeyboardDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardDevice")
            .field("path", &self.path)
            .field("name", &self.device.name())
            .finish()
    }
}

impl EventSource for KeyboardDevice {
    fn name(&self) -> String {
        format!("{}", self.path.display())
    }

    fn fetch(&mut self) -> io::Result<Vec<RawEvent>> {
        Ok(self.device.fetch_events()?.map(RawEvent::from).collect())
    }
}

/// A grabbed device. Call [`release`](Grabbed::release) to give it back.
#[derive(Debug)]
pub struct Grabbed {
    device: KeyboardDevice,
}

impl Grabbed {
    pub(crate) fn new(mut device: KeyboardDevice) -> Result<Self> {
        device.grab()?;
        Ok(Self { device })
    }

    /// The grabbed device.
    pub fn device(&self) -> &KeyboardDevice {
        &self.device
    }

    /// Ungrab and close the device.
    pub fn release(mut self) -> Result<()> {
        let res = self.device.ungrab();
        self.device.close();
        res
    }
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    let flags = fcntl(fd, FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags))?;
    Ok(())
}

fn is_event_node(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("event"))
        .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Every `eventN` node under `/dev/input`.
pub fn input_device_paths() -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(DEVICE_DIR)? {
        let path = entry?.path();
        if is_event_node(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Lazily open every keyboard under `/dev/input`.
///
/// Devices that fail to open or are not keyboards are logged and skipped.
pub fn open_all_keyboards() -> impl Iterator<Item = KeyboardDevice> {
    log::debug!("Looking for keyboards...");
    let paths = input_device_paths().unwrap_or_else(|e| {
        log::warn!("Couldn't read {}: {}", DEVICE_DIR, e);
        Vec::new()
    });
    open_keyboards(paths)
}

/// Lazily open the keyboards among `paths`, skipping the rest.
pub fn open_keyboards(paths: Vec<PathBuf>) -> impl Iterator<Item = KeyboardDevice> {
    paths
        .into_iter()
        .filter_map(|path| match KeyboardDevice::open_keyboard(&path) {
            Ok(kbd) => {
                log::debug!("Found keyboard: {:?} at {:?}", kbd.name(), path);
                Some(kbd)
            }
            Err(KbdError::NotAKeyboard(_)) => None,
            Err(e) => {
                log::warn!("Skipping {:?}: {}", path, e);
                None
            }
        })
}

/// Open every keyboard now; fails when there are none.
pub fn find_keyboards() -> anyhow::Result<Vec<KeyboardDevice>> {
    let paths = input_device_paths().with_context(|| format!("Failed to read {}", DEVICE_DIR))?;
    let keyboards: Vec<_> = open_keyboards(paths).collect();
    if keyboards.is_empty() {
        Err(anyhow!(
            "No keyboards found. Make sure you're in the 'input' group or running as root."
        ))
    } else {
        Ok(keyboards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_event_node() {
        assert!(is_event_node(Path::new("/dev/input/event0")));
        assert!(is_event_node(Path::new("/dev/input/event12")));
        assert!(!is_event_node(Path::new("/dev/input/event")));
        assert!(!is_event_node(Path::new("/dev/input/mice")));
        assert!(!is_event_node(Path::new("/dev/input/mouse0")));
        assert!(!is_event_node(Path::new("/dev/input/event1x")));
    }

    #[test]
    fn test_open_missing_node() {
        let err = KeyboardDevice::open("/fake/path/event0").unwrap_err();
        assert!(matches!(err, KbdError::DeviceOpenFailed { .. }));
    }
}
