//! Scoped privilege elevation for creating uinput devices.
//!
//! Creating a virtual device needs write access to `/dev/uinput`, which
//! usually means root. A setuid-root binary can raise its effective ids
//! for that window and drop back afterwards, keeping membership of the
//! `input` group so it can still use the device.

use crate::error::{KbdError, Result};
use nix::unistd::{getegid, geteuid, getgid, getuid, setegid, seteuid, setgroups, Gid, Group, Uid};

/// A capability to temporarily run with elevated privileges.
pub trait Privilege {
    /// Raise privileges.
    fn elevate(&self) -> Result<()>;

    /// Return to the original identity.
    fn restore(&self) -> Result<()>;
}

/// Run `f` with elevated privileges, restoring them on every exit path,
/// including a failed elevation and a panic inside `f`.
pub fn with_elevated_privilege<P, T, F>(privilege: &P, f: F) -> Result<T>
where
    P: Privilege + ?Sized,
    F: FnOnce() -> Result<T>,
{
    let mut guard = Elevated {
        privilege,
        restored: false,
    };
    if let Err(e) = privilege.elevate() {
        guard.restore()?;
        return Err(e);
    }
    let res = f();
    guard.restore()?;
    res
}

struct Elevated<'a, P: Privilege + ?Sized> {
    privilege: &'a P,
    restored: bool,
}

impl<P: Privilege + ?Sized> Elevated<'_, P> {
    fn restore(&mut self) -> Result<()> {
        self.restored = true;
        self.privilege.restore()
    }
}

impl<P: Privilege + ?Sized> Drop for Elevated<'_, P> {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = self.privilege.restore() {
                log::error!("Unable to drop privileges: {}", e);
            }
        }
    }
}

/// For processes that already have the access they need.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoElevation;

impl Privilege for NoElevation {
    fn elevate(&self) -> Result<()> {
        Ok(())
    }

    fn restore(&self) -> Result<()> {
        Ok(())
    }
}

/// A user and group identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: Uid,
    pub gid: Gid,
}

impl Identity {
    /// The real (invoking) user of this process.
    pub fn real() -> Self {
        Self {
            uid: getuid(),
            gid: getgid(),
        }
    }

    /// The effective user of this process.
    pub fn effective() -> Self {
        Self {
            uid: geteuid(),
            gid: getegid(),
        }
    }

    /// uid 0, gid 0.
    pub fn root() -> Self {
        Self {
            uid: Uid::from_raw(0),
            gid: Gid::from_raw(0),
        }
    }
}

/// Switches effective ids to root and back to `original`, with
/// `extra_groups` as the supplementary groups afterwards.
#[derive(Debug, Clone)]
pub struct SetIdPrivilege {
    original: Identity,
    extra_groups: Vec<Gid>,
}

impl SetIdPrivilege {
    /// Restore to `original` with `extra_groups` after each elevation.
    pub fn new(original: Identity, extra_groups: Vec<Gid>) -> Self {
        Self {
            original,
            extra_groups,
        }
    }

    /// Drop back to the invoking user, keeping the `input` group if it exists.
    pub fn for_invoking_user() -> Result<Self> {
        let input = Group::from_name("input")
            .map_err(|e| KbdError::PrivilegeFailed(format!("looking up input group: {}", e)))?;
        let extra_groups = input.map(|g| vec![g.gid]).unwrap_or_default();
        Ok(Self::new(Identity::real(), extra_groups))
    }

    /// Identity restored after elevation.
    pub fn original(&self) -> Identity {
        self.original
    }

    /// Switch effective ids to `original` and set the supplementary groups.
    pub fn drop_to(original: Identity, extra_groups: &[Gid]) -> Result<()> {
        // setgroups needs root, so it goes before giving up the uid.
        if geteuid().is_root() {
            setgroups(extra_groups)
                .map_err(|e| KbdError::PrivilegeFailed(format!("setgroups: {}", e)))?;
        }
        setegid(original.gid)
            .map_err(|e| KbdError::PrivilegeFailed(format!("setegid({}): {}", original.gid, e)))?;
        seteuid(original.uid)
            .map_err(|e| KbdError::PrivilegeFailed(format!("seteuid({}): {}", original.uid, e)))?;
        log::debug!("Dropped privileges to uid {} gid {}", original.uid, original.gid);
        Ok(())
    }
}

impl Privilege for SetIdPrivilege {
    fn elevate(&self) -> Result<()> {
        let root = Identity::root();
        seteuid(root.uid)
            .map_err(|e| KbdError::PrivilegeFailed(format!("unable to raise uid to root: {}", e)))?;
        setegid(root.gid)
            .map_err(|e| KbdError::PrivilegeFailed(format!("unable to raise gid to root: {}", e)))?;
        log::debug!("Raised privileges to root");
        Ok(())
    }

    fn restore(&self) -> Result<()> {
        Self::drop_to(self.original, &self.extra_groups)
    }
}
