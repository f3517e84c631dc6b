//! Typed control requests on a pty master
//!
//! The kernel exposes slave discovery and unlocking as ioctls on the master
//! descriptor. `PtyControl` wraps the two requests the allocator needs so all
//! payload marshaling stays in one place.
//!
//! # References
//!
//! - ioctl_tty(2): https://man7.org/linux/man-pages/man2/ioctl_tty.2.html
//! - pts(4): https://man7.org/linux/man-pages/man4/pts.4.html

use std::fmt;
use std::os::fd::BorrowedFd;

use nix::errno::Errno;

use crate::handle::UnitNumber;

/// The control requests issued during allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRequest {
    /// Read the slave unit number (`TIOCGPTN`)
    QueryUnitNumber,
    /// Set or clear the slave lock flag (`TIOCSPTLCK`)
    SetLock,
}

impl ControlRequest {
    /// Conventional name of the ioctl behind this request
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::QueryUnitNumber => "TIOCGPTN",
            ControlRequest::SetLock => "TIOCSPTLCK",
        }
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control-channel operations on an open master
pub trait PtyControl {
    /// Ask the master which slave unit it is paired with
    fn query_unit_number(&self, master: BorrowedFd<'_>) -> Result<UnitNumber, Errno>;

    /// Set (`true`) or clear (`false`) the slave lock flag
    fn set_lock(&self, master: BorrowedFd<'_>, locked: bool) -> Result<(), Errno>;
}

impl<T: PtyControl + ?Sized> PtyControl for &T {
    fn query_unit_number(&self, master: BorrowedFd<'_>) -> Result<UnitNumber, Errno> {
        (**self).query_unit_number(master)
    }

    fn set_lock(&self, master: BorrowedFd<'_>, locked: bool) -> Result<(), Errno> {
        (**self).set_lock(master, locked)
    }
}

/// `PtyControl` backed by the kernel's devpts ioctls
///
/// On targets without `TIOCGPTN`/`TIOCSPTLCK` both requests fail with
/// `ENOSYS`, which surfaces as `ControlRequestFailed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelControl;

impl PtyControl for KernelControl {
    #[cfg(target_os = "linux")]
    fn query_unit_number(&self, master: BorrowedFd<'_>) -> Result<UnitNumber, Errno> {
        use std::os::fd::AsRawFd;

        let mut unit: libc::c_uint = 0;
        // SAFETY: TIOCGPTN writes a single unsigned int through the pointer,
        // which refers to `unit` for the duration of the call
        let ret = unsafe {
            libc::ioctl(
                master.as_raw_fd(),
                libc::TIOCGPTN,
                &mut unit as *mut libc::c_uint,
            )
        };
        Errno::result(ret)?;
        Ok(UnitNumber::new(unit))
    }

    #[cfg(not(target_os = "linux"))]
    fn query_unit_number(&self, _master: BorrowedFd<'_>) -> Result<UnitNumber, Errno> {
        Err(Errno::ENOSYS)
    }

    #[cfg(target_os = "linux")]
    fn set_lock(&self, master: BorrowedFd<'_>, locked: bool) -> Result<(), Errno> {
        use std::os::fd::AsRawFd;

        let flag = libc::c_int::from(locked);
        // SAFETY: TIOCSPTLCK reads a single int through the pointer, which
        // refers to `flag` for the duration of the call
        let ret = unsafe {
            libc::ioctl(
                master.as_raw_fd(),
                libc::TIOCSPTLCK,
                &flag as *const libc::c_int,
            )
        };
        Errno::result(ret).map(drop)
    }

    #[cfg(not(target_os = "linux"))]
    fn set_lock(&self, _master: BorrowedFd<'_>, _locked: bool) -> Result<(), Errno> {
        Err(Errno::ENOSYS)
    }
}
