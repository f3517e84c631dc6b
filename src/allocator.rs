//! Pty pair allocation
//!
//! Allocation is a fixed sequence against the devpts subsystem:
//!
//! 1. open the multiplexer (`/dev/ptmx`), which creates a locked pair
//! 2. `TIOCGPTN` to learn the slave unit number
//! 3. `TIOCSPTLCK` with 0 to unlock the slave
//! 4. open `/dev/pts/<unit>` with `O_NOCTTY`
//!
//! Each step is a single attempt. If any step after the first fails, the
//! master is closed before the error is returned, so callers never receive a
//! half-open pair.
//!
//! # References
//!
//! - ptmx(4): https://man7.org/linux/man-pages/man4/ptmx.4.html
//! - unlockpt(3): https://man7.org/linux/man-pages/man3/unlockpt.3.html

use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::config::AllocatorConfig;
use crate::control::{ControlRequest, KernelControl, PtyControl};
use crate::error::{AllocError, Result};
use crate::handle::{MasterHandle, PtyPair, SlaveHandle};

/// Allocates master/slave pty pairs
#[derive(Debug, Clone)]
pub struct PtyAllocator<C = KernelControl> {
    config: AllocatorConfig,
    control: C,
}

impl PtyAllocator<KernelControl> {
    /// Allocator using the kernel ioctls and the default device paths
    pub fn new() -> Self {
        Self::with_config(AllocatorConfig::default())
    }

    pub fn with_config(config: AllocatorConfig) -> Self {
        Self::with_control(config, KernelControl)
    }
}

impl Default for PtyAllocator<KernelControl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PtyControl> PtyAllocator<C> {
    /// Allocator issuing control requests through `control`
    pub fn with_control(config: AllocatorConfig, control: C) -> Self {
        Self { config, control }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    /// Allocate a fresh pty pair
    ///
    /// On success both handles belong to the caller. On error nothing opened
    /// by this call is left open.
    pub fn allocate(&self) -> Result<PtyPair> {
        let multiplexer = &self.config.multiplexer_path;
        let master = open_device(multiplexer)?;
        tracing::trace!(path = %multiplexer.display(), fd = master.as_raw_fd(), "opened multiplexer");

        let unit = match self.control.query_unit_number(master.as_fd()) {
            Ok(unit) => unit,
            Err(errno) => {
                let err = AllocError::control(ControlRequest::QueryUnitNumber, errno);
                return Err(release_on_error(master, err));
            },
        };
        tracing::trace!(%unit, "slave unit number");

        if let Err(errno) = self.control.set_lock(master.as_fd(), false) {
            let err = AllocError::control(ControlRequest::SetLock, errno);
            return Err(release_on_error(master, err));
        }

        // The slave must not be opened before the unlock above succeeds
        let slave_path = unit.slave_path(&self.config.slave_root);
        let slave = match open_device(&slave_path) {
            Ok(slave) => slave,
            Err(err) => return Err(release_on_error(master, err)),
        };

        tracing::debug!(%unit, slave = %slave_path.display(), "allocated pty pair");

        Ok(PtyPair {
            master: MasterHandle::new(master, unit),
            slave: SlaveHandle::new(slave, slave_path),
        })
    }
}

/// Allocate a pair with the kernel ioctls and default device paths
pub fn allocate() -> Result<PtyPair> {
    PtyAllocator::new().allocate()
}

/// Open a pty device read-write without acquiring a controlling terminal
fn open_device(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
        .map_err(|e| AllocError::device(path, e))
}

/// Close the master and hand back the error that caused the abort
fn release_on_error(master: File, err: AllocError) -> AllocError {
    tracing::trace!(fd = master.as_raw_fd(), error = %err, "closing multiplexer after failed allocation");
    drop(master);
    err
}
