//! Master and slave handles
//!
//! Both ends of an allocated pair are owned byte streams. Dropping a handle
//! closes its descriptor; `close` does the same explicitly. The kernel keeps
//! the pairing alive until both ends are closed.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::fcntl::{fcntl, FcntlArg, OFlag};

/// Identifier of a slave device instance (`/dev/pts/<n>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitNumber(u32);

impl UnitNumber {
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Path of the slave device under `root`
    pub fn slave_path(self, root: &Path) -> PathBuf {
        root.join(self.0.to_string())
    }
}

impl fmt::Display for UnitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for UnitNumber {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

/// An open pty master
#[derive(Debug)]
pub struct MasterHandle {
    file: File,
    unit: UnitNumber,
}

impl MasterHandle {
    pub(crate) fn new(file: File, unit: UnitNumber) -> Self {
        Self { file, unit }
    }

    /// Unit number of the slave paired with this master
    pub fn unit_number(&self) -> UnitNumber {
        self.unit
    }

    /// Path of the paired slave under `root`
    pub fn slave_path(&self, root: &Path) -> PathBuf {
        self.unit.slave_path(root)
    }

    /// Toggle `O_NONBLOCK` on the master descriptor
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
        let new_flags = if nonblocking {
            flags | OFlag::O_NONBLOCK
        } else {
            flags & !OFlag::O_NONBLOCK
        };
        fcntl(fd, FcntlArg::F_SETFL(new_flags))?;
        Ok(())
    }

    /// Duplicate the master descriptor
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            unit: self.unit,
        })
    }

    /// Close the master
    pub fn close(self) {
        drop(self.file);
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

/// An open pty slave
#[derive(Debug)]
pub struct SlaveHandle {
    file: File,
    path: PathBuf,
}

impl SlaveHandle {
    pub(crate) fn new(file: File, path: PathBuf) -> Self {
        Self { file, path }
    }

    /// The device path this slave was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
        })
    }

    /// Close the slave
    pub fn close(self) {
        drop(self.file);
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

macro_rules! impl_handle_io {
    ($handle:ty) => {
        impl Read for $handle {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.file.read(buf)
            }
        }

        impl Write for $handle {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.file.write(buf)
            }

            fn flush(&mut self) -> io::Result<()> {
                self.file.flush()
            }
        }

        impl AsFd for $handle {
            fn as_fd(&self) -> BorrowedFd<'_> {
                self.file.as_fd()
            }
        }

        impl AsRawFd for $handle {
            fn as_raw_fd(&self) -> RawFd {
                self.file.as_raw_fd()
            }
        }

        impl IntoRawFd for $handle {
            fn into_raw_fd(self) -> RawFd {
                self.file.into_raw_fd()
            }
        }

        impl From<$handle> for OwnedFd {
            fn from(handle: $handle) -> Self {
                handle.file.into()
            }
        }

        impl From<$handle> for File {
            fn from(handle: $handle) -> Self {
                handle.file
            }
        }
    };
}

impl_handle_io!(MasterHandle);
impl_handle_io!(SlaveHandle);

/// A freshly allocated master/slave pair
#[derive(Debug)]
pub struct PtyPair {
    pub master: MasterHandle,
    pub slave: SlaveHandle,
}

impl PtyPair {
    pub fn unit_number(&self) -> UnitNumber {
        self.master.unit_number()
    }

    pub fn into_parts(self) -> (MasterHandle, SlaveHandle) {
        (self.master, self.slave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unit_number_display() {
        assert_eq!(UnitNumber::new(7).to_string(), "7");
        assert_eq!(UnitNumber::from(0).get(), 0);
    }

    #[test]
    fn test_slave_path() {
        let unit = UnitNumber::new(7);
        assert_eq!(unit.slave_path(Path::new("/dev/pts")), PathBuf::from("/dev/pts/7"));
    }

    #[test]
    fn test_handles_are_byte_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3");
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();

        let mut slave = SlaveHandle::new(file, path.clone());
        slave.write_all(b"hello").unwrap();
        slave.flush().unwrap();
        assert_eq!(slave.path(), path.as_path());

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn test_master_records_unit() {
        let master = MasterHandle::new(tempfile::tempfile().unwrap(), UnitNumber::new(12));
        assert_eq!(master.unit_number(), UnitNumber::new(12));
        assert_eq!(master.slave_path(Path::new("/dev/pts")), PathBuf::from("/dev/pts/12"));

        let clone = master.try_clone().unwrap();
        assert_eq!(clone.unit_number(), master.unit_number());
        assert_ne!(clone.as_raw_fd(), master.as_raw_fd());
    }

    #[test]
    fn test_master_nonblocking_toggle() {
        let master = MasterHandle::new(tempfile::tempfile().unwrap(), UnitNumber::new(0));
        let status = || OFlag::from_bits_truncate(fcntl(master.as_raw_fd(), FcntlArg::F_GETFL).unwrap());

        master.set_nonblocking(true).unwrap();
        assert!(status().contains(OFlag::O_NONBLOCK));
        master.set_nonblocking(false).unwrap();
        assert!(!status().contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn test_into_file_keeps_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("5");
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();

        let master = MasterHandle::new(file.try_clone().unwrap(), UnitNumber::new(5));
        let master_fd = master.as_raw_fd();
        let mut master_file = master.into_file();
        assert_eq!(master_file.as_raw_fd(), master_fd);
        master_file.write_all(b"ab").unwrap();

        let slave = SlaveHandle::new(file, path.clone());
        let slave_fd = slave.as_raw_fd();
        let mut slave_file = slave.into_file();
        assert_eq!(slave_file.as_raw_fd(), slave_fd);
        slave_file.write_all(b"cd").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abcd");
    }

    #[test]
    fn test_slave_try_clone_shares_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("6");
        let file = File::create(&path).unwrap();

        let slave = SlaveHandle::new(file, path.clone());
        let clone = slave.try_clone().unwrap();
        assert_eq!(clone.path(), slave.path());
        assert_ne!(clone.as_raw_fd(), slave.as_raw_fd());

        // Closing the original leaves the duplicate usable
        slave.close();
        assert!(fcntl(clone.as_raw_fd(), FcntlArg::F_GETFD).is_ok());
    }

    proptest! {
        #[test]
        fn prop_slave_path_ends_with_unit(n in any::<u32>()) {
            let path = UnitNumber::new(n).slave_path(Path::new("/dev/pts"));
            let expected = n.to_string();
            prop_assert_eq!(path.parent(), Some(Path::new("/dev/pts")));
            prop_assert_eq!(path.file_name().and_then(|s| s.to_str()), Some(expected.as_str()));
        }
    }
}
