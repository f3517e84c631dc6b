//! Error types for pty allocation and configuration

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::control::ControlRequest;

/// Allocation error
///
/// Either kind is terminal for the `allocate()` call that produced it. By the
/// time the caller sees one, every handle the call opened is already closed.
#[derive(Error, Debug)]
pub enum AllocError {
    /// Opening the multiplexer or the slave device failed
    #[error("Device unavailable: {}: {source}", path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A control request on the master was rejected
    #[error("Control request {request} failed: {errno}")]
    ControlRequestFailed {
        request: ControlRequest,
        #[source]
        errno: Errno,
    },
}

impl AllocError {
    pub(crate) fn device(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AllocError::DeviceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn control(request: ControlRequest, errno: Errno) -> Self {
        AllocError::ControlRequestFailed { request, errno }
    }

    /// The underlying OS error code, if one was reported
    pub fn errno(&self) -> Option<Errno> {
        match self {
            AllocError::DeviceUnavailable { source, .. } => source.raw_os_error().map(Errno::from_raw),
            AllocError::ControlRequestFailed { errno, .. } => Some(*errno),
        }
    }

    /// Whether this is a `DeviceUnavailable` error
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, AllocError::DeviceUnavailable { .. })
    }

    /// Whether this is a `ControlRequestFailed` error
    pub fn is_control_request_failed(&self) -> bool {
        matches!(self, AllocError::ControlRequestFailed { .. })
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Result type for allocation
pub type Result<T> = std::result::Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_unavailable_errno() {
        let err = AllocError::device("/dev/ptmx", io::Error::from_raw_os_error(libc::ENOENT));
        assert!(err.is_device_unavailable());
        assert_eq!(err.errno(), Some(Errno::ENOENT));
        assert!(err.to_string().contains("/dev/ptmx"));
    }

    #[test]
    fn test_device_unavailable_without_os_code() {
        let err = AllocError::device("/dev/ptmx", io::Error::other("synthetic"));
        assert_eq!(err.errno(), None);
    }

    #[test]
    fn test_control_request_failed_errno() {
        let err = AllocError::control(ControlRequest::QueryUnitNumber, Errno::ENOTTY);
        assert!(err.is_control_request_failed());
        assert_eq!(err.errno(), Some(Errno::ENOTTY));
        assert!(err.to_string().contains("TIOCGPTN"));
    }
}
