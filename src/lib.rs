//! ptpair - Linux pseudoterminal pair allocation
//!
//! Opens `/dev/ptmx`, discovers and unlocks the paired slave, and opens
//! `/dev/pts/<n>`, returning both ends as owned byte streams:
//!
//! ```no_run
//! use std::io::Write;
//!
//! let pair = ptpair::allocate()?;
//! println!("slave is {}", pair.slave.path().display());
//! let (mut master, _slave) = pair.into_parts();
//! master.write_all(b"hello\n")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Line-discipline setup, controlling-terminal attachment and I/O forwarding
//! are left to the host.
//!
//! Reference: https://man7.org/linux/man-pages/man4/ptmx.4.html

pub mod allocator;
pub mod config;
pub mod control;
pub mod error;
pub mod handle;

pub use allocator::{allocate, PtyAllocator};
pub use config::AllocatorConfig;
pub use control::{ControlRequest, KernelControl, PtyControl};
pub use error::{AllocError, ConfigError, Result};
pub use handle::{MasterHandle, PtyPair, SlaveHandle, UnitNumber};
