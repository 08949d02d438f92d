//! Optional collaborator interfaces
//!
//! Each trait names one capability that a separately composed component
//! may provide. When the component is absent the emulation core falls back
//! to a neutral built-in implementation, so none of these are required.

use crate::error::Result;
use crate::types::{ControlContext, MountId, TtyId};

/// Flushes file system state before the kernel goes down
pub trait FsFlush: Send + Sync {
    fn flush(&self);
}

/// File system transaction tracking around I/O
pub trait IoTransaction: Send + Sync {
    /// Enters a transaction, blocking if the mount is suspended
    fn start(&self, mount: MountId);

    /// Enters a transaction without blocking.
    ///
    /// Returns `Err(Error::WouldBlock)` when the mount is suspended.
    fn start_nowait(&self, mount: MountId) -> Result<()>;

    /// Leaves a transaction
    fn done(&self, mount: MountId);
}

/// Output queue back-pressure check for terminals
pub trait OutputQueue: Send + Sync {
    /// Returns `true` when output may proceed.
    ///
    /// With `wait` set the implementation may block until the queue drains.
    fn check_output_queue(&self, tty: Option<TtyId>, wait: bool) -> bool;
}

/// Character output used by the kernel's formatted printing
pub trait CharOutput: Send + Sync {
    fn put_char(&self, tty: Option<TtyId>, c: u8) -> Result<()>;
}

/// Remote-session (system call proxy) component
pub trait RemoteSession: Send + Sync {
    /// Tells the session layer the kernel is finalizing.
    ///
    /// `ctl` is `None` when the finalizing caller is the local process.
    fn fini(&self, ctl: Option<ControlContext>);
}
