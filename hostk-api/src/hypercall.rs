//! Hypercall boundary
//!
//! The only operations through which the hosted kernel talks to its host.
//! Implementations live outside this workspace (a host process, a test
//! double); the emulation core consumes them as `Arc<dyn Hypercall>`.

use core::fmt;

use crate::types::{ClockKind, ExitStatus, HostTime};

/// Failure reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypercallError {
    /// The host cut a sleep short (signal delivery or similar)
    Interrupted,
    /// The requested clock is not available on this host
    Unsupported,
    /// Any other host failure, carrying the host error number
    Fault(i32),
}

impl fmt::Display for HypercallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HypercallError::Interrupted => write!(f, "interrupted"),
            HypercallError::Unsupported => write!(f, "unsupported"),
            HypercallError::Fault(errno) => write!(f, "host error {}", errno),
        }
    }
}

/// Result type for hypercalls
pub type HypercallResult<T> = core::result::Result<T, HypercallError>;

/// Host boundary consumed by the emulation core
pub trait Hypercall: Send + Sync {
    /// Reads the given clock
    fn clock_gettime(&self, kind: ClockKind) -> HypercallResult<HostTime>;

    /// Suspends the calling context.
    ///
    /// With `ClockKind::RelativeWall` the arguments are an interval; with
    /// an absolute clock they name the wakeup instant.
    fn clock_sleep(&self, kind: ClockKind, sec: u64, nsec: u32) -> HypercallResult<()>;

    /// Writes one byte to the host console
    fn write_char(&self, c: u8);

    /// Terminates the kernel process.
    ///
    /// Does not return on a real host. Test doubles may return, and callers
    /// must cope with that.
    fn terminate(&self, status: ExitStatus);
}
