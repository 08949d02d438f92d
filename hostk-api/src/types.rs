//! Core types shared across the hypercall boundary

use core::fmt;

/// Virtual address type
pub type VirtAddr = usize;

/// Virtual size type
pub type VirtSize = usize;

/// Time in microseconds
pub type Microseconds = u64;

/// Kernel clock ticks
pub type Ticks = u64;

/// Nanoseconds in one second
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Microseconds in one second
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Clock sources offered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockKind {
    /// Absolute monotonic time, never steps backwards on a sane host
    Monotonic,
    /// Absolute wall-clock time
    WallClock,
    /// Relative wall-clock interval, only meaningful for sleeping
    RelativeWall,
}

/// A raw time value as reported by the host.
///
/// Nothing guarantees `nsec < 1e9` here; the emulation core normalizes
/// host values before using them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostTime {
    pub sec: u64,
    pub nsec: u32,
}

impl HostTime {
    pub const fn new(sec: u64, nsec: u32) -> Self {
        Self { sec, nsec }
    }
}

/// Exit indicator handed to the host when the kernel process terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Orderly stop
    Clean,
    /// Crash, the host should treat the exit as a panic
    Panic,
}

impl ExitStatus {
    /// Host-level exit code
    pub const fn code(self) -> i32 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Panic => -1,
        }
    }

    pub const fn is_panic(self) -> bool {
        matches!(self, ExitStatus::Panic)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Clean => write!(f, "clean"),
            ExitStatus::Panic => write!(f, "panic"),
        }
    }
}

/// Opaque mount identity passed to I/O transaction tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(pub u64);

/// Opaque terminal identity passed to tty output routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TtyId(pub u32);

/// Identity of a virtual address space owned by a remote client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmSpaceId(pub u64);

/// Control context handed to the remote-session component on teardown.
///
/// Derived from the virtual-space identity of the caller when the kernel
/// serves a remote client; absent when the caller is the local process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlContext(pub u64);

impl From<VmSpaceId> for ControlContext {
    fn from(vm: VmSpaceId) -> Self {
        ControlContext(vm.0)
    }
}

/// Device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevNum {
    pub major: u32,
    pub minor: u32,
}

impl DevNum {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}
