//! Error handling module for the hosted kernel

use alloc::string::{String, ToString};
use core::fmt;

use crate::hypercall::HypercallError;

/// Common error type used throughout the emulation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument
    InvalidArgument(String),
    /// Invalid state
    InvalidState(String),
    /// Resource busy
    Busy(String),
    /// Configuration error
    ConfigError(String),
    /// A capability slot already carries an override
    AlreadyBound(&'static str),
    /// A capability slot was used before the registration attempt
    SlotSealed(&'static str),
    /// Operation would block
    WouldBlock,
    /// A sleep was cut short because the kernel is shutting down
    Interrupted,
    /// The host boundary reported a failure
    Hypercall(HypercallError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::Busy(msg) => write!(f, "Resource busy: {}", msg),
            Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Error::AlreadyBound(slot) => write!(f, "Slot already bound: {}", slot),
            Error::SlotSealed(slot) => write!(f, "Slot sealed after first use: {}", slot),
            Error::WouldBlock => write!(f, "Operation would block"),
            Error::Interrupted => write!(f, "Interrupted by shutdown"),
            Error::Hypercall(err) => write!(f, "Hypercall error: {}", err),
        }
    }
}

impl From<HypercallError> for Error {
    fn from(err: HypercallError) -> Self {
        Error::Hypercall(err)
    }
}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, Error>;

/// Creates a new invalid argument error
pub fn invalid_argument(msg: &str) -> Error {
    Error::InvalidArgument(msg.to_string())
}

/// Creates a new invalid state error
pub fn invalid_state(msg: &str) -> Error {
    Error::InvalidState(msg.to_string())
}

/// Creates a new busy error
pub fn busy(msg: &str) -> Error {
    Error::Busy(msg.to_string())
}

/// Creates a new config error
pub fn config_error(msg: &str) -> Error {
    Error::ConfigError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::AlreadyBound("fs_flush").to_string(), "Slot already bound: fs_flush");
        assert_eq!(invalid_argument("hz").to_string(), "Invalid argument: hz");
        assert_eq!(Error::Interrupted.to_string(), "Interrupted by shutdown");
    }

    #[test]
    fn test_hypercall_conversion() {
        let err: Error = HypercallError::Fault(5).into();
        assert_eq!(err, Error::Hypercall(HypercallError::Fault(5)));
    }
}
