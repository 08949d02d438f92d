//! HostK API - Boundary interfaces for the hosted kernel
//!
//! This crate provides the types and traits shared between the kernel
//! emulation core and whatever hosts it. The kernel runs as an ordinary
//! process and reaches its host only through a narrow hypercall boundary;
//! everything the core consumes or exposes is declared here.
//!
//! # Architecture
//!
//! - **Error**: Common error type and result alias
//! - **Types**: Clock kinds, raw host time, exit status and opaque contexts
//! - **Boot**: Boot and shutdown intent flags
//! - **Hypercall**: The host boundary (clock, sleep, console, exit)
//! - **Interfaces**: Optional collaborator capabilities (filesystem flush,
//!   I/O transactions, tty output, remote session teardown)
//!
//! # Usage
//!
//! ```rust
//! use hostk_api::hypercall::{Hypercall, HypercallResult};
//! use hostk_api::types::{ClockKind, ExitStatus, HostTime};
//!
//! struct NullHost;
//!
//! impl Hypercall for NullHost {
//!     fn clock_gettime(&self, _kind: ClockKind) -> HypercallResult<HostTime> {
//!         Ok(HostTime::new(0, 0))
//!     }
//!     fn clock_sleep(&self, _kind: ClockKind, _sec: u64, _nsec: u32) -> HypercallResult<()> {
//!         Ok(())
//!     }
//!     fn write_char(&self, _c: u8) {}
//!     fn terminate(&self, _status: ExitStatus) {}
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod boot;
pub mod error;
pub mod hypercall;
pub mod interfaces;
pub mod types;

// Re-export commonly used types
pub use crate::boot::BootHowto;
pub use crate::error::{Error, Result};
pub use crate::hypercall::{Hypercall, HypercallError, HypercallResult};
pub use crate::interfaces::{CharOutput, FsFlush, IoTransaction, OutputQueue, RemoteSession};
pub use crate::types::*;
