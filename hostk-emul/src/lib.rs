//! HostK Emulation
//!
//! This crate provides the emulation glue that lets an unmodified kernel
//! core run as an ordinary process on top of a host reached only through
//! hypercalls (see `hostk_api::Hypercall`).
//!
//! # Architecture
//!
//! - **Time**: Clock reads, blocking sleep and busy delay over the host clock
//! - **Registry**: Optional subsystems with neutral defaults and overrides
//! - **State**: Process-wide boot state, memory sizing and device tables
//! - **Shutdown**: The shutdown state machine (panic, halt, exit)
//! - **Console**: Console output and the `log` backend
//! - **Emulator**: Composition root tying the above together
//! - **Global**: The process-wide emulator and free-function entry points
//!
//! # Usage
//!
//! ```rust,ignore
//! use hostk_emul::{EmulConfig, Emulator, ExecContext};
//! use hostk_api::BootHowto;
//!
//! let emul = Emulator::new(EmulConfig::default(), host)?;
//! emul.subsystems().register_fs_flush(vfs_flush)?;
//! emul.finish_bootstrap()?;
//!
//! emul.delay(50);
//! emul.reboot(BootHowto::empty(), &ExecContext::local());
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod config;
pub mod console;
pub mod context;
pub mod devsw;
pub mod emulator;
pub mod global;
pub mod registry;
pub mod shutdown;
pub mod state;
pub mod time;

// Re-export commonly used items
pub use config::{EmulConfig, EmulConfigBuilder};
pub use console::{Console, ConsoleLogger};
pub use context::ExecContext;
pub use emulator::Emulator;
pub use registry::{BoundSlots, SlotName, Subsystems};
pub use shutdown::{HaltRelease, ShutdownOutcome, ShutdownRequest, ShutdownState};
pub use state::{KernelBootState, LoadAverage};
pub use time::{ClockSample, DelayOutcome, TimeBridge};
