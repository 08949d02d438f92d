//! Optional-subsystem registry
//!
//! Components composed into the kernel may each provide one capability:
//! flushing file systems on shutdown, tracking I/O transactions, output
//! queue back-pressure, character output, remote session teardown. The
//! core calls these capabilities unconditionally; when nothing registered
//! an override, a neutral built-in default answers instead.
//!
//! # Binding rules
//!
//! - Each slot accepts one override. A second registration is a
//!   composition error and returns [`Error::AlreadyBound`]; the first
//!   override stays active.
//! - The first invocation seals the slot. Registering afterwards returns
//!   [`Error::SlotSealed`] and the slot keeps answering as before.
//!
//! # Concurrency precondition
//!
//! Registration must happen during the single-threaded composition phase,
//! before any context invokes the slot. Invocation is then a lock-free
//! read of an immutable binding and may run from any number of contexts.
//! The registry does not serialize concurrent registrations; the
//! composition process must not issue them.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use hostk_api::error::{Error, Result};
use hostk_api::interfaces::{CharOutput, FsFlush, IoTransaction, OutputQueue, RemoteSession};
use hostk_api::types::{ControlContext, MountId, TtyId};
use log::error;
use spin::Once;

use crate::console::Console;

/// Capability slot names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    FsFlush,
    IoTransaction,
    OutputQueue,
    CharOutput,
    RemoteSession,
}

impl SlotName {
    pub const fn as_str(self) -> &'static str {
        match self {
            SlotName::FsFlush => "fs_flush",
            SlotName::IoTransaction => "io_transaction",
            SlotName::OutputQueue => "output_queue",
            SlotName::CharOutput => "char_output",
            SlotName::RemoteSession => "remote_session",
        }
    }

    const fn flag(self) -> BoundSlots {
        match self {
            SlotName::FsFlush => BoundSlots::FS_FLUSH,
            SlotName::IoTransaction => BoundSlots::IO_TRANSACTION,
            SlotName::OutputQueue => BoundSlots::OUTPUT_QUEUE,
            SlotName::CharOutput => BoundSlots::CHAR_OUTPUT,
            SlotName::RemoteSession => BoundSlots::REMOTE_SESSION,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of slots carrying an override
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BoundSlots: u8 {
        const FS_FLUSH       = 1 << 0;
        const IO_TRANSACTION = 1 << 1;
        const OUTPUT_QUEUE   = 1 << 2;
        const CHAR_OUTPUT    = 1 << 3;
        const REMOTE_SESSION = 1 << 4;
    }
}

/// One capability with a built-in default and an optional override
pub struct Slot<T: ?Sized + Send + Sync> {
    name: SlotName,
    default: Arc<T>,
    bound: Once<Arc<T>>,
    used: AtomicBool,
}

impl<T: ?Sized + Send + Sync> Slot<T> {
    pub fn new(name: SlotName, default: Arc<T>) -> Self {
        Self {
            name,
            default,
            bound: Once::new(),
            used: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> SlotName {
        self.name
    }

    /// Binds an override.
    pub fn register(&self, imp: Arc<T>) -> Result<()> {
        if self.used.load(Ordering::Acquire) {
            error!("{}: registration after first use rejected", self.name);
            return Err(Error::SlotSealed(self.name.as_str()));
        }
        let mut fresh = false;
        self.bound.call_once(|| {
            fresh = true;
            imp
        });
        if !fresh {
            error!("{}: already bound, keeping the first override", self.name);
            return Err(Error::AlreadyBound(self.name.as_str()));
        }
        Ok(())
    }

    /// Returns the active implementation and seals the slot
    pub fn get(&self) -> &T {
        if !self.used.load(Ordering::Relaxed) {
            self.used.store(true, Ordering::Release);
        }
        match self.bound.get() {
            Some(imp) => imp.as_ref(),
            None => self.default.as_ref(),
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.bound.is_completed()
    }

    pub fn is_sealed(&self) -> bool {
        self.used.load(Ordering::Acquire)
    }
}

/// Default flush: nothing to flush without a file system
struct NoFsFlush;

impl FsFlush for NoFsFlush {
    fn flush(&self) {}
}

/// Default transactions: never suspended, nothing to track
struct NoIoTransaction;

impl IoTransaction for NoIoTransaction {
    fn start(&self, _mount: MountId) {}

    fn start_nowait(&self, _mount: MountId) -> Result<()> {
        Ok(())
    }

    fn done(&self, _mount: MountId) {}
}

/// Default output queue: never congested
struct NoOutputQueue;

impl OutputQueue for NoOutputQueue {
    fn check_output_queue(&self, _tty: Option<TtyId>, _wait: bool) -> bool {
        true
    }
}

/// Default character output: straight to the host console
struct ConsoleCharOutput {
    console: Console,
}

impl CharOutput for ConsoleCharOutput {
    fn put_char(&self, _tty: Option<TtyId>, c: u8) -> Result<()> {
        self.console.cnputc(c);
        Ok(())
    }
}

/// Default remote session: no proxy clients to tell
struct NoRemoteSession;

impl RemoteSession for NoRemoteSession {
    fn fini(&self, _ctl: Option<ControlContext>) {}
}

/// Registry of all optional subsystems
pub struct Subsystems {
    fs_flush: Slot<dyn FsFlush>,
    io_transaction: Slot<dyn IoTransaction>,
    output_queue: Slot<dyn OutputQueue>,
    char_output: Slot<dyn CharOutput>,
    remote_session: Slot<dyn RemoteSession>,
}

impl Subsystems {
    /// Creates a registry with every slot at its default
    pub fn new(console: Console) -> Self {
        Self {
            fs_flush: Slot::new(SlotName::FsFlush, Arc::new(NoFsFlush)),
            io_transaction: Slot::new(SlotName::IoTransaction, Arc::new(NoIoTransaction)),
            output_queue: Slot::new(SlotName::OutputQueue, Arc::new(NoOutputQueue)),
            char_output: Slot::new(SlotName::CharOutput, Arc::new(ConsoleCharOutput { console })),
            remote_session: Slot::new(SlotName::RemoteSession, Arc::new(NoRemoteSession)),
        }
    }

    pub fn register_fs_flush(&self, imp: Arc<dyn FsFlush>) -> Result<()> {
        self.fs_flush.register(imp)
    }

    pub fn register_io_transaction(&self, imp: Arc<dyn IoTransaction>) -> Result<()> {
        self.io_transaction.register(imp)
    }

    pub fn register_output_queue(&self, imp: Arc<dyn OutputQueue>) -> Result<()> {
        self.output_queue.register(imp)
    }

    pub fn register_char_output(&self, imp: Arc<dyn CharOutput>) -> Result<()> {
        self.char_output.register(imp)
    }

    pub fn register_remote_session(&self, imp: Arc<dyn RemoteSession>) -> Result<()> {
        self.remote_session.register(imp)
    }

    pub fn flush(&self) {
        self.fs_flush.get().flush();
    }

    pub fn io_start(&self, mount: MountId) {
        self.io_transaction.get().start(mount);
    }

    pub fn io_start_nowait(&self, mount: MountId) -> Result<()> {
        self.io_transaction.get().start_nowait(mount)
    }

    pub fn io_done(&self, mount: MountId) {
        self.io_transaction.get().done(mount);
    }

    pub fn check_output_queue(&self, tty: Option<TtyId>, wait: bool) -> bool {
        self.output_queue.get().check_output_queue(tty, wait)
    }

    pub fn put_char(&self, tty: Option<TtyId>, c: u8) -> Result<()> {
        self.char_output.get().put_char(tty, c)
    }

    pub fn session_fini(&self, ctl: Option<ControlContext>) {
        self.remote_session.get().fini(ctl);
    }

    /// Returns whether `name` carries an override
    pub fn is_overridden(&self, name: SlotName) -> bool {
        match name {
            SlotName::FsFlush => self.fs_flush.is_overridden(),
            SlotName::IoTransaction => self.io_transaction.is_overridden(),
            SlotName::OutputQueue => self.output_queue.is_overridden(),
            SlotName::CharOutput => self.char_output.is_overridden(),
            SlotName::RemoteSession => self.remote_session.is_overridden(),
        }
    }

    /// Returns the set of slots carrying an override
    pub fn bound(&self) -> BoundSlots {
        [
            SlotName::FsFlush,
            SlotName::IoTransaction,
            SlotName::OutputQueue,
            SlotName::CharOutput,
            SlotName::RemoteSession,
        ]
        .into_iter()
        .filter(|name| self.is_overridden(*name))
        .fold(BoundSlots::empty(), |acc, name| acc | name.flag())
    }
}

static_assertions::assert_impl_all!(Subsystems: Send, Sync);
