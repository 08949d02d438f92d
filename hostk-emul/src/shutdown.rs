//! Shutdown orchestration
//!
//! Drives the kernel from a shutdown request to process exit or to the
//! halt loop:
//!
//! ```text
//! Running -> Requested -> Panicking  ----------------------------> Terminated
//!                      -> NormalExit -> sync, hooks -------------> Terminated
//!                      -> NormalHalt -> sync, hooks -> Halted (sleeps forever)
//! ```
//!
//! The panic path skips sync and hooks entirely; getting the crash out
//! matters more than consistency. Flush, hooks and session teardown are
//! called once each and never retried or supervised: a collaborator that
//! hangs there hangs shutdown.
//!
//! Only the first request runs the sequence. Requests arriving while it
//! runs are coalesced, and nothing cancels a sequence once started.
//!
//! Shutdown hooks run last-registered-first.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use core::time::Duration;

use hostk_api::BootHowto;
use hostk_api::hypercall::Hypercall;
use hostk_api::types::{ControlContext, ExitStatus};
use log::{debug, info};
use spin::Mutex;

use crate::config::EmulConfig;
use crate::console::Console;
use crate::context::ExecContext;
use crate::registry::Subsystems;
use crate::state::KernelBootState;
use crate::time::TimeBridge;

/// Process-wide "shutdown has started" flag, shared with the time bridge
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle that lets the halt loop finish.
///
/// Nothing releases it in a production kernel, so a halted kernel sleeps
/// until the host process is killed.
#[derive(Debug, Clone, Default)]
pub struct HaltRelease(Arc<AtomicBool>);

impl HaltRelease {
    pub fn release(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Shutdown progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    Requested = 1,
    Panicking = 2,
    NormalHalt = 3,
    NormalExit = 4,
    /// In the halt loop
    Halted = 5,
    Terminated = 6,
}

impl ShutdownState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ShutdownState::Running,
            1 => ShutdownState::Requested,
            2 => ShutdownState::Panicking,
            3 => ShutdownState::NormalHalt,
            4 => ShutdownState::NormalExit,
            5 => ShutdownState::Halted,
            _ => ShutdownState::Terminated,
        }
    }
}

/// A request to take the kernel down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub how: BootHowto,
    pub reason: String,
    /// Description of the fault that triggered the request, if any
    pub fault: Option<String>,
}

impl ShutdownRequest {
    pub fn new(how: BootHowto) -> Self {
        Self {
            how,
            reason: String::new(),
            fault: None,
        }
    }

    /// A request raised by a kernel panic
    pub fn panic(fault: &str) -> Self {
        Self {
            how: BootHowto::DUMP,
            reason: "panic".to_string(),
            fault: Some(fault.to_string()),
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }
}

/// What a shutdown request led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The host was asked to terminate the process and returned anyway
    Terminated(ExitStatus),
    /// The halt loop ran until its release handle fired
    HaltReleased,
    /// Another request was already running the sequence
    Coalesced,
}

/// Collaborators the shutdown sequence drives
pub struct ShutdownEnv<'a> {
    pub state: &'a KernelBootState,
    pub subsystems: &'a Subsystems,
    pub time: &'a TimeBridge,
    pub console: &'a Console,
    pub hypercall: &'a dyn Hypercall,
}

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// Shutdown state machine
pub struct ShutdownOrchestrator {
    state: AtomicU8,
    hooks: Mutex<Vec<ShutdownHook>>,
    signal: ShutdownSignal,
    halt_release: HaltRelease,
    halt_sleep: Duration,
}

impl ShutdownOrchestrator {
    pub fn new(config: &EmulConfig, signal: ShutdownSignal) -> Self {
        Self {
            state: AtomicU8::new(ShutdownState::Running as u8),
            hooks: Mutex::new(Vec::new()),
            signal,
            halt_release: HaltRelease::default(),
            halt_sleep: Duration::from_secs(config.halt_sleep_secs),
        }
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ShutdownState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    pub fn halt_release(&self) -> HaltRelease {
        self.halt_release.clone()
    }

    /// Registers a hook to run once during orderly shutdown
    pub fn add_shutdown_hook<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hooks.lock().push(Box::new(hook));
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    fn run_hooks(&self) {
        let hooks = mem::take(&mut *self.hooks.lock());
        debug!("running {} shutdown hooks", hooks.len());
        for hook in hooks.into_iter().rev() {
            hook();
        }
    }

    /// Runs the shutdown sequence for `req` on behalf of `ctx`.
    ///
    /// On a real host this only returns for coalesced requests.
    pub fn shutdown(&self, env: &ShutdownEnv<'_>, req: ShutdownRequest, ctx: &ExecContext) -> ShutdownOutcome {
        if self
            .state
            .compare_exchange(
                ShutdownState::Running as u8,
                ShutdownState::Requested as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            info!("shutdown already in progress, request coalesced");
            return ShutdownOutcome::Coalesced;
        }
        self.signal.raise();

        env.state.or_boothowto(req.how.shutdown_intent());
        if let Some(fault) = &req.fault {
            env.state.set_panic(fault);
        }
        if !req.reason.is_empty() {
            info!("shutdown requested: {}", req.reason);
        }

        let name = env.state.emul().name;
        env.console.print(format_args!("{} kernel halting...\n", name));

        let ctl = ctx.control_context();

        // dump means we really take the dive here
        let status = if req.how.wants_dump() || env.state.is_panicking() {
            self.set_state(ShutdownState::Panicking);
            ExitStatus::Panic
        } else {
            let halting = req.how.wants_halt();
            self.set_state(if halting {
                ShutdownState::NormalHalt
            } else {
                ShutdownState::NormalExit
            });

            if req.how.wants_sync() {
                env.subsystems.flush();
            } else {
                debug!("sync skipped on request");
            }

            self.run_hooks();

            if halting {
                env.console.print(format_args!("{} kernel halted (with RB_HALT, not exiting)\n", name));
                return self.halt(env, ctl);
            }
            ExitStatus::Clean
        };

        env.subsystems.session_fini(ctl);
        self.set_state(ShutdownState::Terminated);
        env.hypercall.terminate(status);
        ShutdownOutcome::Terminated(status)
    }

    fn halt(&self, env: &ShutdownEnv<'_>, ctl: Option<ControlContext>) -> ShutdownOutcome {
        env.subsystems.session_fini(ctl);
        self.set_state(ShutdownState::Halted);
        while !self.halt_release.is_released() {
            // interruptions are expected here, the signal is raised
            let _ = env.time.sleep_blocking(self.halt_sleep);
        }
        info!("halt loop released");
        ShutdownOutcome::HaltReleased
    }
}

static_assertions::assert_impl_all!(ShutdownOrchestrator: Send, Sync);
