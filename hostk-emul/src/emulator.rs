//! Composition root of the emulation layer
//!
//! An [`Emulator`] owns one instance of every component and hands out
//! references. The kernel's bootstrap code builds it, registers optional
//! subsystems, marks bootstrap finished, and from then on only reads it.

use alloc::sync::Arc;
use core::time::Duration;

use hostk_api::BootHowto;
use hostk_api::error::Result;
use hostk_api::hypercall::Hypercall;
use hostk_api::types::{ClockKind, Microseconds, Ticks, TtyId};
use log::info;

use crate::config::EmulConfig;
use crate::console::{Console, ConsoleLogger};
use crate::context::ExecContext;
use crate::registry::Subsystems;
use crate::shutdown::{ShutdownEnv, ShutdownOrchestrator, ShutdownOutcome, ShutdownRequest, ShutdownSignal};
use crate::state::KernelBootState;
use crate::time::{DelayOutcome, TimeBridge};

/// The emulation layer of one hosted kernel
pub struct Emulator {
    config: EmulConfig,
    hypercall: Arc<dyn Hypercall>,
    console: Console,
    time: TimeBridge,
    subsystems: Subsystems,
    state: KernelBootState,
    shutdown: ShutdownOrchestrator,
}

impl Emulator {
    /// Builds the emulation layer on top of `hypercall`.
    ///
    /// Reads the wall clock once to record the boot time.
    pub fn new(config: EmulConfig, hypercall: Arc<dyn Hypercall>) -> Result<Self> {
        config.validate()?;

        let signal = ShutdownSignal::new();
        let console = Console::new(hypercall.clone());
        let time = TimeBridge::new(hypercall.clone(), &config, signal.clone());
        let boottime = time.now(ClockKind::WallClock);
        let state = KernelBootState::new(&config, boottime);
        let subsystems = Subsystems::new(console.clone());
        let shutdown = ShutdownOrchestrator::new(&config, signal);

        Ok(Self {
            config,
            hypercall,
            console,
            time,
            subsystems,
            state,
            shutdown,
        })
    }

    pub fn config(&self) -> &EmulConfig {
        &self.config
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn time(&self) -> &TimeBridge {
        &self.time
    }

    pub fn subsystems(&self) -> &Subsystems {
        &self.subsystems
    }

    pub fn state(&self) -> &KernelBootState {
        &self.state
    }

    pub fn shutdown_orchestrator(&self) -> &ShutdownOrchestrator {
        &self.shutdown
    }

    /// A `log` backend writing to this emulator's console
    pub fn logger(&self) -> ConsoleLogger {
        ConsoleLogger::new(self.console.clone(), self.state.boothowto())
    }

    /// Ends bootstrap: the kernel is warm from here on
    pub fn finish_bootstrap(&self) -> Result<()> {
        self.state.mark_warm()?;
        info!(
            "{} up, {} pages physical memory, bound subsystems {:?}",
            self.state.cpu_model(),
            self.state.physmem_pages(),
            self.subsystems.bound()
        );
        Ok(())
    }

    /// Hardware-style busy delay in microseconds
    pub fn delay(&self, us: Microseconds) -> DelayOutcome {
        self.time.delay(us)
    }

    /// Sleeps for `ticks` after checking `ctx` may sleep
    #[track_caller]
    pub fn kpause(&self, ctx: &ExecContext, ticks: Ticks) -> Result<()> {
        self.state.assert_sleepable(ctx);
        self.time.kpause(ticks)
    }

    /// Formatted-print character output for `tty`
    pub fn tputchar(&self, tty: Option<TtyId>, c: u8) -> Result<()> {
        self.subsystems.put_char(tty, c)
    }

    pub fn ttycheckoutq(&self, tty: Option<TtyId>, wait: bool) -> bool {
        self.subsystems.check_output_queue(tty, wait)
    }

    pub fn add_shutdown_hook<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shutdown.add_shutdown_hook(hook);
    }

    fn shutdown_env(&self) -> ShutdownEnv<'_> {
        ShutdownEnv {
            state: &self.state,
            subsystems: &self.subsystems,
            time: &self.time,
            console: &self.console,
            hypercall: self.hypercall.as_ref(),
        }
    }

    /// Runs the shutdown sequence for `req`
    pub fn shutdown(&self, req: ShutdownRequest, ctx: &ExecContext) -> ShutdownOutcome {
        self.shutdown.shutdown(&self.shutdown_env(), req, ctx)
    }

    /// Runs the shutdown sequence for reboot flags `how`
    pub fn reboot(&self, how: BootHowto, ctx: &ExecContext) -> ShutdownOutcome {
        self.shutdown(ShutdownRequest::new(how), ctx)
    }

    /// Records a kernel panic and goes down on the panic path
    pub fn panic(&self, reason: &str, ctx: &ExecContext) -> ShutdownOutcome {
        self.state.set_panic(reason);
        self.shutdown(ShutdownRequest::panic(reason), ctx)
    }

    /// Goes down and never comes back.
    ///
    /// If the sequence returns (coalesced request, released halt, or a host
    /// whose terminate returned) the calling context is parked in sleep.
    pub fn cpu_reboot(&self, how: BootHowto, ctx: &ExecContext) -> ! {
        let outcome = self.reboot(how, ctx);
        info!("cpu_reboot: parking context after {:?}", outcome);
        self.park()
    }

    fn park(&self) -> ! {
        let interval = Duration::from_secs(self.config.halt_sleep_secs);
        loop {
            let _ = self.time.sleep_blocking(interval);
        }
    }
}

static_assertions::assert_impl_all!(Emulator: Send, Sync);
