//! Process-wide emulator instance
//!
//! Kernel code that cannot thread an [`Emulator`] reference through (delay
//! loops in drivers, console output, the final reboot) reaches the one
//! installed here.

use hostk_api::BootHowto;
use hostk_api::error::{Error, Result};
use hostk_api::types::{Microseconds, Ticks};
use spin::Once;

use crate::context::ExecContext;
use crate::emulator::Emulator;
use crate::time::DelayOutcome;

static EMULATOR: Once<Emulator> = Once::new();

/// Installs the process emulator. Only the first call succeeds.
pub fn install(emulator: Emulator) -> Result<&'static Emulator> {
    let mut fresh = false;
    let installed = EMULATOR.call_once(|| {
        fresh = true;
        emulator
    });
    if fresh {
        Ok(installed)
    } else {
        Err(Error::AlreadyBound("emulator"))
    }
}

pub fn get() -> Option<&'static Emulator> {
    EMULATOR.get()
}

fn emulator() -> &'static Emulator {
    match EMULATOR.get() {
        Some(emulator) => emulator,
        None => panic!("hostk: emulator not installed"),
    }
}

/// Busy delay in microseconds
pub fn delay(us: Microseconds) -> DelayOutcome {
    emulator().delay(us)
}

/// Sleeps for `ticks` after checking `ctx` may sleep
#[track_caller]
pub fn kpause(ctx: &ExecContext, ticks: Ticks) -> Result<()> {
    emulator().kpause(ctx, ticks)
}

/// Writes one byte to the console
pub fn cnputc(c: u8) {
    emulator().console().cnputc(c);
}

/// Takes the kernel down on behalf of the local process
pub fn cpu_reboot(how: BootHowto) -> ! {
    emulator().cpu_reboot(how, &ExecContext::local())
}
