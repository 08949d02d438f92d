//! Console output over the hypercall boundary
//!
//! The hosted kernel has no console device of its own. Every byte the
//! kernel prints ends up in `Hypercall::write_char`. This module provides
//! the formatted writer used for notices that must always appear, and a
//! `log` backend for everything that goes through the logging facade.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use hostk_api::BootHowto;
use hostk_api::error::{Error, Result};
use hostk_api::hypercall::Hypercall;
use log::{LevelFilter, Log, Metadata, Record};

/// Formatted writer over the host console
#[derive(Clone)]
pub struct Console {
    hypercall: Arc<dyn Hypercall>,
}

impl Console {
    pub fn new(hypercall: Arc<dyn Hypercall>) -> Self {
        Self { hypercall }
    }

    /// Writes one byte to the host console
    pub fn cnputc(&self, c: u8) {
        self.hypercall.write_char(c);
    }

    /// Flushes pending console output. Writes are unbuffered, nothing to do.
    pub fn cnflush(&self) {}

    /// Prints formatted output
    pub fn print(&self, args: fmt::Arguments<'_>) {
        let mut writer = self.clone();
        let _ = fmt::write(&mut writer, args);
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            self.cnputc(b);
        }
        Ok(())
    }
}

/// Maps boot verbosity flags onto a log level
pub fn level_for(how: BootHowto) -> LevelFilter {
    if how.contains(BootHowto::AB_DEBUG) {
        LevelFilter::Trace
    } else if how.contains(BootHowto::AB_VERBOSE) {
        LevelFilter::Debug
    } else if how.intersects(BootHowto::AB_SILENT | BootHowto::AB_QUIET) {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    }
}

/// `log` backend writing records to the host console
pub struct ConsoleLogger {
    console: Console,
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(console: Console, how: BootHowto) -> Self {
        Self {
            console,
            level: level_for(how),
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Installs the logger as the process-wide `log` backend.
    ///
    /// Fails if another logger is already installed.
    pub fn install(self) -> Result<()> {
        let level = self.level;
        let logger: &'static ConsoleLogger = Box::leak(Box::new(self));
        log::set_logger(logger).map_err(|_| Error::AlreadyBound("logger"))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.console.print(format_args!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        self.console.cnflush();
    }
}
