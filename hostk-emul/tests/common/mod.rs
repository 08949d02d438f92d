//! Common test utilities for emulation integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hostk_api::hypercall::{Hypercall, HypercallError, HypercallResult};
use hostk_api::interfaces::{FsFlush, RemoteSession};
use hostk_api::types::{ClockKind, ControlContext, ExitStatus, HostTime, NANOS_PER_SEC};
use hostk_emul::{EmulConfig, Emulator};
use mockall::mock;

mock! {
    pub Host {}

    impl Hypercall for Host {
        fn clock_gettime(&self, kind: ClockKind) -> Result<HostTime, HypercallError>;
        fn clock_sleep(&self, kind: ClockKind, sec: u64, nsec: u32) -> Result<(), HypercallError>;
        fn write_char(&self, c: u8);
        fn terminate(&self, status: ExitStatus);
    }
}

mock! {
    pub Flush {}

    impl FsFlush for Flush {
        fn flush(&self);
    }
}

mock! {
    pub Session {}

    impl RemoteSession for Session {
        fn fini(&self, ctl: Option<ControlContext>);
    }
}

/// Ordered record of observable side effects across host and collaborators
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

type SleepHook = Box<dyn FnMut(usize) + Send>;

/// Deterministic host: a monotonic clock that advances a fixed step on
/// every read, sleeps that advance the clock, a captured console and a
/// terminate that returns.
pub struct FakeHost {
    mono_ns: AtomicU64,
    step_ns: AtomicU64,
    mono_reads: AtomicUsize,
    sleeps: Mutex<Vec<(ClockKind, u64, u32)>>,
    on_sleep: Mutex<Option<SleepHook>>,
    console: Mutex<Vec<u8>>,
    terminated: Mutex<Vec<ExitStatus>>,
    journal: Journal,
}

impl FakeHost {
    pub fn new(step_ns: u64) -> Arc<Self> {
        Self::with_journal(step_ns, Journal::default())
    }

    pub fn with_journal(step_ns: u64, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            mono_ns: AtomicU64::new(5 * u64::from(NANOS_PER_SEC)),
            step_ns: AtomicU64::new(step_ns),
            mono_reads: AtomicUsize::new(0),
            sleeps: Mutex::new(Vec::new()),
            on_sleep: Mutex::new(None),
            console: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
            journal,
        })
    }

    pub fn mono_ns(&self) -> u64 {
        self.mono_ns.load(Ordering::SeqCst)
    }

    pub fn set_step(&self, step_ns: u64) {
        self.step_ns.store(step_ns, Ordering::SeqCst);
    }

    pub fn mono_reads(&self) -> usize {
        self.mono_reads.load(Ordering::SeqCst)
    }

    pub fn sleeps(&self) -> Vec<(ClockKind, u64, u32)> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn set_on_sleep(&self, hook: impl FnMut(usize) + Send + 'static) {
        *self.on_sleep.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn console(&self) -> String {
        String::from_utf8_lossy(&self.console.lock().unwrap()).into_owned()
    }

    pub fn terminated(&self) -> Vec<ExitStatus> {
        self.terminated.lock().unwrap().clone()
    }
}

impl Hypercall for FakeHost {
    fn clock_gettime(&self, kind: ClockKind) -> HypercallResult<HostTime> {
        match kind {
            ClockKind::Monotonic => {
                self.mono_reads.fetch_add(1, Ordering::SeqCst);
                let step = self.step_ns.load(Ordering::SeqCst);
                let ns = self.mono_ns.fetch_add(step, Ordering::SeqCst);
                let nps = u64::from(NANOS_PER_SEC);
                Ok(HostTime::new(ns / nps, (ns % nps) as u32))
            }
            ClockKind::WallClock => Ok(HostTime::new(1_700_000_000, 0)),
            ClockKind::RelativeWall => Err(HypercallError::Unsupported),
        }
    }

    fn clock_sleep(&self, kind: ClockKind, sec: u64, nsec: u32) -> HypercallResult<()> {
        let n = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push((kind, sec, nsec));
            sleeps.len()
        };
        self.mono_ns.fetch_add(sec * u64::from(NANOS_PER_SEC) + u64::from(nsec), Ordering::SeqCst);
        self.journal.push("sleep");
        if let Some(hook) = self.on_sleep.lock().unwrap().as_mut() {
            hook(n);
        }
        Ok(())
    }

    fn write_char(&self, c: u8) {
        self.console.lock().unwrap().push(c);
    }

    fn terminate(&self, status: ExitStatus) {
        self.terminated.lock().unwrap().push(status);
        self.journal.push("terminate");
    }
}

/// Builds an emulator over a fresh fake host
pub fn fake_emulator(config: EmulConfig, step_ns: u64) -> (Arc<FakeHost>, Emulator) {
    let host = FakeHost::new(step_ns);
    let emul = Emulator::new(config, host.clone()).expect("valid config");
    (host, emul)
}

/// File system flush that counts calls and journals them
pub struct CountingFlush {
    pub calls: AtomicUsize,
    journal: Journal,
}

impl CountingFlush {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            journal,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FsFlush for CountingFlush {
    fn flush(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.push("flush");
    }
}

/// Remote session that journals teardown with its control context
pub struct JournalSession {
    journal: Journal,
}

impl JournalSession {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self { journal })
    }
}

impl RemoteSession for JournalSession {
    fn fini(&self, ctl: Option<ControlContext>) {
        match ctl {
            Some(ControlContext(id)) => self.journal.push(format!("fini:{}", id)),
            None => self.journal.push("fini:local"),
        }
    }
}
