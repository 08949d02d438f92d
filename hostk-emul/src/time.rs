//! Hypercall time bridge
//!
//! Maps the kernel's notion of time, sleeping and hardware delays onto the
//! host clock hypercalls. Two primitives matter:
//!
//! - [`TimeBridge::sleep_blocking`] hands the calling context to the host
//!   for at least the requested interval.
//! - [`TimeBridge::delay_busy`] never gives the context up. It polls the
//!   monotonic clock until the target instant, so it is safe under locks.
//!
//! All conversions are integer arithmetic on seconds and nanoseconds.

use alloc::sync::Arc;
use core::time::Duration;

use hostk_api::error::{Error, Result};
use hostk_api::hypercall::{Hypercall, HypercallError};
use hostk_api::types::{ClockKind, HostTime, MICROS_PER_SEC, Microseconds, NANOS_PER_SEC, Ticks};
use log::warn;
use spin::{Mutex, MutexGuard};

use crate::config::EmulConfig;
use crate::shutdown::ShutdownSignal;

/// A point in monotonic or wall time, read from the host.
///
/// Invariant: `nsec < 1e9`. Only the time bridge creates samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockSample {
    sec: u64,
    nsec: u32,
}

impl ClockSample {
    const END_OF_TIME: ClockSample = ClockSample {
        sec: u64::MAX,
        nsec: NANOS_PER_SEC - 1,
    };

    /// Normalizes a raw host value, carrying excess nanoseconds into seconds
    pub(crate) fn from_host(raw: HostTime) -> Self {
        let carry = u64::from(raw.nsec / NANOS_PER_SEC);
        Self {
            sec: raw.sec.saturating_add(carry),
            nsec: raw.nsec % NANOS_PER_SEC,
        }
    }

    pub fn seconds(&self) -> u64 {
        self.sec
    }

    pub fn nanoseconds(&self) -> u32 {
        self.nsec
    }

    /// Returns the sample shifted forward by `d`, saturating at the end of time
    pub fn saturating_add(self, d: Duration) -> Self {
        let nsec = self.nsec + d.subsec_nanos();
        let carry = u64::from(nsec / NANOS_PER_SEC);
        match self
            .sec
            .checked_add(d.as_secs())
            .and_then(|sec| sec.checked_add(carry))
        {
            Some(sec) => Self {
                sec,
                nsec: nsec % NANOS_PER_SEC,
            },
            None => Self::END_OF_TIME,
        }
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_duration_since(self, earlier: ClockSample) -> Duration {
        if self <= earlier {
            return Duration::ZERO;
        }
        let (sec, nsec) = if self.nsec >= earlier.nsec {
            (self.sec - earlier.sec, self.nsec - earlier.nsec)
        } else {
            (self.sec - earlier.sec - 1, self.nsec + NANOS_PER_SEC - earlier.nsec)
        };
        Duration::new(sec, nsec)
    }
}

/// How a busy-wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    /// The monotonic clock passed the target
    Reached,
    /// The iteration ceiling ran out first
    Escaped,
}

/// Converts a microsecond delay into a duration
pub fn micros_to_duration(us: Microseconds) -> Duration {
    let sec = us / MICROS_PER_SEC;
    let nsec = (us % MICROS_PER_SEC) * 1000;
    Duration::new(sec, nsec as u32)
}

/// Time services backed by the host clock
pub struct TimeBridge {
    hypercall: Arc<dyn Hypercall>,
    hz: u32,
    busy_wait_ceiling: u64,
    shutdown: ShutdownSignal,
}

impl TimeBridge {
    pub fn new(hypercall: Arc<dyn Hypercall>, config: &EmulConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            hypercall,
            hz: config.hz,
            busy_wait_ceiling: config.busy_wait_ceiling,
            shutdown,
        }
    }

    pub fn hz(&self) -> u32 {
        self.hz
    }

    /// Reads the host clock.
    ///
    /// # Panics
    ///
    /// Panics if the host cannot read the clock; the kernel has no way to
    /// run without a time source.
    pub fn now(&self, kind: ClockKind) -> ClockSample {
        match self.hypercall.clock_gettime(kind) {
            Ok(raw) => ClockSample::from_host(raw),
            Err(err) => panic!("now: {:?} clock unavailable: {}", kind, err),
        }
    }

    /// Converts kernel ticks to a duration
    pub fn ticks_to_duration(&self, ticks: Ticks) -> Duration {
        let hz = u64::from(self.hz);
        let sec = ticks / hz;
        // ticks % hz < hz <= 1e9, so the product stays below 1e18
        let nsec = (ticks % hz) * u64::from(NANOS_PER_SEC) / hz;
        Duration::new(sec, nsec as u32)
    }

    /// Suspends the calling context for at least `d`.
    ///
    /// A host-side interruption is retried for the remaining time unless the
    /// kernel is shutting down, in which case `Error::Interrupted` is
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics on any other host failure.
    pub fn sleep_blocking(&self, d: Duration) -> Result<()> {
        let deadline = self.now(ClockKind::Monotonic).saturating_add(d);
        let mut remaining = d;
        loop {
            let rv = self.hypercall.clock_sleep(
                ClockKind::RelativeWall,
                remaining.as_secs(),
                remaining.subsec_nanos(),
            );
            match rv {
                Ok(()) => return Ok(()),
                Err(HypercallError::Interrupted) => {
                    if self.shutdown.is_raised() {
                        return Err(Error::Interrupted);
                    }
                    let now = self.now(ClockKind::Monotonic);
                    if now >= deadline {
                        return Ok(());
                    }
                    remaining = deadline.saturating_duration_since(now);
                }
                Err(err) => panic!("sleep_blocking: host sleep failed: {}", err),
            }
        }
    }

    /// Sleeps for `ticks` clock ticks
    pub fn kpause(&self, ticks: Ticks) -> Result<()> {
        self.sleep_blocking(self.ticks_to_duration(ticks))
    }

    /// Sleeps for `ticks` clock ticks with `mutex` released.
    ///
    /// `guard` must be the caller's guard on `mutex`. It is dropped before
    /// the context is suspended and the lock is taken again before this
    /// returns, whatever the sleep outcome.
    pub fn kpause_locked<'a, T>(
        &self,
        mutex: &'a Mutex<T>,
        guard: MutexGuard<'a, T>,
        ticks: Ticks,
    ) -> (MutexGuard<'a, T>, Result<()>) {
        drop(guard);
        let rv = self.kpause(ticks);
        (mutex.lock(), rv)
    }

    /// Waits `d` without suspending the calling context.
    ///
    /// Polls the monotonic clock until it reaches `start + d`. The number
    /// of polls is capped by the configured ceiling so a misbehaving host
    /// clock cannot wedge the caller; hitting the cap logs a warning and
    /// returns [`DelayOutcome::Escaped`].
    pub fn delay_busy(&self, d: Duration) -> DelayOutcome {
        let start = self.now(ClockKind::Monotonic);
        let target = start.saturating_add(d);

        if d.as_secs() != 0 {
            warn!("over 1s delay ({:?})", d);
        }

        for _ in 0..self.busy_wait_ceiling {
            if self.now(ClockKind::Monotonic) >= target {
                return DelayOutcome::Reached;
            }
            core::hint::spin_loop();
        }
        warn!("delay escaped after {} iterations", self.busy_wait_ceiling);
        DelayOutcome::Escaped
    }

    /// Hardware-style delay in microseconds
    pub fn delay(&self, us: Microseconds) -> DelayOutcome {
        self.delay_busy(micros_to_duration(us))
    }

    /// Writes the kernel's time back to the hardware clock.
    ///
    /// The host clock does not belong to the kernel, so this does nothing.
    pub fn resettodr(&self) {}
}

static_assertions::assert_impl_all!(TimeBridge: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use hostk_api::hypercall::HypercallResult;
    use hostk_api::types::ExitStatus;

    struct Idle;

    impl Hypercall for Idle {
        fn clock_gettime(&self, _kind: ClockKind) -> HypercallResult<HostTime> {
            Ok(HostTime::default())
        }
        fn clock_sleep(&self, _kind: ClockKind, _sec: u64, _nsec: u32) -> HypercallResult<()> {
            Ok(())
        }
        fn write_char(&self, _c: u8) {}
        fn terminate(&self, _status: ExitStatus) {}
    }

    #[test]
    fn test_from_host_carries_nanoseconds() {
        let s = ClockSample::from_host(HostTime::new(1, 2_500_000_000));
        assert_eq!(s.seconds(), 3);
        assert_eq!(s.nanoseconds(), 500_000_000);
    }

    #[test]
    fn test_saturating_add_carries() {
        let s = ClockSample::from_host(HostTime::new(10, 900_000_000));
        let t = s.saturating_add(Duration::new(1, 200_000_000));
        assert_eq!((t.seconds(), t.nanoseconds()), (12, 100_000_000));
    }

    #[test]
    fn test_saturating_add_at_end_of_time() {
        let s = ClockSample::from_host(HostTime::new(u64::MAX - 1, 0));
        let t = s.saturating_add(Duration::new(5, 0));
        assert_eq!(t.seconds(), u64::MAX);
        assert!(t > s);
    }

    #[test]
    fn test_duration_since() {
        let a = ClockSample::from_host(HostTime::new(5, 800_000_000));
        let b = ClockSample::from_host(HostTime::new(7, 100_000_000));
        assert_eq!(b.saturating_duration_since(a), Duration::new(1, 300_000_000));
        assert_eq!(a.saturating_duration_since(b), Duration::ZERO);
    }

    #[test]
    fn test_ticks_with_hz_not_dividing_a_second() {
        let config = EmulConfig::builder().hz(1024).build().unwrap();
        let bridge = TimeBridge::new(Arc::new(Idle), &config, ShutdownSignal::new());
        assert_eq!(bridge.ticks_to_duration(1023), Duration::from_nanos(999_023_437));
        assert_eq!(bridge.ticks_to_duration(2048 + 512), Duration::new(2, 500_000_000));
    }

    #[test]
    fn test_micros_to_duration() {
        assert_eq!(micros_to_duration(1_500_000), Duration::new(1, 500_000_000));
        assert_eq!(micros_to_duration(999), Duration::from_nanos(999_000));
    }
}
