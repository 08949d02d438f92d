//! Process-wide kernel state
//!
//! The handful of values the rest of the kernel reads globally: boot flags,
//! memory sizing, the cold-boot indicator, boot device identity, device
//! switch tables, the default load average and the active emulation.
//!
//! Everything here is assigned once during bootstrap. Afterwards only two
//! fields change: `cold` flips to warm exactly once when bootstrap
//! finishes, and `boothowto` picks up shutdown intent on the shutdown
//! path. Bootstrap and shutdown each run on a single context, so plain
//! atomics are all the synchronization needed.

use alloc::string::{String, ToString};
use core::panic::Location;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use hostk_api::BootHowto;
use hostk_api::error::{self, Result};
use hostk_api::types::{DevNum, VirtAddr, VirtSize};
use log::debug;
use spin::Once;

use crate::config::EmulConfig;
use crate::context::ExecContext;
use crate::devsw::{DevswKind, DevswTable};
use crate::time::ClockSample;

/// Fixed-point shift of load averages
pub const FSHIFT: u32 = 11;

/// Fixed-point scale of load averages
pub const FSCALE: u32 = 1 << FSHIFT;

/// Major number of the memory pseudo-device
pub const MEM_NO: u32 = 2;

/// A load average snapshot in fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadAverage {
    /// 1, 5 and 15 minute averages, scaled by `fscale`
    pub ldavg: [u32; 3],
    pub fscale: u32,
}

impl Default for LoadAverage {
    /// A plausible fixed snapshot for callers that just need some value
    fn default() -> Self {
        Self {
            ldavg: [0, FSCALE, 11 * FSCALE],
            fscale: FSCALE,
        }
    }
}

/// The emulation the kernel presents to system call clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulDescriptor {
    pub name: &'static str,
    pub syscall_count: u32,
}

impl EmulDescriptor {
    /// Per-process system call setup; clears emulation-private data
    pub fn syscall_intern(&self, ctx: &mut ExecContext) {
        ctx.clear_emul_data();
    }
}

/// Device the kernel booted from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootedDevice {
    pub name: String,
    pub partition: u32,
    pub method: &'static str,
}

/// Boot state shared by the bootstrap and shutdown paths
pub struct KernelBootState {
    boothowto: AtomicU32,
    cold: AtomicBool,
    panic_reason: Once<String>,
    physmem_pages: u64,
    nkmempages: u64,
    page_size: u64,
    root_device: Option<DevNum>,
    booted_device: Once<BootedDevice>,
    boottime: ClockSample,
    averunnable: LoadAverage,
    emul: EmulDescriptor,
    bdevsw: DevswTable,
    cdevsw: DevswTable,
}

impl KernelBootState {
    pub fn new(config: &EmulConfig, boottime: ClockSample) -> Self {
        Self {
            boothowto: AtomicU32::new(config.boothowto.bits()),
            cold: AtomicBool::new(true),
            panic_reason: Once::new(),
            physmem_pages: config.physmem_pages,
            nkmempages: config.physmem_pages / 2,
            page_size: config.page_size,
            root_device: None,
            booted_device: Once::new(),
            boottime,
            averunnable: LoadAverage::default(),
            emul: EmulDescriptor {
                name: config.emul_name,
                syscall_count: config.syscall_count,
            },
            bdevsw: DevswTable::new(DevswKind::Block),
            cdevsw: DevswTable::new(DevswKind::Char),
        }
    }

    pub fn boothowto(&self) -> BootHowto {
        BootHowto::from_bits_retain(self.boothowto.load(Ordering::Acquire))
    }

    /// Adds flags to `boothowto`
    pub fn or_boothowto(&self, how: BootHowto) {
        self.boothowto.fetch_or(how.bits(), Ordering::AcqRel);
    }

    pub fn is_cold(&self) -> bool {
        self.cold.load(Ordering::Acquire)
    }

    /// Marks bootstrap as finished. Only the first call succeeds.
    pub fn mark_warm(&self) -> Result<()> {
        self.cold
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| error::invalid_state("kernel already warm"))
    }

    /// Records that the kernel panicked. The first reason sticks.
    pub fn set_panic(&self, reason: &str) -> bool {
        let mut first = false;
        self.panic_reason.call_once(|| {
            first = true;
            reason.to_string()
        });
        first
    }

    pub fn panic_reason(&self) -> Option<&str> {
        self.panic_reason.get().map(String::as_str)
    }

    pub fn is_panicking(&self) -> bool {
        self.panic_reason.is_completed()
    }

    pub fn physmem_pages(&self) -> u64 {
        self.physmem_pages
    }

    pub fn nkmempages(&self) -> u64 {
        self.nkmempages
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn mem_no(&self) -> u32 {
        MEM_NO
    }

    pub fn root_device(&self) -> Option<DevNum> {
        self.root_device
    }

    /// Records the boot device. Only the first call succeeds.
    pub fn set_booted_device(&self, dev: BootedDevice) -> Result<()> {
        let mut first = false;
        self.booted_device.call_once(|| {
            first = true;
            dev
        });
        if first {
            Ok(())
        } else {
            Err(error::invalid_state("booted device already set"))
        }
    }

    pub fn booted_device(&self) -> Option<&BootedDevice> {
        self.booted_device.get()
    }

    pub fn boottime(&self) -> ClockSample {
        self.boottime
    }

    pub fn averunnable(&self) -> LoadAverage {
        self.averunnable
    }

    pub fn emul(&self) -> &EmulDescriptor {
        &self.emul
    }

    pub fn bdevsw(&self) -> &DevswTable {
        &self.bdevsw
    }

    pub fn cdevsw(&self) -> &DevswTable {
        &self.cdevsw
    }

    pub fn cpu_model(&self) -> &'static str {
        "hostk (virtual)"
    }

    /// Machine-dependent module setup. The hosted kernel has none.
    pub fn module_init_md(&self) {
        debug!("module_init_md: no machine-dependent module setup");
    }

    /// Sizes a cache as `pct` percent of physical memory, in bytes.
    ///
    /// The hosted kernel has no virtual-space pressure, so the address space
    /// size does not cap the result.
    ///
    /// # Panics
    ///
    /// Panics if the size does not fit a virtual address; the configured
    /// cache would be larger than the address space.
    pub fn compute_cache_budget(&self, _vasz: VirtSize, pct: u32) -> VirtAddr {
        let bytes = u128::from(self.physmem_pages)
            .checked_mul(u128::from(pct))
            .map(|scaled| scaled / 100)
            .and_then(|pages| pages.checked_mul(u128::from(self.page_size)))
            .and_then(|bytes| VirtAddr::try_from(bytes).ok());
        match bytes {
            Some(size) => size,
            None => panic!(
                "compute_cache_budget: needs tweak ({} pages, {}%, page size {})",
                self.physmem_pages, pct, self.page_size
            ),
        }
    }

    /// Asserts the calling context may sleep.
    ///
    /// # Panics
    ///
    /// Panics, naming the caller, if `ctx` is inside a read section.
    #[track_caller]
    pub fn assert_sleepable(&self, ctx: &ExecContext) {
        let reason = if ctx.in_read_section() {
            Some("pserialize")
        } else {
            None
        };

        if let Some(reason) = reason {
            panic!("assert_sleepable: {} caller={}", reason, Location::caller());
        }
    }
}

static_assertions::assert_impl_all!(KernelBootState: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use hostk_api::types::HostTime;

    fn state(config: &EmulConfig) -> KernelBootState {
        KernelBootState::new(config, ClockSample::from_host(HostTime::new(100, 0)))
    }

    #[test]
    fn test_defaults() {
        let st = state(&EmulConfig::default());
        assert!(st.is_cold());
        assert_eq!(st.boothowto(), BootHowto::AB_SILENT);
        assert_eq!(st.nkmempages(), 512 * 256 / 2);
        assert_eq!(st.mem_no(), 2);
        assert_eq!(st.averunnable().ldavg, [0, 2048, 11 * 2048]);
        assert_eq!(st.emul().name, "hostk");
        assert_eq!(st.boottime().seconds(), 100);
        assert!(st.root_device().is_none());
    }

    #[test]
    fn test_mark_warm_once() {
        let st = state(&EmulConfig::default());
        assert!(st.mark_warm().is_ok());
        assert!(!st.is_cold());
        assert!(st.mark_warm().is_err());
    }

    #[test]
    fn test_panic_reason_first_wins() {
        let st = state(&EmulConfig::default());
        assert!(!st.is_panicking());
        assert!(st.set_panic("lock botch"));
        assert!(!st.set_panic("later"));
        assert_eq!(st.panic_reason(), Some("lock botch"));
    }

    #[test]
    fn test_cache_budget_half_of_physmem() {
        let st = state(&EmulConfig::default());
        assert_eq!(st.compute_cache_budget(0, 50), 512 * 256 * 4096 / 2);
        assert_eq!(st.compute_cache_budget(0, 0), 0);
    }

    #[test]
    #[should_panic(expected = "needs tweak")]
    fn test_cache_budget_overflow_panics() {
        let config = EmulConfig::builder()
            .physmem_pages(u64::MAX / 4096)
            .build()
            .unwrap();
        state(&config).compute_cache_budget(0, 200);
    }

    #[test]
    #[should_panic(expected = "needs tweak")]
    fn test_cache_budget_beyond_u128_panics() {
        let config = EmulConfig::builder()
            .physmem_pages(1 << 63)
            .page_size(1 << 63)
            .build()
            .unwrap();
        state(&config).compute_cache_budget(0, 400);
    }

    #[test]
    fn test_booted_device_first_set_wins() {
        let st = state(&EmulConfig::default());
        assert!(st.booted_device().is_none());
        let dev = BootedDevice {
            name: "ld0".to_string(),
            partition: 1,
            method: "bootinfo",
        };
        assert!(st.set_booted_device(dev.clone()).is_ok());
        let later = BootedDevice {
            name: "wd0".to_string(),
            ..dev.clone()
        };
        assert!(st.set_booted_device(later).is_err());
        assert_eq!(st.booted_device(), Some(&dev));
    }

    #[test]
    #[should_panic(expected = "assert_sleepable: pserialize")]
    fn test_assert_sleepable_in_read_section() {
        let st = state(&EmulConfig::default());
        let ctx = ExecContext::local();
        let _guard = ctx.enter_read_section();
        st.assert_sleepable(&ctx);
    }

    #[test]
    fn test_syscall_intern_clears_emul_data() {
        let st = state(&EmulConfig::default());
        let mut ctx = ExecContext::local();
        ctx.set_emul_data(alloc::boxed::Box::new(5u32));
        st.emul().syscall_intern(&mut ctx);
        assert!(ctx.emul_data().is_none());
    }
}
