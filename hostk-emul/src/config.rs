//! Emulation layer configuration

use hostk_api::BootHowto;
use hostk_api::error::{self, Result};
use hostk_api::types::NANOS_PER_SEC;

/// Default physical memory budget in pages.
///
/// Physical memory is mostly bookkeeping for a hosted kernel; the default
/// is generous enough for file systems that size caches from it.
pub const DEFAULT_PHYSMEM_PAGES: u64 = 512 * 256;

/// Default page size
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Default clock interrupt frequency
pub const DEFAULT_HZ: u32 = 100;

/// Default busy-wait iteration ceiling
pub const DEFAULT_BUSY_WAIT_CEILING: u64 = 1000 * 1000 * 100;

/// Default halt-loop sleep interval in seconds
pub const DEFAULT_HALT_SLEEP_SECS: u64 = 10;

/// Default emulation name
pub const DEFAULT_EMUL_NAME: &str = "hostk";

static_assertions::const_assert!(DEFAULT_PAGE_SIZE.is_power_of_two());
static_assertions::const_assert!(NANOS_PER_SEC % DEFAULT_HZ == 0);

/// Emulation layer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulConfig {
    /// Physical memory budget in pages
    pub physmem_pages: u64,
    /// Page size in bytes
    pub page_size: u64,
    /// Kernel clock ticks per second
    pub hz: u32,
    /// Iterations after which a busy-wait gives up
    pub busy_wait_ceiling: u64,
    /// Seconds slept per halt-loop iteration
    pub halt_sleep_secs: u64,
    /// Initial boot flags
    pub boothowto: BootHowto,
    /// Name of the active emulation
    pub emul_name: &'static str,
    /// Number of entries in the emulation's system call table
    pub syscall_count: u32,
}

impl Default for EmulConfig {
    fn default() -> Self {
        Self {
            physmem_pages: DEFAULT_PHYSMEM_PAGES,
            page_size: DEFAULT_PAGE_SIZE,
            hz: DEFAULT_HZ,
            busy_wait_ceiling: DEFAULT_BUSY_WAIT_CEILING,
            halt_sleep_secs: DEFAULT_HALT_SLEEP_SECS,
            boothowto: BootHowto::AB_SILENT,
            emul_name: DEFAULT_EMUL_NAME,
            syscall_count: 0,
        }
    }
}

impl EmulConfig {
    pub fn builder() -> EmulConfigBuilder {
        EmulConfigBuilder::new()
    }

    /// Checks the configuration for values the emulation cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.hz == 0 || self.hz > NANOS_PER_SEC {
            return Err(error::config_error("hz must be within 1..=1000000000"));
        }
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(error::config_error("page size must be a power of two"));
        }
        if self.physmem_pages == 0 {
            return Err(error::config_error("physical memory budget is empty"));
        }
        if self.busy_wait_ceiling == 0 {
            return Err(error::config_error("busy-wait ceiling must be positive"));
        }
        if self.halt_sleep_secs == 0 {
            return Err(error::config_error("halt sleep interval must be positive"));
        }
        if self.emul_name.is_empty() {
            return Err(error::config_error("emulation name is empty"));
        }
        Ok(())
    }
}

/// Builder for [`EmulConfig`]
#[derive(Debug, Clone, Default)]
pub struct EmulConfigBuilder {
    config: EmulConfig,
}

impl EmulConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EmulConfig::default(),
        }
    }

    pub fn physmem_pages(mut self, pages: u64) -> Self {
        self.config.physmem_pages = pages;
        self
    }

    pub fn page_size(mut self, bytes: u64) -> Self {
        self.config.page_size = bytes;
        self
    }

    pub fn hz(mut self, hz: u32) -> Self {
        self.config.hz = hz;
        self
    }

    pub fn busy_wait_ceiling(mut self, iterations: u64) -> Self {
        self.config.busy_wait_ceiling = iterations;
        self
    }

    pub fn halt_sleep_secs(mut self, secs: u64) -> Self {
        self.config.halt_sleep_secs = secs;
        self
    }

    pub fn boothowto(mut self, how: BootHowto) -> Self {
        self.config.boothowto = how;
        self
    }

    pub fn emul_name(mut self, name: &'static str) -> Self {
        self.config.emul_name = name;
        self
    }

    pub fn syscall_count(mut self, count: u32) -> Self {
        self.config.syscall_count = count;
        self
    }

    /// Validates and returns the configuration
    pub fn build(self) -> Result<EmulConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EmulConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.physmem_pages, 131072);
        assert_eq!(config.boothowto, BootHowto::AB_SILENT);
    }

    #[test]
    fn test_builder_rejects_zero_hz() {
        let result = EmulConfig::builder().hz(0).build();
        assert!(matches!(result, Err(hostk_api::Error::ConfigError(_))));
    }

    #[test]
    fn test_builder_rejects_odd_page_size() {
        assert!(EmulConfig::builder().page_size(3000).build().is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EmulConfig::builder()
            .hz(1000)
            .halt_sleep_secs(1)
            .boothowto(BootHowto::AB_VERBOSE)
            .build()
            .unwrap();
        assert_eq!(config.hz, 1000);
        assert_eq!(config.halt_sleep_secs, 1);
        assert_eq!(config.boothowto, BootHowto::AB_VERBOSE);
    }
}
