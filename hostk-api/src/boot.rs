//! Boot and shutdown intent flags
//!
//! `BootHowto` carries both the boot-time verbosity flags and the shutdown
//! intent a caller passes when asking the kernel to go down. The bit values
//! follow the traditional BSD `reboot(2)` layout so that values coming from
//! existing kernel code keep their meaning.

use bitflags::bitflags;

bitflags! {
    /// Boot options and shutdown intent
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BootHowto: u32 {
        /// Ask for the root file system
        const ASKNAME   = 0x0000_0001;
        /// Boot to single-user mode
        const SINGLE    = 0x0000_0002;
        /// Do not sync file systems before going down
        const NOSYNC    = 0x0000_0004;
        /// Halt instead of exiting
        const HALT      = 0x0000_0008;
        /// Enter the kernel debugger on boot
        const KDB       = 0x0000_0040;
        /// Mount root read-only
        const RDONLY    = 0x0000_0080;
        /// Dump core before going down
        const DUMP      = 0x0000_0100;
        /// Power down after halting
        const POWERDOWN = 0x0000_0808;
        /// Quiet boot messages
        const AB_QUIET   = 0x0001_0000;
        /// Silent boot messages
        const AB_SILENT  = 0x0002_0000;
        /// Verbose boot messages
        const AB_VERBOSE = 0x0004_0000;
        /// Debug boot messages
        const AB_DEBUG   = 0x0008_0000;
    }
}

impl BootHowto {
    /// Shutdown-intent bits, everything else is boot verbosity
    pub const SHUTDOWN_MASK: BootHowto = BootHowto::NOSYNC
        .union(BootHowto::HALT)
        .union(BootHowto::DUMP)
        .union(BootHowto::POWERDOWN);

    /// Returns the shutdown-intent part of the flags
    pub fn shutdown_intent(self) -> BootHowto {
        self & Self::SHUTDOWN_MASK
    }

    pub fn wants_dump(self) -> bool {
        self.contains(BootHowto::DUMP)
    }

    pub fn wants_sync(self) -> bool {
        !self.contains(BootHowto::NOSYNC)
    }

    pub fn wants_halt(self) -> bool {
        self.contains(BootHowto::HALT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_intent_strips_verbosity() {
        let how = BootHowto::AB_SILENT | BootHowto::HALT | BootHowto::NOSYNC;
        assert_eq!(how.shutdown_intent(), BootHowto::HALT | BootHowto::NOSYNC);
    }

    #[test]
    fn test_powerdown_implies_halt() {
        assert!(BootHowto::POWERDOWN.wants_halt());
        assert!(BootHowto::empty().wants_sync());
        assert!(!BootHowto::NOSYNC.wants_sync());
        assert!(BootHowto::DUMP.wants_dump());
    }
}
