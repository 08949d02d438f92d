//! Per-context execution state
//!
//! Each kernel execution context carries who it runs for (the local
//! process or a remote client's address space) and whether it currently
//! sits inside a passive-serialization read section, where sleeping is
//! forbidden.

use alloc::boxed::Box;
use core::any::Any;
use core::cell::Cell;

use hostk_api::types::{ControlContext, VmSpaceId};

/// Execution state of one kernel context
pub struct ExecContext {
    vmspace: Option<VmSpaceId>,
    read_depth: Cell<u32>,
    emul_data: Option<Box<dyn Any + Send>>,
}

impl ExecContext {
    /// A context running on behalf of the local process
    pub fn local() -> Self {
        Self {
            vmspace: None,
            read_depth: Cell::new(0),
            emul_data: None,
        }
    }

    /// A context serving a remote client's address space
    pub fn remote(vmspace: VmSpaceId) -> Self {
        Self {
            vmspace: Some(vmspace),
            ..Self::local()
        }
    }

    pub fn is_local(&self) -> bool {
        self.vmspace.is_none()
    }

    /// Control context handed to the remote session layer on teardown
    pub fn control_context(&self) -> Option<ControlContext> {
        self.vmspace.map(ControlContext::from)
    }

    /// Enters a read section; sleeping is forbidden until the guard drops
    pub fn enter_read_section(&self) -> ReadSectionGuard<'_> {
        self.read_depth.set(self.read_depth.get() + 1);
        ReadSectionGuard { ctx: self }
    }

    pub fn in_read_section(&self) -> bool {
        self.read_depth.get() != 0
    }

    pub fn emul_data(&self) -> Option<&(dyn Any + Send)> {
        self.emul_data.as_deref()
    }

    pub fn set_emul_data(&mut self, data: Box<dyn Any + Send>) {
        self.emul_data = Some(data);
    }

    pub(crate) fn clear_emul_data(&mut self) {
        self.emul_data = None;
    }
}

/// Live read section, see [`ExecContext::enter_read_section`]
pub struct ReadSectionGuard<'a> {
    ctx: &'a ExecContext,
}

impl Drop for ReadSectionGuard<'_> {
    fn drop(&mut self) {
        let depth = self.ctx.read_depth.get();
        self.ctx.read_depth.set(depth - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sections_nest() {
        let ctx = ExecContext::local();
        assert!(!ctx.in_read_section());
        {
            let _outer = ctx.enter_read_section();
            {
                let _inner = ctx.enter_read_section();
                assert!(ctx.in_read_section());
            }
            assert!(ctx.in_read_section());
        }
        assert!(!ctx.in_read_section());
    }

    #[test]
    fn test_control_context() {
        assert_eq!(ExecContext::local().control_context(), None);
        let ctx = ExecContext::remote(VmSpaceId(7));
        assert!(!ctx.is_local());
        assert_eq!(ctx.control_context(), Some(ControlContext(7)));
    }
}
