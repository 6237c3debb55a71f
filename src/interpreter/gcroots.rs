//! GC-root registration (§4.F, component F).
//!
//! On frame entry, every register whose kind can hold a heap pointer is
//! registered as a root; on every exit path — a normal `Ret` or an early
//! trap — every such address is unregistered again before the frame buffer
//! is released (I3, P3).

use crate::error::InterpreterError;
use crate::frame::Frame;
use crate::host::HostRuntime;
use crate::module::FunctionRecord;

use super::Interpreter;

impl<H: HostRuntime> Interpreter<H> {
    pub(super) fn register_roots(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
    ) -> Result<Vec<usize>, InterpreterError<H::Error>> {
        let mut addrs = Vec::new();
        for (k, kind) in func.registers.iter().enumerate() {
            if self.host.is_ptr(*kind) {
                let addr = frame.slot_addr(k)?;
                self.host.add_root(addr);
                addrs.push(addr);
            }
        }
        Ok(addrs)
    }

    pub(super) fn unregister_roots(&mut self, addrs: &[usize]) {
        for &addr in addrs {
            self.host.remove_root(addr);
        }
    }
}
