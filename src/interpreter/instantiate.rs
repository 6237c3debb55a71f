//! Object/dynobj/virtual instantiation (§4.E "Instantiation").
//!
//! The one opcode that needs to know a destination register's full
//! [`TypeDescriptor`] just to pick *which* allocator to call: `obj`/`struct`
//! go through [`DynamicRuntime::alloc_obj`], `dynobj` through
//! [`DynamicRuntime::alloc_dynobj`], `virtual` through
//! [`DynamicRuntime::alloc_virtual`]. Every other destination kind is a
//! decode-time kind mismatch, mirroring the source's `HL_UNREACHABLE` default
//! case.

use std::sync::Arc;

use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::{DynamicRuntime, HostRuntime};
use crate::module::FunctionRecord;
use crate::types::Kind;

use super::regs;
use super::Interpreter;

impl<H: HostRuntime> Interpreter<H> {
    /// `Alloc dst`.
    pub(super) fn op_alloc(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let kind = regs::kind_of(func, dst)?;
        let module = Arc::clone(&self.module);
        let v = match kind {
            Kind::Obj | Kind::Struct => {
                let ty = regs::type_of(&module, func, dst)?;
                self.host.dynamic().alloc_obj(ty)
            }
            Kind::DynObj => self.host.dynamic().alloc_dynobj(),
            Kind::Virtual => {
                let ty = regs::type_of(&module, func, dst)?;
                self.host.dynamic().alloc_virtual(ty)
            }
            _ => return Err(Trap::KindMismatch.into()),
        }
        .map_err(|e| InterpreterError::Host(e.into()))?;
        regs::write_ptr(frame, func, dst, v.bits)?;
        Ok(())
    }
}
