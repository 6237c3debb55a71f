//! Enum allocation and field access (§4.E "Enums").
//!
//! Mirrors [`crate::interpreter::fields`]: enum instances are opaque
//! `HostValue`s, and per-constructor field layout (from
//! [`crate::types::EnumConstructor::param_offsets`]) is handed to the host
//! rather than read through a raw pointer.

use std::sync::Arc;

use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::{DynamicRuntime, HostRuntime, HostValue};
use crate::module::FunctionRecord;
use crate::types::{FieldDescriptor, FieldHash, Kind};

use super::fields::{bits_to_field, field_to_bits};
use super::regs;
use super::Interpreter;

fn enum_value(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<HostValue, Trap> {
    if regs::kind_of(func, r)? != Kind::Enum {
        return Err(Trap::KindMismatch);
    }
    if regs::is_null(frame, func, r)? {
        return Err(Trap::NullAccess);
    }
    Ok(HostValue { kind: Kind::Enum, bits: regs::read_ptr(frame, func, r)? })
}

impl<H: HostRuntime> Interpreter<H> {
    /// `EnumAlloc dst ctor`.
    pub(super) fn op_enum_alloc(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        ctor: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        if regs::kind_of(func, dst)? != Kind::Enum {
            return Err(Trap::KindMismatch.into());
        }
        let module = Arc::clone(&self.module);
        let ty = regs::type_of(&module, func, dst)?;
        ty.constructor(ctor)?;
        let v = self
            .host
            .dynamic()
            .alloc_enum(ty, ctor)
            .map_err(|e| InterpreterError::Host(e.into()))?;
        regs::write_ptr(frame, func, dst, v.bits)?;
        Ok(())
    }

    /// `EnumIndex dst e`.
    pub(super) fn op_enum_index(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        e: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let v = enum_value(frame, func, e)?;
        let idx = self
            .host
            .dynamic()
            .enum_index(v)
            .map_err(|e| InterpreterError::Host(e.into()))?;
        regs::write_int(frame, func, dst, idx as i64)?;
        Ok(())
    }

    /// `EnumField dst e ctor field`.
    pub(super) fn op_enum_field(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        e: usize,
        ctor: usize,
        field_idx: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let v = enum_value(frame, func, e)?;
        let module = Arc::clone(&self.module);
        let ty = regs::type_of(&module, func, e)?;
        let c = ty.constructor(ctor)?;
        let field_kind = *c.params.get(field_idx).ok_or(Trap::KindMismatch)?;
        let offset = *c.param_offsets.get(field_idx).ok_or(Trap::KindMismatch)?;
        let field = FieldDescriptor { hash: FieldHash(0), ty: field_kind, offset };
        let bits = self
            .host
            .dynamic()
            .enum_field_get(v, ctor, &field)
            .map_err(|e| InterpreterError::Host(e.into()))?;
        bits_to_field(frame, func, dst, bits)?;
        Ok(())
    }

    /// `SetEnumField dst field src`: always writes constructor `0`, the only
    /// writable form (§4.E).
    pub(super) fn op_set_enum_field(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        dst: usize,
        field_idx: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let v = enum_value(frame, func, dst)?;
        let module = Arc::clone(&self.module);
        let ty = regs::type_of(&module, func, dst)?;
        let c = ty.constructor(0)?;
        let field_kind = *c.params.get(field_idx).ok_or(Trap::KindMismatch)?;
        let offset = *c.param_offsets.get(field_idx).ok_or(Trap::KindMismatch)?;
        let field = FieldDescriptor { hash: FieldHash(0), ty: field_kind, offset };
        let bits = field_to_bits(frame, func, src)?;
        self.host
            .dynamic()
            .enum_field_set(v, 0, &field, bits)
            .map_err(|e| InterpreterError::Host(e.into()))
    }
}
