//! Globals, object/virtual field access, arrays and raw memory (§4.E
//! "Globals and fields", "Memory and arrays").
//!
//! Object/struct field access and the virtual fast path never touch host
//! memory directly from the core; they hand the resolved
//! [`crate::types::FieldDescriptor`] to the host's [`DynamicRuntime`] (§6.3)
//! the way the original's `obj_field_fetch` hands an offset to the runtime
//! library, keeping heap access entirely behind the host boundary.

use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::{DynamicRuntime, FieldBits, HostRuntime, HostValue};
use crate::module::{FunctionRecord, GlobalSlot, Module};
use crate::types::{FieldDescriptor, Kind};

use super::regs;
use super::Interpreter;

pub(super) fn field_to_bits(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<FieldBits, Trap> {
    let kind = regs::kind_of(func, r)?;
    Ok(match kind {
        Kind::Bool => FieldBits::Int(regs::read_bool(frame, func, r)? as i64),
        k if k.is_int() => FieldBits::Int(regs::read_int(frame, func, r)?),
        k if k.is_float() => FieldBits::Float(regs::read_float(frame, func, r)?),
        k if k.can_be_null() => FieldBits::Ptr(HostValue { kind, bits: regs::read_ptr(frame, func, r)? }),
        _ => return Err(Trap::KindMismatch),
    })
}

pub(super) fn bits_to_field(frame: &mut Frame, func: &FunctionRecord, r: usize, bits: FieldBits) -> Result<(), Trap> {
    let kind = regs::kind_of(func, r)?;
    match (kind, bits) {
        (Kind::Bool, FieldBits::Int(v)) => regs::write_bool(frame, func, r, v != 0),
        (k, FieldBits::Int(v)) if k.is_int() => regs::write_int(frame, func, r, v),
        (k, FieldBits::Float(v)) if k.is_float() => regs::write_float(frame, func, r, v),
        (k, FieldBits::Ptr(hv)) if k.can_be_null() => regs::write_ptr(frame, func, r, hv.bits),
        _ => Err(Trap::KindMismatch),
    }
}

fn obj_value(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<HostValue, Trap> {
    let kind = regs::kind_of(func, r)?;
    if regs::is_null(frame, func, r)? {
        return Err(Trap::NullAccess);
    }
    Ok(HostValue { kind, bits: regs::read_ptr(frame, func, r)? })
}

impl<H: HostRuntime> Interpreter<H> {
    /// `GetGlobal dst global`.
    pub(super) fn op_get_global(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        global: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let slot = *self.module.globals.get(global).ok_or(Trap::FrameOverrun)?;
        if regs::kind_of(func, dst)? != slot.kind {
            return Err(Trap::KindMismatch.into());
        }
        let size = slot.kind.slot_size()?;
        let src = self
            .globals
            .get(slot.offset..slot.offset + size)
            .ok_or(Trap::FrameOverrun)?
            .to_vec();
        crate::transfer::copy(frame.slot_mut(dst, slot.kind)?, &src, slot.kind)?;
        Ok(())
    }

    /// `SetGlobal global src`.
    pub(super) fn op_set_global(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        global: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let slot: GlobalSlot = *self.module.globals.get(global).ok_or(Trap::FrameOverrun)?;
        if regs::kind_of(func, src)? != slot.kind {
            return Err(Trap::KindMismatch.into());
        }
        let size = slot.kind.slot_size()?;
        let dst = self
            .globals
            .get_mut(slot.offset..slot.offset + size)
            .ok_or(Trap::FrameOverrun)?;
        crate::transfer::copy(dst, frame.slot(src, slot.kind)?, slot.kind)?;
        Ok(())
    }

    fn dyn_get_hashed(
        &mut self,
        v: HostValue,
        field: &FieldDescriptor,
        dst_kind: Kind,
    ) -> Result<FieldBits, InterpreterError<H::Error>> {
        let dyn_rt = self.host.dynamic();
        Ok(match dst_kind {
            Kind::Bool | Kind::U8 | Kind::U16 | Kind::I32 => {
                FieldBits::Int(dyn_rt.dyn_geti(v, field.hash).map_err(|e| InterpreterError::Host(e.into()))?)
            }
            Kind::I64 => {
                FieldBits::Int(dyn_rt.dyn_geti64(v, field.hash).map_err(|e| InterpreterError::Host(e.into()))?)
            }
            Kind::F32 => FieldBits::Float(
                dyn_rt.dyn_getf(v, field.hash).map_err(|e| InterpreterError::Host(e.into()))? as f64,
            ),
            Kind::F64 => {
                FieldBits::Float(dyn_rt.dyn_getd(v, field.hash).map_err(|e| InterpreterError::Host(e.into()))?)
            }
            k if k.can_be_null() => {
                FieldBits::Ptr(dyn_rt.dyn_getp(v, field.hash).map_err(|e| InterpreterError::Host(e.into()))?)
            }
            _ => return Err(Trap::KindMismatch.into()),
        })
    }

    fn dyn_set_hashed(
        &mut self,
        v: HostValue,
        field: &FieldDescriptor,
        bits: FieldBits,
    ) -> Result<(), InterpreterError<H::Error>> {
        let dyn_rt = self.host.dynamic();
        match bits {
            FieldBits::Int(val) if field.ty == Kind::I64 => {
                dyn_rt.dyn_seti64(v, field.hash, val).map_err(|e| InterpreterError::Host(e.into()))
            }
            FieldBits::Int(val) => {
                dyn_rt.dyn_seti(v, field.hash, val).map_err(|e| InterpreterError::Host(e.into()))
            }
            FieldBits::Float(val) if field.ty == Kind::F32 => dyn_rt
                .dyn_setf(v, field.hash, val as f32)
                .map_err(|e| InterpreterError::Host(e.into())),
            FieldBits::Float(val) => {
                dyn_rt.dyn_setd(v, field.hash, val).map_err(|e| InterpreterError::Host(e.into()))
            }
            FieldBits::Ptr(val) => {
                dyn_rt.dyn_setp(v, field.hash, val).map_err(|e| InterpreterError::Host(e.into()))
            }
        }
    }

    fn read_field(
        &mut self,
        module: &Module,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        obj: usize,
        field_idx: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let obj_val = obj_value(frame, func, obj)?;
        let desc = regs::type_of(module, func, obj)?;
        let dst_kind = regs::kind_of(func, dst)?;
        let bits = match obj_val.kind {
            Kind::Obj | Kind::Struct => {
                let field = desc.object_layout()?.field(field_idx).ok_or(Trap::KindMismatch)?;
                self.host
                    .dynamic()
                    .obj_field_get(obj_val, field)
                    .map_err(|e| InterpreterError::Host(e.into()))?
            }
            Kind::Virtual => {
                let field = desc
                    .virtual_layout()?
                    .fields
                    .get(field_idx)
                    .ok_or(Trap::KindMismatch)?
                    .clone();
                match self
                    .host
                    .dynamic()
                    .virtual_fast_field_get(obj_val, &field)
                    .map_err(|e| InterpreterError::Host(e.into()))?
                {
                    Some(bits) => bits,
                    None => self.dyn_get_hashed(obj_val, &field, dst_kind)?,
                }
            }
            _ => return Err(Trap::KindMismatch.into()),
        };
        bits_to_field(frame, func, dst, bits)?;
        Ok(())
    }

    fn write_field(
        &mut self,
        module: &Module,
        frame: &Frame,
        func: &FunctionRecord,
        obj: usize,
        field_idx: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let obj_val = obj_value(frame, func, obj)?;
        let desc = regs::type_of(module, func, obj)?;
        let bits = field_to_bits(frame, func, src)?;
        match obj_val.kind {
            Kind::Obj | Kind::Struct => {
                let field = desc.object_layout()?.field(field_idx).ok_or(Trap::KindMismatch)?;
                self.host
                    .dynamic()
                    .obj_field_set(obj_val, field, bits)
                    .map_err(|e| InterpreterError::Host(e.into()))
            }
            Kind::Virtual => {
                let field = desc
                    .virtual_layout()?
                    .fields
                    .get(field_idx)
                    .ok_or(Trap::KindMismatch)?
                    .clone();
                let handled = self
                    .host
                    .dynamic()
                    .virtual_fast_field_set(obj_val, &field, bits)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                if handled {
                    Ok(())
                } else {
                    self.dyn_set_hashed(obj_val, &field, bits)
                }
            }
            _ => Err(Trap::KindMismatch.into()),
        }
    }

    /// `Field dst obj field`.
    pub(super) fn op_field(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        obj: usize,
        field_idx: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let module = std::sync::Arc::clone(&self.module);
        self.read_field(&module, frame, func, dst, obj, field_idx)
    }

    /// `GetThis dst field`: `Field dst 0 field`.
    pub(super) fn op_get_this(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        field_idx: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        self.op_field(frame, func, dst, 0, field_idx)
    }

    /// `SetField obj field src`.
    pub(super) fn op_set_field(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        obj: usize,
        field_idx: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let module = std::sync::Arc::clone(&self.module);
        self.write_field(&module, frame, func, obj, field_idx, src)
    }

    /// `SetThis field src`: `SetField 0 field src`.
    pub(super) fn op_set_this(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        field_idx: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        self.op_set_field(frame, func, 0, field_idx, src)
    }

    /// `DynSet dst name src`.
    pub(super) fn op_dyn_set(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        dst: usize,
        name: &str,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let dst_kind = regs::kind_of(func, dst)?;
        if !dst_kind.can_be_null() {
            return Err(Trap::KindMismatch.into());
        }
        let v = HostValue { kind: dst_kind, bits: regs::read_ptr(frame, func, dst)? };
        let bits = field_to_bits(frame, func, src)?;
        let src_kind = regs::kind_of(func, src)?;
        let hash = self.host.dynamic().hash_gen(name);
        let field = FieldDescriptor { hash, ty: src_kind, offset: 0 };
        self.dyn_set_hashed(v, &field, bits)
    }

    /// `ArraySize dst arr`.
    pub(super) fn op_array_size(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        arr: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let v = obj_value(frame, func, arr)?;
        let len = self.host.dynamic().array_len(v).map_err(|e| InterpreterError::Host(e.into()))?;
        regs::write_int(frame, func, dst, len as i64)?;
        Ok(())
    }

    /// `GetArray dst arr idx`.
    pub(super) fn op_get_array(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        arr: usize,
        idx: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let v = obj_value(frame, func, arr)?;
        let idx_kind = regs::kind_of(func, idx)?;
        let i = crate::transfer::read_index(frame.slot(idx, idx_kind)?, idx_kind)?;
        let elem_kind = regs::kind_of(func, dst)?;
        let bits = self
            .host
            .dynamic()
            .array_get(v, i, elem_kind)
            .map_err(|e| InterpreterError::Host(e.into()))?;
        bits_to_field(frame, func, dst, bits)?;
        Ok(())
    }

    /// `SetArray arr idx src`.
    pub(super) fn op_set_array(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        arr: usize,
        idx: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let v = obj_value(frame, func, arr)?;
        let idx_kind = regs::kind_of(func, idx)?;
        let i = crate::transfer::read_index(frame.slot(idx, idx_kind)?, idx_kind)?;
        let elem_kind = regs::kind_of(func, src)?;
        let bits = field_to_bits(frame, func, src)?;
        self.host
            .dynamic()
            .array_set(v, i, elem_kind, bits)
            .map_err(|e| InterpreterError::Host(e.into()))
    }

    fn op_mem_store(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        ptr: usize,
        offset: usize,
        kind: Kind,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let p = obj_value(frame, func, ptr)?;
        let off_kind = regs::kind_of(func, offset)?;
        let off = crate::transfer::read_index(frame.slot(offset, off_kind)?, off_kind)?;
        let bits = field_to_bits(frame, func, src)?;
        self.host
            .dynamic()
            .mem_store(p, off, kind, bits)
            .map_err(|e| InterpreterError::Host(e.into()))
    }

    /// `SetI8 ptr offset src`.
    pub(super) fn op_set_i8(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        ptr: usize,
        offset: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        self.op_mem_store(frame, func, ptr, offset, Kind::U8, src)
    }

    /// `SetI16 ptr offset src`.
    pub(super) fn op_set_i16(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        ptr: usize,
        offset: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        self.op_mem_store(frame, func, ptr, offset, Kind::U16, src)
    }

    /// `SetMem ptr offset src`.
    pub(super) fn op_set_mem(
        &mut self,
        frame: &Frame,
        func: &FunctionRecord,
        ptr: usize,
        offset: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let kind = regs::kind_of(func, src)?;
        self.op_mem_store(frame, func, ptr, offset, kind, src)
    }
}
