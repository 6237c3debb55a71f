//! Type conversions (§4.E "Type conversions").
//!
//! `ToSFloat`/`ToUFloat` are pure register-to-register widenings and need no
//! host; `ToDyn`/`SafeCast`/`ToVirtual` box or cast through the dynamic
//! runtime, the way the original's `hl_alloc_dynamic`/`hl_dyn_cast*` pair
//! does.

use std::sync::Arc;

use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::{DynamicRuntime, HostRuntime, HostValue};
use crate::module::FunctionRecord;
use crate::types::{Kind, TypeDescriptor};

use super::regs;
use super::Interpreter;

/// `ToSFloat dst src`: signed integer to float.
pub fn to_sfloat(frame: &mut Frame, func: &FunctionRecord, dst: usize, src: usize) -> Result<(), Trap> {
    if !regs::kind_of(func, src)?.is_int() || !regs::kind_of(func, dst)?.is_float() {
        return Err(Trap::KindMismatch);
    }
    let v = regs::read_int(frame, func, src)? as f64;
    regs::write_float(frame, func, dst, v)
}

/// `ToUFloat dst src`: unsigned integer to float.
pub fn to_ufloat(frame: &mut Frame, func: &FunctionRecord, dst: usize, src: usize) -> Result<(), Trap> {
    if !regs::kind_of(func, src)?.is_int() || !regs::kind_of(func, dst)?.is_float() {
        return Err(Trap::KindMismatch);
    }
    let v = regs::read_uint(frame, func, src)? as f64;
    regs::write_float(frame, func, dst, v)
}

impl<H: HostRuntime> Interpreter<H> {
    /// `ToDyn dst src`: boxes `R[src]` into a dynamic value.
    pub(super) fn op_to_dyn(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        if regs::kind_of(func, dst)? != Kind::Dyn {
            return Err(Trap::KindMismatch.into());
        }
        let src_kind = regs::kind_of(func, src)?;
        let v = match src_kind {
            Kind::Bool => {
                let b = regs::read_bool(frame, func, src)?;
                self.host
                    .dynamic()
                    .alloc_dynbool(b)
                    .map_err(|e| InterpreterError::Host(e.into()))?
            }
            k if k.is_int() => {
                let bits = regs::read_int(frame, func, src)? as u64;
                let ty = TypeDescriptor::primitive(k);
                self.host
                    .dynamic()
                    .alloc_dynamic(&ty, bits)
                    .map_err(|e| InterpreterError::Host(e.into()))?
            }
            Kind::F32 => {
                let bits = (regs::read_float(frame, func, src)? as f32).to_bits() as u64;
                let ty = TypeDescriptor::primitive(Kind::F32);
                self.host
                    .dynamic()
                    .alloc_dynamic(&ty, bits)
                    .map_err(|e| InterpreterError::Host(e.into()))?
            }
            Kind::F64 => {
                let bits = regs::read_float(frame, func, src)?.to_bits();
                let ty = TypeDescriptor::primitive(Kind::F64);
                self.host
                    .dynamic()
                    .alloc_dynamic(&ty, bits)
                    .map_err(|e| InterpreterError::Host(e.into()))?
            }
            k if k.can_be_null() => HostValue { kind: k, bits: regs::read_ptr(frame, func, src)? },
            _ => return Err(Trap::KindMismatch.into()),
        };
        regs::write_ptr(frame, func, dst, v.bits)?;
        Ok(())
    }

    /// `SafeCast dst src`: typed cast through the dynamic runtime, selected
    /// by `T[dst]`.
    pub(super) fn op_safe_cast(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        let src_kind = regs::kind_of(func, src)?;
        if regs::is_null(frame, func, src)? {
            return Err(Trap::NullAccess.into());
        }
        let v = HostValue { kind: src_kind, bits: regs::read_ptr(frame, func, src)? };
        let dst_kind = regs::kind_of(func, dst)?;
        match dst_kind {
            Kind::Bool => {
                let r = self
                    .host
                    .dynamic()
                    .dyn_casti(v, dst_kind)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_bool(frame, func, dst, r != 0)?;
            }
            Kind::U8 | Kind::U16 | Kind::I32 => {
                let r = self
                    .host
                    .dynamic()
                    .dyn_casti(v, dst_kind)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_int(frame, func, dst, r)?;
            }
            Kind::I64 => {
                let r = self
                    .host
                    .dynamic()
                    .dyn_casti64(v, dst_kind)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_int(frame, func, dst, r)?;
            }
            Kind::F32 => {
                let r = self
                    .host
                    .dynamic()
                    .dyn_castf(v, dst_kind)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_float(frame, func, dst, r as f64)?;
            }
            Kind::F64 => {
                let r = self
                    .host
                    .dynamic()
                    .dyn_castd(v, dst_kind)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_float(frame, func, dst, r)?;
            }
            k if k.can_be_null() => {
                let r = self
                    .host
                    .dynamic()
                    .dyn_castp(v, dst_kind)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_ptr(frame, func, dst, r.bits)?;
            }
            _ => return Err(Trap::KindMismatch.into()),
        }
        Ok(())
    }

    /// `ToVirtual dst src`: obtains or constructs a virtual projection of
    /// `R[src]` against `T[dst]`'s virtual type.
    pub(super) fn op_to_virtual(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: usize,
        src: usize,
    ) -> Result<(), InterpreterError<H::Error>> {
        if regs::kind_of(func, dst)? != Kind::Virtual {
            return Err(Trap::KindMismatch.into());
        }
        let src_kind = regs::kind_of(func, src)?;
        if !src_kind.can_be_null() {
            return Err(Trap::KindMismatch.into());
        }
        let v = HostValue { kind: src_kind, bits: regs::read_ptr(frame, func, src)? };
        let module = Arc::clone(&self.module);
        let ty = regs::type_of(&module, func, dst)?;
        let result = self
            .host
            .dynamic()
            .to_virtual(ty, v)
            .map_err(|e| InterpreterError::Host(e.into()))?;
        regs::write_ptr(frame, func, dst, result.bits)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{plan, NaturalAlignment};
    use crate::types::FunctionType;

    fn func(registers: Vec<Kind>) -> FunctionRecord {
        let register_types = vec![None; registers.len()];
        FunctionRecord {
            findex: 0,
            ty: FunctionType { params: vec![], ret: Kind::Void },
            registers,
            register_types,
            ops: vec![],
        }
    }

    #[test]
    fn to_sfloat_widens_negative_integers() {
        let f = func(vec![Kind::F64, Kind::I32]);
        let p = plan(&f, &NaturalAlignment).unwrap();
        let mut frame = Frame::allocate(&p);
        regs::write_int(&mut frame, &f, 1, -5).unwrap();
        to_sfloat(&mut frame, &f, 0, 1).unwrap();
        assert_eq!(regs::read_float(&frame, &f, 0).unwrap(), -5.0);
    }

    #[test]
    fn to_ufloat_treats_negative_bit_pattern_as_large_unsigned() {
        let f = func(vec![Kind::F64, Kind::I32]);
        let p = plan(&f, &NaturalAlignment).unwrap();
        let mut frame = Frame::allocate(&p);
        regs::write_int(&mut frame, &f, 1, -1).unwrap();
        to_ufloat(&mut frame, &f, 0, 1).unwrap();
        assert_eq!(regs::read_float(&frame, &f, 0).unwrap(), u32::MAX as f64);
    }
}
