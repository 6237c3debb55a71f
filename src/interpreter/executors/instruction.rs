//! Per-opcode decode (§4.E).
//!
//! One big `match` over [`Opcode`], the Rust shape of `interp.c`'s central
//! `switch`. Each arm either calls a host-independent free function
//! ([`crate::interpreter::alu`], [`crate::interpreter::flow`],
//! [`crate::interpreter::refs`], [`crate::interpreter::convert`]) or an
//! `Interpreter` method that needs the host
//! ([`crate::interpreter::fields`], [`crate::interpreter::enums`], the call
//! bridge, conversions that box through the dynamic runtime).

use crate::call::ReturnSlot;
use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::{DynamicRuntime, HostRuntime, HostValue};
use crate::module::FunctionRecord;
use crate::opcode::{Opcode, Reg};
use crate::types::{Kind, POINTER_SIZE};

use crate::interpreter::{alu, convert, flow, refs, regs};
use crate::interpreter::Interpreter;

/// What the dispatch loop should do after one opcode (§7).
pub(crate) enum Flow {
    /// Advance to `pc + 1`.
    Continue,
    /// Jump to an absolute opcode index.
    Jump(usize),
    /// `Ret` fired; the loop should return.
    Return,
}

fn gather_args(frame: &Frame, func: &FunctionRecord, list: &[Reg]) -> Result<Vec<(Kind, Vec<u8>)>, Trap> {
    list.iter()
        .map(|&r| {
            let k = regs::kind_of(func, r)?;
            Ok((k, frame.slot(r, k)?.to_vec()))
        })
        .collect()
}

fn as_refs(owned: &[(Kind, Vec<u8>)]) -> Vec<(Kind, &[u8])> {
    owned.iter().map(|(k, b)| (*k, b.as_slice())).collect()
}

fn ptr_bytes(bits: u64) -> Vec<u8> {
    bits.to_le_bytes()[..POINTER_SIZE].to_vec()
}

impl<H: HostRuntime> Interpreter<H> {
    fn dispatch_call(
        &mut self,
        frame: &mut Frame,
        func: &FunctionRecord,
        dst: Reg,
        findex: usize,
        owned_args: Vec<(Kind, Vec<u8>)>,
    ) -> Result<Flow, InterpreterError<H::Error>> {
        let ret_kind = self
            .module
            .function_type(findex)
            .ok_or(Trap::UnresolvedFunction)?
            .ret;
        if regs::kind_of(func, dst)? != ret_kind {
            return Err(Trap::KindMismatch.into());
        }
        let mut ret_slot = ReturnSlot::for_kind(ret_kind)?;
        let refs = as_refs(&owned_args);
        self.call_into(findex, &refs, &mut ret_slot)?;
        crate::transfer::copy(frame.slot_mut(dst, ret_kind)?, ret_slot.bytes(), ret_kind)?;
        Ok(Flow::Continue)
    }

    pub(super) fn step(
        &mut self,
        func: &FunctionRecord,
        frame: &mut Frame,
        ret: &mut ReturnSlot,
        pc: usize,
        op: &Opcode,
    ) -> Result<Flow, InterpreterError<H::Error>> {
        use Opcode::*;
        Ok(match op {
            // -- Constants and moves --
            Mov { dst, src } => {
                flow::mov(frame, func, *dst, *src)?;
                Flow::Continue
            }
            Int { dst, k } => {
                let pools = self.module.constants.clone();
                flow::load_int(frame, func, &pools, *dst, *k)?;
                Flow::Continue
            }
            Float { dst, k } => {
                let pools = self.module.constants.clone();
                flow::load_float(frame, func, &pools, *dst, *k)?;
                Flow::Continue
            }
            Bool { dst, v } => {
                flow::load_bool(frame, func, *dst, *v)?;
                Flow::Continue
            }
            Bytes { dst, k } => {
                let pools = self.module.constants.clone();
                flow::load_bytes(frame, func, &pools, *dst, *k)?;
                Flow::Continue
            }
            String { dst, k } => {
                let pools = self.module.constants.clone();
                flow::load_string(frame, func, &pools, *dst, *k)?;
                Flow::Continue
            }
            Null { dst } => {
                flow::load_null(frame, func, *dst)?;
                Flow::Continue
            }

            // -- Arithmetic / logic / shifts --
            Add { dst, a, b } => {
                alu::add(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            Sub { dst, a, b } => {
                alu::sub(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            Mul { dst, a, b } => {
                alu::mul(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            SDiv { dst, a, b } => {
                alu::sdiv(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            UDiv { dst, a, b } => {
                alu::udiv(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            SMod { dst, a, b } => {
                alu::smod(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            UMod { dst, a, b } => {
                alu::umod(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            FDiv { dst, a, b } => {
                alu::fdiv(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            Shl { dst, a, b } => {
                alu::shl(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            SShr { dst, a, b } => {
                alu::sshr(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            UShr { dst, a, b } => {
                alu::ushr(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            And { dst, a, b } => {
                alu::and(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            Or { dst, a, b } => {
                alu::or(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }
            Xor { dst, a, b } => {
                alu::xor(frame, func, *dst, *a, *b)?;
                Flow::Continue
            }

            // -- Unary --
            Neg { dst, src } => {
                alu::neg(frame, func, *dst, *src)?;
                Flow::Continue
            }
            Not { dst, src } => {
                alu::not(frame, func, *dst, *src)?;
                Flow::Continue
            }
            Incr { dst } => {
                alu::incr(frame, func, *dst)?;
                Flow::Continue
            }
            Decr { dst } => {
                alu::decr(frame, func, *dst)?;
                Flow::Continue
            }

            // -- Comparisons and branches --
            JTrue { cond, offset } => {
                if regs::read_bool(frame, func, *cond)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JFalse { cond, offset } => {
                if !regs::read_bool(frame, func, *cond)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JNull { cond, offset } => {
                if regs::is_null(frame, func, *cond)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JNotNull { cond, offset } => {
                if !regs::is_null(frame, func, *cond)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JEq { a, b, offset } => {
                if flow::jeq(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JNotEq { a, b, offset } => {
                if flow::jnoteq(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JSLt { a, b, offset } => {
                if flow::jslt(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JSGte { a, b, offset } => {
                if flow::jsgte(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JSLte { a, b, offset } => {
                if flow::jslte(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JSGt { a, b, offset } => {
                if flow::jsgt(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JULt { a, b, offset } => {
                if flow::jult(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JUGte { a, b, offset } => {
                if flow::jugte(frame, func, *a, *b)? {
                    Flow::Jump(flow::apply_offset(pc + 1, *offset)?)
                } else {
                    Flow::Continue
                }
            }
            JAlways { offset } => Flow::Jump(flow::apply_offset(pc + 1, *offset)?),

            // -- Calls --
            Call0 { dst, fun } => self.dispatch_call(frame, func, *dst, *fun, Vec::new())?,
            Call1 { dst, fun, a0 } => {
                let args = gather_args(frame, func, &[*a0])?;
                self.dispatch_call(frame, func, *dst, *fun, args)?
            }
            Call2 { dst, fun, a0, a1 } => {
                let args = gather_args(frame, func, &[*a0, *a1])?;
                self.dispatch_call(frame, func, *dst, *fun, args)?
            }
            Call3 { dst, fun, a0, a1, a2 } => {
                let args = gather_args(frame, func, &[*a0, *a1, *a2])?;
                self.dispatch_call(frame, func, *dst, *fun, args)?
            }
            Call4 { dst, fun, a0, a1, a2, a3 } => {
                let args = gather_args(frame, func, &[*a0, *a1, *a2, *a3])?;
                self.dispatch_call(frame, func, *dst, *fun, args)?
            }
            CallN { dst, fun, args } => {
                let owned = gather_args(frame, func, args)?;
                self.dispatch_call(frame, func, *dst, *fun, owned)?
            }
            CallClosure { dst, fun, args } => {
                let fun_kind = regs::kind_of(func, *fun)?;
                if regs::is_null(frame, func, *fun)? {
                    return Err(Trap::NullAccess.into());
                }
                let v = HostValue { kind: fun_kind, bits: regs::read_ptr(frame, func, *fun)? };
                let (findex, recv) = self
                    .host
                    .dynamic()
                    .closure_target(v)
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                let mut owned = gather_args(frame, func, args)?;
                if let Some(r) = recv {
                    owned.insert(0, (Kind::Dyn, ptr_bytes(r.bits)));
                }
                self.dispatch_call(frame, func, *dst, findex, owned)?
            }
            InstanceClosure { dst, findex, obj } => {
                if regs::kind_of(func, *dst)? != Kind::Fun {
                    return Err(Trap::KindMismatch.into());
                }
                let obj_kind = regs::kind_of(func, *obj)?;
                let recv = HostValue { kind: obj_kind, bits: regs::read_ptr(frame, func, *obj)? };
                let module = std::sync::Arc::clone(&self.module);
                let ty = regs::type_of(&module, func, *dst)?;
                let v = self
                    .host
                    .dynamic()
                    .alloc_closure_ptr(ty, *findex, Some(recv))
                    .map_err(|e| InterpreterError::Host(e.into()))?;
                regs::write_ptr(frame, func, *dst, v.bits)?;
                Flow::Continue
            }
            CallMethod { .. } | CallThis { .. } => return Err(Trap::UnimplementedOpcode.into()),

            // -- Globals and fields --
            GetGlobal { dst, global } => {
                self.op_get_global(frame, func, *dst, *global)?;
                Flow::Continue
            }
            SetGlobal { global, src } => {
                self.op_set_global(frame, func, *global, *src)?;
                Flow::Continue
            }
            Field { dst, obj, field } => {
                self.op_field(frame, func, *dst, *obj, *field)?;
                Flow::Continue
            }
            GetThis { dst, field } => {
                self.op_get_this(frame, func, *dst, *field)?;
                Flow::Continue
            }
            SetField { obj, field, src } => {
                self.op_set_field(frame, func, *obj, *field, *src)?;
                Flow::Continue
            }
            SetThis { field, src } => {
                self.op_set_this(frame, func, *field, *src)?;
                Flow::Continue
            }
            DynSet { dst, name, src } => {
                self.op_dyn_set(frame, func, *dst, name, *src)?;
                Flow::Continue
            }

            // -- Memory and arrays --
            GetArray { dst, arr, idx } => {
                self.op_get_array(frame, func, *dst, *arr, *idx)?;
                Flow::Continue
            }
            SetArray { arr, idx, src } => {
                self.op_set_array(frame, func, *arr, *idx, *src)?;
                Flow::Continue
            }
            SetI8 { ptr, offset, src } => {
                self.op_set_i8(frame, func, *ptr, *offset, *src)?;
                Flow::Continue
            }
            SetI16 { ptr, offset, src } => {
                self.op_set_i16(frame, func, *ptr, *offset, *src)?;
                Flow::Continue
            }
            SetMem { ptr, offset, src } => {
                self.op_set_mem(frame, func, *ptr, *offset, *src)?;
                Flow::Continue
            }
            ArraySize { dst, arr } => {
                self.op_array_size(frame, func, *dst, *arr)?;
                Flow::Continue
            }
            Ref { dst, src } => {
                refs::make_ref(frame, func, *dst, *src)?;
                Flow::Continue
            }
            Unref { dst, refreg } => {
                refs::deref(frame, func, *dst, *refreg)?;
                Flow::Continue
            }

            // -- Type conversions --
            ToDyn { dst, src } => {
                self.op_to_dyn(frame, func, *dst, *src)?;
                Flow::Continue
            }
            ToSFloat { dst, src } => {
                convert::to_sfloat(frame, func, *dst, *src)?;
                Flow::Continue
            }
            ToUFloat { dst, src } => {
                convert::to_ufloat(frame, func, *dst, *src)?;
                Flow::Continue
            }
            SafeCast { dst, src } => {
                self.op_safe_cast(frame, func, *dst, *src)?;
                Flow::Continue
            }
            ToVirtual { dst, src } => {
                self.op_to_virtual(frame, func, *dst, *src)?;
                Flow::Continue
            }

            // -- Instantiation --
            Alloc { dst } => {
                self.op_alloc(frame, func, *dst)?;
                Flow::Continue
            }
            LoadType { dst, k } => {
                flow::load_type(frame, func, self.module.types.len(), *dst, *k)?;
                Flow::Continue
            }

            // -- Enums --
            EnumAlloc { dst, ctor } => {
                self.op_enum_alloc(frame, func, *dst, *ctor)?;
                Flow::Continue
            }
            EnumIndex { dst, e } => {
                self.op_enum_index(frame, func, *dst, *e)?;
                Flow::Continue
            }
            EnumField { dst, e, ctor, field } => {
                self.op_enum_field(frame, func, *dst, *e, *ctor, *field)?;
                Flow::Continue
            }
            SetEnumField { dst, field, src } => {
                self.op_set_enum_field(frame, func, *dst, *field, *src)?;
                Flow::Continue
            }

            // -- Switch --
            Switch { src, table } => match flow::switch_target(frame, func, *src, table)? {
                Some(offset) => Flow::Jump(flow::apply_offset(pc + 1, offset)?),
                None => Flow::Continue,
            },

            // -- Other --
            Label => Flow::Continue,
            Ret { src } => {
                let kind = regs::kind_of(func, *src)?;
                if kind != ret.kind() {
                    return Err(Trap::ReturnTypeMismatch.into());
                }
                crate::transfer::copy(ret.bytes_mut(), frame.slot(*src, kind)?, kind)?;
                Flow::Return
            }
            NullCheck { src } => {
                flow::null_check(frame, func, *src)?;
                Flow::Continue
            }

            _ => return Err(Trap::UnknownOpcode.into()),
        })
    }
}
