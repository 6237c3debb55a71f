//! Constants, moves, branch predicates and switch dispatch (§4.E).
//!
//! Like [`crate::interpreter::alu`], this family never touches the host:
//! branch predicates are pure functions of two registers, and constant
//! loads pull straight from the module's constant pools.

use crate::error::Trap;
use crate::frame::Frame;
use crate::interpreter::regs;
use crate::module::{ConstantPools, FunctionRecord};
use crate::opcode::JumpOffset;
use crate::types::Kind;

/// `Mov dst src`: `T[dst].kind` must equal `T[src].kind`.
pub fn mov(frame: &mut Frame, func: &FunctionRecord, dst: usize, src: usize) -> Result<(), Trap> {
    let kd = regs::kind_of(func, dst)?;
    let ks = regs::kind_of(func, src)?;
    if kd != ks {
        return Err(Trap::KindMismatch);
    }
    let buf = frame.slot(src, ks)?.to_vec();
    crate::transfer::copy(frame.slot_mut(dst, kd)?, &buf, kd)
}

/// `Int dst k`: writes `ints[k]` narrowed to `R[dst]`'s integer kind.
pub fn load_int(
    frame: &mut Frame,
    func: &FunctionRecord,
    pools: &ConstantPools,
    dst: usize,
    k: usize,
) -> Result<(), Trap> {
    let kind = regs::kind_of(func, dst)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let v = *pools.ints.get(k).ok_or(Trap::FrameOverrun)?;
    regs::write_int(frame, func, dst, v)
}

/// `Float dst k`: writes `floats[k]` as `R[dst]`'s float kind.
pub fn load_float(
    frame: &mut Frame,
    func: &FunctionRecord,
    pools: &ConstantPools,
    dst: usize,
    k: usize,
) -> Result<(), Trap> {
    let kind = regs::kind_of(func, dst)?;
    if !kind.is_float() {
        return Err(Trap::KindMismatch);
    }
    let v = *pools.floats.get(k).ok_or(Trap::FrameOverrun)?;
    regs::write_float(frame, func, dst, v)
}

/// `Bool dst v`: stores the low bit of `v`.
pub fn load_bool(frame: &mut Frame, func: &FunctionRecord, dst: usize, v: bool) -> Result<(), Trap> {
    regs::write_bool(frame, func, dst, v)
}

/// `Bytes dst k`: the core holds no real heap, so a byte-blob or
/// interned-string "pointer" is just `k + 1` (kept non-zero so it reads as
/// non-null); a host wanting the actual bytes resolves it back through
/// `Module::constants`.
pub fn load_bytes(
    frame: &mut Frame,
    func: &FunctionRecord,
    pools: &ConstantPools,
    dst: usize,
    k: usize,
) -> Result<(), Trap> {
    if regs::kind_of(func, dst)? != Kind::Bytes {
        return Err(Trap::KindMismatch);
    }
    pools.bytes_pos.get(k).ok_or(Trap::FrameOverrun)?;
    regs::write_ptr(frame, func, dst, k as u64 + 1)
}

/// `String dst k`: same opaque-index convention as [`load_bytes`]; register
/// kind must be `bytes`.
pub fn load_string(
    frame: &mut Frame,
    func: &FunctionRecord,
    pools: &ConstantPools,
    dst: usize,
    k: usize,
) -> Result<(), Trap> {
    if regs::kind_of(func, dst)? != Kind::Bytes {
        return Err(Trap::KindMismatch);
    }
    pools.strings.get(k).ok_or(Trap::FrameOverrun)?;
    regs::write_ptr(frame, func, dst, k as u64 + 1)
}

/// `LoadType dst k`: same opaque-index convention as [`load_bytes`]; loads
/// the type table entry at `k` as a value. Register kind must be `type`. No
/// host call needed: the type table is module data, not something a
/// dynamic-runtime allocator needs to produce.
pub fn load_type(
    frame: &mut Frame,
    func: &FunctionRecord,
    types_len: usize,
    dst: usize,
    k: usize,
) -> Result<(), Trap> {
    if regs::kind_of(func, dst)? != Kind::Type {
        return Err(Trap::KindMismatch);
    }
    if k >= types_len {
        return Err(Trap::FrameOverrun);
    }
    regs::write_ptr(frame, func, dst, k as u64 + 1)
}

/// `Null dst`: zeroes a nullable slot.
pub fn load_null(frame: &mut Frame, func: &FunctionRecord, dst: usize) -> Result<(), Trap> {
    let kind = regs::kind_of(func, dst)?;
    if !kind.can_be_null() {
        return Err(Trap::KindMismatch);
    }
    regs::write_null(frame, func, dst)
}

/// `NullCheck src`: traps with [`Trap::NullAccess`] if `R[src]` is null.
pub fn null_check(frame: &Frame, func: &FunctionRecord, src: usize) -> Result<(), Trap> {
    if regs::is_null(frame, func, src)? {
        return Err(Trap::NullAccess);
    }
    Ok(())
}

/// Adds a signed jump `offset` to the position immediately after the branch
/// opcode (§4.E "Comparisons and branches").
pub fn apply_offset(pc_after: usize, offset: JumpOffset) -> Result<usize, Trap> {
    let target = pc_after as isize + offset;
    usize::try_from(target).map_err(|_| Trap::ProgramCounterOutOfRange)
}

fn equal(frame: &Frame, func: &FunctionRecord, a: usize, b: usize) -> Result<bool, Trap> {
    let kind = regs::kind_of(func, a)?;
    if regs::kind_of(func, b)? != kind {
        return Err(Trap::KindMismatch);
    }
    Ok(match kind {
        Kind::Bool => regs::read_bool(frame, func, a)? == regs::read_bool(frame, func, b)?,
        Kind::F32 | Kind::F64 => {
            // IEEE-754 `==`: NaN is never equal to anything, including itself.
            regs::read_float(frame, func, a)? == regs::read_float(frame, func, b)?
        }
        k if k.is_int() => regs::read_int(frame, func, a)? == regs::read_int(frame, func, b)?,
        k if k.can_be_null() => regs::read_ptr(frame, func, a)? == regs::read_ptr(frame, func, b)?,
        _ => return Err(Trap::KindMismatch),
    })
}

/// `JEq a b offset`.
pub fn jeq(frame: &Frame, func: &FunctionRecord, a: usize, b: usize) -> Result<bool, Trap> {
    equal(frame, func, a, b)
}

/// `JNotEq a b offset`.
pub fn jnoteq(frame: &Frame, func: &FunctionRecord, a: usize, b: usize) -> Result<bool, Trap> {
    Ok(!equal(frame, func, a, b)?)
}

macro_rules! signed_cmp {
    ($name:ident, $op:tt) => {
        pub fn $name(frame: &Frame, func: &FunctionRecord, a: usize, b: usize) -> Result<bool, Trap> {
            let kind = regs::kind_of(func, a)?;
            if regs::kind_of(func, b)? != kind || !kind.is_number() {
                return Err(Trap::KindMismatch);
            }
            Ok(if kind.is_float() {
                regs::read_float(frame, func, a)? $op regs::read_float(frame, func, b)?
            } else {
                regs::read_int(frame, func, a)? $op regs::read_int(frame, func, b)?
            })
        }
    };
}

signed_cmp!(jslt, <);
signed_cmp!(jsgte, >=);
signed_cmp!(jslte, <=);
signed_cmp!(jsgt, >);

macro_rules! unsigned_cmp {
    ($name:ident, $op:tt) => {
        pub fn $name(frame: &Frame, func: &FunctionRecord, a: usize, b: usize) -> Result<bool, Trap> {
            let kind = regs::kind_of(func, a)?;
            if regs::kind_of(func, b)? != kind || !kind.is_int() {
                return Err(Trap::KindMismatch);
            }
            Ok(regs::read_uint(frame, func, a)? $op regs::read_uint(frame, func, b)?)
        }
    };
}

unsigned_cmp!(jult, <);
unsigned_cmp!(jugte, >=);

/// `Switch src table`: the table entry at `R[src]` if in range, otherwise
/// `None` (fall through) (§4.E, P5).
pub fn switch_target(
    frame: &Frame,
    func: &FunctionRecord,
    src: usize,
    table: &[JumpOffset],
) -> Result<Option<JumpOffset>, Trap> {
    let idx = crate::transfer::read_index(frame.slot(src, regs::kind_of(func, src)?)?, regs::kind_of(func, src)?)?;
    Ok(table.get(idx).copied())
}
