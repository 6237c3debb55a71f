//! Arithmetic, logic, shift and unary opcode semantics (§4.E).
//!
//! None of this family touches the host: every operand is a plain register
//! read/write over the current frame. Kept as free functions rather than
//! `Interpreter` methods, the way `fuel-vm`'s own `alu::*` helpers stay
//! callable without a live host borrow.

use crate::error::Trap;
use crate::frame::Frame;
use crate::interpreter::regs;
use crate::module::FunctionRecord;
use crate::types::Kind;

fn same_kind(func: &FunctionRecord, a: usize, b: usize) -> Result<Kind, Trap> {
    let ka = regs::kind_of(func, a)?;
    let kb = regs::kind_of(func, b)?;
    if ka != kb {
        return Err(Trap::KindMismatch);
    }
    Ok(ka)
}

macro_rules! binary_numeric {
    ($name:ident, $int_op:expr, $float_op:expr) => {
        pub fn $name(
            frame: &mut Frame,
            func: &FunctionRecord,
            dst: usize,
            a: usize,
            b: usize,
        ) -> Result<(), Trap> {
            let kind = same_kind(func, a, b)?;
            if !kind.is_number() {
                return Err(Trap::KindMismatch);
            }
            if kind.is_float() {
                let x = regs::read_float(frame, func, a)?;
                let y = regs::read_float(frame, func, b)?;
                regs::write_float(frame, func, dst, $float_op(x, y))
            } else {
                let x = regs::read_int(frame, func, a)?;
                let y = regs::read_int(frame, func, b)?;
                regs::write_int(frame, func, dst, $int_op(x, y))
            }
        }
    };
}

binary_numeric!(add, |x: i64, y: i64| x.wrapping_add(y), |x: f64, y: f64| x + y);
binary_numeric!(sub, |x: i64, y: i64| x.wrapping_sub(y), |x: f64, y: f64| x - y);
binary_numeric!(mul, |x: i64, y: i64| x.wrapping_mul(y), |x: f64, y: f64| x * y);

macro_rules! binary_integer {
    ($name:ident, $op:expr) => {
        pub fn $name(
            frame: &mut Frame,
            func: &FunctionRecord,
            dst: usize,
            a: usize,
            b: usize,
        ) -> Result<(), Trap> {
            let kind = same_kind(func, a, b)?;
            if !kind.is_int() {
                return Err(Trap::KindMismatch);
            }
            let x = regs::read_int(frame, func, a)?;
            let y = regs::read_int(frame, func, b)?;
            regs::write_int(frame, func, dst, $op(x, y))
        }
    };
}

binary_integer!(shl, |x: i64, y: i64| x.wrapping_shl(y as u32));
binary_integer!(sshr, |x: i64, y: i64| x.wrapping_shr(y as u32));
binary_integer!(and, |x: i64, y: i64| x & y);
binary_integer!(or, |x: i64, y: i64| x | y);
binary_integer!(xor, |x: i64, y: i64| x ^ y);

/// Logical (unsigned) right shift; reinterprets both operands as unsigned
/// before shifting, matching the JIT's `UShr` contract (§4.E).
pub fn ushr(frame: &mut Frame, func: &FunctionRecord, dst: usize, a: usize, b: usize) -> Result<(), Trap> {
    let kind = same_kind(func, a, b)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let x = regs::read_uint(frame, func, a)?;
    let y = regs::read_uint(frame, func, b)?;
    regs::write_int(frame, func, dst, x.wrapping_shr(y as u32) as i64)
}

/// Signed integer division; division by zero yields `0` rather than
/// trapping (P6).
pub fn sdiv(frame: &mut Frame, func: &FunctionRecord, dst: usize, a: usize, b: usize) -> Result<(), Trap> {
    let kind = same_kind(func, a, b)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let x = regs::read_int(frame, func, a)?;
    let y = regs::read_int(frame, func, b)?;
    let v = if y == 0 { 0 } else { x.wrapping_div(y) };
    regs::write_int(frame, func, dst, v)
}

/// Unsigned integer division; division by zero yields `0` (P6).
pub fn udiv(frame: &mut Frame, func: &FunctionRecord, dst: usize, a: usize, b: usize) -> Result<(), Trap> {
    let kind = same_kind(func, a, b)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let x = regs::read_uint(frame, func, a)?;
    let y = regs::read_uint(frame, func, b)?;
    let v = if y == 0 { 0 } else { x / y };
    regs::write_int(frame, func, dst, v as i64)
}

/// Signed integer modulo; modulo by zero yields `0` (P6).
pub fn smod(frame: &mut Frame, func: &FunctionRecord, dst: usize, a: usize, b: usize) -> Result<(), Trap> {
    let kind = same_kind(func, a, b)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let x = regs::read_int(frame, func, a)?;
    let y = regs::read_int(frame, func, b)?;
    let v = if y == 0 { 0 } else { x.wrapping_rem(y) };
    regs::write_int(frame, func, dst, v)
}

/// Unsigned integer modulo; modulo by zero yields `0` (P6).
pub fn umod(frame: &mut Frame, func: &FunctionRecord, dst: usize, a: usize, b: usize) -> Result<(), Trap> {
    let kind = same_kind(func, a, b)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let x = regs::read_uint(frame, func, a)?;
    let y = regs::read_uint(frame, func, b)?;
    let v = if y == 0 { 0 } else { x % y };
    regs::write_int(frame, func, dst, v as i64)
}

/// Float division; division by zero yields `0.0`, distinguished between
/// `f32`/`f64` by the operand kind (§4.E `FDiv`).
pub fn fdiv(frame: &mut Frame, func: &FunctionRecord, dst: usize, a: usize, b: usize) -> Result<(), Trap> {
    let kind = same_kind(func, a, b)?;
    if !kind.is_float() {
        return Err(Trap::KindMismatch);
    }
    let x = regs::read_float(frame, func, a)?;
    let y = regs::read_float(frame, func, b)?;
    let v = if y == 0.0 { 0.0 } else { x / y };
    regs::write_float(frame, func, dst, v)
}

/// Arithmetic negation, numeric kinds only.
pub fn neg(frame: &mut Frame, func: &FunctionRecord, dst: usize, src: usize) -> Result<(), Trap> {
    let kind = regs::kind_of(func, src)?;
    if regs::kind_of(func, dst)? != kind || !kind.is_number() {
        return Err(Trap::KindMismatch);
    }
    if kind.is_float() {
        let v = regs::read_float(frame, func, src)?;
        regs::write_float(frame, func, dst, -v)
    } else {
        let v = regs::read_int(frame, func, src)?;
        regs::write_int(frame, func, dst, v.wrapping_neg())
    }
}

/// Boolean negation.
pub fn not(frame: &mut Frame, func: &FunctionRecord, dst: usize, src: usize) -> Result<(), Trap> {
    let v = regs::read_bool(frame, func, src)?;
    regs::write_bool(frame, func, dst, !v)
}

/// `R[dst] += 1`, integer kinds only.
pub fn incr(frame: &mut Frame, func: &FunctionRecord, dst: usize) -> Result<(), Trap> {
    let kind = regs::kind_of(func, dst)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let v = regs::read_int(frame, func, dst)?;
    regs::write_int(frame, func, dst, v.wrapping_add(1))
}

/// `R[dst] -= 1`, integer kinds only.
pub fn decr(frame: &mut Frame, func: &FunctionRecord, dst: usize) -> Result<(), Trap> {
    let kind = regs::kind_of(func, dst)?;
    if !kind.is_int() {
        return Err(Trap::KindMismatch);
    }
    let v = regs::read_int(frame, func, dst)?;
    regs::write_int(frame, func, dst, v.wrapping_sub(1))
}
