//! Typed register access (§4.A, §4.C).
//!
//! Every opcode family reads and writes registers through these helpers
//! rather than poking frame bytes directly: each one looks up the
//! register's declared kind from the function record, checks it against
//! what the caller expects, then does a width-correct access (I1).

use crate::error::Trap;
use crate::frame::Frame;
use crate::module::{FunctionRecord, Module};
use crate::types::{Kind, TypeDescriptor};

/// The declared kind of register `r`, or [`Trap::FrameOverrun`] if `r` is
/// out of range for this function.
pub fn kind_of(func: &FunctionRecord, r: usize) -> Result<Kind, Trap> {
    func.registers.get(r).copied().ok_or(Trap::FrameOverrun)
}

/// The full type descriptor backing register `r`, for opcodes that need
/// more than a bare [`Kind`] (object layouts, virtual field lists, enum
/// constructors, function types).
pub fn type_of<'m>(
    module: &'m Module,
    func: &FunctionRecord,
    r: usize,
) -> Result<&'m TypeDescriptor, Trap> {
    let idx = func
        .register_types
        .get(r)
        .copied()
        .flatten()
        .ok_or(Trap::KindMismatch)?;
    module.types.get(idx).ok_or(Trap::KindMismatch)
}

/// Reads a boolean register.
pub fn read_bool(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<bool, Trap> {
    let kind = kind_of(func, r)?;
    if kind != Kind::Bool {
        return Err(Trap::KindMismatch);
    }
    Ok(frame.slot(r, kind)?[0] != 0)
}

/// Writes a boolean register.
pub fn write_bool(frame: &mut Frame, func: &FunctionRecord, r: usize, v: bool) -> Result<(), Trap> {
    let kind = kind_of(func, r)?;
    if kind != Kind::Bool {
        return Err(Trap::KindMismatch);
    }
    frame.slot_mut(r, kind)?[0] = v as u8;
    Ok(())
}

fn le_bits(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..b.len()].copy_from_slice(b);
    u64::from_le_bytes(buf)
}

/// Reads a reference-kind register as its raw bit pattern. `0` means null.
pub fn read_ptr(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<u64, Trap> {
    let kind = kind_of(func, r)?;
    if !kind.can_be_null() {
        return Err(Trap::KindMismatch);
    }
    Ok(le_bits(frame.slot(r, kind)?))
}

/// Writes a reference-kind register's raw bit pattern.
pub fn write_ptr(frame: &mut Frame, func: &FunctionRecord, r: usize, bits: u64) -> Result<(), Trap> {
    let kind = kind_of(func, r)?;
    if !kind.can_be_null() {
        return Err(Trap::KindMismatch);
    }
    let b = frame.slot_mut(r, kind)?;
    let full = bits.to_le_bytes();
    b.copy_from_slice(&full[..b.len()]);
    Ok(())
}

/// Zeroes a nullable register (`Null dst`).
pub fn write_null(frame: &mut Frame, func: &FunctionRecord, r: usize) -> Result<(), Trap> {
    write_ptr(frame, func, r, 0)
}

/// True if register `r` currently holds a null pointer.
pub fn is_null(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<bool, Trap> {
    Ok(read_ptr(frame, func, r)? == 0)
}

/// Reads an integer register, sign-extended to `i64`.
pub fn read_int(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<i64, Trap> {
    let kind = kind_of(func, r)?;
    let b = frame.slot(r, kind)?;
    Ok(match kind {
        Kind::U8 => b[0] as i64,
        Kind::U16 => u16::from_le_bytes(b.try_into().unwrap()) as i64,
        Kind::I32 => i32::from_le_bytes(b.try_into().unwrap()) as i64,
        Kind::I64 => i64::from_le_bytes(b.try_into().unwrap()),
        _ => return Err(Trap::KindMismatch),
    })
}

/// Reads an integer register, zero-extended to `u64` (unsigned reading of
/// the same bit pattern `read_int` would sign-extend).
pub fn read_uint(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<u64, Trap> {
    let kind = kind_of(func, r)?;
    let b = frame.slot(r, kind)?;
    Ok(match kind {
        Kind::U8 => b[0] as u64,
        Kind::U16 => u16::from_le_bytes(b.try_into().unwrap()) as u64,
        Kind::I32 => i32::from_le_bytes(b.try_into().unwrap()) as u32 as u64,
        Kind::I64 => i64::from_le_bytes(b.try_into().unwrap()) as u64,
        _ => return Err(Trap::KindMismatch),
    })
}

/// Writes an integer register, narrowing from `i64`.
pub fn write_int(frame: &mut Frame, func: &FunctionRecord, r: usize, v: i64) -> Result<(), Trap> {
    let kind = kind_of(func, r)?;
    let b = frame.slot_mut(r, kind)?;
    match kind {
        Kind::U8 => b[0] = v as u8,
        Kind::U16 => b.copy_from_slice(&(v as u16).to_le_bytes()),
        Kind::I32 => b.copy_from_slice(&(v as i32).to_le_bytes()),
        Kind::I64 => b.copy_from_slice(&v.to_le_bytes()),
        _ => return Err(Trap::KindMismatch),
    }
    Ok(())
}

/// Reads a float register, widened to `f64`.
pub fn read_float(frame: &Frame, func: &FunctionRecord, r: usize) -> Result<f64, Trap> {
    let kind = kind_of(func, r)?;
    let b = frame.slot(r, kind)?;
    Ok(match kind {
        Kind::F32 => f32::from_le_bytes(b.try_into().unwrap()) as f64,
        Kind::F64 => f64::from_le_bytes(b.try_into().unwrap()),
        _ => return Err(Trap::KindMismatch),
    })
}

/// Writes a float register, narrowing from `f64`.
pub fn write_float(frame: &mut Frame, func: &FunctionRecord, r: usize, v: f64) -> Result<(), Trap> {
    let kind = kind_of(func, r)?;
    let b = frame.slot_mut(r, kind)?;
    match kind {
        Kind::F32 => b.copy_from_slice(&(v as f32).to_le_bytes()),
        Kind::F64 => b.copy_from_slice(&v.to_le_bytes()),
        _ => return Err(Trap::KindMismatch),
    }
    Ok(())
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
            ty: FunctionType {
                params: vec![],
                ret: Kind::Void,
            },
            registers,
            register_types,
            ops: vec![],
        }
    }

    #[test]
    fn int_round_trips_through_i32_register() {
        let f = func(vec![Kind::I32]);
        let p = plan(&f, &NaturalAlignment).unwrap();
        let mut frame = Frame::allocate(&p);
        write_int(&mut frame, &f, 0, -7).unwrap();
        assert_eq!(read_int(&frame, &f, 0).unwrap(), -7);
    }

    #[test]
    fn ptr_register_starts_null() {
        let f = func(vec![Kind::Obj]);
        let p = plan(&f, &NaturalAlignment).unwrap();
        let frame = Frame::allocate(&p);
        assert!(is_null(&frame, &f, 0).unwrap());
    }

    #[test]
    fn kind_mismatch_traps_on_wrong_accessor() {
        let f = func(vec![Kind::Bool]);
        let p = plan(&f, &NaturalAlignment).unwrap();
        let frame = Frame::allocate(&p);
        assert_eq!(read_int(&frame, &f, 0), Err(Trap::KindMismatch));
    }
}
