//! `Ref`/`Unref` (§4.E "Memory and arrays").
//!
//! A `ref` value is a raw pointer to a register slot within the *same*
//! frame it was taken from. Since a frame's backing buffer is never
//! resized or moved after allocation (I5), that address stays valid for
//! the whole call, which is the only scope these two opcodes are ever
//! used across.

use crate::error::Trap;
use crate::frame::Frame;
use crate::interpreter::regs;
use crate::module::FunctionRecord;
use crate::types::Kind;

/// `Ref dst src`: stores the address of `R[src]`'s slot into `R[dst]`;
/// `T[dst]` must be `ref`.
pub fn make_ref(frame: &mut Frame, func: &FunctionRecord, dst: usize, src: usize) -> Result<(), Trap> {
    if regs::kind_of(func, dst)? != Kind::Ref {
        return Err(Trap::KindMismatch);
    }
    let addr = frame.slot_addr(src)? as u64;
    regs::write_ptr(frame, func, dst, addr)
}

/// `Unref dst refreg`: loads the pointee of `R[refreg]` into `R[dst]`, read
/// at `R[dst]`'s own declared width.
pub fn deref(frame: &mut Frame, func: &FunctionRecord, dst: usize, refreg: usize) -> Result<(), Trap> {
    if regs::kind_of(func, refreg)? != Kind::Ref {
        return Err(Trap::KindMismatch);
    }
    let addr = regs::read_ptr(frame, func, refreg)?;
    if addr == 0 {
        return Err(Trap::NullAccess);
    }
    let kind = regs::kind_of(func, dst)?;
    let size = kind.slot_size()?;
    let mut buf = vec![0u8; size];
    // SAFETY: `addr` was produced by `make_ref` from a live slot of this
    // same frame; the frame's buffer is never reallocated after
    // `Frame::allocate` (I5), so the address is still valid here.
    unsafe {
        std::ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), size);
    }
    frame.slot_mut(dst, kind)?.copy_from_slice(&buf);
    Ok(())
}
