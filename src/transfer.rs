//! Width-correct typed slot copies (§4.C).
//!
//! This is the Rust shape of `hl_copy_type_data`/`hl_copy_type_data_until`
//! from the original C engine: dispatch once on the register kind, then do a
//! plain `memcpy`-equivalent of exactly that kind's slot size. Kept as a
//! small, inlinable free function rather than a trait so the dispatch loop
//! can call it without indirection on the hot path.

use crate::error::Trap;
use crate::types::Kind;

/// Copies exactly `kind.slot_size()` bytes from `src` to `dst`.
///
/// Both slices must be at least `kind.slot_size()` bytes long; callers in
/// this crate always pass frame sub-slices sized by the layout planner, so
/// this is an assertion rather than a recoverable error in practice, but we
/// still surface [`Trap::FrameOverrun`] defensively.
pub fn copy(dst: &mut [u8], src: &[u8], kind: Kind) -> Result<(), Trap> {
    let n = kind.slot_size()?;
    if dst.len() < n || src.len() < n {
        return Err(Trap::FrameOverrun);
    }
    dst[..n].copy_from_slice(&src[..n]);
    Ok(())
}

/// Copies `min(kind.slot_size(), max_n)` bytes from `src` to `dst`.
///
/// Used when a wider or narrower integer is zero-extended into a host-sized
/// temporary for indexing/switching (§4.C, §10.5).
pub fn copy_min(dst: &mut [u8], src: &[u8], kind: Kind, max_n: usize) -> Result<(), Trap> {
    let n = kind.slot_size()?.min(max_n);
    if dst.len() < n || src.len() < n {
        return Err(Trap::FrameOverrun);
    }
    dst[..n].copy_from_slice(&src[..n]);
    Ok(())
}

/// Reads a little-endian host-sized unsigned integer out of a slot,
/// zero-extending narrower kinds. Used by `GetArray`/`SetArray`/`Switch`,
/// which interpret their index/selector operand as a host-sized unsigned
/// integer (§4.E).
pub fn read_index(src: &[u8], kind: Kind) -> Result<usize, Trap> {
    use Kind::*;
    Ok(match kind {
        U8 => src.first().copied().ok_or(Trap::FrameOverrun)? as usize,
        U16 => u16::from_le_bytes(src.get(..2).ok_or(Trap::FrameOverrun)?.try_into().unwrap()) as usize,
        I32 => {
            i32::from_le_bytes(src.get(..4).ok_or(Trap::FrameOverrun)?.try_into().unwrap()) as u32 as usize
        }
        I64 => {
            i64::from_le_bytes(src.get(..8).ok_or(Trap::FrameOverrun)?.try_into().unwrap()) as u64 as usize
        }
        _ => return Err(Trap::KindMismatch),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_i32_moves_exactly_four_bytes() {
        let src = [0x11, 0x22, 0x33, 0x44, 0xFF, 0xFF];
        let mut dst = [0u8; 6];
        copy(&mut dst, &src, Kind::I32).unwrap();
        assert_eq!(&dst[..4], &src[..4]);
        assert_eq!(&dst[4..], &[0, 0]);
    }

    #[test]
    fn copy_min_narrows_to_the_smaller_side() {
        let src = [0xAAu8; 8];
        let mut dst = [0u8; 2];
        copy_min(&mut dst, &src, Kind::I64, 2).unwrap();
        assert_eq!(dst, [0xAA, 0xAA]);
    }

    #[test]
    fn copy_rejects_packed_kind() {
        let src = [0u8; 8];
        let mut dst = [0u8; 8];
        assert_eq!(copy(&mut dst, &src, Kind::Packed), Err(Trap::PackedType));
    }

    #[test]
    fn read_index_zero_extends_u16() {
        let src = [0xFF, 0x00];
        assert_eq!(read_index(&src, Kind::U16).unwrap(), 0xFF);
    }
}
