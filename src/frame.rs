//! Register-frame layout planning and the live frame buffer (§3, §4.B).
//!
//! The planner computes, once per function at module init, the byte offset
//! of every register and the function's total frame size (I5: these offsets
//! never change for the module's lifetime). [`Frame`] is the live buffer a
//! call bridge allocates from that plan.

use crate::error::Trap;
use crate::module::FunctionRecord;
use crate::types::Kind;

/// Per-function byte offsets, as computed by [`plan`].
///
/// `offsets[k]` is register `k`'s starting byte offset; `offsets[nregs]`
/// (one past the last register) is the total frame size (§4.B).
#[derive(Debug, Clone, Default)]
pub struct FramePlan {
    offsets: Vec<usize>,
}

impl FramePlan {
    /// Byte offset of register `k`, or [`Trap::FrameOverrun`] if out of
    /// range.
    pub fn offset(&self, k: usize) -> Result<usize, Trap> {
        self.offsets.get(k).copied().ok_or(Trap::FrameOverrun)
    }

    /// Total frame byte count (`offsets[nregs]`).
    pub fn frame_size(&self) -> usize {
        *self.offsets.last().unwrap_or(&0)
    }

    /// Number of registers this plan covers.
    pub fn register_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Host-supplied alignment rule (§6.2 "per-type alignment padding for a
/// given current offset"). A default natural-alignment rule is provided in
/// [`natural_padding`] for hosts that don't need anything fancier.
pub trait AlignmentRule {
    /// Bytes of padding needed before placing a slot of `kind` at byte
    /// offset `current`.
    fn pad(&self, current: usize, kind: Kind) -> Result<usize, Trap>;
}

/// Aligns each slot to its own natural size (capped at pointer size), the
/// same rule most ahead-of-time compilers for this kind of bytecode use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalAlignment;

impl AlignmentRule for NaturalAlignment {
    fn pad(&self, current: usize, kind: Kind) -> Result<usize, Trap> {
        let size = kind.slot_size()?;
        if size == 0 {
            return Ok(0);
        }
        let align = size.min(crate::types::POINTER_SIZE);
        let misalignment = current % align;
        Ok(if misalignment == 0 { 0 } else { align - misalignment })
    }
}

/// Computes the [`FramePlan`] for a single function (§4.B).
pub fn plan(function: &FunctionRecord, rule: &impl AlignmentRule) -> Result<FramePlan, Trap> {
    let mut offsets = Vec::with_capacity(function.registers.len() + 1);
    let mut cursor = 0usize;
    offsets.push(0);
    for &kind in &function.registers {
        cursor += rule.pad(cursor, kind)?;
        cursor += kind.slot_size()?;
        offsets.push(cursor);
    }
    Ok(FramePlan { offsets })
}

/// Computes the frame plan for every function in a module, indexed by
/// physical function index (§4.B "Offsets are stored per function").
pub fn plan_module(
    functions: &[FunctionRecord],
    rule: &impl AlignmentRule,
) -> Result<Vec<FramePlan>, Trap> {
    functions.iter().map(|f| plan(f, rule)).collect()
}

/// A live register frame: a contiguous byte buffer sized by a [`FramePlan`]
/// (§3 "Register frame").
///
/// The frame is never resized after allocation (I5); all accessors are
/// bounds-checked against the plan rather than against `Vec` capacity
/// directly, so an off-by-one in the planner surfaces as [`Trap::FrameOverrun`]
/// rather than a panic.
#[derive(Debug)]
pub struct Frame<'p> {
    plan: &'p FramePlan,
    bytes: Vec<u8>,
}

impl<'p> Frame<'p> {
    /// Allocates a zero-initialized frame for `plan`.
    pub fn allocate(plan: &'p FramePlan) -> Self {
        Self {
            plan,
            bytes: vec![0u8; plan.frame_size()],
        }
    }

    /// Byte slice for register `k`'s slot, sized to its declared kind.
    pub fn slot(&self, k: usize, kind: Kind) -> Result<&[u8], Trap> {
        let start = self.plan.offset(k)?;
        let size = kind.slot_size()?;
        self.bytes
            .get(start..start + size)
            .ok_or(Trap::FrameOverrun)
    }

    /// Mutable byte slice for register `k`'s slot.
    pub fn slot_mut(&mut self, k: usize, kind: Kind) -> Result<&mut [u8], Trap> {
        let start = self.plan.offset(k)?;
        let size = kind.slot_size()?;
        self.bytes
            .get_mut(start..start + size)
            .ok_or(Trap::FrameOverrun)
    }

    /// The byte address of register `k`'s slot, used to register/unregister
    /// GC roots (§4.F). Valid only while this frame is alive.
    pub fn slot_addr(&self, k: usize) -> Result<usize, Trap> {
        let start = self.plan.offset(k)?;
        Ok(self.bytes.as_ptr() as usize + start)
    }

    /// The plan backing this frame.
    pub fn plan(&self) -> &FramePlan {
        self.plan
    }

    /// Zero-initializes the byte range `[from, to)`, used by the call
    /// bridge to clear non-argument registers on entry (§4.D).
    pub fn zero_range(&mut self, from: usize, to: usize) -> Result<(), Trap> {
        self.bytes
            .get_mut(from..to)
            .ok_or(Trap::FrameOverrun)?
            .fill(0);
        Ok(())
    }
}
