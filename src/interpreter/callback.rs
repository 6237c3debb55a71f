//! The C→bytecode callback handle (§4.G, component G).
//!
//! Handed to [`crate::host::NativeFfi::call`] so a native implementation can
//! re-enter the interpreter. The call chain is `native_call` →
//! `host.ffi().call(..)` → (possibly) `callback.call_back(..)` → `call_into`
//! again, which needs its own `&mut` access to the host nested inside the
//! borrow the outer `host.ffi()` call already holds; there's no way to
//! express "these two borrows are sequential, never concurrent" to the
//! borrow checker without a raw pointer. The original engine has the same
//! shape with a single mutable global context pointer (§9); this keeps the
//! pointer scoped to one call instead of process-global (§10.5).

use crate::call::ReturnSlot;
use crate::error::InterpreterError;
use crate::host::{BytecodeReentry, HostRuntime};
use crate::types::Kind;

use super::Interpreter;

/// Re-entry handle for one native call.
pub struct Callback<H> {
    interp: *mut Interpreter<H>,
}

impl<H> Callback<H> {
    pub(super) fn new(interp: &mut Interpreter<H>) -> Self {
        Self { interp: interp as *mut _ }
    }
}

impl<H: HostRuntime> BytecodeReentry for Callback<H> {
    type Error = InterpreterError<H::Error>;

    fn call_back(
        &mut self,
        findex: usize,
        args: &[(Kind, &[u8])],
        ret_kind: Kind,
    ) -> Result<Vec<u8>, Self::Error> {
        // SAFETY: this handle is only ever live for the duration of the
        // `NativeFfi::call` invocation that created it, which itself is
        // nested inside a live borrow of the same `Interpreter` (§5:
        // single logical thread, reentrant nesting only — never
        // concurrent access).
        let interp = unsafe { &mut *self.interp };
        let mut ret = ReturnSlot::for_kind(ret_kind)?;
        interp.call_into(findex, args, &mut ret)?;
        Ok(ret.bytes().to_vec())
    }
}
