//! The call bridge (§4.D, component D).
//!
//! Routes a logical function index to either a bytecode frame or a native
//! invocation via the FFI bridge. Shared by the public [`Interpreter::call`]
//! entry point, the dispatch loop's `Call*` family, and the C→bytecode
//! callback (component G), all of which bottom out in [`Interpreter::call_into`].

use std::sync::Arc;

use tracing::trace;

use crate::call::ReturnSlot;
use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::HostRuntime;
use crate::module::{Callee, FunctionRecord, Module, NativeRecord};
use crate::types::Kind;

use super::callback::Callback;
use super::Interpreter;

impl<H: HostRuntime> Interpreter<H> {
    /// Public call entry point (§4.D): resolves `findex`, routes to a
    /// bytecode frame or a native invocation, and returns the callee's
    /// result. `args` must list exactly the callee's declared parameters,
    /// in order.
    pub fn call(
        &mut self,
        findex: usize,
        args: &[(Kind, &[u8])],
    ) -> Result<ReturnSlot, InterpreterError<H::Error>> {
        let ret_kind = self
            .module
            .function_type(findex)
            .ok_or(Trap::UnresolvedFunction)?
            .ret;
        let mut ret = ReturnSlot::for_kind(ret_kind)?;
        self.call_into(findex, args, &mut ret)?;
        Ok(ret)
    }

    /// The recursive core of the call bridge, shared by [`Self::call`] and
    /// [`super::callback::Callback::call_back`].
    pub(crate) fn call_into(
        &mut self,
        findex: usize,
        args: &[(Kind, &[u8])],
        ret: &mut ReturnSlot,
    ) -> Result<(), InterpreterError<H::Error>> {
        self.depth.enter()?;
        let module: Arc<Module> = Arc::clone(&self.module);
        let physical = module
            .functions_indexes
            .get(findex)
            .ok_or(Trap::UnresolvedFunction)?
            .0;
        let result = match module.resolve(findex) {
            Some(Callee::Bytecode(func)) => self.bytecode_call(physical, func, args, ret),
            Some(Callee::Native(native)) => self.native_call(native, args, ret),
            None => Err(Trap::UnresolvedFunction.into()),
        };
        self.depth.exit();
        result
    }

    fn bytecode_call(
        &mut self,
        physical: usize,
        func: &FunctionRecord,
        args: &[(Kind, &[u8])],
        ret: &mut ReturnSlot,
    ) -> Result<(), InterpreterError<H::Error>> {
        if func.ty.ret != ret.kind() {
            return Err(Trap::ReturnTypeMismatch.into());
        }
        if args.len() > func.ty.arity() {
            return Err(Trap::KindMismatch.into());
        }
        trace!(findex = func.findex, physical, "bytecode_call");

        let plan = self
            .plans
            .get(physical)
            .cloned()
            .ok_or(Trap::UnresolvedFunction)?;
        let mut frame = Frame::allocate(&plan);
        for (i, (kind, bytes)) in args.iter().enumerate() {
            let reg_kind = *func.registers.get(i).ok_or(Trap::FrameOverrun)?;
            if *kind != reg_kind {
                return Err(Trap::KindMismatch.into());
            }
            crate::transfer::copy(frame.slot_mut(i, reg_kind)?, bytes, reg_kind)?;
        }
        frame.zero_range(plan.offset(args.len())?, plan.frame_size())?;

        let roots = self.register_roots(&frame, func)?;
        let result = self.run(func, &mut frame, ret);
        self.unregister_roots(&roots);
        result
    }

    fn native_call(
        &mut self,
        native: &NativeRecord,
        args: &[(Kind, &[u8])],
        ret: &mut ReturnSlot,
    ) -> Result<(), InterpreterError<H::Error>> {
        if native.ty.ret != ret.kind() {
            return Err(Trap::ReturnTypeMismatch.into());
        }
        trace!(findex = native.findex, "native_call");

        // `Callback::new` only reborrows `self` for the duration of this
        // call; the handle it returns holds a raw pointer, not a live
        // borrow, so `self.host` is free again immediately below (see
        // `callback.rs`).
        let mut callback = Callback::new(self);
        let bytes = self
            .host
            .ffi()
            .call(native.ptr, args, ret.kind(), &mut callback)
            .map_err(|e| InterpreterError::Host(e.into()))?;
        if bytes.len() != ret.bytes().len() {
            return Err(Trap::NativeCallFailed.into());
        }
        ret.bytes_mut().copy_from_slice(&bytes);
        Ok(())
    }
}
