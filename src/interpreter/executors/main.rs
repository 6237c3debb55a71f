//! The pc-stepping loop itself (§7 "Dispatch loop").

use tracing::trace;

use crate::call::ReturnSlot;
use crate::error::{InterpreterError, Trap};
use crate::frame::Frame;
use crate::host::HostRuntime;
use crate::module::FunctionRecord;

use super::instruction::Flow;
use crate::interpreter::Interpreter;

impl<H: HostRuntime> Interpreter<H> {
    /// Runs `func`'s opcodes against `frame` until a `Ret` fires, writing
    /// the result into `ret`.
    pub(in crate::interpreter) fn run(
        &mut self,
        func: &FunctionRecord,
        frame: &mut Frame,
        ret: &mut ReturnSlot,
    ) -> Result<(), InterpreterError<H::Error>> {
        let mut pc: usize = 0;
        loop {
            let op = func.ops.get(pc).ok_or(Trap::ProgramCounterOutOfRange)?;
            if self.config().trace_opcodes {
                trace!(pc, ?op, "dispatch");
            }
            match self.step(func, frame, ret, pc, op)? {
                Flow::Continue => pc += 1,
                Flow::Jump(target) => pc = target,
                Flow::Return => return Ok(()),
            }
        }
    }
}
