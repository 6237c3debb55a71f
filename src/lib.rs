//! A typed, register-based bytecode interpreter.
//!
//! Every register carries a static [`types::Kind`] fixed by the function's
//! signature; dispatch checks a register's kind before reading or writing it
//! rather than trusting the bytecode. The core never touches host memory
//! directly except through [`frame::Frame`] (its own per-call register
//! buffer, the one exception being [`opcode::Opcode::Ref`]/`Unref`) — objects,
//! arrays, globals-backed dynamics, and enums are all read and written
//! through the [`host::HostRuntime`] collaborator.

#![warn(missing_docs)]
#![deny(unused_must_use)]

pub mod call;
pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod interpreter;
pub mod module;
pub mod opcode;
pub mod transfer;
pub mod types;

pub mod prelude {
    //! Re-exports of the types most callers need to embed the interpreter.
    #[doc(no_inline)]
    pub use crate::call::{CallDepth, ReturnSlot};
    #[doc(no_inline)]
    pub use crate::config::Config;
    #[doc(no_inline)]
    pub use crate::error::{InterpreterError, Trap};
    #[doc(no_inline)]
    pub use crate::frame::{Frame, FramePlan, NaturalAlignment};
    #[doc(no_inline)]
    pub use crate::host::{
        BytecodeReentry, Collector, DynamicRuntime, FieldBits, HostRuntime, HostValue, NativeFfi,
    };
    #[doc(no_inline)]
    pub use crate::interpreter::Interpreter;
    #[doc(no_inline)]
    pub use crate::module::{Module, FunctionRecord, NativeRecord};
    #[doc(no_inline)]
    pub use crate::opcode::Opcode;
    #[doc(no_inline)]
    pub use crate::types::{Kind, TypeDescriptor};
}
