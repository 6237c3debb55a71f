//! Runtime error taxonomy (§7).
//!
//! Every fatal condition the dispatch loop can hit is a [`Trap`] variant
//! rather than a raw process abort; [`InterpreterError`] is the outer error
//! type returned by every public entry point, wrapping a `Trap` plus
//! host-reported failures. A host that wants the documented "abort with
//! message" behavior can simply `.unwrap()` or `std::process::abort()` on
//! receipt of an `Err`; the core never does so itself, which keeps it
//! embeddable and testable (§10.1).

use core::fmt;

use derive_more::Display;

/// Fatal, unrecoverable failure raised by the dispatch loop or call bridge.
///
/// Mirrors the "internal consistency failure" and "null-access runtime
/// failure" taxonomy of §7. Arithmetic edge cases (division/modulo by zero)
/// are deliberately *not* represented here: they are defined to yield zero
/// and are not errors (P6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Trap {
    /// A register or operand's declared kind didn't match what the opcode
    /// required (I1).
    #[display(fmt = "register kind mismatch")]
    KindMismatch,
    /// The opcode id has no defined semantics.
    #[display(fmt = "unknown opcode")]
    UnknownOpcode,
    /// A register declared the reserved `packed` kind.
    #[display(fmt = "packed type encountered")]
    PackedType,
    /// A slot access fell outside `[0, offsets[nregs])` (P2).
    #[display(fmt = "frame buffer overrun")]
    FrameOverrun,
    /// `NullCheck` observed a null pointer in a non-nullable position.
    #[display(fmt = "null access")]
    NullAccess,
    /// An opcode documented as unimplemented in the source was reached
    /// (`JNotLt`, `JNotGte`, `CallThis`, `CallMethod`; §9 open questions).
    #[display(fmt = "unimplemented opcode")]
    UnimplementedOpcode,
    /// The callee's declared return kind didn't match the caller's expected
    /// return kind.
    #[display(fmt = "return type mismatch")]
    ReturnTypeMismatch,
    /// `functions_indexes[findex]` had no corresponding bytecode function or
    /// native.
    #[display(fmt = "unresolved function index")]
    UnresolvedFunction,
    /// The native call bridge reported a failure packing or invoking the
    /// call.
    #[display(fmt = "native call failed")]
    NativeCallFailed,
    /// Re-entrant bytecode→native→bytecode nesting exceeded the configured
    /// soft limit (§10.3); guards against host stack overflow.
    #[display(fmt = "call depth exceeded")]
    CallDepthExceeded,
    /// A switch's `extra` payload was shorter than the declared entry count.
    #[display(fmt = "malformed switch table")]
    MalformedSwitch,
    /// The program counter fell outside the function's opcode array; only
    /// reachable via a miscomputed jump target (an internal consistency
    /// failure, §7).
    #[display(fmt = "program counter out of range")]
    ProgramCounterOutOfRange,
}

impl std::error::Error for Trap {}

/// Outer error type returned by every public entry point.
///
/// Generic over the host's own error type so a `HostRuntime` implementation
/// can surface its own failures (e.g. an allocation failure reported by the
/// dynamic runtime) without the core needing to know its shape.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InterpreterError<HostError = core::convert::Infallible> {
    /// A fatal trap raised by the dispatch loop or call bridge.
    #[display(fmt = "trap: {_0}")]
    Trap(Trap),
    /// The host-supplied collaborator (module access, dynamic runtime,
    /// collector, or FFI bridge) reported a failure.
    #[display(fmt = "host error: {_0:?}")]
    Host(HostError),
}

impl<HostError> From<Trap> for InterpreterError<HostError> {
    fn from(t: Trap) -> Self {
        Self::Trap(t)
    }
}

impl<HostError: fmt::Debug> std::error::Error for InterpreterError<HostError> {}

/// Convenience alias used throughout the crate.
pub type Result<T, HostError = core::convert::Infallible> =
    core::result::Result<T, InterpreterError<HostError>>;
