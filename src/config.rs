//! Embedding configuration (§10.3).
//!
//! Mirrors `fuel-vm`'s `InterpreterParams`: a small struct of knobs a host
//! sets once when constructing an [`crate::interpreter::Interpreter`].

/// Construction-time knobs for an [`crate::interpreter::Interpreter`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Soft limit on bytecode→native→bytecode re-entrancy depth. The spec
    /// leaves this "bounded only by the host stack" (§5); a production
    /// embedding still wants a configurable guard so runaway recursion
    /// surfaces as [`crate::error::Trap::CallDepthExceeded`] instead of an
    /// actual host stack overflow.
    pub max_call_depth: usize,
    /// Emit a `tracing::trace!` event for every dispatched opcode (§10.2).
    /// Off by default since it dominates dispatch cost when enabled.
    pub trace_opcodes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: 4096,
            trace_opcodes: false,
        }
    }
}
