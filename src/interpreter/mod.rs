//! The interpreter: frame layout, the call bridge, the dispatch loop, and
//! every opcode family (§4).
//!
//! [`Interpreter`] owns the loaded module, its precomputed frame plans, a
//! private copy of the module's global data, the host collaborators, and the
//! re-entrant call-depth counter. Submodules group opcode handling by family
//! the way the original engine's `interp.c` does with its `switch` cases,
//! except host-independent families (`alu`, `flow`, `refs`) are free
//! functions that only need `&mut Frame`, while host-dependent families
//! (`calls`, `fields`, `convert`, `enums`, `instantiate`, `gcroots`) are
//! inherent methods here since they need `&mut self.host`.

use std::sync::Arc;

use crate::call::CallDepth;
use crate::config::Config;
use crate::error::Trap;
use crate::frame::{self, FramePlan, NaturalAlignment};
use crate::host::HostRuntime;
use crate::module::Module;

mod alu;
mod callback;
mod calls;
mod convert;
mod enums;
mod executors;
mod fields;
mod flow;
mod gcroots;
mod instantiate;
mod refs;
mod regs;

pub use callback::Callback;

/// A single interpreter instance bound to one host (§3 "Interpreter state").
///
/// Holds its own copy of the module's global data rather than mutating the
/// shared [`Module`]: `Module` is an `Arc` that may be shared across several
/// `Interpreter`s (e.g. several independent VM instances loading the same
/// compiled program), and `SetGlobal` needs a mutable backing store that
/// belongs to exactly one of them.
pub struct Interpreter<H> {
    module: Arc<Module>,
    plans: Vec<FramePlan>,
    globals: Vec<u8>,
    host: H,
    config: Config,
    depth: CallDepth,
}

impl<H: HostRuntime> Interpreter<H> {
    /// Builds an interpreter over `module`, precomputing every function's
    /// frame plan (§4.B) and seeding its private global data from the
    /// module's initial values.
    pub fn new(module: Arc<Module>, config: Config, host: H) -> Result<Self, Trap> {
        let plans = frame::plan_module(&module.functions, &NaturalAlignment)?;
        let globals = module.globals_data.clone();
        let depth = CallDepth::new(config.max_call_depth);
        Ok(Self { module, plans, globals, host, config, depth })
    }

    /// The loaded module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrows the host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrows the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Current re-entrant call depth (§10.3).
    pub fn call_depth(&self) -> usize {
        self.depth.depth()
    }
}
