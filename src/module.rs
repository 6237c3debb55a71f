//! Module data model (§3, §6.1).
//!
//! A [`Module`] is the read-only, already-loaded representation of a
//! compiled program: constant pools, the type table, the global area, the
//! function table and the natives table. Producing one from a bytecode file
//! is the loader's job and is out of scope (§1); the core only ever reads
//! through this structure.

use std::sync::Arc;

use crate::opcode::Opcode;
use crate::types::{FunctionType, Kind, TypeDescriptor};

/// Physical index space: `functions[0..nfunctions)` are bytecode functions,
/// `natives[0..nnatives)` are native functions. `functions_indexes` maps a
/// *logical* function index to a physical index in this combined space;
/// indices `>= nfunctions` denote natives (§4.D step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalIndex(pub usize);

/// One defined bytecode function: its type, register file, and opcodes
/// (§3 "Function record").
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    /// Logical function index (as referenced by `Call*`/`InstanceClosure`).
    pub findex: usize,
    /// The function's type (parameter kinds, return kind).
    pub ty: FunctionType,
    /// Per-register declared kind, in register-index order. Arguments occupy
    /// the first `ty.arity()` entries (§3 "Register frame").
    pub registers: Vec<Kind>,
    /// For registers whose kind needs more than a bare [`Kind`] to execute
    /// correctly (`obj`/`struct`/`virtual`/`enum`/`fun`), the register's
    /// index into [`Module::types`]; `None` for plain primitives and
    /// reference kinds with no further structure (§3 "Type descriptor").
    pub register_types: Vec<Option<usize>>,
    /// The opcode sequence.
    pub ops: Vec<Opcode>,
}

impl FunctionRecord {
    /// Number of registers (including argument registers).
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }
}

/// A native function entry: its declared type and an opaque function
/// pointer the host's FFI bridge knows how to invoke (§4.D "Native call").
#[derive(Debug, Clone)]
pub struct NativeRecord {
    /// Logical function index.
    pub findex: usize,
    /// The native's type (parameter kinds, return kind).
    pub ty: FunctionType,
    /// Opaque pointer the FFI bridge resolves and calls; the core never
    /// dereferences it directly.
    pub ptr: NativePtr,
}

/// An opaque native function pointer.
///
/// Deliberately not `*const ()` to keep the core free of raw pointer
/// arithmetic outside the call bridge and FFI boundary; a `usize` is
/// sufficient for the core's bookkeeping, and the host's FFI bridge is
/// responsible for interpreting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativePtr(pub usize);

/// A byte-offset global slot descriptor (§3 "Module").
#[derive(Debug, Clone, Copy)]
pub struct GlobalSlot {
    /// Declared kind of the global.
    pub kind: Kind,
    /// Byte offset into the module's global data buffer.
    pub offset: usize,
}

/// The constant pools (§3 "Module").
#[derive(Debug, Clone, Default)]
pub struct ConstantPools {
    /// Integer constant pool, referenced by `Int dst k`.
    pub ints: Vec<i64>,
    /// Float constant pool, referenced by `Float dst k`.
    pub floats: Vec<f64>,
    /// Concatenated byte-blob storage.
    pub bytes: Vec<u8>,
    /// Start offset of each blob within `bytes`, referenced by `Bytes dst k`.
    pub bytes_pos: Vec<usize>,
    /// Interned strings, referenced by `String dst k`.
    pub strings: Vec<Arc<str>>,
}

/// A fully loaded, read-only module (§3 "Module", §6.1).
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Constant pools.
    pub constants: ConstantPools,
    /// Type table, indexed by the type ids embedded in [`TypeDescriptor`]
    /// cross-references (function params/return, field types, ...).
    pub types: Vec<TypeDescriptor>,
    /// Global slot descriptors, indexed by global id.
    pub globals: Vec<GlobalSlot>,
    /// Raw backing storage for all globals, sized to the sum of global slot
    /// sizes (with alignment). Mutated in place by `SetGlobal`.
    pub globals_data: Vec<u8>,
    /// Defined bytecode functions.
    pub functions: Vec<FunctionRecord>,
    /// Declared native functions.
    pub natives: Vec<NativeRecord>,
    /// `function_index -> physical_index` map (§3, §4.D).
    pub functions_indexes: Vec<PhysicalIndex>,
}

impl Module {
    /// Resolves a logical function index to either a bytecode function or a
    /// native, per the `physical >= nfunctions` rule of §4.D step 2.
    pub fn resolve(&self, findex: usize) -> Option<Callee<'_>> {
        let physical = self.functions_indexes.get(findex)?.0;
        if physical < self.functions.len() {
            self.functions.get(physical).map(Callee::Bytecode)
        } else {
            self.natives
                .get(physical - self.functions.len())
                .map(Callee::Native)
        }
    }

    /// The declared type of a logical function, regardless of whether it
    /// resolves to bytecode or a native.
    pub fn function_type(&self, findex: usize) -> Option<&FunctionType> {
        match self.resolve(findex)? {
            Callee::Bytecode(f) => Some(&f.ty),
            Callee::Native(n) => Some(&n.ty),
        }
    }
}

/// The resolved target of a call bridge dispatch (§4.D).
#[derive(Debug, Clone, Copy)]
pub enum Callee<'m> {
    /// Routes to the dispatch loop.
    Bytecode(&'m FunctionRecord),
    /// Routes to the native FFI bridge.
    Native(&'m NativeRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Module {
        let ty = FunctionType {
            params: vec![Kind::I32],
            ret: Kind::I32,
        };
        Module {
            functions: vec![FunctionRecord {
                findex: 0,
                ty: ty.clone(),
                registers: vec![Kind::I32],
                register_types: vec![None],
                ops: vec![],
            }],
            natives: vec![NativeRecord {
                findex: 1,
                ty,
                ptr: NativePtr(0xdead_beef),
            }],
            functions_indexes: vec![PhysicalIndex(0), PhysicalIndex(1)],
            ..Default::default()
        }
    }

    #[test]
    fn resolves_bytecode_function_below_nfunctions() {
        let m = sample_module();
        assert!(matches!(m.resolve(0), Some(Callee::Bytecode(_))));
    }

    #[test]
    fn resolves_native_at_or_above_nfunctions() {
        let m = sample_module();
        assert!(matches!(m.resolve(1), Some(Callee::Native(_))));
    }

    #[test]
    fn unresolved_findex_is_none() {
        let m = sample_module();
        assert!(m.resolve(2).is_none());
    }
}
