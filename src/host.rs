//! External collaborator traits (§6).
//!
//! The core deliberately doesn't implement the bytecode loader, the garbage
//! collector, the dynamic value/virtual/object runtime library, or the C FFI
//! trampoline library (§1). Instead it consumes them through the
//! [`HostRuntime`] trait, the way [`crate::storage`]-style traits let
//! `fuel-vm` stay agnostic of its storage backend. A host plugs in one
//! implementation at [`crate::interpreter::Interpreter::new`] and the core
//! never assumes anything about it beyond this contract.

use crate::types::{FieldDescriptor, FieldHash, Kind, TypeDescriptor};

/// A typed value as it crosses the host boundary: a heap pointer, tagged
/// with the kind it was allocated as. Opaque to the core beyond its kind and
/// bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostValue {
    /// The kind this value was allocated as.
    pub kind: Kind,
    /// The raw bit pattern: a pointer for reference kinds, or the value
    /// itself reinterpreted as a `u64` for primitives passed through the
    /// dynamic runtime (e.g. a pre-boxed boolean index).
    pub bits: u64,
}

/// The garbage collector's interface (§6.4).
///
/// Corresponds to component F: the interpreter registers/unregisters slot
/// addresses as roots; it never has write authority over what the collector
/// does with them (I3).
pub trait Collector {
    /// Registers `addr` — the byte address of a register slot — as a GC
    /// root. Called once per nullable register on frame entry (§4.F).
    fn add_root(&mut self, addr: usize);

    /// Unregisters a previously registered root. Called once per nullable
    /// register on every frame exit path, including early returns (I3, P3).
    fn remove_root(&mut self, addr: usize);

    /// Whether `kind` denotes a traced pointer kind. Typically delegates to
    /// [`Kind::can_be_null`], but kept as a host hook since a collector may
    /// choose not to trace some reference kinds (e.g. `Kind::Abstract`).
    fn is_ptr(&self, kind: Kind) -> bool {
        kind.can_be_null()
    }
}

/// A field value as read or written through an object/struct layout offset
/// or a virtual's fast vfield slot (§4.E "Globals and fields").
///
/// Shaped by the field's own kind rather than the core's register kind, so a
/// host can hand back exactly the width the field descriptor declares.
#[derive(Debug, Clone, Copy)]
pub enum FieldBits {
    /// An integer-shaped field (`u8`/`u16`/`i32`/`i64`), sign-extended.
    Int(i64),
    /// A float-shaped field (`f32`/`f64`), widened.
    Float(f64),
    /// A reference-shaped field.
    Ptr(HostValue),
}

/// The dynamic value / virtual / object runtime library's interface (§6.3).
///
/// Allocation primitives, hashed dynamic get/set, and typed casts. The core
/// never allocates heap objects itself; every `alloc_*` opcode delegates
/// here. Field access also never touches host memory directly (the core has
/// no business dereferencing a host-owned object): `obj_field_get`/`_set`
/// carry out the layout-offset read/write the object runtime would do with
/// `obj_field_fetch`, and `virtual_fast_field_get`/`_set` carry out the same
/// for a virtual's vfield fast path, reporting back whether the fast path
/// applied so the caller can fall back to hashed dyn-get/set (§4.E).
pub trait DynamicRuntime {
    /// Error type surfaced when a dynamic-runtime operation fails (e.g. an
    /// allocation failure, or a cast that cannot succeed).
    type Error: std::fmt::Debug;

    /// Allocates a zeroed instance of an `obj`/`struct` type.
    fn alloc_obj(&mut self, ty: &TypeDescriptor) -> Result<HostValue, Self::Error>;
    /// Allocates an empty dynamic object (`dynobj`).
    fn alloc_dynobj(&mut self) -> Result<HostValue, Self::Error>;
    /// Allocates a virtual projection shell for `ty`.
    fn alloc_virtual(&mut self, ty: &TypeDescriptor) -> Result<HostValue, Self::Error>;
    /// Boxes a primitive value of `ty`'s kind into a `dyn`.
    fn alloc_dynamic(&mut self, ty: &TypeDescriptor, bits: u64) -> Result<HostValue, Self::Error>;
    /// Returns the canonical pre-boxed boolean (`true`/`false` share a
    /// single allocation per the source's convention).
    fn alloc_dynbool(&mut self, b: bool) -> Result<HostValue, Self::Error>;
    /// Allocates an enum value of constructor `ctor`.
    fn alloc_enum(&mut self, ty: &TypeDescriptor, ctor: usize) -> Result<HostValue, Self::Error>;
    /// The constructor index `v` was allocated with (`EnumIndex`).
    fn enum_index(&self, v: HostValue) -> Result<usize, Self::Error>;
    /// Reads a field of `v`'s constructor `ctor` at its declared layout
    /// offset (`EnumField`).
    fn enum_field_get(
        &self,
        v: HostValue,
        ctor: usize,
        field: &FieldDescriptor,
    ) -> Result<FieldBits, Self::Error>;
    /// Writes a field of `v`'s constructor `ctor` (`SetEnumField` always
    /// passes `ctor = 0`, the only writable form, §4.E).
    fn enum_field_set(
        &mut self,
        v: HostValue,
        ctor: usize,
        field: &FieldDescriptor,
        value: FieldBits,
    ) -> Result<(), Self::Error>;
    /// Allocates a closure binding `obj` (if any) as receiver of `findex`.
    fn alloc_closure_ptr(
        &mut self,
        ty: &TypeDescriptor,
        findex: usize,
        obj: Option<HostValue>,
    ) -> Result<HostValue, Self::Error>;

    /// Obtains or constructs a virtual projection of `v` against `ty`.
    fn to_virtual(&mut self, ty: &TypeDescriptor, v: HostValue) -> Result<HostValue, Self::Error>;

    /// The `(findex, bound receiver)` a closure value was allocated with via
    /// `alloc_closure_ptr`/`InstanceClosure` (`CallClosure`, §4.E).
    fn closure_target(&self, v: HostValue) -> Result<(usize, Option<HostValue>), Self::Error>;

    /// Reads an `obj`/`struct` field at its declared layout offset.
    fn obj_field_get(&self, v: HostValue, field: &FieldDescriptor) -> Result<FieldBits, Self::Error>;
    /// Writes an `obj`/`struct` field at its declared layout offset.
    fn obj_field_set(
        &mut self,
        v: HostValue,
        field: &FieldDescriptor,
        value: FieldBits,
    ) -> Result<(), Self::Error>;
    /// Reads a virtual's fast vfield slot if the underlying dynamic object
    /// exposes one; `Ok(None)` means the caller should fall back to a hashed
    /// `dyn_get*` keyed by `field.hash`.
    fn virtual_fast_field_get(
        &self,
        v: HostValue,
        field: &FieldDescriptor,
    ) -> Result<Option<FieldBits>, Self::Error>;
    /// Writes a virtual's fast vfield slot if present, returning whether it
    /// applied; `Ok(false)` means the caller should fall back to a hashed
    /// `dyn_set*`.
    fn virtual_fast_field_set(
        &mut self,
        v: HostValue,
        field: &FieldDescriptor,
        value: FieldBits,
    ) -> Result<bool, Self::Error>;

    /// Element count of a homogeneous array (`ArraySize`).
    fn array_len(&self, arr: HostValue) -> Result<usize, Self::Error>;
    /// Typed element read (`GetArray`).
    fn array_get(&self, arr: HostValue, idx: usize, elem_kind: Kind) -> Result<FieldBits, Self::Error>;
    /// Typed element write (`SetArray`).
    fn array_set(
        &mut self,
        arr: HostValue,
        idx: usize,
        elem_kind: Kind,
        value: FieldBits,
    ) -> Result<(), Self::Error>;
    /// Byte/halfword/typed store into a raw pointer at an integer offset
    /// (`SetI8`/`SetI16`/`SetMem`); `kind` selects the write width.
    fn mem_store(
        &mut self,
        ptr: HostValue,
        offset: usize,
        kind: Kind,
        value: FieldBits,
    ) -> Result<(), Self::Error>;

    /// Stable hash of a field name, as produced by `hash_gen(name, true)`.
    fn hash_gen(&self, name: &str) -> FieldHash;

    /// Hashed dynamic-get of an integer-shaped field (`u8`/`u16`/`i32`).
    fn dyn_geti(&self, v: HostValue, field: FieldHash) -> Result<i64, Self::Error>;
    /// Hashed dynamic-get of an `i64` field.
    fn dyn_geti64(&self, v: HostValue, field: FieldHash) -> Result<i64, Self::Error>;
    /// Hashed dynamic-get of an `f32` field.
    fn dyn_getf(&self, v: HostValue, field: FieldHash) -> Result<f32, Self::Error>;
    /// Hashed dynamic-get of an `f64` field.
    fn dyn_getd(&self, v: HostValue, field: FieldHash) -> Result<f64, Self::Error>;
    /// Hashed dynamic-get of a pointer-shaped field.
    fn dyn_getp(&self, v: HostValue, field: FieldHash) -> Result<HostValue, Self::Error>;

    /// Hashed dynamic-set of an integer-shaped field.
    fn dyn_seti(&mut self, v: HostValue, field: FieldHash, value: i64) -> Result<(), Self::Error>;
    /// Hashed dynamic-set of an `i64` field.
    fn dyn_seti64(&mut self, v: HostValue, field: FieldHash, value: i64) -> Result<(), Self::Error>;
    /// Hashed dynamic-set of an `f32` field.
    fn dyn_setf(&mut self, v: HostValue, field: FieldHash, value: f32) -> Result<(), Self::Error>;
    /// Hashed dynamic-set of an `f64` field.
    fn dyn_setd(&mut self, v: HostValue, field: FieldHash, value: f64) -> Result<(), Self::Error>;
    /// Hashed dynamic-set of a pointer-shaped field.
    fn dyn_setp(
        &mut self,
        v: HostValue,
        field: FieldHash,
        value: HostValue,
    ) -> Result<(), Self::Error>;

    /// Typed cast to an integer kind, selected by the destination kind.
    fn dyn_casti(&self, v: HostValue, dst: Kind) -> Result<i64, Self::Error>;
    /// Typed cast to `i64`.
    fn dyn_casti64(&self, v: HostValue, dst: Kind) -> Result<i64, Self::Error>;
    /// Typed cast to `f32`.
    fn dyn_castf(&self, v: HostValue, dst: Kind) -> Result<f32, Self::Error>;
    /// Typed cast to `f64`.
    fn dyn_castd(&self, v: HostValue, dst: Kind) -> Result<f64, Self::Error>;
    /// Typed cast to a pointer kind.
    fn dyn_castp(&self, v: HostValue, dst: Kind) -> Result<HostValue, Self::Error>;
}

/// The interpreter's re-entry point, handed to native code so it can call
/// back into bytecode (§4.G, component G).
///
/// The original C engine keeps a single global context pointer for this
/// purpose (`global_ctx` in `interp.c`); this crate instead threads an
/// explicit handle through the call so two independent `Interpreter`
/// instances never share mutable state through a global (§9 redesign note,
/// §10.5).
pub trait BytecodeReentry {
    /// Error type for a failed reverse call.
    type Error: std::fmt::Debug;

    /// Resolves `findex` and invokes the call bridge (§4.D), returning the
    /// callee's result encoded per `ret_kind`.
    fn call_back(
        &mut self,
        findex: usize,
        args: &[(Kind, &[u8])],
        ret_kind: Kind,
    ) -> Result<Vec<u8>, Self::Error>;
}

/// The C-ABI native call bridge's interface (§6.5).
///
/// Wraps the FFI layer behind a typed interface that consumes the
/// kind→[`crate::types::FfiType`] mapping; the core never touches FFI
/// internals beyond that mapping (§9).
pub trait NativeFfi {
    /// Error surfaced when packing or invoking a native call fails.
    type Error: std::fmt::Debug;

    /// Invokes the native function at `ptr`, passing `args` (each already
    /// encoded per its declared kind) and writing the return value encoded
    /// per `ret_kind` into the returned buffer.
    ///
    /// `reentry` is the live interpreter context (component G): a native
    /// implementation that wants to call back into bytecode invokes
    /// `reentry.call_back(..)` rather than reaching for global state.
    fn call(
        &mut self,
        ptr: crate::module::NativePtr,
        args: &[(Kind, &[u8])],
        ret_kind: Kind,
        reentry: &mut dyn BytecodeReentry<Error = Self::ReentryError>,
    ) -> Result<Vec<u8>, Self::Error>;

    /// The error type `reentry.call_back` may report; kept as a separate
    /// associated type so a host's FFI bridge isn't forced to unify it with
    /// its own `Error`.
    type ReentryError: std::fmt::Debug;
}

/// Everything component D/E/F/G need from the host, bundled the way
/// `InterpreterStorage` bundles `fuel-vm`'s storage requirements.
///
/// A type implementing this trait is handed to [`crate::interpreter::Interpreter::new`]
/// once; the interpreter borrows it mutably for the lifetime of every call.
pub trait HostRuntime: Collector {
    /// The dynamic runtime implementation.
    type Dynamic: DynamicRuntime;
    /// The native FFI bridge implementation. Its `ReentryError` is pinned to
    /// this interpreter's own outer error type, since the re-entry handle
    /// passed to [`NativeFfi::call`] is always a recursive call back into
    /// this same `Interpreter` (component G).
    type Ffi: NativeFfi<ReentryError = crate::error::InterpreterError<Self::Error>>;
    /// A single error type covering both collaborators, so the interpreter
    /// doesn't need to carry two host error type parameters around.
    type Error: std::fmt::Debug
        + From<<Self::Dynamic as DynamicRuntime>::Error>
        + From<<Self::Ffi as NativeFfi>::Error>;

    /// Borrows the dynamic runtime.
    fn dynamic(&mut self) -> &mut Self::Dynamic;
    /// Borrows the native FFI bridge.
    fn ffi(&mut self) -> &mut Self::Ffi;

    /// Called when the dispatch loop is about to trap fatally, before the
    /// `Err` unwinds out of [`crate::interpreter::Interpreter::call`].
    /// Default is a no-op; hosts typically wire this to their own logging
    /// (the core itself always emits a `tracing::error!` regardless, §10.2).
    fn report_fatal(&mut self, _trap: crate::error::Trap, _context: &str) {}
}
