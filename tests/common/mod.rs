//! A minimal in-memory [`HostRuntime`] used only by the integration tests in
//! this directory. Not part of the crate's public surface: a real embedder
//! plugs in a dynamic-value runtime, collector, and FFI bridge backed by its
//! own heap; this one keeps everything in a few `HashMap`s so the end-to-end
//! scenarios in `tests/scenarios.rs` don't need a real object runtime.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use typed_reg_vm::error::InterpreterError;
use typed_reg_vm::host::{
    BytecodeReentry, Collector, DynamicRuntime, FieldBits, HostRuntime, HostValue, NativeFfi,
};
use typed_reg_vm::module::NativePtr;
use typed_reg_vm::types::{FieldHash, Kind, TypeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestError {
    NoSuchInstance,
    NoSuchNative,
}

fn default_bits(kind: Kind) -> FieldBits {
    if kind.is_float() {
        FieldBits::Float(0.0)
    } else if kind.can_be_null() {
        FieldBits::Ptr(HostValue { kind, bits: 0 })
    } else {
        FieldBits::Int(0)
    }
}

fn fnv1a(name: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in name.as_bytes() {
        h ^= *b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

type NativeImpl = Box<
    dyn Fn(&[(Kind, &[u8])], &mut dyn BytecodeReentry<Error = InterpreterError<TestError>>) -> Result<Vec<u8>, TestError>,
>;

/// Implements both [`DynamicRuntime`] and [`NativeFfi`]; [`TestHost::dynamic`]
/// and [`TestHost::ffi`] both hand out `&mut` to the same value.
#[derive(Default)]
pub struct TestRuntime {
    next: Cell<u64>,
    objs: RefCell<HashMap<u64, HashMap<usize, FieldBits>>>,
    dynobjs: RefCell<HashMap<u64, HashMap<u32, FieldBits>>>,
    fast_capable: RefCell<HashSet<u64>>,
    arrays: RefCell<HashMap<u64, Vec<FieldBits>>>,
    enums: RefCell<HashMap<u64, (usize, HashMap<usize, FieldBits>)>>,
    closures: RefCell<HashMap<u64, (usize, Option<HostValue>)>>,
    dynamics: RefCell<HashMap<u64, u64>>,
    dynbool: Cell<[Option<u64>; 2]>,
    natives: RefCell<HashMap<usize, NativeImpl>>,
}

impl TestRuntime {
    fn alloc(&self) -> u64 {
        let id = self.next.get() + 1;
        self.next.set(id);
        id
    }

    /// Marks `v` (previously allocated through [`TestRuntime::new_dynobj`]) as
    /// exposing a fast vfield slot for `name`, seeded with `value`.
    pub fn give_fast_slot(&self, v: HostValue, name: &str, value: FieldBits) {
        self.fast_capable.borrow_mut().insert(v.bits);
        self.dynobjs.borrow_mut().entry(v.bits).or_default().insert(fnv1a(name), value);
    }

    /// Seeds a hashed field on `v` without marking it fast-path capable, so
    /// `Field` falls through to the hashed `dyn_get*` family.
    pub fn give_hashed_field(&self, v: HostValue, name: &str, value: FieldBits) {
        self.dynobjs.borrow_mut().entry(v.bits).or_default().insert(fnv1a(name), value);
    }

    /// Allocates a bare dynamic-object-shaped handle for the virtual field
    /// scenario; not reachable through any opcode directly.
    pub fn new_dynobj(&self) -> HostValue {
        let id = self.alloc();
        self.dynobjs.borrow_mut().insert(id, HashMap::new());
        HostValue { kind: Kind::DynObj, bits: id }
    }

    /// Registers a native implementation under `ptr`, for `Call*` opcodes
    /// targeting a [`typed_reg_vm::module::NativeRecord`] with that pointer.
    pub fn register_native(&self, ptr: usize, f: NativeImpl) {
        self.natives.borrow_mut().insert(ptr, f);
    }
}

impl DynamicRuntime for TestRuntime {
    type Error = TestError;

    fn alloc_obj(&mut self, _ty: &TypeDescriptor) -> Result<HostValue, Self::Error> {
        let id = self.alloc();
        self.objs.borrow_mut().insert(id, HashMap::new());
        Ok(HostValue { kind: Kind::Obj, bits: id })
    }

    fn alloc_dynobj(&mut self) -> Result<HostValue, Self::Error> {
        let id = self.alloc();
        self.dynobjs.borrow_mut().insert(id, HashMap::new());
        Ok(HostValue { kind: Kind::DynObj, bits: id })
    }

    fn alloc_virtual(&mut self, _ty: &TypeDescriptor) -> Result<HostValue, Self::Error> {
        let id = self.alloc();
        self.dynobjs.borrow_mut().insert(id, HashMap::new());
        Ok(HostValue { kind: Kind::Virtual, bits: id })
    }

    fn alloc_dynamic(&mut self, _ty: &TypeDescriptor, bits: u64) -> Result<HostValue, Self::Error> {
        let id = self.alloc();
        self.dynamics.borrow_mut().insert(id, bits);
        Ok(HostValue { kind: Kind::Dyn, bits: id })
    }

    fn alloc_dynbool(&mut self, b: bool) -> Result<HostValue, Self::Error> {
        let mut slots = self.dynbool.get();
        let idx = b as usize;
        if slots[idx].is_none() {
            let id = self.alloc();
            self.dynamics.borrow_mut().insert(id, b as u64);
            slots[idx] = Some(id);
            self.dynbool.set(slots);
        }
        Ok(HostValue { kind: Kind::Dyn, bits: slots[idx].unwrap() })
    }

    fn alloc_enum(&mut self, _ty: &TypeDescriptor, ctor: usize) -> Result<HostValue, Self::Error> {
        let id = self.alloc();
        self.enums.borrow_mut().insert(id, (ctor, HashMap::new()));
        Ok(HostValue { kind: Kind::Enum, bits: id })
    }

    fn enum_index(&self, v: HostValue) -> Result<usize, Self::Error> {
        self.enums.borrow().get(&v.bits).map(|(ctor, _)| *ctor).ok_or(TestError::NoSuchInstance)
    }

    fn enum_field_get(
        &self,
        v: HostValue,
        _ctor: usize,
        field: &typed_reg_vm::types::FieldDescriptor,
    ) -> Result<FieldBits, Self::Error> {
        let enums = self.enums.borrow();
        let (_, fields) = enums.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        Ok(fields.get(&field.offset).copied().unwrap_or_else(|| default_bits(field.ty)))
    }

    fn enum_field_set(
        &mut self,
        v: HostValue,
        _ctor: usize,
        field: &typed_reg_vm::types::FieldDescriptor,
        value: FieldBits,
    ) -> Result<(), Self::Error> {
        let mut enums = self.enums.borrow_mut();
        let (_, fields) = enums.get_mut(&v.bits).ok_or(TestError::NoSuchInstance)?;
        fields.insert(field.offset, value);
        Ok(())
    }

    fn alloc_closure_ptr(
        &mut self,
        _ty: &TypeDescriptor,
        findex: usize,
        obj: Option<HostValue>,
    ) -> Result<HostValue, Self::Error> {
        let id = self.alloc();
        self.closures.borrow_mut().insert(id, (findex, obj));
        Ok(HostValue { kind: Kind::Fun, bits: id })
    }

    fn to_virtual(&mut self, _ty: &TypeDescriptor, v: HostValue) -> Result<HostValue, Self::Error> {
        Ok(HostValue { kind: Kind::Virtual, bits: v.bits })
    }

    fn closure_target(&self, v: HostValue) -> Result<(usize, Option<HostValue>), Self::Error> {
        self.closures.borrow().get(&v.bits).copied().ok_or(TestError::NoSuchInstance)
    }

    fn obj_field_get(&self, v: HostValue, field: &typed_reg_vm::types::FieldDescriptor) -> Result<FieldBits, Self::Error> {
        let objs = self.objs.borrow();
        let fields = objs.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        Ok(fields.get(&field.offset).copied().unwrap_or_else(|| default_bits(field.ty)))
    }

    fn obj_field_set(
        &mut self,
        v: HostValue,
        field: &typed_reg_vm::types::FieldDescriptor,
        value: FieldBits,
    ) -> Result<(), Self::Error> {
        let mut objs = self.objs.borrow_mut();
        let fields = objs.get_mut(&v.bits).ok_or(TestError::NoSuchInstance)?;
        fields.insert(field.offset, value);
        Ok(())
    }

    fn virtual_fast_field_get(
        &self,
        v: HostValue,
        field: &typed_reg_vm::types::FieldDescriptor,
    ) -> Result<Option<FieldBits>, Self::Error> {
        if !self.fast_capable.borrow().contains(&v.bits) {
            return Ok(None);
        }
        let dynobjs = self.dynobjs.borrow();
        let fields = dynobjs.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        Ok(Some(fields.get(&field.hash.0).copied().unwrap_or_else(|| default_bits(field.ty))))
    }

    fn virtual_fast_field_set(
        &mut self,
        v: HostValue,
        field: &typed_reg_vm::types::FieldDescriptor,
        value: FieldBits,
    ) -> Result<bool, Self::Error> {
        if !self.fast_capable.borrow().contains(&v.bits) {
            return Ok(false);
        }
        let mut dynobjs = self.dynobjs.borrow_mut();
        let fields = dynobjs.get_mut(&v.bits).ok_or(TestError::NoSuchInstance)?;
        fields.insert(field.hash.0, value);
        Ok(true)
    }

    fn array_len(&self, arr: HostValue) -> Result<usize, Self::Error> {
        self.arrays.borrow().get(&arr.bits).map(Vec::len).ok_or(TestError::NoSuchInstance)
    }

    fn array_get(&self, arr: HostValue, idx: usize, _elem_kind: Kind) -> Result<FieldBits, Self::Error> {
        let arrays = self.arrays.borrow();
        let elems = arrays.get(&arr.bits).ok_or(TestError::NoSuchInstance)?;
        elems.get(idx).copied().ok_or(TestError::NoSuchInstance)
    }

    fn array_set(
        &mut self,
        arr: HostValue,
        idx: usize,
        _elem_kind: Kind,
        value: FieldBits,
    ) -> Result<(), Self::Error> {
        let mut arrays = self.arrays.borrow_mut();
        let elems = arrays.get_mut(&arr.bits).ok_or(TestError::NoSuchInstance)?;
        if idx >= elems.len() {
            elems.resize(idx + 1, FieldBits::Int(0));
        }
        elems[idx] = value;
        Ok(())
    }

    fn mem_store(&mut self, ptr: HostValue, offset: usize, _kind: Kind, value: FieldBits) -> Result<(), Self::Error> {
        let mut objs = self.objs.borrow_mut();
        objs.entry(ptr.bits).or_default().insert(offset, value);
        Ok(())
    }

    fn hash_gen(&self, name: &str) -> FieldHash {
        FieldHash(fnv1a(name))
    }

    fn dyn_geti(&self, v: HostValue, field: FieldHash) -> Result<i64, Self::Error> {
        let dynobjs = self.dynobjs.borrow();
        let fields = dynobjs.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        match fields.get(&field.0) {
            Some(FieldBits::Int(n)) => Ok(*n),
            _ => Ok(0),
        }
    }

    fn dyn_geti64(&self, v: HostValue, field: FieldHash) -> Result<i64, Self::Error> {
        self.dyn_geti(v, field)
    }

    fn dyn_getf(&self, v: HostValue, field: FieldHash) -> Result<f32, Self::Error> {
        let dynobjs = self.dynobjs.borrow();
        let fields = dynobjs.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        match fields.get(&field.0) {
            Some(FieldBits::Float(n)) => Ok(*n as f32),
            _ => Ok(0.0),
        }
    }

    fn dyn_getd(&self, v: HostValue, field: FieldHash) -> Result<f64, Self::Error> {
        let dynobjs = self.dynobjs.borrow();
        let fields = dynobjs.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        match fields.get(&field.0) {
            Some(FieldBits::Float(n)) => Ok(*n),
            _ => Ok(0.0),
        }
    }

    fn dyn_getp(&self, v: HostValue, field: FieldHash) -> Result<HostValue, Self::Error> {
        let dynobjs = self.dynobjs.borrow();
        let fields = dynobjs.get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        match fields.get(&field.0) {
            Some(FieldBits::Ptr(p)) => Ok(*p),
            _ => Ok(HostValue { kind: Kind::Null, bits: 0 }),
        }
    }

    fn dyn_seti(&mut self, v: HostValue, field: FieldHash, value: i64) -> Result<(), Self::Error> {
        self.dynobjs.borrow_mut().entry(v.bits).or_default().insert(field.0, FieldBits::Int(value));
        Ok(())
    }

    fn dyn_seti64(&mut self, v: HostValue, field: FieldHash, value: i64) -> Result<(), Self::Error> {
        self.dyn_seti(v, field, value)
    }

    fn dyn_setf(&mut self, v: HostValue, field: FieldHash, value: f32) -> Result<(), Self::Error> {
        self.dynobjs.borrow_mut().entry(v.bits).or_default().insert(field.0, FieldBits::Float(value as f64));
        Ok(())
    }

    fn dyn_setd(&mut self, v: HostValue, field: FieldHash, value: f64) -> Result<(), Self::Error> {
        self.dynobjs.borrow_mut().entry(v.bits).or_default().insert(field.0, FieldBits::Float(value));
        Ok(())
    }

    fn dyn_setp(&mut self, v: HostValue, field: FieldHash, value: HostValue) -> Result<(), Self::Error> {
        self.dynobjs.borrow_mut().entry(v.bits).or_default().insert(field.0, FieldBits::Ptr(value));
        Ok(())
    }

    fn dyn_casti(&self, v: HostValue, _dst: Kind) -> Result<i64, Self::Error> {
        Ok(*self.dynamics.borrow().get(&v.bits).ok_or(TestError::NoSuchInstance)? as i64)
    }

    fn dyn_casti64(&self, v: HostValue, dst: Kind) -> Result<i64, Self::Error> {
        self.dyn_casti(v, dst)
    }

    fn dyn_castf(&self, v: HostValue, _dst: Kind) -> Result<f32, Self::Error> {
        let bits = *self.dynamics.borrow().get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        Ok(f32::from_bits(bits as u32))
    }

    fn dyn_castd(&self, v: HostValue, _dst: Kind) -> Result<f64, Self::Error> {
        let bits = *self.dynamics.borrow().get(&v.bits).ok_or(TestError::NoSuchInstance)?;
        Ok(f64::from_bits(bits))
    }

    fn dyn_castp(&self, v: HostValue, dst: Kind) -> Result<HostValue, Self::Error> {
        Ok(HostValue { kind: dst, bits: v.bits })
    }
}

impl NativeFfi for TestRuntime {
    type Error = TestError;
    type ReentryError = InterpreterError<TestError>;

    fn call(
        &mut self,
        ptr: NativePtr,
        args: &[(Kind, &[u8])],
        _ret_kind: Kind,
        reentry: &mut dyn BytecodeReentry<Error = Self::ReentryError>,
    ) -> Result<Vec<u8>, Self::Error> {
        let natives = self.natives.borrow();
        let f = natives.get(&ptr.0).ok_or(TestError::NoSuchNative)?;
        f(args, reentry)
    }
}

#[derive(Default)]
pub struct TestHost {
    runtime: TestRuntime,
    roots: RefCell<HashSet<usize>>,
}

impl TestHost {
    pub fn runtime(&self) -> &TestRuntime {
        &self.runtime
    }

    /// Number of GC roots currently registered; used to assert root-discipline
    /// balance (P3) after a call returns.
    pub fn live_root_count(&self) -> usize {
        self.roots.borrow().len()
    }
}

impl Collector for TestHost {
    fn add_root(&mut self, addr: usize) {
        self.roots.borrow_mut().insert(addr);
    }

    fn remove_root(&mut self, addr: usize) {
        self.roots.borrow_mut().remove(&addr);
    }
}

impl HostRuntime for TestHost {
    type Dynamic = TestRuntime;
    type Ffi = TestRuntime;
    type Error = TestError;

    fn dynamic(&mut self) -> &mut Self::Dynamic {
        &mut self.runtime
    }

    fn ffi(&mut self) -> &mut Self::Ffi {
        &mut self.runtime
    }
}
