//! End-to-end scenarios (§8 "Concrete end-to-end scenarios"), each building a
//! tiny in-memory module by hand and driving it through [`Interpreter::call`].

mod common;

use std::sync::Arc;

use typed_reg_vm::config::Config;
use typed_reg_vm::error::{InterpreterError, Trap};
use typed_reg_vm::interpreter::Interpreter;
use typed_reg_vm::module::{ConstantPools, FunctionRecord, Module, NativePtr, NativeRecord, PhysicalIndex};
use typed_reg_vm::opcode::Opcode;
use typed_reg_vm::types::{EnumConstructor, FieldDescriptor, FieldHash, FunctionType, Kind, POINTER_SIZE, TypeDescriptor, VirtualLayout};

use common::TestHost;

fn ptr_bytes(bits: u64) -> Vec<u8> {
    bits.to_le_bytes()[..POINTER_SIZE].to_vec()
}

/// Matches the hash `TestRuntime::hash_gen`/`give_fast_slot`/`give_hashed_field`
/// use internally, so a hand-built `FieldDescriptor` resolves to the same slot.
fn fnv1a(name: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in name.as_bytes() {
        h ^= *b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

fn interpreter(module: Module) -> Interpreter<TestHost> {
    Interpreter::new(Arc::new(module), Config::default(), TestHost::default()).unwrap()
}

#[test]
fn identity_returns_its_single_argument() {
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![Kind::I32], ret: Kind::I32 },
        registers: vec![Kind::I32],
        register_types: vec![None],
        ops: vec![Opcode::Ret { src: 0 }],
    };
    let module = Module {
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    };
    let mut interp = interpreter(module);
    let ret = interp.call(0, &[(Kind::I32, &7i32.to_le_bytes())]).unwrap();
    assert_eq!(i32::from_le_bytes(ret.bytes().try_into().unwrap()), 7);
}

#[test]
fn sum_loop_accumulates_one_through_n() {
    // r0: param, r1: acc, r2: i, r3: bool (unused scratch, as in §8 scenario 2).
    let ops = vec![
        Opcode::Int { dst: 1, k: 0 }, // r1 = 0
        Opcode::Int { dst: 2, k: 1 }, // r2 = 1
        Opcode::JSGt { a: 2, b: 0, offset: 3 }, // L: if r2 > r0, jump to END
        Opcode::Add { dst: 1, a: 1, b: 2 },
        Opcode::Incr { dst: 2 },
        Opcode::JAlways { offset: -4 }, // back to L
        Opcode::Ret { src: 1 },         // END
    ];
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![Kind::I32], ret: Kind::I32 },
        registers: vec![Kind::I32, Kind::I32, Kind::I32, Kind::Bool],
        register_types: vec![None; 4],
        ops,
    };
    let module = Module {
        constants: ConstantPools { ints: vec![0, 1], ..Default::default() },
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    };
    let mut interp = interpreter(module);
    let ret = interp.call(0, &[(Kind::I32, &5i32.to_le_bytes())]).unwrap();
    assert_eq!(i32::from_le_bytes(ret.bytes().try_into().unwrap()), 15);
}

#[test]
fn signed_division_by_zero_yields_zero() {
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![Kind::I32, Kind::I32], ret: Kind::I32 },
        registers: vec![Kind::I32, Kind::I32, Kind::I32],
        register_types: vec![None; 3],
        ops: vec![Opcode::SDiv { dst: 2, a: 0, b: 1 }, Opcode::Ret { src: 2 }],
    };
    let module = Module {
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    };
    let mut interp = interpreter(module);
    let ret = interp
        .call(0, &[(Kind::I32, &10i32.to_le_bytes()), (Kind::I32, &0i32.to_le_bytes())])
        .unwrap();
    assert_eq!(i32::from_le_bytes(ret.bytes().try_into().unwrap()), 0);
}

#[test]
fn null_check_traps_on_a_null_object_register() {
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![], ret: Kind::Void },
        registers: vec![Kind::Obj],
        register_types: vec![None],
        ops: vec![Opcode::NullCheck { src: 0 }, Opcode::Ret { src: 0 }],
    };
    let module = Module {
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    };
    let mut interp = interpreter(module);
    let err = interp.call(0, &[]).unwrap_err();
    assert!(matches!(err, InterpreterError::Trap(Trap::NullAccess)));
}

#[test]
fn virtual_field_read_agrees_across_fast_path_and_hashed_fallback() {
    let field = FieldDescriptor { hash: FieldHash(fnv1a("x")), ty: Kind::I32, offset: 0 };
    let ty = TypeDescriptor {
        kind: Kind::Virtual,
        function: None,
        object: None,
        virt: Some(VirtualLayout { fields: vec![field] }),
        enum_constructors: vec![],
    };
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![Kind::Virtual], ret: Kind::I32 },
        registers: vec![Kind::Virtual, Kind::I32],
        register_types: vec![Some(0), None],
        ops: vec![Opcode::Field { dst: 1, obj: 0, field: 0 }, Opcode::Ret { src: 1 }],
    };
    let module = Arc::new(Module {
        types: vec![ty],
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    });

    let fast_host = TestHost::default();
    let fast_obj = fast_host.runtime().new_dynobj();
    fast_host.runtime().give_fast_slot(fast_obj, "x", typed_reg_vm::host::FieldBits::Int(42));
    let mut fast_interp = Interpreter::new(Arc::clone(&module), Config::default(), fast_host).unwrap();
    let fast_ret = fast_interp
        .call(0, &[(Kind::Virtual, &ptr_bytes(fast_obj.bits))])
        .unwrap();

    let hashed_host = TestHost::default();
    let hashed_obj = hashed_host.runtime().new_dynobj();
    hashed_host.runtime().give_hashed_field(hashed_obj, "x", typed_reg_vm::host::FieldBits::Int(42));
    let mut hashed_interp = Interpreter::new(Arc::clone(&module), Config::default(), hashed_host).unwrap();
    let hashed_ret = hashed_interp
        .call(0, &[(Kind::Virtual, &ptr_bytes(hashed_obj.bits))])
        .unwrap();

    assert_eq!(
        i32::from_le_bytes(fast_ret.bytes().try_into().unwrap()),
        i32::from_le_bytes(hashed_ret.bytes().try_into().unwrap()),
    );
    assert_eq!(i32::from_le_bytes(fast_ret.bytes().try_into().unwrap()), 42);
}

#[test]
fn native_call_round_trips_and_calls_back_into_bytecode() {
    use std::cell::Cell;
    use std::rc::Rc;
    use typed_reg_vm::host::BytecodeReentry;

    // findex 0: main, calls the native at findex 2 with (40, 2).
    let main = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![], ret: Kind::I32 },
        registers: vec![Kind::I32, Kind::I32, Kind::I32],
        register_types: vec![None; 3],
        ops: vec![
            Opcode::Int { dst: 0, k: 0 },
            Opcode::Int { dst: 1, k: 1 },
            Opcode::Call2 { dst: 2, fun: 2, a0: 0, a1: 1 },
            Opcode::Ret { src: 2 },
        ],
    };
    // findex 1: negate(i32) -> i32, the callback target.
    let negate = FunctionRecord {
        findex: 1,
        ty: FunctionType { params: vec![Kind::I32], ret: Kind::I32 },
        registers: vec![Kind::I32, Kind::I32],
        register_types: vec![None; 2],
        ops: vec![Opcode::Neg { dst: 1, src: 0 }, Opcode::Ret { src: 1 }],
    };
    let native = NativeRecord {
        findex: 2,
        ty: FunctionType { params: vec![Kind::I32, Kind::I32], ret: Kind::I32 },
        ptr: NativePtr(7),
    };
    let module = Module {
        constants: ConstantPools { ints: vec![40, 2], ..Default::default() },
        functions: vec![main, negate],
        natives: vec![native],
        functions_indexes: vec![PhysicalIndex(0), PhysicalIndex(1), PhysicalIndex(2)],
        ..Default::default()
    };

    let observed = Rc::new(Cell::new(None));
    let observed_in_closure = Rc::clone(&observed);
    let host = TestHost::default();
    host.runtime().register_native(
        7,
        Box::new(move |args, reentry| {
            let a = i32::from_le_bytes(args[0].1.try_into().unwrap());
            let b = i32::from_le_bytes(args[1].1.try_into().unwrap());
            let sum = a + b;
            let neg_bytes = sum.to_le_bytes();
            let result = reentry
                .call_back(1, &[(Kind::I32, &neg_bytes)], Kind::I32)
                .map_err(|_| common::TestError::NoSuchNative)?;
            observed_in_closure.set(Some(i32::from_le_bytes(result.try_into().unwrap())));
            Ok(sum.to_le_bytes().to_vec())
        }),
    );

    let mut interp = Interpreter::new(Arc::new(module), Config::default(), host).unwrap();
    let ret = interp.call(0, &[]).unwrap();
    assert_eq!(i32::from_le_bytes(ret.bytes().try_into().unwrap()), 42);
    assert_eq!(observed.get(), Some(-42));
}

#[test]
fn enum_alloc_set_index_and_field_round_trip() {
    let ctor_with_field = EnumConstructor { params: vec![Kind::I32], param_offsets: vec![0] };
    let ty = TypeDescriptor {
        kind: Kind::Enum,
        function: None,
        object: None,
        virt: None,
        enum_constructors: vec![
            ctor_with_field.clone(),
            EnumConstructor { params: vec![], param_offsets: vec![] },
            ctor_with_field,
        ],
    };

    let read_index = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![], ret: Kind::I32 },
        registers: vec![Kind::Enum, Kind::I32],
        register_types: vec![Some(0), None],
        ops: vec![
            Opcode::EnumAlloc { dst: 0, ctor: 2 },
            Opcode::EnumIndex { dst: 1, e: 0 },
            Opcode::Ret { src: 1 },
        ],
    };
    let read_field = FunctionRecord {
        findex: 1,
        ty: FunctionType { params: vec![], ret: Kind::I32 },
        registers: vec![Kind::Enum, Kind::I32, Kind::I32],
        register_types: vec![Some(0), None, None],
        ops: vec![
            Opcode::EnumAlloc { dst: 0, ctor: 2 },
            Opcode::Int { dst: 1, k: 0 },
            Opcode::SetEnumField { dst: 0, field: 0, src: 1 },
            Opcode::EnumField { dst: 2, e: 0, ctor: 2, field: 0 },
            Opcode::Ret { src: 2 },
        ],
    };
    let module = Module {
        constants: ConstantPools { ints: vec![99], ..Default::default() },
        types: vec![ty],
        functions: vec![read_index, read_field],
        functions_indexes: vec![PhysicalIndex(0), PhysicalIndex(1)],
        ..Default::default()
    };
    let mut interp = interpreter(module);

    let idx_ret = interp.call(0, &[]).unwrap();
    assert_eq!(i32::from_le_bytes(idx_ret.bytes().try_into().unwrap()), 2);

    let field_ret = interp.call(1, &[]).unwrap();
    assert_eq!(i32::from_le_bytes(field_ret.bytes().try_into().unwrap()), 99);
}

#[test]
fn alloc_dispatches_on_destination_kind_and_load_type_reads_the_type_table() {
    fn alloc_fn(findex: usize, kind: Kind, typed: bool) -> FunctionRecord {
        FunctionRecord {
            findex,
            ty: FunctionType { params: vec![], ret: kind },
            registers: vec![kind],
            register_types: vec![if typed { Some(0) } else { None }],
            ops: vec![Opcode::Alloc { dst: 0 }, Opcode::Ret { src: 0 }],
        }
    }
    let load_type_fn = FunctionRecord {
        findex: 3,
        ty: FunctionType { params: vec![], ret: Kind::Type },
        registers: vec![Kind::Type],
        register_types: vec![None],
        ops: vec![Opcode::LoadType { dst: 0, k: 0 }, Opcode::Ret { src: 0 }],
    };
    let module = Module {
        types: vec![TypeDescriptor::primitive(Kind::Obj)],
        functions: vec![
            alloc_fn(0, Kind::Obj, true),
            alloc_fn(1, Kind::DynObj, false),
            alloc_fn(2, Kind::Virtual, true),
            load_type_fn,
        ],
        functions_indexes: vec![PhysicalIndex(0), PhysicalIndex(1), PhysicalIndex(2), PhysicalIndex(3)],
        ..Default::default()
    };
    let mut interp = interpreter(module);

    for findex in 0..3 {
        let ret = interp.call(findex, &[]).unwrap();
        let mut buf = [0u8; 8];
        buf[..ret.bytes().len()].copy_from_slice(ret.bytes());
        assert_ne!(u64::from_le_bytes(buf), 0, "alloc at findex {findex} returned a null pointer");
    }

    let ret = interp.call(3, &[]).unwrap();
    let mut buf = [0u8; 8];
    buf[..ret.bytes().len()].copy_from_slice(ret.bytes());
    assert_eq!(u64::from_le_bytes(buf), 1);
}

#[test]
fn alloc_on_a_non_instantiable_kind_traps() {
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![], ret: Kind::I32 },
        registers: vec![Kind::I32],
        register_types: vec![None],
        ops: vec![Opcode::Alloc { dst: 0 }, Opcode::Ret { src: 0 }],
    };
    let module = Module {
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    };
    let mut interp = interpreter(module);
    let err = interp.call(0, &[]).unwrap_err();
    assert!(matches!(err, InterpreterError::Trap(Trap::KindMismatch)));
}

#[test]
fn gc_root_registration_balances_across_a_completed_call() {
    let func = FunctionRecord {
        findex: 0,
        ty: FunctionType { params: vec![Kind::Obj], ret: Kind::Obj },
        registers: vec![Kind::Obj],
        register_types: vec![None],
        ops: vec![Opcode::Ret { src: 0 }],
    };
    let module = Module {
        functions: vec![func],
        functions_indexes: vec![PhysicalIndex(0)],
        ..Default::default()
    };
    let host = TestHost::default();
    let mut interp = Interpreter::new(Arc::new(module), Config::default(), host).unwrap();
    interp.call(0, &[(Kind::Obj, &ptr_bytes(0))]).unwrap();
    assert_eq!(interp.host().live_root_count(), 0);
}
