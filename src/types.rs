//! Type kinds and type descriptors.
//!
//! A [`Kind`] is the runtime tag that drives register slot layout and opcode
//! legality (invariant I1 in the design notes). A [`TypeDescriptor`] is the
//! richer, per-type metadata the loader hands the core: parameter lists for
//! functions, field layouts for objects/structs, field lists for virtuals,
//! and constructor layouts for enums.

use core::mem;

use strum::EnumIter;

use crate::error::Trap;

/// The size, in bytes, of a pointer-sized register slot on this target.
pub const POINTER_SIZE: usize = mem::size_of::<usize>();

/// Closed enumeration of register/value kinds.
///
/// `Packed` is reserved by the source format and is never a legal register
/// kind; every accessor below traps on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Kind {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit IEEE-754 float.
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// Boolean.
    Bool,
    /// The empty type; registers of this kind never carry data (I4).
    Void,
    /// Byte blob / interned string pointer.
    Bytes,
    /// Boxed dynamic value.
    Dyn,
    /// Function / closure pointer.
    Fun,
    /// Object instance pointer.
    Obj,
    /// Homogeneous array pointer.
    Array,
    /// Type-descriptor-as-value pointer (reflection).
    Type,
    /// Raw reference to a register slot, produced by `Ref`.
    Ref,
    /// Virtual projection over a dynamic value.
    Virtual,
    /// Untyped dynamic object.
    DynObj,
    /// Abstract (opaque host) pointer.
    Abstract,
    /// Enum instance pointer.
    Enum,
    /// The type of the `null` literal.
    Null,
    /// Bound method pointer.
    Method,
    /// Struct instance pointer (like `Obj` but unboxed-friendly on the host).
    Struct,
    /// Reserved by the source format; never a legal register kind.
    Packed,
}

impl Kind {
    /// Number of bytes a register of this kind occupies in a frame, before
    /// alignment padding.
    ///
    /// # Errors
    /// Returns [`Trap::PackedType`] for [`Kind::Packed`] (§4.A).
    pub fn slot_size(self) -> Result<usize, Trap> {
        use Kind::*;
        Ok(match self {
            U8 => 1,
            U16 => 2,
            I32 | F32 => 4,
            I64 | F64 => 8,
            Bool => 1,
            Void => 0,
            Bytes | Dyn | Fun | Obj | Array | Type | Ref | Virtual | DynObj | Abstract | Enum
            | Null | Method | Struct => POINTER_SIZE,
            Packed => return Err(Trap::PackedType),
        })
    }

    /// True for every reference kind (I2): the slot may hold a null pointer
    /// and must be traced by the collector.
    pub const fn can_be_null(self) -> bool {
        matches!(
            self,
            Kind::Bytes
                | Kind::Dyn
                | Kind::Fun
                | Kind::Obj
                | Kind::Array
                | Kind::Type
                | Kind::Ref
                | Kind::Virtual
                | Kind::DynObj
                | Kind::Abstract
                | Kind::Enum
                | Kind::Null
                | Kind::Method
                | Kind::Struct
        )
    }

    /// True for the integer kinds (`u8`, `u16`, `i32`, `i64`).
    pub const fn is_int(self) -> bool {
        matches!(self, Kind::U8 | Kind::U16 | Kind::I32 | Kind::I64)
    }

    /// True for the floating-point kinds.
    pub const fn is_float(self) -> bool {
        matches!(self, Kind::F32 | Kind::F64)
    }

    /// True for any numeric kind (integer or float).
    pub const fn is_number(self) -> bool {
        self.is_int() || self.is_float()
    }

    /// Maps this kind to the primitive/pointer encoding the FFI layer
    /// expects when packing a native call argument or return slot.
    ///
    /// `Void` maps to the FFI void type; every reference kind maps to a
    /// pointer. `Packed` traps.
    pub fn ffi_type(self) -> Result<FfiType, Trap> {
        use Kind::*;
        Ok(match self {
            U8 => FfiType::UInt8,
            U16 => FfiType::UInt16,
            I32 => FfiType::Sint32,
            I64 => FfiType::Sint64,
            F32 => FfiType::Float,
            F64 => FfiType::Double,
            Bool => FfiType::UInt8,
            Void => FfiType::Void,
            Bytes | Dyn | Fun | Obj | Array | Type | Ref | Virtual | DynObj | Abstract | Enum
            | Null | Method | Struct => FfiType::Pointer,
            Packed => return Err(Trap::PackedType),
        })
    }
}

/// The primitive/pointer encoding used at the native-call boundary (§6.5).
///
/// This is a language-neutral description the host's FFI bridge (e.g. a
/// `libffi`-backed implementation) translates into its own `ffi_type`
/// descriptors; the core never links against an FFI crate directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiType {
    /// No value (`void`).
    Void,
    /// Unsigned 8-bit.
    UInt8,
    /// Unsigned 16-bit.
    UInt16,
    /// Signed 32-bit.
    Sint32,
    /// Signed 64-bit.
    Sint64,
    /// IEEE-754 single precision.
    Float,
    /// IEEE-754 double precision.
    Double,
    /// A pointer-sized value.
    Pointer,
}

/// A stable hashed field name, as produced by the dynamic runtime's
/// `hash_gen(name, true)` (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHash(pub u32);

/// A field descriptor within an object/struct/virtual layout.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Stable hashed name, used by the hashed dynamic-get/set fallback.
    pub hash: FieldHash,
    /// The field's declared type.
    pub ty: Kind,
    /// Byte offset within the owning instance, as reported by the runtime
    /// layout (`get_obj_rt`/`obj_field_fetch`, §6.2).
    pub offset: usize,
}

/// Runtime layout of an `obj`/`struct` type: per-field byte offsets as
/// reported by the object runtime (`get_obj_rt`, §6.2).
#[derive(Debug, Clone, Default)]
pub struct ObjectLayout {
    /// Fields in declaration order, each carrying its byte offset.
    pub fields: Vec<FieldDescriptor>,
}

impl ObjectLayout {
    /// `obj_field_fetch(type, i)`: the field descriptor at slot `i`.
    pub fn field(&self, i: usize) -> Option<&FieldDescriptor> {
        self.fields.get(i)
    }
}

/// Ordered field list of a `virtual` type (§3, §4.E "Globals and fields").
#[derive(Debug, Clone, Default)]
pub struct VirtualLayout {
    /// Fields in declaration order. A virtual has no owned storage of its
    /// own; the fast path only applies when the projected dynamic object
    /// happens to expose a matching vfield slot.
    pub fields: Vec<FieldDescriptor>,
}

/// Per-constructor layout of an `enum` type.
#[derive(Debug, Clone)]
pub struct EnumConstructor {
    /// Parameter types, in declaration order.
    pub params: Vec<Kind>,
    /// Byte offset of each parameter within the constructor's storage.
    pub param_offsets: Vec<usize>,
}

/// Function type metadata: parameter/return types and arity.
#[derive(Debug, Clone)]
pub struct FunctionType {
    /// Parameter kinds, in declaration order.
    pub params: Vec<Kind>,
    /// Return kind.
    pub ret: Kind,
}

impl FunctionType {
    /// Declared arity (number of parameters).
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Opaque per-kind metadata, as described in §3 "Type descriptor".
///
/// The loader (out of scope) owns the full type table; the core only ever
/// reads through this view.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// The runtime kind this descriptor classifies.
    pub kind: Kind,
    /// Present for `Kind::Fun`.
    pub function: Option<FunctionType>,
    /// Present for `Kind::Obj` / `Kind::Struct`.
    pub object: Option<ObjectLayout>,
    /// Present for `Kind::Virtual`.
    pub virt: Option<VirtualLayout>,
    /// Present for `Kind::Enum`, indexed by constructor id.
    pub enum_constructors: Vec<EnumConstructor>,
}

impl TypeDescriptor {
    /// Build a descriptor for a plain (non-aggregate) kind.
    pub const fn primitive(kind: Kind) -> Self {
        Self {
            kind,
            function: None,
            object: None,
            virt: None,
            enum_constructors: Vec::new(),
        }
    }

    /// Slot size for this descriptor's kind (delegates to [`Kind::slot_size`]).
    pub fn slot_size(&self) -> Result<usize, Trap> {
        self.kind.slot_size()
    }

    /// The object/struct runtime layout, or a trap if this isn't an
    /// object-shaped type.
    pub fn object_layout(&self) -> Result<&ObjectLayout, Trap> {
        self.object.as_ref().ok_or(Trap::KindMismatch)
    }

    /// The virtual field list, or a trap if this isn't a virtual type.
    pub fn virtual_layout(&self) -> Result<&VirtualLayout, Trap> {
        self.virt.as_ref().ok_or(Trap::KindMismatch)
    }

    /// The function type, or a trap if this isn't a function type.
    pub fn function_type(&self) -> Result<&FunctionType, Trap> {
        self.function.as_ref().ok_or(Trap::KindMismatch)
    }

    /// The constructor layout at `ctor`, or a trap if out of range or not an
    /// enum type.
    pub fn constructor(&self, ctor: usize) -> Result<&EnumConstructor, Trap> {
        self.enum_constructors.get(ctor).ok_or(Trap::KindMismatch)
    }
}
