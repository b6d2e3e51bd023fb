//! Value codecs
//!
//! Every type that can cross the host boundary implements [`WireType`]:
//! four conversions between the Rust value, a raw `TypePtr` slot and a boxed
//! [`Variant`], plus a [`TypeInfo`] descriptor captured at bind time.
//!
//! Dispatch does not know the concrete types. It works with
//! [`ErasedCodec`], the same four conversions over [`NativeValue`], chosen
//! once per parameter by `reflect::codec_for`.

mod aggregate;
mod object;
mod scalar;
mod string;

pub use aggregate::*;
pub use object::*;
pub use scalar::*;
pub use string::*;

use crate::error::{BindResult, BindingError};
use crate::handle::*;
use crate::reflect::{ArgumentMetadata, Capabilities, TypeInfo, TypeKind};
use crate::types::*;
use crate::variant::Variant;
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};
use std::any::TypeId;

// ============================================================================
// Native Value
// ============================================================================

/// Type-erased native value
#[derive(Debug, Clone)]
pub enum NativeValue {
    Nil,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Vector2(Vector2),
    Vector2i(Vector2i),
    Rect2(Rect2),
    Rect2i(Rect2i),
    Vector3(Vector3),
    Vector3i(Vector3i),
    Transform2D(Transform2D),
    Vector4(Vector4),
    Vector4i(Vector4i),
    Plane(Plane),
    Quaternion(Quaternion),
    Aabb(Aabb),
    Basis(Basis),
    Transform3D(Transform3D),
    Projection(Projection),
    Color(Color),
    Rid(Rid),
    StringName(StringName),
    NodePath(NodePath),
    Callable(Callable),
    Signal(Signal),
    Dictionary(Dictionary),
    Array(Array),
    PackedByteArray(PackedByteArray),
    PackedInt32Array(PackedInt32Array),
    PackedInt64Array(PackedInt64Array),
    PackedFloat32Array(PackedFloat32Array),
    PackedFloat64Array(PackedFloat64Array),
    PackedStringArray(PackedStringArray),
    PackedVector2Array(PackedVector2Array),
    PackedVector3Array(PackedVector3Array),
    PackedColorArray(PackedColorArray),
    Object(ObjectHandle),
    Variant(Variant),
}

impl NativeValue {
    /// Name of the carried type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Nil => "nil",
            NativeValue::Bool(_) => "bool",
            NativeValue::I8(_) => "i8",
            NativeValue::I16(_) => "i16",
            NativeValue::I32(_) => "i32",
            NativeValue::I64(_) => "i64",
            NativeValue::U8(_) => "u8",
            NativeValue::U16(_) => "u16",
            NativeValue::U32(_) => "u32",
            NativeValue::U64(_) => "u64",
            NativeValue::F32(_) => "f32",
            NativeValue::F64(_) => "f64",
            NativeValue::String(_) => "String",
            NativeValue::Vector2(_) => "Vector2",
            NativeValue::Vector2i(_) => "Vector2i",
            NativeValue::Rect2(_) => "Rect2",
            NativeValue::Rect2i(_) => "Rect2i",
            NativeValue::Vector3(_) => "Vector3",
            NativeValue::Vector3i(_) => "Vector3i",
            NativeValue::Transform2D(_) => "Transform2D",
            NativeValue::Vector4(_) => "Vector4",
            NativeValue::Vector4i(_) => "Vector4i",
            NativeValue::Plane(_) => "Plane",
            NativeValue::Quaternion(_) => "Quaternion",
            NativeValue::Aabb(_) => "Aabb",
            NativeValue::Basis(_) => "Basis",
            NativeValue::Transform3D(_) => "Transform3D",
            NativeValue::Projection(_) => "Projection",
            NativeValue::Color(_) => "Color",
            NativeValue::Rid(_) => "Rid",
            NativeValue::StringName(_) => "StringName",
            NativeValue::NodePath(_) => "NodePath",
            NativeValue::Callable(_) => "Callable",
            NativeValue::Signal(_) => "Signal",
            NativeValue::Dictionary(_) => "Dictionary",
            NativeValue::Array(_) => "Array",
            NativeValue::PackedByteArray(_) => "PackedByteArray",
            NativeValue::PackedInt32Array(_) => "PackedInt32Array",
            NativeValue::PackedInt64Array(_) => "PackedInt64Array",
            NativeValue::PackedFloat32Array(_) => "PackedFloat32Array",
            NativeValue::PackedFloat64Array(_) => "PackedFloat64Array",
            NativeValue::PackedStringArray(_) => "PackedStringArray",
            NativeValue::PackedVector2Array(_) => "PackedVector2Array",
            NativeValue::PackedVector3Array(_) => "PackedVector3Array",
            NativeValue::PackedColorArray(_) => "PackedColorArray",
            NativeValue::Object(_) => "ObjectHandle",
            NativeValue::Variant(_) => "Variant",
        }
    }
}

// ============================================================================
// Wire Type
// ============================================================================

/// A Rust type with a host representation
pub trait WireType: Sized + Send + 'static {
    /// Rust-side name, for diagnostics
    const NAME: &'static str;
    /// Host type tag. `Nil` for "any value".
    const VARIANT_TYPE: VariantType;
    const KIND: TypeKind;
    const CAPS: Capabilities = Capabilities::NONE;
    const METADATA: ArgumentMetadata = ArgumentMetadata::None;

    /// Descriptor used for codec resolution
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Self>()
    }

    /// Read a value from a raw slot.
    ///
    /// # Safety
    ///
    /// `ptr` must hold an initialized host value of `VARIANT_TYPE`.
    unsafe fn decode_type_ptr(wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self;

    /// Write a value into a raw slot. The slot's previous contents are
    /// overwritten, not destroyed.
    ///
    /// # Safety
    ///
    /// `ptr` must be writable storage for a host value of `VARIANT_TYPE`.
    unsafe fn encode_type_ptr(&self, wire: &WireTable, ptr: sys::GDExtensionTypePtr);

    /// Unbox a variant. The caller checks the variant's type first.
    fn decode_variant(wire: &WireTable, value: &Variant) -> Self;

    /// Box into a fresh variant
    fn encode_variant(&self, wire: &WireTable) -> Variant;

    fn into_native(self) -> NativeValue;

    fn from_native(value: NativeValue) -> Option<Self>;
}

// ============================================================================
// Erased Codec
// ============================================================================

/// Type-erased codec, one static per wire type
pub struct ErasedCodec {
    pub type_name: &'static str,
    pub variant_type: VariantType,
    pub type_id: fn() -> TypeId,
    /// Same contract as [`WireType::decode_type_ptr`]
    pub decode_type_ptr: unsafe fn(&WireTable, sys::GDExtensionConstTypePtr) -> NativeValue,
    /// Same contract as [`WireType::encode_type_ptr`]
    pub encode_type_ptr:
        unsafe fn(&WireTable, NativeValue, sys::GDExtensionTypePtr) -> BindResult<()>,
    /// `None` when the variant's type does not match
    pub decode_variant: fn(&WireTable, &Variant) -> Option<NativeValue>,
    pub encode_variant: fn(&WireTable, NativeValue) -> BindResult<Variant>,
}

impl ErasedCodec {
    pub const fn of<T: WireType>() -> Self {
        Self {
            type_name: T::NAME,
            variant_type: T::VARIANT_TYPE,
            type_id: TypeId::of::<T>,
            decode_type_ptr: erased_decode_type_ptr::<T>,
            encode_type_ptr: erased_encode_type_ptr::<T>,
            decode_variant: erased_decode_variant::<T>,
            encode_variant: erased_encode_variant::<T>,
        }
    }
}

impl std::fmt::Debug for ErasedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedCodec")
            .field("type_name", &self.type_name)
            .field("variant_type", &self.variant_type)
            .finish()
    }
}

unsafe fn erased_decode_type_ptr<T: WireType>(
    wire: &WireTable,
    ptr: sys::GDExtensionConstTypePtr,
) -> NativeValue {
    T::decode_type_ptr(wire, ptr).into_native()
}

unsafe fn erased_encode_type_ptr<T: WireType>(
    wire: &WireTable,
    value: NativeValue,
    ptr: sys::GDExtensionTypePtr,
) -> BindResult<()> {
    let value = typed::<T>(value)?;
    value.encode_type_ptr(wire, ptr);
    Ok(())
}

fn erased_decode_variant<T: WireType>(wire: &WireTable, value: &Variant) -> Option<NativeValue> {
    if !accepts_variant::<T>(value.get_type(wire)) {
        return None;
    }
    Some(T::decode_variant(wire, value).into_native())
}

fn erased_encode_variant<T: WireType>(wire: &WireTable, value: NativeValue) -> BindResult<Variant> {
    Ok(typed::<T>(value)?.encode_variant(wire))
}

fn typed<T: WireType>(value: NativeValue) -> BindResult<T> {
    let found = value.type_name();
    T::from_native(value).ok_or(BindingError::ValueTypeMismatch {
        expected: T::NAME,
        found,
    })
}

/// Whether a variant of type `found` can be unboxed as `T`. Object
/// parameters also accept nil, which decodes to a null handle.
pub(crate) fn accepts_variant<T: WireType>(found: VariantType) -> bool {
    match T::KIND {
        TypeKind::Any => true,
        TypeKind::Object => found == VariantType::Object || found == VariantType::Nil,
        _ => found == T::VARIANT_TYPE,
    }
}
