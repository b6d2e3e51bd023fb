//! Aggregate and handle codecs
//!
//! Plain aggregates are copied bit for bit on the raw path. Handles are
//! copied with the host's copy constructor so the host sees the extra
//! reference. Both go through the host's from/to-type constructors when
//! boxed.

use super::scalar::{box_plain, unbox_plain};
use super::{ErasedCodec, NativeValue, WireType};
use crate::handle::*;
use crate::reflect::TypeKind;
use crate::types::*;
use crate::variant::Variant;
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};

macro_rules! plain_wire_type {
    ($($ty:ident => $codec:ident;)*) => {
        $(
            impl WireType for $ty {
                const NAME: &'static str = stringify!($ty);
                const VARIANT_TYPE: VariantType = VariantType::$ty;
                const KIND: TypeKind = TypeKind::Aggregate;

                unsafe fn decode_type_ptr(_wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
                    std::ptr::read_unaligned(ptr as *const $ty)
                }

                unsafe fn encode_type_ptr(&self, _wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
                    std::ptr::write_unaligned(ptr as *mut $ty, *self);
                }

                fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
                    unbox_plain(wire, VariantType::$ty, value, $ty::default())
                }

                fn encode_variant(&self, wire: &WireTable) -> Variant {
                    box_plain(wire, VariantType::$ty, self)
                }

                fn into_native(self) -> NativeValue {
                    NativeValue::$ty(self)
                }

                fn from_native(value: NativeValue) -> Option<Self> {
                    match value {
                        NativeValue::$ty(v) => Some(v),
                        _ => None,
                    }
                }
            }

            pub static $codec: ErasedCodec = ErasedCodec::of::<$ty>();
        )*
    };
}

plain_wire_type! {
    Vector2 => VECTOR2_CODEC;
    Vector2i => VECTOR2I_CODEC;
    Rect2 => RECT2_CODEC;
    Rect2i => RECT2I_CODEC;
    Vector3 => VECTOR3_CODEC;
    Vector3i => VECTOR3I_CODEC;
    Transform2D => TRANSFORM2D_CODEC;
    Vector4 => VECTOR4_CODEC;
    Vector4i => VECTOR4I_CODEC;
    Plane => PLANE_CODEC;
    Quaternion => QUATERNION_CODEC;
    Aabb => AABB_CODEC;
    Basis => BASIS_CODEC;
    Transform3D => TRANSFORM3D_CODEC;
    Projection => PROJECTION_CODEC;
    Color => COLOR_CODEC;
    Rid => RID_CODEC;
}

macro_rules! handle_wire_type {
    ($($ty:ident => $codec:ident;)*) => {
        $(
            impl WireType for $ty {
                const NAME: &'static str = stringify!($ty);
                const VARIANT_TYPE: VariantType = VariantType::$ty;
                const KIND: TypeKind = TypeKind::Handle;

                unsafe fn decode_type_ptr(wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
                    $ty::from_sys_copy(wire, ptr)
                }

                unsafe fn encode_type_ptr(&self, wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
                    wire.copy(VariantType::$ty, ptr, self.as_ptr());
                }

                fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
                    unsafe { $ty::new_with(|dst| wire.to_type(VariantType::$ty, dst, value.as_ptr())) }
                }

                fn encode_variant(&self, wire: &WireTable) -> Variant {
                    unsafe {
                        Variant::new_with(|dst| wire.from_type(VariantType::$ty, dst, self.as_ptr()))
                    }
                }

                fn into_native(self) -> NativeValue {
                    NativeValue::$ty(self)
                }

                fn from_native(value: NativeValue) -> Option<Self> {
                    match value {
                        NativeValue::$ty(v) => Some(v),
                        _ => None,
                    }
                }
            }

            pub static $codec: ErasedCodec = ErasedCodec::of::<$ty>();
        )*
    };
}

handle_wire_type! {
    StringName => STRING_NAME_CODEC;
    NodePath => NODE_PATH_CODEC;
    Callable => CALLABLE_CODEC;
    Signal => SIGNAL_CODEC;
    Dictionary => DICTIONARY_CODEC;
    Array => ARRAY_CODEC;
    PackedByteArray => PACKED_BYTE_ARRAY_CODEC;
    PackedInt32Array => PACKED_INT32_ARRAY_CODEC;
    PackedInt64Array => PACKED_INT64_ARRAY_CODEC;
    PackedFloat32Array => PACKED_FLOAT32_ARRAY_CODEC;
    PackedFloat64Array => PACKED_FLOAT64_ARRAY_CODEC;
    PackedStringArray => PACKED_STRING_ARRAY_CODEC;
    PackedVector2Array => PACKED_VECTOR2_ARRAY_CODEC;
    PackedVector3Array => PACKED_VECTOR3_ARRAY_CODEC;
    PackedColorArray => PACKED_COLOR_ARRAY_CODEC;
}
