//! Scalar codecs
//!
//! Integers travel in an `i64` slot and floats in an `f64` slot whatever
//! their Rust width; narrowing truncates. Booleans are one byte and any
//! non-zero byte reads as `true`.

use super::{NativeValue, WireType};
use crate::reflect::{ArgumentMetadata, TypeKind};
use crate::variant::Variant;
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};

/// Box a plain value of type `ty` held in `slot`.
pub(crate) fn box_plain<S>(wire: &WireTable, ty: VariantType, slot: &S) -> Variant {
    unsafe {
        Variant::new_with(|dst| {
            wire.from_type(ty, dst, slot as *const S as sys::GDExtensionConstTypePtr)
        })
    }
}

/// Unbox a plain value of type `ty`, starting from `slot`'s initial value.
pub(crate) fn unbox_plain<S>(wire: &WireTable, ty: VariantType, value: &Variant, mut slot: S) -> S {
    unsafe { wire.to_type(ty, &mut slot as *mut S as sys::GDExtensionUninitializedTypePtr, value.as_ptr()) };
    slot
}

impl WireType for bool {
    const NAME: &'static str = "bool";
    const VARIANT_TYPE: VariantType = VariantType::Bool;
    const KIND: TypeKind = TypeKind::Primitive;

    unsafe fn decode_type_ptr(_wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
        *(ptr as *const sys::GDExtensionBool) != 0
    }

    unsafe fn encode_type_ptr(&self, _wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
        *(ptr as *mut sys::GDExtensionBool) = if *self {
            sys::GDEXTENSION_TRUE
        } else {
            sys::GDEXTENSION_FALSE
        };
    }

    fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
        unbox_plain::<sys::GDExtensionBool>(wire, VariantType::Bool, value, 0) != 0
    }

    fn encode_variant(&self, wire: &WireTable) -> Variant {
        let byte: sys::GDExtensionBool = if *self { 1 } else { 0 };
        box_plain(wire, VariantType::Bool, &byte)
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Bool(self)
    }

    fn from_native(value: NativeValue) -> Option<Self> {
        match value {
            NativeValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! int_wire_type {
    ($($ty:ty => $variant:ident, $meta:ident;)*) => {
        $(
            impl WireType for $ty {
                const NAME: &'static str = stringify!($ty);
                const VARIANT_TYPE: VariantType = VariantType::Int;
                const KIND: TypeKind = TypeKind::Primitive;
                const METADATA: ArgumentMetadata = ArgumentMetadata::$meta;

                unsafe fn decode_type_ptr(_wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
                    *(ptr as *const sys::GDExtensionInt) as $ty
                }

                unsafe fn encode_type_ptr(&self, _wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
                    *(ptr as *mut sys::GDExtensionInt) = *self as sys::GDExtensionInt;
                }

                fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
                    unbox_plain::<sys::GDExtensionInt>(wire, VariantType::Int, value, 0) as $ty
                }

                fn encode_variant(&self, wire: &WireTable) -> Variant {
                    box_plain(wire, VariantType::Int, &(*self as sys::GDExtensionInt))
                }

                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }

                fn from_native(value: NativeValue) -> Option<Self> {
                    match value {
                        NativeValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_wire_type! {
    i8 => I8, IntIsInt8;
    i16 => I16, IntIsInt16;
    i32 => I32, IntIsInt32;
    i64 => I64, IntIsInt64;
    u8 => U8, IntIsUint8;
    u16 => U16, IntIsUint16;
    u32 => U32, IntIsUint32;
    u64 => U64, IntIsUint64;
}

macro_rules! float_wire_type {
    ($($ty:ty => $variant:ident, $meta:ident;)*) => {
        $(
            impl WireType for $ty {
                const NAME: &'static str = stringify!($ty);
                const VARIANT_TYPE: VariantType = VariantType::Float;
                const KIND: TypeKind = TypeKind::Primitive;
                const METADATA: ArgumentMetadata = ArgumentMetadata::$meta;

                unsafe fn decode_type_ptr(_wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
                    *(ptr as *const f64) as $ty
                }

                unsafe fn encode_type_ptr(&self, _wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
                    *(ptr as *mut f64) = *self as f64;
                }

                fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
                    unbox_plain::<f64>(wire, VariantType::Float, value, 0.0) as $ty
                }

                fn encode_variant(&self, wire: &WireTable) -> Variant {
                    box_plain(wire, VariantType::Float, &(*self as f64))
                }

                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }

                fn from_native(value: NativeValue) -> Option<Self> {
                    match value {
                        NativeValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

float_wire_type! {
    f32 => F32, RealIsFloat;
    f64 => F64, RealIsDouble;
}

pub static BOOL_CODEC: super::ErasedCodec = super::ErasedCodec::of::<bool>();
pub static I8_CODEC: super::ErasedCodec = super::ErasedCodec::of::<i8>();
pub static I16_CODEC: super::ErasedCodec = super::ErasedCodec::of::<i16>();
pub static I32_CODEC: super::ErasedCodec = super::ErasedCodec::of::<i32>();
pub static I64_CODEC: super::ErasedCodec = super::ErasedCodec::of::<i64>();
pub static U8_CODEC: super::ErasedCodec = super::ErasedCodec::of::<u8>();
pub static U16_CODEC: super::ErasedCodec = super::ErasedCodec::of::<u16>();
pub static U32_CODEC: super::ErasedCodec = super::ErasedCodec::of::<u32>();
pub static U64_CODEC: super::ErasedCodec = super::ErasedCodec::of::<u64>();
pub static F32_CODEC: super::ErasedCodec = super::ErasedCodec::of::<f32>();
pub static F64_CODEC: super::ErasedCodec = super::ErasedCodec::of::<f64>();

#[cfg(test)]
mod tests {
    use super::*;

    fn wire() -> &'static WireTable {
        crate::testing::install().1
    }

    #[test]
    fn test_bool_nonzero_byte_is_true() {
        let wire = wire();
        for byte in [1u8, 2, 0x80, 0xff] {
            let decoded = unsafe { bool::decode_type_ptr(wire, &byte as *const u8 as _) };
            assert!(decoded, "byte {byte} should decode to true");
        }
        let zero = 0u8;
        assert!(!unsafe { bool::decode_type_ptr(wire, &zero as *const u8 as _) });
    }

    #[test]
    fn test_bool_encodes_canonical_bytes() {
        let wire = wire();
        let mut slot = 0xAAu8;
        unsafe { true.encode_type_ptr(wire, &mut slot as *mut u8 as _) };
        assert_eq!(slot, 1);
        unsafe { false.encode_type_ptr(wire, &mut slot as *mut u8 as _) };
        assert_eq!(slot, 0);
    }

    #[test]
    fn test_narrowing_truncates() {
        let wire = wire();
        let slot: i64 = 0x1_0000_0102;
        assert_eq!(unsafe { u8::decode_type_ptr(wire, &slot as *const i64 as _) }, 0x02);
        assert_eq!(unsafe { i16::decode_type_ptr(wire, &slot as *const i64 as _) }, 0x0102);
        assert_eq!(unsafe { i32::decode_type_ptr(wire, &slot as *const i64 as _) }, 0x0102);
    }

    #[test]
    fn test_int_widens_into_i64_slot() {
        let wire = wire();
        let mut slot: i64 = 0;
        unsafe { (-5i8).encode_type_ptr(wire, &mut slot as *mut i64 as _) };
        assert_eq!(slot, -5);
        unsafe { u32::MAX.encode_type_ptr(wire, &mut slot as *mut i64 as _) };
        assert_eq!(slot, u32::MAX as i64);
    }

    #[test]
    fn test_f32_through_f64_slot() {
        let wire = wire();
        let mut slot = 0f64;
        unsafe { 1.5f32.encode_type_ptr(wire, &mut slot as *mut f64 as _) };
        assert_eq!(slot, 1.5);
        assert_eq!(unsafe { f32::decode_type_ptr(wire, &slot as *const f64 as _) }, 1.5f32);
    }

    #[test]
    fn test_metadata() {
        assert_eq!(<i8 as WireType>::METADATA, ArgumentMetadata::IntIsInt8);
        assert_eq!(<u64 as WireType>::METADATA, ArgumentMetadata::IntIsUint64);
        assert_eq!(<f32 as WireType>::METADATA, ArgumentMetadata::RealIsFloat);
        assert_eq!(<bool as WireType>::METADATA, ArgumentMetadata::None);
    }
}
