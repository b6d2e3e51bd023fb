//! Object and any-value codecs

use super::{ErasedCodec, NativeValue, WireType};
use crate::reflect::{Capabilities, TypeKind};
use crate::types::ObjectHandle;
use crate::variant::Variant;
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};

impl WireType for ObjectHandle {
    const NAME: &'static str = "ObjectHandle";
    const VARIANT_TYPE: VariantType = VariantType::Object;
    const KIND: TypeKind = TypeKind::Object;
    const CAPS: Capabilities = Capabilities::OBJECT_HANDLE;

    unsafe fn decode_type_ptr(_wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
        ObjectHandle::from_sys(*(ptr as *const sys::GDExtensionObjectPtr))
    }

    unsafe fn encode_type_ptr(&self, _wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
        *(ptr as *mut sys::GDExtensionObjectPtr) = self.as_sys();
    }

    fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
        if value.is_nil(wire) {
            return ObjectHandle::null();
        }
        let mut raw: sys::GDExtensionObjectPtr = std::ptr::null_mut();
        unsafe {
            wire.to_type(
                VariantType::Object,
                &mut raw as *mut sys::GDExtensionObjectPtr as sys::GDExtensionUninitializedTypePtr,
                value.as_ptr(),
            )
        };
        ObjectHandle::from_sys(raw)
    }

    fn encode_variant(&self, wire: &WireTable) -> Variant {
        if self.is_null() {
            return Variant::nil();
        }
        let raw = self.as_sys();
        unsafe {
            Variant::new_with(|dst| {
                wire.from_type(
                    VariantType::Object,
                    dst,
                    &raw as *const sys::GDExtensionObjectPtr as sys::GDExtensionConstTypePtr,
                )
            })
        }
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Object(self)
    }

    fn from_native(value: NativeValue) -> Option<Self> {
        match value {
            NativeValue::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl WireType for Variant {
    const NAME: &'static str = "Variant";
    const VARIANT_TYPE: VariantType = VariantType::Nil;
    const KIND: TypeKind = TypeKind::Any;

    unsafe fn decode_type_ptr(wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
        Variant::from_sys_copy(wire, ptr)
    }

    unsafe fn encode_type_ptr(&self, wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
        wire.host().variant_new_copy(ptr, self.as_ptr());
    }

    fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
        unsafe { Variant::from_sys_copy(wire, value.as_ptr()) }
    }

    fn encode_variant(&self, wire: &WireTable) -> Variant {
        unsafe { Variant::from_sys_copy(wire, self.as_ptr()) }
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Variant(self)
    }

    fn from_native(value: NativeValue) -> Option<Self> {
        match value {
            NativeValue::Variant(v) => Some(v),
            _ => None,
        }
    }
}

pub static OBJECT_CODEC: ErasedCodec = ErasedCodec::of::<ObjectHandle>();
pub static VARIANT_CODEC: ErasedCodec = ErasedCodec::of::<Variant>();

/// A typed wrapper around a host object pointer.
///
/// Implement this and invoke [`impl_object_wire_type!`](crate::impl_object_wire_type)
/// to pass the wrapper directly as a method argument or return value. It
/// travels through the object codec.
pub trait ObjectWrapper: Sized + Send + 'static {
    fn from_handle(handle: ObjectHandle) -> Self;
    fn handle(&self) -> ObjectHandle;
}

/// Implement `WireType` for an [`ObjectWrapper`].
///
/// ```ignore
/// struct Node(ObjectHandle);
/// impl ObjectWrapper for Node { /* ... */ }
/// impl_object_wire_type!(Node);
/// impl_object_wire_type!(Texture, ref_counted);
/// ```
#[macro_export]
macro_rules! impl_object_wire_type {
    ($ty:ty) => {
        $crate::impl_object_wire_type!(@impl $ty, $crate::reflect::Capabilities::OBJECT_HANDLE);
    };
    ($ty:ty, ref_counted) => {
        $crate::impl_object_wire_type!(
            @impl $ty,
            $crate::reflect::Capabilities::OBJECT_HANDLE
                .union($crate::reflect::Capabilities::REF_COUNTED)
        );
    };
    (@impl $ty:ty, $caps:expr) => {
        impl $crate::codec::WireType for $ty {
            const NAME: &'static str = stringify!($ty);
            const VARIANT_TYPE: $crate::sys::VariantType = $crate::sys::VariantType::Object;
            const KIND: $crate::reflect::TypeKind = $crate::reflect::TypeKind::Object;
            const CAPS: $crate::reflect::Capabilities = $caps;

            unsafe fn decode_type_ptr(
                wire: &$crate::wire::WireTable,
                ptr: $crate::sys::GDExtensionConstTypePtr,
            ) -> Self {
                <$ty as $crate::codec::ObjectWrapper>::from_handle(
                    <$crate::types::ObjectHandle as $crate::codec::WireType>::decode_type_ptr(wire, ptr),
                )
            }

            unsafe fn encode_type_ptr(
                &self,
                wire: &$crate::wire::WireTable,
                ptr: $crate::sys::GDExtensionTypePtr,
            ) {
                $crate::codec::WireType::encode_type_ptr(
                    &$crate::codec::ObjectWrapper::handle(self),
                    wire,
                    ptr,
                )
            }

            fn decode_variant(
                wire: &$crate::wire::WireTable,
                value: &$crate::variant::Variant,
            ) -> Self {
                <$ty as $crate::codec::ObjectWrapper>::from_handle(
                    <$crate::types::ObjectHandle as $crate::codec::WireType>::decode_variant(wire, value),
                )
            }

            fn encode_variant(&self, wire: &$crate::wire::WireTable) -> $crate::variant::Variant {
                $crate::codec::WireType::encode_variant(&$crate::codec::ObjectWrapper::handle(self), wire)
            }

            fn into_native(self) -> $crate::codec::NativeValue {
                $crate::codec::NativeValue::Object($crate::codec::ObjectWrapper::handle(&self))
            }

            fn from_native(value: $crate::codec::NativeValue) -> Option<Self> {
                match value {
                    $crate::codec::NativeValue::Object(handle) => {
                        Some(<$ty as $crate::codec::ObjectWrapper>::from_handle(handle))
                    }
                    _ => None,
                }
            }
        }
    };
}
