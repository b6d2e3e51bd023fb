//! Rust `String` codec
//!
//! Text is transcoded through the host's UTF-8 entry points on every
//! crossing. A raw slot holds a host `String`; the bridge never looks
//! inside it.

use super::{ErasedCodec, NativeValue, WireType};
use crate::handle::{read_utf8, GString};
use crate::reflect::TypeKind;
use crate::variant::Variant;
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};

impl WireType for String {
    const NAME: &'static str = "String";
    const VARIANT_TYPE: VariantType = VariantType::String;
    const KIND: TypeKind = TypeKind::String;

    unsafe fn decode_type_ptr(wire: &WireTable, ptr: sys::GDExtensionConstTypePtr) -> Self {
        read_utf8(wire, ptr)
    }

    unsafe fn encode_type_ptr(&self, wire: &WireTable, ptr: sys::GDExtensionTypePtr) {
        wire.host()
            .string_new_with_utf8_chars_and_len(ptr, self.as_bytes());
    }

    fn decode_variant(wire: &WireTable, value: &Variant) -> Self {
        let text = unsafe {
            GString::new_with(|dst| wire.to_type(VariantType::String, dst, value.as_ptr()))
        };
        text.to_rust_string(wire)
    }

    fn encode_variant(&self, wire: &WireTable) -> Variant {
        let text = GString::from_str(wire, self);
        unsafe { Variant::new_with(|dst| wire.from_type(VariantType::String, dst, text.as_ptr())) }
    }

    fn into_native(self) -> NativeValue {
        NativeValue::String(self)
    }

    fn from_native(value: NativeValue) -> Option<Self> {
        match value {
            NativeValue::String(v) => Some(v),
            _ => None,
        }
    }
}

pub static STRING_CODEC: ErasedCodec = ErasedCodec::of::<String>();
