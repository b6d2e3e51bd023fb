//! Reflective codec dispatch
//!
//! A [`TypeInfo`] is captured from each parameter and return type when a
//! method is bound. [`codec_for`] turns it into the erased codec the
//! dispatch engine uses for every later call, so no type inspection
//! happens on the call path.

use crate::codec::{self, ErasedCodec, WireType};
use crate::error::{BindResult, BindingError};
use hostbind_sys::{self as sys, VariantType};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::ops::BitOr;

// ============================================================================
// Descriptors
// ============================================================================

/// Broad category of a wire type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// bool, integers and floats
    Primitive,
    /// Rust `String`
    String,
    /// Plain `#[repr(C)]` values such as `Vector3`
    Aggregate,
    /// Owned host handles such as `Array`
    Handle,
    /// Host object pointers
    Object,
    /// Any value (`Variant`)
    Any,
}

/// Capability bits that route a type to a codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Self = Self(0);
    /// The value is a host object pointer
    pub const OBJECT_HANDLE: Self = Self(1 << 0);
    /// The object is reference counted on the host
    pub const REF_COUNTED: Self = Self(1 << 1);

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Width hint reported to the host alongside an argument's type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArgumentMetadata {
    #[default]
    None,
    IntIsInt8,
    IntIsInt16,
    IntIsInt32,
    IntIsInt64,
    IntIsUint8,
    IntIsUint16,
    IntIsUint32,
    IntIsUint64,
    RealIsFloat,
    RealIsDouble,
}

impl ArgumentMetadata {
    pub const fn sys(self) -> sys::GDExtensionClassMethodArgumentMetadata {
        match self {
            ArgumentMetadata::None => sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_NONE,
            ArgumentMetadata::IntIsInt8 => sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT8,
            ArgumentMetadata::IntIsInt16 => sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT16,
            ArgumentMetadata::IntIsInt32 => sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT32,
            ArgumentMetadata::IntIsInt64 => sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT64,
            ArgumentMetadata::IntIsUint8 => sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT8,
            ArgumentMetadata::IntIsUint16 => {
                sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT16
            }
            ArgumentMetadata::IntIsUint32 => {
                sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT32
            }
            ArgumentMetadata::IntIsUint64 => {
                sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT64
            }
            ArgumentMetadata::RealIsFloat => {
                sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_REAL_IS_FLOAT
            }
            ArgumentMetadata::RealIsDouble => {
                sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_REAL_IS_DOUBLE
            }
        }
    }
}

/// Type descriptor captured from a Rust signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: &'static str,
    pub type_id: TypeId,
    pub kind: TypeKind,
    /// Host type tag; `Nil` for "any value"
    pub variant_type: VariantType,
    pub metadata: ArgumentMetadata,
    pub caps: Capabilities,
}

impl TypeInfo {
    pub fn of<T: WireType>() -> Self {
        Self {
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            kind: T::KIND,
            variant_type: T::VARIANT_TYPE,
            metadata: T::METADATA,
            caps: T::CAPS,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

static PRIMITIVE_CODECS: Lazy<FxHashMap<TypeId, &'static ErasedCodec>> = Lazy::new(|| {
    [
        &codec::BOOL_CODEC,
        &codec::I8_CODEC,
        &codec::I16_CODEC,
        &codec::I32_CODEC,
        &codec::I64_CODEC,
        &codec::U8_CODEC,
        &codec::U16_CODEC,
        &codec::U32_CODEC,
        &codec::U64_CODEC,
        &codec::F32_CODEC,
        &codec::F64_CODEC,
        &codec::STRING_CODEC,
    ]
    .into_iter()
    .map(|c: &'static ErasedCodec| ((c.type_id)(), c))
    .collect()
});

static AGGREGATE_CODECS: [&ErasedCodec; 32] = [
    &codec::VECTOR2_CODEC,
    &codec::VECTOR2I_CODEC,
    &codec::RECT2_CODEC,
    &codec::RECT2I_CODEC,
    &codec::VECTOR3_CODEC,
    &codec::VECTOR3I_CODEC,
    &codec::TRANSFORM2D_CODEC,
    &codec::VECTOR4_CODEC,
    &codec::VECTOR4I_CODEC,
    &codec::PLANE_CODEC,
    &codec::QUATERNION_CODEC,
    &codec::AABB_CODEC,
    &codec::BASIS_CODEC,
    &codec::TRANSFORM3D_CODEC,
    &codec::PROJECTION_CODEC,
    &codec::COLOR_CODEC,
    &codec::RID_CODEC,
    &codec::STRING_NAME_CODEC,
    &codec::NODE_PATH_CODEC,
    &codec::CALLABLE_CODEC,
    &codec::SIGNAL_CODEC,
    &codec::DICTIONARY_CODEC,
    &codec::ARRAY_CODEC,
    &codec::PACKED_BYTE_ARRAY_CODEC,
    &codec::PACKED_INT32_ARRAY_CODEC,
    &codec::PACKED_INT64_ARRAY_CODEC,
    &codec::PACKED_FLOAT32_ARRAY_CODEC,
    &codec::PACKED_FLOAT64_ARRAY_CODEC,
    &codec::PACKED_STRING_ARRAY_CODEC,
    &codec::PACKED_VECTOR2_ARRAY_CODEC,
    &codec::PACKED_VECTOR3_ARRAY_CODEC,
    &codec::PACKED_COLOR_ARRAY_CODEC,
];

/// Resolve the codec for a descriptor.
///
/// Order: primitives and strings by type id, then aggregates and handles by
/// type id, then anything carrying `OBJECT_HANDLE`, then the any-value codec.
pub fn codec_for(info: &TypeInfo) -> BindResult<&'static ErasedCodec> {
    match info.kind {
        TypeKind::Primitive | TypeKind::String => {
            if let Some(codec) = PRIMITIVE_CODECS.get(&info.type_id) {
                return Ok(codec);
            }
        }
        TypeKind::Aggregate | TypeKind::Handle => {
            if let Some(codec) = AGGREGATE_CODECS
                .iter()
                .find(|c| (c.type_id)() == info.type_id)
            {
                return Ok(codec);
            }
        }
        _ => {}
    }

    if info.caps.contains(Capabilities::OBJECT_HANDLE) {
        return Ok(&codec::OBJECT_CODEC);
    }
    if info.kind == TypeKind::Any {
        return Ok(&codec::VARIANT_CODEC);
    }

    Err(BindingError::UnresolvableType {
        type_name: info.name,
    })
}
