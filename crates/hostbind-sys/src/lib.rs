//! Raw declarations for the host extension C interface
//!
//! Everything in this crate mirrors the host's `gdextension_interface.h`
//! byte for byte: pointer aliases, enum values, descriptor structs and the
//! function-pointer typedefs returned by `get_proc_address`. There is no
//! logic here beyond the variant type table.
//!
//! Enums the host writes into our memory are declared as integer typedefs
//! with associated constants, because receiving an out-of-range value in a
//! Rust `enum` is undefined behavior. [`VariantType`] is the checked Rust
//! view over `GDExtensionVariantType`.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use std::os::raw::{c_char, c_void};

// ============================================================================
// Scalars and Pointers
// ============================================================================

pub type GDExtensionBool = u8;
pub type GDExtensionInt = i64;
pub type GDObjectInstanceID = u64;
pub type char32_t = u32;

pub type GDExtensionVariantPtr = *mut c_void;
pub type GDExtensionConstVariantPtr = *const c_void;
pub type GDExtensionUninitializedVariantPtr = *mut c_void;
pub type GDExtensionStringNamePtr = *mut c_void;
pub type GDExtensionConstStringNamePtr = *const c_void;
pub type GDExtensionUninitializedStringNamePtr = *mut c_void;
pub type GDExtensionStringPtr = *mut c_void;
pub type GDExtensionConstStringPtr = *const c_void;
pub type GDExtensionUninitializedStringPtr = *mut c_void;
pub type GDExtensionObjectPtr = *mut c_void;
pub type GDExtensionConstObjectPtr = *const c_void;
pub type GDExtensionTypePtr = *mut c_void;
pub type GDExtensionConstTypePtr = *const c_void;
pub type GDExtensionUninitializedTypePtr = *mut c_void;
pub type GDExtensionMethodBindPtr = *const c_void;
pub type GDExtensionClassLibraryPtr = *mut c_void;
pub type GDExtensionClassInstancePtr = *mut c_void;

pub const GDEXTENSION_TRUE: GDExtensionBool = 1;
pub const GDEXTENSION_FALSE: GDExtensionBool = 0;

/// Size in bytes of the host's variant.
pub const VARIANT_SIZE: usize = 24;
/// Size in bytes of a host `String` / `StringName` / `NodePath` / `Array` / `Dictionary`.
pub const OPAQUE_POINTER_SIZE: usize = 8;
/// Size in bytes of `Callable`, `Signal` and every packed array.
pub const OPAQUE_DOUBLE_POINTER_SIZE: usize = 16;

// ============================================================================
// Variant Types
// ============================================================================

pub type GDExtensionVariantType = u32;

pub const GDEXTENSION_VARIANT_TYPE_NIL: GDExtensionVariantType = 0;
pub const GDEXTENSION_VARIANT_TYPE_BOOL: GDExtensionVariantType = 1;
pub const GDEXTENSION_VARIANT_TYPE_INT: GDExtensionVariantType = 2;
pub const GDEXTENSION_VARIANT_TYPE_FLOAT: GDExtensionVariantType = 3;
pub const GDEXTENSION_VARIANT_TYPE_STRING: GDExtensionVariantType = 4;
pub const GDEXTENSION_VARIANT_TYPE_VECTOR2: GDExtensionVariantType = 5;
pub const GDEXTENSION_VARIANT_TYPE_VECTOR2I: GDExtensionVariantType = 6;
pub const GDEXTENSION_VARIANT_TYPE_RECT2: GDExtensionVariantType = 7;
pub const GDEXTENSION_VARIANT_TYPE_RECT2I: GDExtensionVariantType = 8;
pub const GDEXTENSION_VARIANT_TYPE_VECTOR3: GDExtensionVariantType = 9;
pub const GDEXTENSION_VARIANT_TYPE_VECTOR3I: GDExtensionVariantType = 10;
pub const GDEXTENSION_VARIANT_TYPE_TRANSFORM2D: GDExtensionVariantType = 11;
pub const GDEXTENSION_VARIANT_TYPE_VECTOR4: GDExtensionVariantType = 12;
pub const GDEXTENSION_VARIANT_TYPE_VECTOR4I: GDExtensionVariantType = 13;
pub const GDEXTENSION_VARIANT_TYPE_PLANE: GDExtensionVariantType = 14;
pub const GDEXTENSION_VARIANT_TYPE_QUATERNION: GDExtensionVariantType = 15;
pub const GDEXTENSION_VARIANT_TYPE_AABB: GDExtensionVariantType = 16;
pub const GDEXTENSION_VARIANT_TYPE_BASIS: GDExtensionVariantType = 17;
pub const GDEXTENSION_VARIANT_TYPE_TRANSFORM3D: GDExtensionVariantType = 18;
pub const GDEXTENSION_VARIANT_TYPE_PROJECTION: GDExtensionVariantType = 19;
pub const GDEXTENSION_VARIANT_TYPE_COLOR: GDExtensionVariantType = 20;
pub const GDEXTENSION_VARIANT_TYPE_STRING_NAME: GDExtensionVariantType = 21;
pub const GDEXTENSION_VARIANT_TYPE_NODE_PATH: GDExtensionVariantType = 22;
pub const GDEXTENSION_VARIANT_TYPE_RID: GDExtensionVariantType = 23;
pub const GDEXTENSION_VARIANT_TYPE_OBJECT: GDExtensionVariantType = 24;
pub const GDEXTENSION_VARIANT_TYPE_CALLABLE: GDExtensionVariantType = 25;
pub const GDEXTENSION_VARIANT_TYPE_SIGNAL: GDExtensionVariantType = 26;
pub const GDEXTENSION_VARIANT_TYPE_DICTIONARY: GDExtensionVariantType = 27;
pub const GDEXTENSION_VARIANT_TYPE_ARRAY: GDExtensionVariantType = 28;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_BYTE_ARRAY: GDExtensionVariantType = 29;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_INT32_ARRAY: GDExtensionVariantType = 30;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_INT64_ARRAY: GDExtensionVariantType = 31;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_FLOAT32_ARRAY: GDExtensionVariantType = 32;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_FLOAT64_ARRAY: GDExtensionVariantType = 33;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_STRING_ARRAY: GDExtensionVariantType = 34;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_VECTOR2_ARRAY: GDExtensionVariantType = 35;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_VECTOR3_ARRAY: GDExtensionVariantType = 36;
pub const GDEXTENSION_VARIANT_TYPE_PACKED_COLOR_ARRAY: GDExtensionVariantType = 37;
pub const GDEXTENSION_VARIANT_TYPE_VARIANT_MAX: GDExtensionVariantType = 38;

/// Checked view of `GDExtensionVariantType`.
///
/// Discriminants are the host's tag values, so `ty as u32` is the wire tag.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantType {
    Nil = 0,
    Bool,
    Int,
    Float,
    String,
    Vector2,
    Vector2i,
    Rect2,
    Rect2i,
    Vector3,
    Vector3i,
    Transform2D,
    Vector4,
    Vector4i,
    Plane,
    Quaternion,
    Aabb,
    Basis,
    Transform3D,
    Projection,
    Color,
    StringName,
    NodePath,
    Rid,
    Object,
    Callable,
    Signal,
    Dictionary,
    Array,
    PackedByteArray,
    PackedInt32Array,
    PackedInt64Array,
    PackedFloat32Array,
    PackedFloat64Array,
    PackedStringArray,
    PackedVector2Array,
    PackedVector3Array,
    PackedColorArray,
}

/// Number of concrete variant types (`GDEXTENSION_VARIANT_TYPE_VARIANT_MAX`).
pub const VARIANT_TYPE_COUNT: usize = GDEXTENSION_VARIANT_TYPE_VARIANT_MAX as usize;

/// Which types own external resources and must be destroyed through the
/// host before their storage is released or overwritten. Indexed by tag.
pub const NEEDS_DEINIT: [bool; VARIANT_TYPE_COUNT] = [
    false, // NIL
    false, // BOOL
    false, // INT
    false, // FLOAT
    true,  // STRING
    false, // VECTOR2
    false, // VECTOR2I
    false, // RECT2
    false, // RECT2I
    false, // VECTOR3
    false, // VECTOR3I
    true,  // TRANSFORM2D
    false, // VECTOR4
    false, // VECTOR4I
    false, // PLANE
    false, // QUATERNION
    true,  // AABB
    true,  // BASIS
    true,  // TRANSFORM3D
    true,  // PROJECTION
    false, // COLOR
    true,  // STRING_NAME
    true,  // NODE_PATH
    false, // RID
    true,  // OBJECT
    true,  // CALLABLE
    true,  // SIGNAL
    true,  // DICTIONARY
    true,  // ARRAY
    true,  // PACKED_BYTE_ARRAY
    true,  // PACKED_INT32_ARRAY
    true,  // PACKED_INT64_ARRAY
    true,  // PACKED_FLOAT32_ARRAY
    true,  // PACKED_FLOAT64_ARRAY
    true,  // PACKED_STRING_ARRAY
    true,  // PACKED_VECTOR2_ARRAY
    true,  // PACKED_VECTOR3_ARRAY
    true,  // PACKED_COLOR_ARRAY
];

impl VariantType {
    /// Every concrete type in tag order.
    pub const ALL: [VariantType; VARIANT_TYPE_COUNT] = [
        VariantType::Nil,
        VariantType::Bool,
        VariantType::Int,
        VariantType::Float,
        VariantType::String,
        VariantType::Vector2,
        VariantType::Vector2i,
        VariantType::Rect2,
        VariantType::Rect2i,
        VariantType::Vector3,
        VariantType::Vector3i,
        VariantType::Transform2D,
        VariantType::Vector4,
        VariantType::Vector4i,
        VariantType::Plane,
        VariantType::Quaternion,
        VariantType::Aabb,
        VariantType::Basis,
        VariantType::Transform3D,
        VariantType::Projection,
        VariantType::Color,
        VariantType::StringName,
        VariantType::NodePath,
        VariantType::Rid,
        VariantType::Object,
        VariantType::Callable,
        VariantType::Signal,
        VariantType::Dictionary,
        VariantType::Array,
        VariantType::PackedByteArray,
        VariantType::PackedInt32Array,
        VariantType::PackedInt64Array,
        VariantType::PackedFloat32Array,
        VariantType::PackedFloat64Array,
        VariantType::PackedStringArray,
        VariantType::PackedVector2Array,
        VariantType::PackedVector3Array,
        VariantType::PackedColorArray,
    ];

    /// Convert a raw host tag. Returns `None` for `VARIANT_MAX` and above.
    #[inline]
    pub fn from_sys(tag: GDExtensionVariantType) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Raw host tag.
    #[inline]
    pub const fn sys(self) -> GDExtensionVariantType {
        self as GDExtensionVariantType
    }

    /// Whether values of this type own host resources.
    #[inline]
    pub const fn needs_deinit(self) -> bool {
        NEEDS_DEINIT[self as usize]
    }

    /// Host-facing type name, as printed by the host's own `type_string`.
    pub const fn name(self) -> &'static str {
        match self {
            VariantType::Nil => "Nil",
            VariantType::Bool => "bool",
            VariantType::Int => "int",
            VariantType::Float => "float",
            VariantType::String => "String",
            VariantType::Vector2 => "Vector2",
            VariantType::Vector2i => "Vector2i",
            VariantType::Rect2 => "Rect2",
            VariantType::Rect2i => "Rect2i",
            VariantType::Vector3 => "Vector3",
            VariantType::Vector3i => "Vector3i",
            VariantType::Transform2D => "Transform2D",
            VariantType::Vector4 => "Vector4",
            VariantType::Vector4i => "Vector4i",
            VariantType::Plane => "Plane",
            VariantType::Quaternion => "Quaternion",
            VariantType::Aabb => "AABB",
            VariantType::Basis => "Basis",
            VariantType::Transform3D => "Transform3D",
            VariantType::Projection => "Projection",
            VariantType::Color => "Color",
            VariantType::StringName => "StringName",
            VariantType::NodePath => "NodePath",
            VariantType::Rid => "RID",
            VariantType::Object => "Object",
            VariantType::Callable => "Callable",
            VariantType::Signal => "Signal",
            VariantType::Dictionary => "Dictionary",
            VariantType::Array => "Array",
            VariantType::PackedByteArray => "PackedByteArray",
            VariantType::PackedInt32Array => "PackedInt32Array",
            VariantType::PackedInt64Array => "PackedInt64Array",
            VariantType::PackedFloat32Array => "PackedFloat32Array",
            VariantType::PackedFloat64Array => "PackedFloat64Array",
            VariantType::PackedStringArray => "PackedStringArray",
            VariantType::PackedVector2Array => "PackedVector2Array",
            VariantType::PackedVector3Array => "PackedVector3Array",
            VariantType::PackedColorArray => "PackedColorArray",
        }
    }

    /// Size in bytes of the unboxed (TypePtr) representation, single-precision build.
    pub const fn type_ptr_size(self) -> usize {
        match self {
            VariantType::Nil => 0,
            VariantType::Bool => 1,
            VariantType::Int | VariantType::Float => 8,
            VariantType::String
            | VariantType::StringName
            | VariantType::NodePath
            | VariantType::Dictionary
            | VariantType::Array
            | VariantType::Object
            | VariantType::Rid => 8,
            VariantType::Vector2 | VariantType::Vector2i => 8,
            VariantType::Vector3 | VariantType::Vector3i => 12,
            VariantType::Rect2
            | VariantType::Rect2i
            | VariantType::Vector4
            | VariantType::Vector4i
            | VariantType::Plane
            | VariantType::Quaternion
            | VariantType::Color => 16,
            VariantType::Transform2D | VariantType::Aabb => 24,
            VariantType::Basis => 36,
            VariantType::Transform3D => 48,
            VariantType::Projection => 64,
            VariantType::Callable
            | VariantType::Signal
            | VariantType::PackedByteArray
            | VariantType::PackedInt32Array
            | VariantType::PackedInt64Array
            | VariantType::PackedFloat32Array
            | VariantType::PackedFloat64Array
            | VariantType::PackedStringArray
            | VariantType::PackedVector2Array
            | VariantType::PackedVector3Array
            | VariantType::PackedColorArray => 16,
        }
    }
}

// ============================================================================
// Call Errors
// ============================================================================

pub type GDExtensionCallErrorType = u32;

pub const GDEXTENSION_CALL_OK: GDExtensionCallErrorType = 0;
pub const GDEXTENSION_CALL_ERROR_INVALID_METHOD: GDExtensionCallErrorType = 1;
/// `expected` is the variant type.
pub const GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT: GDExtensionCallErrorType = 2;
/// `expected` is the number of arguments.
pub const GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS: GDExtensionCallErrorType = 3;
/// `expected` is the number of arguments.
pub const GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS: GDExtensionCallErrorType = 4;
pub const GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL: GDExtensionCallErrorType = 5;
/// Used for const calls.
pub const GDEXTENSION_CALL_ERROR_METHOD_NOT_CONST: GDExtensionCallErrorType = 6;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GDExtensionCallError {
    pub error: GDExtensionCallErrorType,
    pub argument: i32,
    pub expected: i32,
}

// ============================================================================
// Variant Constructors and Destructors
// ============================================================================

pub type GDExtensionVariantFromTypeConstructorFunc =
    Option<unsafe extern "C" fn(GDExtensionUninitializedVariantPtr, GDExtensionTypePtr)>;
pub type GDExtensionTypeFromVariantConstructorFunc =
    Option<unsafe extern "C" fn(GDExtensionUninitializedTypePtr, GDExtensionVariantPtr)>;
pub type GDExtensionPtrConstructor =
    Option<unsafe extern "C" fn(GDExtensionUninitializedTypePtr, *const GDExtensionConstTypePtr)>;
pub type GDExtensionPtrDestructor = Option<unsafe extern "C" fn(GDExtensionTypePtr)>;

// ============================================================================
// Instance Bindings
// ============================================================================

pub type GDExtensionInstanceBindingCreateCallback =
    Option<unsafe extern "C" fn(p_token: *mut c_void, p_instance: *mut c_void) -> *mut c_void>;
pub type GDExtensionInstanceBindingFreeCallback = Option<
    unsafe extern "C" fn(p_token: *mut c_void, p_instance: *mut c_void, p_binding: *mut c_void),
>;
pub type GDExtensionInstanceBindingReferenceCallback = Option<
    unsafe extern "C" fn(
        p_token: *mut c_void,
        p_binding: *mut c_void,
        p_reference: GDExtensionBool,
    ) -> GDExtensionBool,
>;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GDExtensionInstanceBindingCallbacks {
    pub create_callback: GDExtensionInstanceBindingCreateCallback,
    pub free_callback: GDExtensionInstanceBindingFreeCallback,
    pub reference_callback: GDExtensionInstanceBindingReferenceCallback,
}

// ============================================================================
// Property Info
// ============================================================================

pub type GDExtensionPropertyHint = u32;
pub const PROPERTY_HINT_NONE: GDExtensionPropertyHint = 0;

pub type GDExtensionPropertyUsageFlags = u32;
pub const PROPERTY_USAGE_NONE: GDExtensionPropertyUsageFlags = 0;
pub const PROPERTY_USAGE_STORAGE: GDExtensionPropertyUsageFlags = 2;
pub const PROPERTY_USAGE_EDITOR: GDExtensionPropertyUsageFlags = 4;
pub const PROPERTY_USAGE_DEFAULT: GDExtensionPropertyUsageFlags =
    PROPERTY_USAGE_STORAGE | PROPERTY_USAGE_EDITOR;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GDExtensionPropertyInfo {
    pub type_: GDExtensionVariantType,
    pub name: GDExtensionStringNamePtr,
    pub class_name: GDExtensionStringNamePtr,
    /// Bitfield of `PropertyHint` (defined in `extension_api.json`).
    pub hint: u32,
    pub hint_string: GDExtensionStringPtr,
    /// Bitfield of `PropertyUsageFlags` (defined in `extension_api.json`).
    pub usage: u32,
}

// ============================================================================
// Methods
// ============================================================================

pub type GDExtensionClassMethodFlags = u32;

pub const GDEXTENSION_METHOD_FLAG_NORMAL: GDExtensionClassMethodFlags = 1;
pub const GDEXTENSION_METHOD_FLAG_EDITOR: GDExtensionClassMethodFlags = 2;
pub const GDEXTENSION_METHOD_FLAG_CONST: GDExtensionClassMethodFlags = 4;
pub const GDEXTENSION_METHOD_FLAG_VIRTUAL: GDExtensionClassMethodFlags = 8;
pub const GDEXTENSION_METHOD_FLAG_VARARG: GDExtensionClassMethodFlags = 16;
pub const GDEXTENSION_METHOD_FLAG_STATIC: GDExtensionClassMethodFlags = 32;
pub const GDEXTENSION_METHOD_FLAGS_DEFAULT: GDExtensionClassMethodFlags =
    GDEXTENSION_METHOD_FLAG_NORMAL;

pub type GDExtensionClassMethodArgumentMetadata = u32;

pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_NONE: GDExtensionClassMethodArgumentMetadata = 0;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT8: GDExtensionClassMethodArgumentMetadata = 1;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT16: GDExtensionClassMethodArgumentMetadata = 2;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT32: GDExtensionClassMethodArgumentMetadata = 3;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_INT64: GDExtensionClassMethodArgumentMetadata = 4;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT8: GDExtensionClassMethodArgumentMetadata = 5;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT16: GDExtensionClassMethodArgumentMetadata = 6;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT32: GDExtensionClassMethodArgumentMetadata = 7;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_INT_IS_UINT64: GDExtensionClassMethodArgumentMetadata = 8;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_REAL_IS_FLOAT: GDExtensionClassMethodArgumentMetadata = 9;
pub const GDEXTENSION_METHOD_ARGUMENT_METADATA_REAL_IS_DOUBLE: GDExtensionClassMethodArgumentMetadata = 10;

pub type GDExtensionClassMethodCall = Option<
    unsafe extern "C" fn(
        method_userdata: *mut c_void,
        p_instance: GDExtensionClassInstancePtr,
        p_args: *const GDExtensionConstVariantPtr,
        p_argument_count: GDExtensionInt,
        r_return: GDExtensionVariantPtr,
        r_error: *mut GDExtensionCallError,
    ),
>;

pub type GDExtensionClassMethodPtrCall = Option<
    unsafe extern "C" fn(
        method_userdata: *mut c_void,
        p_instance: GDExtensionClassInstancePtr,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr,
    ),
>;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GDExtensionClassMethodInfo {
    pub name: GDExtensionStringNamePtr,
    pub method_userdata: *mut c_void,
    pub call_func: GDExtensionClassMethodCall,
    pub ptrcall_func: GDExtensionClassMethodPtrCall,
    /// Bitfield of `GDExtensionClassMethodFlags`.
    pub method_flags: u32,
    pub has_return_value: GDExtensionBool,
    pub return_value_info: *mut GDExtensionPropertyInfo,
    pub return_value_metadata: GDExtensionClassMethodArgumentMetadata,
    /// Number of entries in both `arguments_info` and `arguments_metadata`.
    pub argument_count: u32,
    pub arguments_info: *mut GDExtensionPropertyInfo,
    pub arguments_metadata: *mut GDExtensionClassMethodArgumentMetadata,
    pub default_argument_count: u32,
    pub default_arguments: *mut GDExtensionVariantPtr,
}

// ============================================================================
// Extension Classes
// ============================================================================

pub type GDExtensionClassSet = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_name: GDExtensionConstStringNamePtr,
        p_value: GDExtensionConstVariantPtr,
    ) -> GDExtensionBool,
>;
pub type GDExtensionClassGet = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_name: GDExtensionConstStringNamePtr,
        r_ret: GDExtensionVariantPtr,
    ) -> GDExtensionBool,
>;
pub type GDExtensionClassGetRID =
    Option<unsafe extern "C" fn(p_instance: GDExtensionClassInstancePtr) -> u64>;
pub type GDExtensionClassGetPropertyList = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        r_count: *mut u32,
    ) -> *const GDExtensionPropertyInfo,
>;
pub type GDExtensionClassFreePropertyList2 = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_list: *const GDExtensionPropertyInfo,
        p_count: u32,
    ),
>;
pub type GDExtensionClassPropertyCanRevert = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_name: GDExtensionConstStringNamePtr,
    ) -> GDExtensionBool,
>;
pub type GDExtensionClassPropertyGetRevert = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_name: GDExtensionConstStringNamePtr,
        r_ret: GDExtensionVariantPtr,
    ) -> GDExtensionBool,
>;
pub type GDExtensionClassValidateProperty = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_property: *mut GDExtensionPropertyInfo,
    ) -> GDExtensionBool,
>;
pub type GDExtensionClassNotification2 = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_what: i32,
        p_reversed: GDExtensionBool,
    ),
>;
pub type GDExtensionClassToString = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        r_is_valid: *mut GDExtensionBool,
        p_out: GDExtensionStringPtr,
    ),
>;
pub type GDExtensionClassReference =
    Option<unsafe extern "C" fn(p_instance: GDExtensionClassInstancePtr)>;
pub type GDExtensionClassUnreference =
    Option<unsafe extern "C" fn(p_instance: GDExtensionClassInstancePtr)>;
pub type GDExtensionClassCallVirtual = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr,
    ),
>;
pub type GDExtensionClassCreateInstance =
    Option<unsafe extern "C" fn(p_class_userdata: *mut c_void) -> GDExtensionObjectPtr>;
pub type GDExtensionClassFreeInstance = Option<
    unsafe extern "C" fn(p_class_userdata: *mut c_void, p_instance: GDExtensionClassInstancePtr),
>;
pub type GDExtensionClassRecreateInstance = Option<
    unsafe extern "C" fn(
        p_class_userdata: *mut c_void,
        p_object: GDExtensionObjectPtr,
    ) -> GDExtensionClassInstancePtr,
>;
pub type GDExtensionClassGetVirtual = Option<
    unsafe extern "C" fn(
        p_class_userdata: *mut c_void,
        p_name: GDExtensionConstStringNamePtr,
    ) -> GDExtensionClassCallVirtual,
>;
pub type GDExtensionClassGetVirtualCallData = Option<
    unsafe extern "C" fn(
        p_class_userdata: *mut c_void,
        p_name: GDExtensionConstStringNamePtr,
    ) -> *mut c_void,
>;
pub type GDExtensionClassCallVirtualWithData = Option<
    unsafe extern "C" fn(
        p_instance: GDExtensionClassInstancePtr,
        p_name: GDExtensionConstStringNamePtr,
        p_virtual_call_userdata: *mut c_void,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr,
    ),
>;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GDExtensionClassCreationInfo3 {
    pub is_virtual: GDExtensionBool,
    pub is_abstract: GDExtensionBool,
    pub is_exposed: GDExtensionBool,
    pub is_runtime: GDExtensionBool,
    pub set_func: GDExtensionClassSet,
    pub get_func: GDExtensionClassGet,
    pub get_property_list_func: GDExtensionClassGetPropertyList,
    pub free_property_list_func: GDExtensionClassFreePropertyList2,
    pub property_can_revert_func: GDExtensionClassPropertyCanRevert,
    pub property_get_revert_func: GDExtensionClassPropertyGetRevert,
    pub validate_property_func: GDExtensionClassValidateProperty,
    pub notification_func: GDExtensionClassNotification2,
    pub to_string_func: GDExtensionClassToString,
    pub reference_func: GDExtensionClassReference,
    pub unreference_func: GDExtensionClassUnreference,
    /// Mandatory.
    pub create_instance_func: GDExtensionClassCreateInstance,
    /// Mandatory.
    pub free_instance_func: GDExtensionClassFreeInstance,
    pub recreate_instance_func: GDExtensionClassRecreateInstance,
    /// Queried by the host when `get_virtual_call_data_func` is null.
    pub get_virtual_func: GDExtensionClassGetVirtual,
    pub get_virtual_call_data_func: GDExtensionClassGetVirtualCallData,
    pub call_virtual_with_data_func: GDExtensionClassCallVirtualWithData,
    pub get_rid_func: GDExtensionClassGetRID,
    /// Per-class user data, passed back to the class-level callbacks.
    pub class_userdata: *mut c_void,
}

// ============================================================================
// Initialization
// ============================================================================

pub type GDExtensionInitializationLevel = u32;

pub const GDEXTENSION_INITIALIZATION_CORE: GDExtensionInitializationLevel = 0;
pub const GDEXTENSION_INITIALIZATION_SERVERS: GDExtensionInitializationLevel = 1;
pub const GDEXTENSION_INITIALIZATION_SCENE: GDExtensionInitializationLevel = 2;
pub const GDEXTENSION_INITIALIZATION_EDITOR: GDExtensionInitializationLevel = 3;
pub const GDEXTENSION_MAX_INITIALIZATION_LEVEL: GDExtensionInitializationLevel = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GDExtensionInitialization {
    /// Minimum initialization level required.
    pub minimum_initialization_level: GDExtensionInitializationLevel,
    /// Up to the extension to supply when initializing.
    pub userdata: *mut c_void,
    /// Called once per initialization level, in ascending order.
    pub initialize:
        Option<unsafe extern "C" fn(userdata: *mut c_void, p_level: GDExtensionInitializationLevel)>,
    /// Called once per initialization level, in descending order.
    pub deinitialize:
        Option<unsafe extern "C" fn(userdata: *mut c_void, p_level: GDExtensionInitializationLevel)>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GDExtensionGodotVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub string: *const c_char,
}

// ============================================================================
// Interface Loader
// ============================================================================

pub type GDExtensionInterfaceFunctionPtr = Option<unsafe extern "C" fn()>;
pub type GDExtensionInterfaceGetProcAddress =
    Option<unsafe extern "C" fn(p_function_name: *const c_char) -> GDExtensionInterfaceFunctionPtr>;

/// Signature of the library entry point named in the extension's config file.
pub type GDExtensionInitializationFunction = Option<
    unsafe extern "C" fn(
        p_get_proc_address: GDExtensionInterfaceGetProcAddress,
        p_library: GDExtensionClassLibraryPtr,
        r_initialization: *mut GDExtensionInitialization,
    ) -> GDExtensionBool,
>;

// ============================================================================
// Interface Functions
// ============================================================================
//
// One typedef per entry point the bridge loads through `get_proc_address`.
// The string in each doc comment is the lookup name.

/// `get_godot_version`
pub type GDExtensionInterfaceGetGodotVersion =
    Option<unsafe extern "C" fn(r_godot_version: *mut GDExtensionGodotVersion)>;

/// `print_error`
pub type GDExtensionInterfacePrintError = Option<
    unsafe extern "C" fn(
        p_description: *const c_char,
        p_function: *const c_char,
        p_file: *const c_char,
        p_line: i32,
        p_editor_notify: GDExtensionBool,
    ),
>;

/// `print_warning`
pub type GDExtensionInterfacePrintWarning = GDExtensionInterfacePrintError;

/// `variant_new_copy`
pub type GDExtensionInterfaceVariantNewCopy = Option<
    unsafe extern "C" fn(r_dest: GDExtensionUninitializedVariantPtr, p_src: GDExtensionConstVariantPtr),
>;

/// `variant_new_nil`
pub type GDExtensionInterfaceVariantNewNil =
    Option<unsafe extern "C" fn(r_dest: GDExtensionUninitializedVariantPtr)>;

/// `variant_destroy`
pub type GDExtensionInterfaceVariantDestroy =
    Option<unsafe extern "C" fn(p_self: GDExtensionVariantPtr)>;

/// `variant_set_named`
pub type GDExtensionInterfaceVariantSetNamed = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionVariantPtr,
        p_key: GDExtensionConstStringNamePtr,
        p_value: GDExtensionConstVariantPtr,
        r_valid: *mut GDExtensionBool,
    ),
>;

/// `variant_set_keyed`
pub type GDExtensionInterfaceVariantSetKeyed = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionVariantPtr,
        p_key: GDExtensionConstVariantPtr,
        p_value: GDExtensionConstVariantPtr,
        r_valid: *mut GDExtensionBool,
    ),
>;

/// `variant_set_indexed`
pub type GDExtensionInterfaceVariantSetIndexed = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionVariantPtr,
        p_index: GDExtensionInt,
        p_value: GDExtensionConstVariantPtr,
        r_valid: *mut GDExtensionBool,
        r_oob: *mut GDExtensionBool,
    ),
>;

/// `variant_get_named`
pub type GDExtensionInterfaceVariantGetNamed = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionConstVariantPtr,
        p_key: GDExtensionConstStringNamePtr,
        r_ret: GDExtensionUninitializedVariantPtr,
        r_valid: *mut GDExtensionBool,
    ),
>;

/// `variant_get_keyed`
pub type GDExtensionInterfaceVariantGetKeyed = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionConstVariantPtr,
        p_key: GDExtensionConstVariantPtr,
        r_ret: GDExtensionUninitializedVariantPtr,
        r_valid: *mut GDExtensionBool,
    ),
>;

/// `variant_get_indexed`
pub type GDExtensionInterfaceVariantGetIndexed = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionConstVariantPtr,
        p_index: GDExtensionInt,
        r_ret: GDExtensionUninitializedVariantPtr,
        r_valid: *mut GDExtensionBool,
        r_oob: *mut GDExtensionBool,
    ),
>;

/// `variant_booleanize`
pub type GDExtensionInterfaceVariantBooleanize =
    Option<unsafe extern "C" fn(p_self: GDExtensionConstVariantPtr) -> GDExtensionBool>;

/// `variant_stringify`
pub type GDExtensionInterfaceVariantStringify =
    Option<unsafe extern "C" fn(p_self: GDExtensionConstVariantPtr, r_ret: GDExtensionStringPtr)>;

/// `variant_get_type`
pub type GDExtensionInterfaceVariantGetType =
    Option<unsafe extern "C" fn(p_self: GDExtensionConstVariantPtr) -> GDExtensionVariantType>;

/// `get_variant_from_type_constructor`
pub type GDExtensionInterfaceGetVariantFromTypeConstructor = Option<
    unsafe extern "C" fn(p_type: GDExtensionVariantType) -> GDExtensionVariantFromTypeConstructorFunc,
>;

/// `get_variant_to_type_constructor`
pub type GDExtensionInterfaceGetVariantToTypeConstructor = Option<
    unsafe extern "C" fn(p_type: GDExtensionVariantType) -> GDExtensionTypeFromVariantConstructorFunc,
>;

/// `variant_get_ptr_constructor`
pub type GDExtensionInterfaceVariantGetPtrConstructor = Option<
    unsafe extern "C" fn(
        p_type: GDExtensionVariantType,
        p_constructor: i32,
    ) -> GDExtensionPtrConstructor,
>;

/// `variant_get_ptr_destructor`
pub type GDExtensionInterfaceVariantGetPtrDestructor =
    Option<unsafe extern "C" fn(p_type: GDExtensionVariantType) -> GDExtensionPtrDestructor>;

/// `string_new_with_latin1_chars`
pub type GDExtensionInterfaceStringNewWithLatin1Chars = Option<
    unsafe extern "C" fn(r_dest: GDExtensionUninitializedStringPtr, p_contents: *const c_char),
>;

/// `string_new_with_utf8_chars_and_len`
pub type GDExtensionInterfaceStringNewWithUtf8CharsAndLen = Option<
    unsafe extern "C" fn(
        r_dest: GDExtensionUninitializedStringPtr,
        p_contents: *const c_char,
        p_size: GDExtensionInt,
    ),
>;

/// `string_new_with_utf32_chars_and_len`
pub type GDExtensionInterfaceStringNewWithUtf32CharsAndLen = Option<
    unsafe extern "C" fn(
        r_dest: GDExtensionUninitializedStringPtr,
        p_contents: *const char32_t,
        p_char_count: GDExtensionInt,
    ),
>;

/// `string_to_utf8_chars`
pub type GDExtensionInterfaceStringToUtf8Chars = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionConstStringPtr,
        r_text: *mut c_char,
        p_max_write_length: GDExtensionInt,
    ) -> GDExtensionInt,
>;

/// `string_to_utf32_chars`
pub type GDExtensionInterfaceStringToUtf32Chars = Option<
    unsafe extern "C" fn(
        p_self: GDExtensionConstStringPtr,
        r_text: *mut char32_t,
        p_max_write_length: GDExtensionInt,
    ) -> GDExtensionInt,
>;

/// `string_name_new_with_utf8_chars_and_len`
pub type GDExtensionInterfaceStringNameNewWithUtf8CharsAndLen = Option<
    unsafe extern "C" fn(
        r_dest: GDExtensionUninitializedStringNamePtr,
        p_contents: *const c_char,
        p_size: GDExtensionInt,
    ),
>;

/// `object_destroy`
pub type GDExtensionInterfaceObjectDestroy =
    Option<unsafe extern "C" fn(p_o: GDExtensionObjectPtr)>;

/// `object_get_instance_binding`
pub type GDExtensionInterfaceObjectGetInstanceBinding = Option<
    unsafe extern "C" fn(
        p_o: GDExtensionObjectPtr,
        p_token: *mut c_void,
        p_callbacks: *const GDExtensionInstanceBindingCallbacks,
    ) -> *mut c_void,
>;

/// `object_set_instance_binding`
pub type GDExtensionInterfaceObjectSetInstanceBinding = Option<
    unsafe extern "C" fn(
        p_o: GDExtensionObjectPtr,
        p_token: *mut c_void,
        p_binding: *mut c_void,
        p_callbacks: *const GDExtensionInstanceBindingCallbacks,
    ),
>;

/// `object_set_instance`
pub type GDExtensionInterfaceObjectSetInstance = Option<
    unsafe extern "C" fn(
        p_o: GDExtensionObjectPtr,
        p_classname: GDExtensionConstStringNamePtr,
        p_instance: GDExtensionClassInstancePtr,
    ),
>;

/// `object_get_class_name`
pub type GDExtensionInterfaceObjectGetClassName = Option<
    unsafe extern "C" fn(
        p_object: GDExtensionConstObjectPtr,
        p_library: GDExtensionClassLibraryPtr,
        r_class_name: GDExtensionUninitializedStringNamePtr,
    ) -> GDExtensionBool,
>;

/// `object_get_instance_id`
pub type GDExtensionInterfaceObjectGetInstanceId =
    Option<unsafe extern "C" fn(p_object: GDExtensionConstObjectPtr) -> GDObjectInstanceID>;

/// `classdb_construct_object`
pub type GDExtensionInterfaceClassdbConstructObject = Option<
    unsafe extern "C" fn(p_classname: GDExtensionConstStringNamePtr) -> GDExtensionObjectPtr,
>;

/// `classdb_register_extension_class3`
pub type GDExtensionInterfaceClassdbRegisterExtensionClass3 = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
        p_parent_class_name: GDExtensionConstStringNamePtr,
        p_extension_funcs: *const GDExtensionClassCreationInfo3,
    ),
>;

/// `classdb_register_extension_class_method`
pub type GDExtensionInterfaceClassdbRegisterExtensionClassMethod = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
        p_method_info: *const GDExtensionClassMethodInfo,
    ),
>;

/// `classdb_register_extension_class_integer_constant`
pub type GDExtensionInterfaceClassdbRegisterExtensionClassIntegerConstant = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
        p_enum_name: GDExtensionConstStringNamePtr,
        p_constant_name: GDExtensionConstStringNamePtr,
        p_constant_value: GDExtensionInt,
        p_is_bitfield: GDExtensionBool,
    ),
>;

/// `classdb_register_extension_class_property`
pub type GDExtensionInterfaceClassdbRegisterExtensionClassProperty = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
        p_info: *const GDExtensionPropertyInfo,
        p_setter: GDExtensionConstStringNamePtr,
        p_getter: GDExtensionConstStringNamePtr,
    ),
>;

/// `classdb_register_extension_class_property_group` and `_subgroup`
pub type GDExtensionInterfaceClassdbRegisterExtensionClassPropertyGroup = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
        p_group_name: GDExtensionConstStringPtr,
        p_prefix: GDExtensionConstStringPtr,
    ),
>;

/// `classdb_register_extension_class_signal`
pub type GDExtensionInterfaceClassdbRegisterExtensionClassSignal = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
        p_signal_name: GDExtensionConstStringNamePtr,
        p_argument_info: *const GDExtensionPropertyInfo,
        p_argument_count: GDExtensionInt,
    ),
>;

/// `classdb_unregister_extension_class`
pub type GDExtensionInterfaceClassdbUnregisterExtensionClass = Option<
    unsafe extern "C" fn(
        p_library: GDExtensionClassLibraryPtr,
        p_class_name: GDExtensionConstStringNamePtr,
    ),
>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_variant_type_table_order() {
        for (i, ty) in VariantType::ALL.iter().enumerate() {
            assert_eq!(ty.sys() as usize, i);
            assert_eq!(VariantType::from_sys(i as u32), Some(*ty));
        }
        assert_eq!(VariantType::from_sys(GDEXTENSION_VARIANT_TYPE_VARIANT_MAX), None);
        assert_eq!(VariantType::PackedColorArray.sys(), GDEXTENSION_VARIANT_TYPE_PACKED_COLOR_ARRAY);
    }

    #[test]
    fn test_needs_deinit() {
        assert!(!VariantType::Nil.needs_deinit());
        assert!(!VariantType::Int.needs_deinit());
        assert!(!VariantType::Vector3.needs_deinit());
        assert!(!VariantType::Color.needs_deinit());
        assert!(!VariantType::Rid.needs_deinit());
        assert!(VariantType::String.needs_deinit());
        assert!(VariantType::Transform2D.needs_deinit());
        assert!(VariantType::Object.needs_deinit());
        assert!(VariantType::Dictionary.needs_deinit());
        assert!(VariantType::PackedByteArray.needs_deinit());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_struct_layouts() {
        assert_eq!(size_of::<GDExtensionCallError>(), 12);
        assert_eq!(size_of::<GDExtensionPropertyInfo>(), 48);
        assert_eq!(size_of::<GDExtensionInstanceBindingCallbacks>(), 3 * size_of::<usize>());
        assert_eq!(align_of::<GDExtensionClassMethodInfo>(), align_of::<usize>());
        assert_eq!(size_of::<GDExtensionClassCreationInfo3>(), 8 + 19 * size_of::<usize>());
    }
}
