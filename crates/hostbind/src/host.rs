//! HostApi trait: the host's function table
//!
//! Every call the bridge makes into the host goes through this trait. The
//! real host is [`InterfaceHost`], loaded by name through `get_proc_address`.
//! Tests use the in-process `testing::MockHost` (behind the `testing` feature).
//!
//! Most methods take raw host pointers and are `unsafe`: the caller
//! guarantees each pointer refers to storage of the right kind, initialized
//! or uninitialized as the parameter name says.

use crate::error::{BindResult, BindingError};
use hostbind_sys as sys;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};

/// Host engine version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub string: String,
}

/// Abstract host operations.
///
/// Implementations must be callable from any thread; the host serializes
/// whatever it needs to internally.
pub trait HostApi: Send + Sync {
    // ========================================================================
    // Library
    // ========================================================================

    /// The library pointer handed to the entry point
    fn library(&self) -> sys::GDExtensionClassLibraryPtr;

    /// Host engine version
    fn version(&self) -> HostVersion;

    /// Report an error in the host's log
    fn print_error(&self, message: &str, function: &str, file: &str, line: u32);

    /// Report a warning in the host's log
    fn print_warning(&self, message: &str, function: &str, file: &str, line: u32);

    // ========================================================================
    // Variants
    // ========================================================================

    /// Copy-construct `dst` from `src`
    unsafe fn variant_new_copy(
        &self,
        dst: sys::GDExtensionUninitializedVariantPtr,
        src: sys::GDExtensionConstVariantPtr,
    );

    /// Construct a nil variant in `dst`
    unsafe fn variant_new_nil(&self, dst: sys::GDExtensionUninitializedVariantPtr);

    /// Release the resources held by a variant
    unsafe fn variant_destroy(&self, value: sys::GDExtensionVariantPtr);

    /// Type tag of a variant
    unsafe fn variant_get_type(&self, value: sys::GDExtensionConstVariantPtr) -> u32;

    /// Truthiness of a variant
    unsafe fn variant_booleanize(&self, value: sys::GDExtensionConstVariantPtr) -> bool;

    /// Convert a variant to text, writing a new host string into `dst`
    unsafe fn variant_stringify(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        dst: sys::GDExtensionUninitializedStringPtr,
    );

    /// Read an element by index. Returns `(valid, out_of_bounds)`.
    unsafe fn variant_get_indexed(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        index: i64,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> (bool, bool);

    /// Write an element by index. Returns `(valid, out_of_bounds)`.
    unsafe fn variant_set_indexed(
        &self,
        value: sys::GDExtensionVariantPtr,
        index: i64,
        element: sys::GDExtensionConstVariantPtr,
    ) -> (bool, bool);

    /// Read an element by variant key
    unsafe fn variant_get_keyed(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        key: sys::GDExtensionConstVariantPtr,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> bool;

    /// Write an element by variant key
    unsafe fn variant_set_keyed(
        &self,
        value: sys::GDExtensionVariantPtr,
        key: sys::GDExtensionConstVariantPtr,
        element: sys::GDExtensionConstVariantPtr,
    ) -> bool;

    /// Read a member by name
    unsafe fn variant_get_named(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        name: sys::GDExtensionConstStringNamePtr,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> bool;

    /// Write a member by name
    unsafe fn variant_set_named(
        &self,
        value: sys::GDExtensionVariantPtr,
        name: sys::GDExtensionConstStringNamePtr,
        element: sys::GDExtensionConstVariantPtr,
    ) -> bool;

    // ========================================================================
    // Type Constructors
    // ========================================================================

    /// Constructor boxing a raw value of type `ty` into a variant
    fn variant_from_type_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
    ) -> sys::GDExtensionVariantFromTypeConstructorFunc;

    /// Constructor unboxing a variant into a raw value of type `ty`
    fn variant_to_type_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
    ) -> sys::GDExtensionTypeFromVariantConstructorFunc;

    /// Raw constructor number `index` of type `ty`
    fn ptr_constructor(&self, ty: sys::GDExtensionVariantType, index: i32)
        -> sys::GDExtensionPtrConstructor;

    /// Raw destructor of type `ty`. Null for types without resources.
    fn ptr_destructor(&self, ty: sys::GDExtensionVariantType) -> sys::GDExtensionPtrDestructor;

    // ========================================================================
    // Strings
    // ========================================================================

    /// Construct a host string from UTF-8 bytes
    unsafe fn string_new_with_utf8_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &[u8],
    );

    /// Construct a host string from a NUL-terminated Latin-1 buffer
    unsafe fn string_new_with_latin1_chars(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &CStr,
    );

    /// Construct a host string from UTF-32 code points
    unsafe fn string_new_with_utf32_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &[u32],
    );

    /// Encode a host string as UTF-8 into `buf`, writing at most `max`
    /// bytes. Returns the full encoded length. `buf` may be null.
    unsafe fn string_to_utf8_chars(
        &self,
        value: sys::GDExtensionConstStringPtr,
        buf: *mut c_char,
        max: i64,
    ) -> i64;

    /// Encode a host string as UTF-32 into `buf`, writing at most `max`
    /// code points. Returns the full length. `buf` may be null.
    unsafe fn string_to_utf32_chars(
        &self,
        value: sys::GDExtensionConstStringPtr,
        buf: *mut u32,
        max: i64,
    ) -> i64;

    /// Construct a host string name from UTF-8 bytes
    unsafe fn string_name_new_with_utf8_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringNamePtr,
        text: &[u8],
    );

    // ========================================================================
    // Objects
    // ========================================================================

    /// Binding stored on `object` under `token`. With non-null `callbacks`
    /// a missing binding is created through `create_callback`.
    unsafe fn object_get_instance_binding(
        &self,
        object: sys::GDExtensionObjectPtr,
        token: *mut c_void,
        callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
    ) -> *mut c_void;

    /// Store a binding on `object` under `token`
    unsafe fn object_set_instance_binding(
        &self,
        object: sys::GDExtensionObjectPtr,
        token: *mut c_void,
        binding: *mut c_void,
        callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
    );

    /// Attach extension instance data to a host object
    unsafe fn object_set_instance(
        &self,
        object: sys::GDExtensionObjectPtr,
        class_name: sys::GDExtensionConstStringNamePtr,
        instance: sys::GDExtensionClassInstancePtr,
    );

    /// Class name of `object`, written as a new string name into `dst`.
    /// Returns false when the host does not know the object.
    unsafe fn object_get_class_name(
        &self,
        object: sys::GDExtensionConstObjectPtr,
        dst: sys::GDExtensionUninitializedStringNamePtr,
    ) -> bool;

    /// Host instance id of `object`
    unsafe fn object_get_instance_id(&self, object: sys::GDExtensionConstObjectPtr) -> u64;

    /// Destroy a host object
    unsafe fn object_destroy(&self, object: sys::GDExtensionObjectPtr);

    // ========================================================================
    // Class Database
    // ========================================================================

    /// Construct an object of a native or registered class
    unsafe fn classdb_construct_object(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
    ) -> sys::GDExtensionObjectPtr;

    unsafe fn classdb_register_extension_class(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        parent_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionClassCreationInfo3,
    );

    unsafe fn classdb_register_extension_class_method(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionClassMethodInfo,
    );

    unsafe fn classdb_register_extension_class_integer_constant(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        enum_name: sys::GDExtensionConstStringNamePtr,
        constant_name: sys::GDExtensionConstStringNamePtr,
        value: i64,
        is_bitfield: bool,
    );

    unsafe fn classdb_register_extension_class_property(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionPropertyInfo,
        setter: sys::GDExtensionConstStringNamePtr,
        getter: sys::GDExtensionConstStringNamePtr,
    );

    unsafe fn classdb_register_extension_class_property_group(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        group_name: sys::GDExtensionConstStringPtr,
        prefix: sys::GDExtensionConstStringPtr,
    );

    unsafe fn classdb_register_extension_class_property_subgroup(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        subgroup_name: sys::GDExtensionConstStringPtr,
        prefix: sys::GDExtensionConstStringPtr,
    );

    unsafe fn classdb_register_extension_class_signal(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        signal_name: sys::GDExtensionConstStringNamePtr,
        arguments: *const sys::GDExtensionPropertyInfo,
        argument_count: i64,
    );

    unsafe fn classdb_unregister_extension_class(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
    );
}

// ============================================================================
// Interface Host
// ============================================================================

/// Fetch one entry point and cast it to its typedef.
macro_rules! load_fn {
    ($get_proc_address:expr, $name:literal, $ty:ty) => {{
        let raw = $get_proc_address(concat!($name, "\0").as_ptr() as *const c_char);
        let typed = std::mem::transmute::<sys::GDExtensionInterfaceFunctionPtr, $ty>(raw);
        if typed.is_none() {
            return Err(BindingError::MissingEntryPoint($name));
        }
        typed
    }};
}

/// Call a loaded entry point. Presence was checked by [`InterfaceHost::load`].
macro_rules! interface_fn {
    ($self:ident . $field:ident) => {
        match $self.$field {
            Some(f) => f,
            None => unreachable!(concat!(stringify!($field), " is checked at load")),
        }
    };
}

/// Host function table loaded through `get_proc_address`
pub struct InterfaceHost {
    library: sys::GDExtensionClassLibraryPtr,
    get_godot_version: sys::GDExtensionInterfaceGetGodotVersion,
    print_error: sys::GDExtensionInterfacePrintError,
    print_warning: sys::GDExtensionInterfacePrintWarning,
    variant_new_copy: sys::GDExtensionInterfaceVariantNewCopy,
    variant_new_nil: sys::GDExtensionInterfaceVariantNewNil,
    variant_destroy: sys::GDExtensionInterfaceVariantDestroy,
    variant_get_type: sys::GDExtensionInterfaceVariantGetType,
    variant_booleanize: sys::GDExtensionInterfaceVariantBooleanize,
    variant_stringify: sys::GDExtensionInterfaceVariantStringify,
    variant_get_indexed: sys::GDExtensionInterfaceVariantGetIndexed,
    variant_set_indexed: sys::GDExtensionInterfaceVariantSetIndexed,
    variant_get_keyed: sys::GDExtensionInterfaceVariantGetKeyed,
    variant_set_keyed: sys::GDExtensionInterfaceVariantSetKeyed,
    variant_get_named: sys::GDExtensionInterfaceVariantGetNamed,
    variant_set_named: sys::GDExtensionInterfaceVariantSetNamed,
    get_variant_from_type_constructor: sys::GDExtensionInterfaceGetVariantFromTypeConstructor,
    get_variant_to_type_constructor: sys::GDExtensionInterfaceGetVariantToTypeConstructor,
    variant_get_ptr_constructor: sys::GDExtensionInterfaceVariantGetPtrConstructor,
    variant_get_ptr_destructor: sys::GDExtensionInterfaceVariantGetPtrDestructor,
    string_new_with_latin1_chars: sys::GDExtensionInterfaceStringNewWithLatin1Chars,
    string_new_with_utf8_chars_and_len: sys::GDExtensionInterfaceStringNewWithUtf8CharsAndLen,
    string_new_with_utf32_chars_and_len: sys::GDExtensionInterfaceStringNewWithUtf32CharsAndLen,
    string_to_utf8_chars: sys::GDExtensionInterfaceStringToUtf8Chars,
    string_to_utf32_chars: sys::GDExtensionInterfaceStringToUtf32Chars,
    string_name_new_with_utf8_chars_and_len:
        sys::GDExtensionInterfaceStringNameNewWithUtf8CharsAndLen,
    object_destroy: sys::GDExtensionInterfaceObjectDestroy,
    object_get_instance_binding: sys::GDExtensionInterfaceObjectGetInstanceBinding,
    object_set_instance_binding: sys::GDExtensionInterfaceObjectSetInstanceBinding,
    object_set_instance: sys::GDExtensionInterfaceObjectSetInstance,
    object_get_class_name: sys::GDExtensionInterfaceObjectGetClassName,
    object_get_instance_id: sys::GDExtensionInterfaceObjectGetInstanceId,
    classdb_construct_object: sys::GDExtensionInterfaceClassdbConstructObject,
    classdb_register_extension_class3: sys::GDExtensionInterfaceClassdbRegisterExtensionClass3,
    classdb_register_extension_class_method:
        sys::GDExtensionInterfaceClassdbRegisterExtensionClassMethod,
    classdb_register_extension_class_integer_constant:
        sys::GDExtensionInterfaceClassdbRegisterExtensionClassIntegerConstant,
    classdb_register_extension_class_property:
        sys::GDExtensionInterfaceClassdbRegisterExtensionClassProperty,
    classdb_register_extension_class_property_group:
        sys::GDExtensionInterfaceClassdbRegisterExtensionClassPropertyGroup,
    classdb_register_extension_class_property_subgroup:
        sys::GDExtensionInterfaceClassdbRegisterExtensionClassPropertyGroup,
    classdb_register_extension_class_signal:
        sys::GDExtensionInterfaceClassdbRegisterExtensionClassSignal,
    classdb_unregister_extension_class: sys::GDExtensionInterfaceClassdbUnregisterExtensionClass,
}

// The table is immutable after `load`, and the host's entry points may be
// called from any thread.
unsafe impl Send for InterfaceHost {}
unsafe impl Sync for InterfaceHost {}

impl InterfaceHost {
    /// Resolve every entry point the bridge uses.
    ///
    /// # Safety
    ///
    /// `get_proc_address` must be the host's loader, and every name it
    /// resolves must have the signature declared in `hostbind-sys`.
    pub unsafe fn load(
        get_proc_address: sys::GDExtensionInterfaceGetProcAddress,
        library: sys::GDExtensionClassLibraryPtr,
    ) -> BindResult<Self> {
        let gpa = get_proc_address.ok_or(BindingError::MissingEntryPoint("get_proc_address"))?;

        Ok(Self {
            library,
            get_godot_version: load_fn!(
                gpa,
                "get_godot_version",
                sys::GDExtensionInterfaceGetGodotVersion
            ),
            print_error: load_fn!(gpa, "print_error", sys::GDExtensionInterfacePrintError),
            print_warning: load_fn!(gpa, "print_warning", sys::GDExtensionInterfacePrintWarning),
            variant_new_copy: load_fn!(
                gpa,
                "variant_new_copy",
                sys::GDExtensionInterfaceVariantNewCopy
            ),
            variant_new_nil: load_fn!(gpa, "variant_new_nil", sys::GDExtensionInterfaceVariantNewNil),
            variant_destroy: load_fn!(
                gpa,
                "variant_destroy",
                sys::GDExtensionInterfaceVariantDestroy
            ),
            variant_get_type: load_fn!(
                gpa,
                "variant_get_type",
                sys::GDExtensionInterfaceVariantGetType
            ),
            variant_booleanize: load_fn!(
                gpa,
                "variant_booleanize",
                sys::GDExtensionInterfaceVariantBooleanize
            ),
            variant_stringify: load_fn!(
                gpa,
                "variant_stringify",
                sys::GDExtensionInterfaceVariantStringify
            ),
            variant_get_indexed: load_fn!(
                gpa,
                "variant_get_indexed",
                sys::GDExtensionInterfaceVariantGetIndexed
            ),
            variant_set_indexed: load_fn!(
                gpa,
                "variant_set_indexed",
                sys::GDExtensionInterfaceVariantSetIndexed
            ),
            variant_get_keyed: load_fn!(
                gpa,
                "variant_get_keyed",
                sys::GDExtensionInterfaceVariantGetKeyed
            ),
            variant_set_keyed: load_fn!(
                gpa,
                "variant_set_keyed",
                sys::GDExtensionInterfaceVariantSetKeyed
            ),
            variant_get_named: load_fn!(
                gpa,
                "variant_get_named",
                sys::GDExtensionInterfaceVariantGetNamed
            ),
            variant_set_named: load_fn!(
                gpa,
                "variant_set_named",
                sys::GDExtensionInterfaceVariantSetNamed
            ),
            get_variant_from_type_constructor: load_fn!(
                gpa,
                "get_variant_from_type_constructor",
                sys::GDExtensionInterfaceGetVariantFromTypeConstructor
            ),
            get_variant_to_type_constructor: load_fn!(
                gpa,
                "get_variant_to_type_constructor",
                sys::GDExtensionInterfaceGetVariantToTypeConstructor
            ),
            variant_get_ptr_constructor: load_fn!(
                gpa,
                "variant_get_ptr_constructor",
                sys::GDExtensionInterfaceVariantGetPtrConstructor
            ),
            variant_get_ptr_destructor: load_fn!(
                gpa,
                "variant_get_ptr_destructor",
                sys::GDExtensionInterfaceVariantGetPtrDestructor
            ),
            string_new_with_latin1_chars: load_fn!(
                gpa,
                "string_new_with_latin1_chars",
                sys::GDExtensionInterfaceStringNewWithLatin1Chars
            ),
            string_new_with_utf8_chars_and_len: load_fn!(
                gpa,
                "string_new_with_utf8_chars_and_len",
                sys::GDExtensionInterfaceStringNewWithUtf8CharsAndLen
            ),
            string_new_with_utf32_chars_and_len: load_fn!(
                gpa,
                "string_new_with_utf32_chars_and_len",
                sys::GDExtensionInterfaceStringNewWithUtf32CharsAndLen
            ),
            string_to_utf8_chars: load_fn!(
                gpa,
                "string_to_utf8_chars",
                sys::GDExtensionInterfaceStringToUtf8Chars
            ),
            string_to_utf32_chars: load_fn!(
                gpa,
                "string_to_utf32_chars",
                sys::GDExtensionInterfaceStringToUtf32Chars
            ),
            string_name_new_with_utf8_chars_and_len: load_fn!(
                gpa,
                "string_name_new_with_utf8_chars_and_len",
                sys::GDExtensionInterfaceStringNameNewWithUtf8CharsAndLen
            ),
            object_destroy: load_fn!(gpa, "object_destroy", sys::GDExtensionInterfaceObjectDestroy),
            object_get_instance_binding: load_fn!(
                gpa,
                "object_get_instance_binding",
                sys::GDExtensionInterfaceObjectGetInstanceBinding
            ),
            object_set_instance_binding: load_fn!(
                gpa,
                "object_set_instance_binding",
                sys::GDExtensionInterfaceObjectSetInstanceBinding
            ),
            object_set_instance: load_fn!(
                gpa,
                "object_set_instance",
                sys::GDExtensionInterfaceObjectSetInstance
            ),
            object_get_class_name: load_fn!(
                gpa,
                "object_get_class_name",
                sys::GDExtensionInterfaceObjectGetClassName
            ),
            object_get_instance_id: load_fn!(
                gpa,
                "object_get_instance_id",
                sys::GDExtensionInterfaceObjectGetInstanceId
            ),
            classdb_construct_object: load_fn!(
                gpa,
                "classdb_construct_object",
                sys::GDExtensionInterfaceClassdbConstructObject
            ),
            classdb_register_extension_class3: load_fn!(
                gpa,
                "classdb_register_extension_class3",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClass3
            ),
            classdb_register_extension_class_method: load_fn!(
                gpa,
                "classdb_register_extension_class_method",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClassMethod
            ),
            classdb_register_extension_class_integer_constant: load_fn!(
                gpa,
                "classdb_register_extension_class_integer_constant",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClassIntegerConstant
            ),
            classdb_register_extension_class_property: load_fn!(
                gpa,
                "classdb_register_extension_class_property",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClassProperty
            ),
            classdb_register_extension_class_property_group: load_fn!(
                gpa,
                "classdb_register_extension_class_property_group",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClassPropertyGroup
            ),
            classdb_register_extension_class_property_subgroup: load_fn!(
                gpa,
                "classdb_register_extension_class_property_subgroup",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClassPropertyGroup
            ),
            classdb_register_extension_class_signal: load_fn!(
                gpa,
                "classdb_register_extension_class_signal",
                sys::GDExtensionInterfaceClassdbRegisterExtensionClassSignal
            ),
            classdb_unregister_extension_class: load_fn!(
                gpa,
                "classdb_unregister_extension_class",
                sys::GDExtensionInterfaceClassdbUnregisterExtensionClass
            ),
        })
    }

    fn print(
        &self,
        f: unsafe extern "C" fn(*const c_char, *const c_char, *const c_char, i32, sys::GDExtensionBool),
        message: &str,
        function: &str,
        file: &str,
        line: u32,
    ) {
        let message = to_cstring(message);
        let function = to_cstring(function);
        let file = to_cstring(file);
        unsafe {
            f(
                message.as_ptr(),
                function.as_ptr(),
                file.as_ptr(),
                line.min(i32::MAX as u32) as i32,
                sys::GDEXTENSION_FALSE,
            )
        }
    }
}

/// Interior NULs cannot cross the C boundary; they are replaced.
fn to_cstring(s: &str) -> CString {
    CString::new(s.replace('\0', "\u{FFFD}")).unwrap_or_default()
}

impl HostApi for InterfaceHost {
    fn library(&self) -> sys::GDExtensionClassLibraryPtr {
        self.library
    }

    fn version(&self) -> HostVersion {
        let mut raw = sys::GDExtensionGodotVersion {
            major: 0,
            minor: 0,
            patch: 0,
            string: std::ptr::null(),
        };
        unsafe { interface_fn!(self.get_godot_version)(&mut raw) };
        let string = if raw.string.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(raw.string) }.to_string_lossy().into_owned()
        };
        HostVersion {
            major: raw.major,
            minor: raw.minor,
            patch: raw.patch,
            string,
        }
    }

    fn print_error(&self, message: &str, function: &str, file: &str, line: u32) {
        self.print(interface_fn!(self.print_error), message, function, file, line);
    }

    fn print_warning(&self, message: &str, function: &str, file: &str, line: u32) {
        self.print(interface_fn!(self.print_warning), message, function, file, line);
    }

    unsafe fn variant_new_copy(
        &self,
        dst: sys::GDExtensionUninitializedVariantPtr,
        src: sys::GDExtensionConstVariantPtr,
    ) {
        interface_fn!(self.variant_new_copy)(dst, src)
    }

    unsafe fn variant_new_nil(&self, dst: sys::GDExtensionUninitializedVariantPtr) {
        interface_fn!(self.variant_new_nil)(dst)
    }

    unsafe fn variant_destroy(&self, value: sys::GDExtensionVariantPtr) {
        interface_fn!(self.variant_destroy)(value)
    }

    unsafe fn variant_get_type(&self, value: sys::GDExtensionConstVariantPtr) -> u32 {
        interface_fn!(self.variant_get_type)(value)
    }

    unsafe fn variant_booleanize(&self, value: sys::GDExtensionConstVariantPtr) -> bool {
        interface_fn!(self.variant_booleanize)(value) != 0
    }

    unsafe fn variant_stringify(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        dst: sys::GDExtensionUninitializedStringPtr,
    ) {
        interface_fn!(self.variant_stringify)(value, dst)
    }

    unsafe fn variant_get_indexed(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        index: i64,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> (bool, bool) {
        let mut valid = sys::GDEXTENSION_FALSE;
        let mut oob = sys::GDEXTENSION_FALSE;
        interface_fn!(self.variant_get_indexed)(value, index, dst, &mut valid, &mut oob);
        (valid != 0, oob != 0)
    }

    unsafe fn variant_set_indexed(
        &self,
        value: sys::GDExtensionVariantPtr,
        index: i64,
        element: sys::GDExtensionConstVariantPtr,
    ) -> (bool, bool) {
        let mut valid = sys::GDEXTENSION_FALSE;
        let mut oob = sys::GDEXTENSION_FALSE;
        interface_fn!(self.variant_set_indexed)(value, index, element, &mut valid, &mut oob);
        (valid != 0, oob != 0)
    }

    unsafe fn variant_get_keyed(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        key: sys::GDExtensionConstVariantPtr,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> bool {
        let mut valid = sys::GDEXTENSION_FALSE;
        interface_fn!(self.variant_get_keyed)(value, key, dst, &mut valid);
        valid != 0
    }

    unsafe fn variant_set_keyed(
        &self,
        value: sys::GDExtensionVariantPtr,
        key: sys::GDExtensionConstVariantPtr,
        element: sys::GDExtensionConstVariantPtr,
    ) -> bool {
        let mut valid = sys::GDEXTENSION_FALSE;
        interface_fn!(self.variant_set_keyed)(value, key, element, &mut valid);
        valid != 0
    }

    unsafe fn variant_get_named(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        name: sys::GDExtensionConstStringNamePtr,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> bool {
        let mut valid = sys::GDEXTENSION_FALSE;
        interface_fn!(self.variant_get_named)(value, name, dst, &mut valid);
        valid != 0
    }

    unsafe fn variant_set_named(
        &self,
        value: sys::GDExtensionVariantPtr,
        name: sys::GDExtensionConstStringNamePtr,
        element: sys::GDExtensionConstVariantPtr,
    ) -> bool {
        let mut valid = sys::GDEXTENSION_FALSE;
        interface_fn!(self.variant_set_named)(value, name, element, &mut valid);
        valid != 0
    }

    fn variant_from_type_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
    ) -> sys::GDExtensionVariantFromTypeConstructorFunc {
        unsafe { interface_fn!(self.get_variant_from_type_constructor)(ty) }
    }

    fn variant_to_type_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
    ) -> sys::GDExtensionTypeFromVariantConstructorFunc {
        unsafe { interface_fn!(self.get_variant_to_type_constructor)(ty) }
    }

    fn ptr_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
        index: i32,
    ) -> sys::GDExtensionPtrConstructor {
        unsafe { interface_fn!(self.variant_get_ptr_constructor)(ty, index) }
    }

    fn ptr_destructor(&self, ty: sys::GDExtensionVariantType) -> sys::GDExtensionPtrDestructor {
        unsafe { interface_fn!(self.variant_get_ptr_destructor)(ty) }
    }

    unsafe fn string_new_with_utf8_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &[u8],
    ) {
        interface_fn!(self.string_new_with_utf8_chars_and_len)(
            dst,
            text.as_ptr() as *const c_char,
            text.len() as i64,
        )
    }

    unsafe fn string_new_with_latin1_chars(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &CStr,
    ) {
        interface_fn!(self.string_new_with_latin1_chars)(dst, text.as_ptr())
    }

    unsafe fn string_new_with_utf32_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &[u32],
    ) {
        interface_fn!(self.string_new_with_utf32_chars_and_len)(
            dst,
            text.as_ptr(),
            text.len() as i64,
        )
    }

    unsafe fn string_to_utf8_chars(
        &self,
        value: sys::GDExtensionConstStringPtr,
        buf: *mut c_char,
        max: i64,
    ) -> i64 {
        interface_fn!(self.string_to_utf8_chars)(value, buf, max)
    }

    unsafe fn string_to_utf32_chars(
        &self,
        value: sys::GDExtensionConstStringPtr,
        buf: *mut u32,
        max: i64,
    ) -> i64 {
        interface_fn!(self.string_to_utf32_chars)(value, buf, max)
    }

    unsafe fn string_name_new_with_utf8_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringNamePtr,
        text: &[u8],
    ) {
        interface_fn!(self.string_name_new_with_utf8_chars_and_len)(
            dst,
            text.as_ptr() as *const c_char,
            text.len() as i64,
        )
    }

    unsafe fn object_get_instance_binding(
        &self,
        object: sys::GDExtensionObjectPtr,
        token: *mut c_void,
        callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
    ) -> *mut c_void {
        interface_fn!(self.object_get_instance_binding)(object, token, callbacks)
    }

    unsafe fn object_set_instance_binding(
        &self,
        object: sys::GDExtensionObjectPtr,
        token: *mut c_void,
        binding: *mut c_void,
        callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
    ) {
        interface_fn!(self.object_set_instance_binding)(object, token, binding, callbacks)
    }

    unsafe fn object_set_instance(
        &self,
        object: sys::GDExtensionObjectPtr,
        class_name: sys::GDExtensionConstStringNamePtr,
        instance: sys::GDExtensionClassInstancePtr,
    ) {
        interface_fn!(self.object_set_instance)(object, class_name, instance)
    }

    unsafe fn object_get_class_name(
        &self,
        object: sys::GDExtensionConstObjectPtr,
        dst: sys::GDExtensionUninitializedStringNamePtr,
    ) -> bool {
        interface_fn!(self.object_get_class_name)(object, self.library, dst) != 0
    }

    unsafe fn object_get_instance_id(&self, object: sys::GDExtensionConstObjectPtr) -> u64 {
        interface_fn!(self.object_get_instance_id)(object)
    }

    unsafe fn object_destroy(&self, object: sys::GDExtensionObjectPtr) {
        interface_fn!(self.object_destroy)(object)
    }

    unsafe fn classdb_construct_object(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
    ) -> sys::GDExtensionObjectPtr {
        interface_fn!(self.classdb_construct_object)(class_name)
    }

    unsafe fn classdb_register_extension_class(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        parent_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionClassCreationInfo3,
    ) {
        interface_fn!(self.classdb_register_extension_class3)(
            self.library,
            class_name,
            parent_name,
            info,
        )
    }

    unsafe fn classdb_register_extension_class_method(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionClassMethodInfo,
    ) {
        interface_fn!(self.classdb_register_extension_class_method)(self.library, class_name, info)
    }

    unsafe fn classdb_register_extension_class_integer_constant(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        enum_name: sys::GDExtensionConstStringNamePtr,
        constant_name: sys::GDExtensionConstStringNamePtr,
        value: i64,
        is_bitfield: bool,
    ) {
        interface_fn!(self.classdb_register_extension_class_integer_constant)(
            self.library,
            class_name,
            enum_name,
            constant_name,
            value,
            is_bitfield as sys::GDExtensionBool,
        )
    }

    unsafe fn classdb_register_extension_class_property(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionPropertyInfo,
        setter: sys::GDExtensionConstStringNamePtr,
        getter: sys::GDExtensionConstStringNamePtr,
    ) {
        interface_fn!(self.classdb_register_extension_class_property)(
            self.library,
            class_name,
            info,
            setter,
            getter,
        )
    }

    unsafe fn classdb_register_extension_class_property_group(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        group_name: sys::GDExtensionConstStringPtr,
        prefix: sys::GDExtensionConstStringPtr,
    ) {
        interface_fn!(self.classdb_register_extension_class_property_group)(
            self.library,
            class_name,
            group_name,
            prefix,
        )
    }

    unsafe fn classdb_register_extension_class_property_subgroup(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        subgroup_name: sys::GDExtensionConstStringPtr,
        prefix: sys::GDExtensionConstStringPtr,
    ) {
        interface_fn!(self.classdb_register_extension_class_property_subgroup)(
            self.library,
            class_name,
            subgroup_name,
            prefix,
        )
    }

    unsafe fn classdb_register_extension_class_signal(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        signal_name: sys::GDExtensionConstStringNamePtr,
        arguments: *const sys::GDExtensionPropertyInfo,
        argument_count: i64,
    ) {
        interface_fn!(self.classdb_register_extension_class_signal)(
            self.library,
            class_name,
            signal_name,
            arguments,
            argument_count,
        )
    }

    unsafe fn classdb_unregister_extension_class(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
    ) {
        interface_fn!(self.classdb_unregister_extension_class)(self.library, class_name)
    }
}
