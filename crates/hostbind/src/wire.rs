//! Process-wide table of per-type host constructors
//!
//! The host hands out one from-type constructor, to-type constructor, copy
//! constructor and destructor per variant type. They are fetched once, when
//! the host is installed, and indexed by tag afterwards. `Variant` and the
//! handle types need the table from `Clone` and `Drop`, so it is the one
//! piece of state that lives in a global.

use crate::error::{BindResult, BindingError};
use crate::host::HostApi;
use hostbind_sys::{self as sys, VariantType, VARIANT_TYPE_COUNT};
use once_cell::sync::OnceCell;

static WIRE: OnceCell<WireTable> = OnceCell::new();

/// Constructor number of the default (empty) constructor
const DEFAULT_CONSTRUCTOR: i32 = 0;
/// Constructor number of the copy constructor
const COPY_CONSTRUCTOR: i32 = 1;
/// Constructor number of `String(StringName)` and `StringName(String)`
const CONVERT_CONSTRUCTOR: i32 = 2;

/// Cached host constructors, indexed by variant tag
pub struct WireTable {
    host: &'static dyn HostApi,
    from_type: [sys::GDExtensionVariantFromTypeConstructorFunc; VARIANT_TYPE_COUNT],
    to_type: [sys::GDExtensionTypeFromVariantConstructorFunc; VARIANT_TYPE_COUNT],
    default: [sys::GDExtensionPtrConstructor; VARIANT_TYPE_COUNT],
    copy: [sys::GDExtensionPtrConstructor; VARIANT_TYPE_COUNT],
    destroy: [sys::GDExtensionPtrDestructor; VARIANT_TYPE_COUNT],
    string_from_string_name: sys::GDExtensionPtrConstructor,
}

impl WireTable {
    /// Fetch every constructor from `host`.
    pub fn new(host: &'static dyn HostApi) -> Self {
        let mut table = Self {
            host,
            from_type: [None; VARIANT_TYPE_COUNT],
            to_type: [None; VARIANT_TYPE_COUNT],
            default: [None; VARIANT_TYPE_COUNT],
            copy: [None; VARIANT_TYPE_COUNT],
            destroy: [None; VARIANT_TYPE_COUNT],
            string_from_string_name: host.ptr_constructor(
                VariantType::String.sys(),
                CONVERT_CONSTRUCTOR,
            ),
        };
        // NIL has no constructors
        for ty in &VariantType::ALL[1..] {
            let i = *ty as usize;
            table.from_type[i] = host.variant_from_type_constructor(ty.sys());
            table.to_type[i] = host.variant_to_type_constructor(ty.sys());
            table.default[i] = host.ptr_constructor(ty.sys(), DEFAULT_CONSTRUCTOR);
            table.copy[i] = host.ptr_constructor(ty.sys(), COPY_CONSTRUCTOR);
            if ty.needs_deinit() {
                table.destroy[i] = host.ptr_destructor(ty.sys());
            }
        }
        table
    }

    /// The host this table was built from
    #[inline]
    pub fn host(&self) -> &'static dyn HostApi {
        self.host
    }

    /// Box the raw value at `src` into the variant at `dst`.
    ///
    /// # Safety
    ///
    /// `src` must hold an initialized value of type `ty`; `dst` must be
    /// writable variant storage whose previous contents are not needed.
    pub unsafe fn from_type(
        &self,
        ty: VariantType,
        dst: sys::GDExtensionUninitializedVariantPtr,
        src: sys::GDExtensionConstTypePtr,
    ) {
        match self.from_type[ty as usize] {
            Some(f) => f(dst, src as sys::GDExtensionTypePtr),
            None => self.host.variant_new_nil(dst),
        }
    }

    /// Unbox the variant at `src` into raw storage at `dst`.
    ///
    /// # Safety
    ///
    /// `src` must be a variant of type `ty`; `dst` must be writable storage
    /// for that type.
    pub unsafe fn to_type(
        &self,
        ty: VariantType,
        dst: sys::GDExtensionUninitializedTypePtr,
        src: sys::GDExtensionConstVariantPtr,
    ) {
        if let Some(f) = self.to_type[ty as usize] {
            f(dst, src as sys::GDExtensionVariantPtr);
        }
    }

    /// Default-construct a raw value of type `ty` at `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be writable storage for type `ty`.
    pub unsafe fn construct_default(&self, ty: VariantType, dst: sys::GDExtensionUninitializedTypePtr) {
        match self.default[ty as usize] {
            Some(f) => f(dst, std::ptr::null()),
            None => std::ptr::write_bytes(dst as *mut u8, 0, ty.type_ptr_size()),
        }
    }

    /// Copy-construct a raw value of type `ty` from `src` into `dst`.
    ///
    /// # Safety
    ///
    /// `src` must hold an initialized value of type `ty`; `dst` must be
    /// writable storage for that type.
    pub unsafe fn copy(
        &self,
        ty: VariantType,
        dst: sys::GDExtensionUninitializedTypePtr,
        src: sys::GDExtensionConstTypePtr,
    ) {
        match self.copy[ty as usize] {
            Some(f) => {
                let args = [src];
                f(dst, args.as_ptr());
            }
            None => std::ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, ty.type_ptr_size()),
        }
    }

    /// Release the resources of the raw value at `ptr`. A no-op for types
    /// without resources.
    ///
    /// # Safety
    ///
    /// `ptr` must hold an initialized value of type `ty`, which is invalid
    /// afterwards.
    pub unsafe fn destroy(&self, ty: VariantType, ptr: sys::GDExtensionTypePtr) {
        if let Some(f) = self.destroy[ty as usize] {
            f(ptr);
        }
    }

    /// Construct a host `String` from the `StringName` at `src`.
    ///
    /// # Safety
    ///
    /// `src` must be an initialized string name; `dst` writable string storage.
    pub unsafe fn string_from_string_name(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        src: sys::GDExtensionConstStringNamePtr,
    ) {
        match self.string_from_string_name {
            Some(f) => {
                let args = [src];
                f(dst, args.as_ptr());
            }
            None => self.host.string_new_with_utf8_chars_and_len(dst, &[]),
        }
    }
}

/// Build the table from `host` and make it the process table.
pub fn install(host: &'static dyn HostApi) -> BindResult<&'static WireTable> {
    let mut fresh = false;
    let table = WIRE.get_or_init(|| {
        fresh = true;
        WireTable::new(host)
    });
    if fresh {
        Ok(table)
    } else {
        Err(BindingError::HostAlreadyInstalled)
    }
}

/// The process table, building it from `host` on first use.
pub fn get_or_install(host: impl FnOnce() -> &'static dyn HostApi) -> &'static WireTable {
    WIRE.get_or_init(|| WireTable::new(host()))
}

/// The process table, if installed
#[inline]
pub fn installed() -> Option<&'static WireTable> {
    WIRE.get()
}

/// The process table
pub fn get() -> BindResult<&'static WireTable> {
    WIRE.get().ok_or(BindingError::HostNotInstalled)
}
