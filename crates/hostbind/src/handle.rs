//! Owned host handle types
//!
//! Strings, containers, callables and packed arrays are opaque buffers of
//! the host's size. Copies go through the host's copy constructor and drops
//! through its destructor, so reference counts stay right on the host side.
//! Equality compares the handle bits, not the contents.

use crate::wire::{self, WireTable};
use hostbind_sys::{self as sys, VariantType};
use std::ffi::CStr;
use std::fmt;
use std::mem::MaybeUninit;
use std::os::raw::c_char;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $size:expr) => {
        $(#[$meta])*
        #[repr(C, align(8))]
        pub struct $name {
            opaque: [u8; $size],
        }

        // Host handles are reference counted with atomic counts.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            pub const VARIANT_TYPE: VariantType = VariantType::$variant;

            /// Construct by letting `init` write into fresh storage.
            ///
            /// # Safety
            ///
            /// `init` must leave a valid host value of this type at the pointer.
            pub unsafe fn new_with(init: impl FnOnce(sys::GDExtensionUninitializedTypePtr)) -> Self {
                let mut raw = MaybeUninit::<Self>::uninit();
                init(raw.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
                raw.assume_init()
            }

            /// The host's default (empty) value
            pub fn new_empty(wire: &WireTable) -> Self {
                unsafe { Self::new_with(|dst| wire.construct_default(Self::VARIANT_TYPE, dst)) }
            }

            /// Copy the host value at `src`.
            ///
            /// # Safety
            ///
            /// `src` must hold an initialized value of this type.
            pub unsafe fn from_sys_copy(wire: &WireTable, src: sys::GDExtensionConstTypePtr) -> Self {
                Self::new_with(|dst| wire.copy(Self::VARIANT_TYPE, dst, src))
            }

            #[inline]
            pub fn as_ptr(&self) -> sys::GDExtensionConstTypePtr {
                self as *const Self as sys::GDExtensionConstTypePtr
            }

            #[inline]
            pub fn as_mut_ptr(&mut self) -> sys::GDExtensionTypePtr {
                self as *mut Self as sys::GDExtensionTypePtr
            }

            /// Raw handle bits
            #[inline]
            pub fn bits(&self) -> &[u8; $size] {
                &self.opaque
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                match wire::installed() {
                    Some(wire) => unsafe { Self::from_sys_copy(wire, self.as_ptr()) },
                    None => Self { opaque: self.opaque },
                }
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                if let Some(wire) = wire::installed() {
                    unsafe { wire.destroy(Self::VARIANT_TYPE, self.as_mut_ptr()) };
                }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.opaque == other.opaque
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:02x?})", stringify!($name), self.opaque)
            }
        }
    };
}

opaque_handle!(
    /// Host `String`
    GString, String, sys::OPAQUE_POINTER_SIZE
);
opaque_handle!(
    /// Host `StringName`, an interned string
    StringName, StringName, sys::OPAQUE_POINTER_SIZE
);
opaque_handle!(NodePath, NodePath, sys::OPAQUE_POINTER_SIZE);
opaque_handle!(Dictionary, Dictionary, sys::OPAQUE_POINTER_SIZE);
opaque_handle!(Array, Array, sys::OPAQUE_POINTER_SIZE);
opaque_handle!(Callable, Callable, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(Signal, Signal, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedByteArray, PackedByteArray, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedInt32Array, PackedInt32Array, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedInt64Array, PackedInt64Array, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedFloat32Array, PackedFloat32Array, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedFloat64Array, PackedFloat64Array, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedStringArray, PackedStringArray, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedVector2Array, PackedVector2Array, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedVector3Array, PackedVector3Array, sys::OPAQUE_DOUBLE_POINTER_SIZE);
opaque_handle!(PackedColorArray, PackedColorArray, sys::OPAQUE_DOUBLE_POINTER_SIZE);

// ============================================================================
// Strings
// ============================================================================

impl GString {
    /// Host string from UTF-8 text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(wire: &WireTable, text: &str) -> Self {
        unsafe {
            Self::new_with(|dst| {
                wire.host()
                    .string_new_with_utf8_chars_and_len(dst, text.as_bytes())
            })
        }
    }

    /// Host string from NUL-terminated Latin-1 bytes
    pub fn from_latin1(wire: &WireTable, text: &CStr) -> Self {
        unsafe { Self::new_with(|dst| wire.host().string_new_with_latin1_chars(dst, text)) }
    }

    /// Host string from UTF-32 code points
    pub fn from_utf32(wire: &WireTable, text: &[u32]) -> Self {
        unsafe { Self::new_with(|dst| wire.host().string_new_with_utf32_chars_and_len(dst, text)) }
    }

    /// Host string with the text of a string name
    pub fn from_string_name(wire: &WireTable, name: &StringName) -> Self {
        unsafe { Self::new_with(|dst| wire.string_from_string_name(dst, name.as_ptr())) }
    }

    /// Decode into a Rust string. Invalid UTF-8 is replaced.
    pub fn to_rust_string(&self, wire: &WireTable) -> String {
        // SAFETY: `self` is an initialized host string.
        unsafe { read_utf8(wire, self.as_ptr()) }
    }

    /// UTF-32 code points
    pub fn to_utf32(&self, wire: &WireTable) -> Vec<u32> {
        let host = wire.host();
        unsafe {
            let len = host.string_to_utf32_chars(self.as_ptr(), std::ptr::null_mut(), 0);
            let mut buf = vec![0u32; len.max(0) as usize];
            host.string_to_utf32_chars(self.as_ptr(), buf.as_mut_ptr(), buf.len() as i64);
            buf
        }
    }
}

/// Read the host string at `ptr` as UTF-8.
///
/// # Safety
///
/// `ptr` must hold an initialized host string.
pub(crate) unsafe fn read_utf8(wire: &WireTable, ptr: sys::GDExtensionConstStringPtr) -> String {
    let host = wire.host();
    let len = host.string_to_utf8_chars(ptr, std::ptr::null_mut(), 0);
    let mut buf = vec![0u8; len.max(0) as usize];
    host.string_to_utf8_chars(ptr, buf.as_mut_ptr() as *mut c_char, buf.len() as i64);
    match String::from_utf8(buf) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

impl StringName {
    /// Host string name from UTF-8 text
    pub fn new(wire: &WireTable, text: &str) -> Self {
        unsafe {
            Self::new_with(|dst| {
                wire.host()
                    .string_name_new_with_utf8_chars_and_len(dst, text.as_bytes())
            })
        }
    }

    /// Text of the name
    pub fn to_rust_string(&self, wire: &WireTable) -> String {
        GString::from_string_name(wire, self).to_rust_string(wire)
    }
}
