//! The host's boxed value
//!
//! A [`Variant`] is 24 opaque bytes laid out by the host. Nothing here reads
//! the bytes: the type tag always comes from `variant_get_type`, and every
//! conversion goes through the constructors in the [`WireTable`].

use crate::error::VariantError;
use crate::handle::{GString, StringName};
use crate::wire::{self, WireTable};
use hostbind_sys::{self as sys, VariantType};
use std::fmt;
use std::mem::MaybeUninit;

/// Owned host variant
#[repr(C, align(8))]
pub struct Variant {
    opaque: [u8; sys::VARIANT_SIZE],
}

// The host's variant operations are thread-safe; ownership rules out
// concurrent mutation of a single box.
unsafe impl Send for Variant {}
unsafe impl Sync for Variant {}

impl Variant {
    /// The nil variant. Its storage is all zeroes, which is the host's
    /// representation of nil.
    #[inline]
    pub const fn nil() -> Self {
        Self {
            opaque: [0; sys::VARIANT_SIZE],
        }
    }

    /// Construct a variant by letting `init` write into fresh storage.
    ///
    /// # Safety
    ///
    /// `init` must leave a valid host variant at the pointer it receives.
    pub unsafe fn new_with(init: impl FnOnce(sys::GDExtensionUninitializedVariantPtr)) -> Self {
        let mut raw = MaybeUninit::<Variant>::uninit();
        init(raw.as_mut_ptr() as sys::GDExtensionUninitializedVariantPtr);
        raw.assume_init()
    }

    /// Copy the host variant at `src`.
    ///
    /// # Safety
    ///
    /// `src` must point at a valid host variant.
    pub unsafe fn from_sys_copy(wire: &WireTable, src: sys::GDExtensionConstVariantPtr) -> Self {
        Self::new_with(|dst| wire.host().variant_new_copy(dst, src))
    }

    /// Borrow the host variant at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a valid host variant that outlives `'a`.
    #[inline]
    pub unsafe fn borrow_sys<'a>(ptr: sys::GDExtensionConstVariantPtr) -> &'a Variant {
        &*(ptr as *const Variant)
    }

    /// Move this variant into host storage at `dst`. Ownership passes to
    /// the host.
    ///
    /// # Safety
    ///
    /// `dst` must be writable variant storage whose previous contents have
    /// been destroyed or were never initialized.
    pub unsafe fn move_into_sys(self, dst: sys::GDExtensionUninitializedVariantPtr) {
        std::ptr::write(dst as *mut Variant, self);
    }

    #[inline]
    pub fn as_ptr(&self) -> sys::GDExtensionConstVariantPtr {
        self as *const Variant as sys::GDExtensionConstVariantPtr
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> sys::GDExtensionVariantPtr {
        self as *mut Variant as sys::GDExtensionVariantPtr
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Type tag, as reported by the host
    pub fn get_type(&self, wire: &WireTable) -> VariantType {
        let tag = unsafe { wire.host().variant_get_type(self.as_ptr()) };
        VariantType::from_sys(tag).unwrap_or(VariantType::Nil)
    }

    #[inline]
    pub fn is_nil(&self, wire: &WireTable) -> bool {
        self.get_type(wire) == VariantType::Nil
    }

    /// Host truthiness
    pub fn booleanize(&self, wire: &WireTable) -> bool {
        unsafe { wire.host().variant_booleanize(self.as_ptr()) }
    }

    /// Host text representation
    pub fn stringify(&self, wire: &WireTable) -> String {
        let text = unsafe {
            GString::new_with(|dst| wire.host().variant_stringify(self.as_ptr(), dst))
        };
        text.to_rust_string(wire)
    }

    // ========================================================================
    // Element Access
    // ========================================================================

    /// Element at `index`
    pub fn get_indexed(&self, wire: &WireTable, index: i64) -> Result<Variant, VariantError> {
        let mut valid = false;
        let mut oob = false;
        let out = unsafe {
            Variant::new_with(|dst| {
                wire.host().variant_new_nil(dst);
                (valid, oob) = wire.host().variant_get_indexed(self.as_ptr(), index, dst);
            })
        };
        access_result(valid, oob, index).map(|_| out)
    }

    /// Replace the element at `index`
    pub fn set_indexed(
        &mut self,
        wire: &WireTable,
        index: i64,
        value: &Variant,
    ) -> Result<(), VariantError> {
        let (valid, oob) =
            unsafe { wire.host().variant_set_indexed(self.as_mut_ptr(), index, value.as_ptr()) };
        access_result(valid, oob, index)
    }

    /// Element under `key`
    pub fn get_keyed(&self, wire: &WireTable, key: &Variant) -> Result<Variant, VariantError> {
        let mut valid = false;
        let out = unsafe {
            Variant::new_with(|dst| {
                wire.host().variant_new_nil(dst);
                valid = wire.host().variant_get_keyed(self.as_ptr(), key.as_ptr(), dst);
            })
        };
        access_result(valid, false, 0).map(|_| out)
    }

    /// Replace the element under `key`
    pub fn set_keyed(
        &mut self,
        wire: &WireTable,
        key: &Variant,
        value: &Variant,
    ) -> Result<(), VariantError> {
        let valid = unsafe {
            wire.host()
                .variant_set_keyed(self.as_mut_ptr(), key.as_ptr(), value.as_ptr())
        };
        access_result(valid, false, 0)
    }

    /// Member called `name`
    pub fn get_named(&self, wire: &WireTable, name: &str) -> Result<Variant, VariantError> {
        let name = StringName::new(wire, name);
        let mut valid = false;
        let out = unsafe {
            Variant::new_with(|dst| {
                wire.host().variant_new_nil(dst);
                valid = wire.host().variant_get_named(self.as_ptr(), name.as_ptr(), dst);
            })
        };
        access_result(valid, false, 0).map(|_| out)
    }

    /// Replace the member called `name`
    pub fn set_named(
        &mut self,
        wire: &WireTable,
        name: &str,
        value: &Variant,
    ) -> Result<(), VariantError> {
        let name = StringName::new(wire, name);
        let valid = unsafe {
            wire.host()
                .variant_set_named(self.as_mut_ptr(), name.as_ptr(), value.as_ptr())
        };
        access_result(valid, false, 0)
    }
}

fn access_result(valid: bool, oob: bool, index: i64) -> Result<(), VariantError> {
    if oob {
        Err(VariantError::OutOfBounds { index })
    } else if !valid {
        Err(VariantError::Invalid)
    } else {
        Ok(())
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::nil()
    }
}

impl Clone for Variant {
    fn clone(&self) -> Self {
        match wire::installed() {
            Some(wire) => unsafe { Variant::from_sys_copy(wire, self.as_ptr()) },
            // Without a host only nil variants can exist
            None => Self::nil(),
        }
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        if let Some(wire) = wire::installed() {
            if self.get_type(wire).needs_deinit() {
                unsafe { wire.host().variant_destroy(self.as_mut_ptr()) };
            }
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match wire::installed() {
            Some(wire) => write!(f, "Variant({}: {})", self.get_type(wire).name(), self.stringify(wire)),
            None => f.write_str("Variant(<no host>)"),
        }
    }
}
