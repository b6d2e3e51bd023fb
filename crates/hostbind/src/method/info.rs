//! Host-facing method and property descriptors
//!
//! The host keeps raw pointers into the descriptors it is handed at
//! registration, so every string and slice here lives in its own heap
//! allocation and stays put until the owning class is unregistered.

use super::MethodBind;
use crate::ffi;
use crate::handle::{GString, StringName};
use crate::reflect::{TypeInfo, TypeKind};
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};
use std::ffi::c_void;
use std::sync::Arc;

// ============================================================================
// Property Info
// ============================================================================

/// Owned storage behind a `GDExtensionPropertyInfo`
pub struct PropertyInfoStorage {
    name_text: String,
    variant_type: VariantType,
    name: Box<StringName>,
    class_name: Box<StringName>,
    hint_string: Box<GString>,
    hint: u32,
    usage: u32,
}

impl PropertyInfoStorage {
    pub fn new(wire: &WireTable, variant_type: VariantType, name: &str, class_name: &str) -> Self {
        Self {
            name_text: name.to_string(),
            variant_type,
            name: Box::new(StringName::new(wire, name)),
            class_name: Box::new(StringName::new(wire, class_name)),
            hint_string: Box::new(GString::from_str(wire, "")),
            hint: sys::PROPERTY_HINT_NONE,
            usage: sys::PROPERTY_USAGE_DEFAULT,
        }
    }

    /// Descriptor for a parameter or return value of type `info`
    pub fn for_type(wire: &WireTable, info: &TypeInfo, name: &str) -> Self {
        let class_name = match info.kind {
            TypeKind::Object if info.name != "ObjectHandle" => info.name,
            TypeKind::Object => "Object",
            _ => "",
        };
        Self::new(wire, info.variant_type, name, class_name)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name_text
    }

    #[inline]
    pub fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    /// The host view. Valid while `self` is alive.
    pub fn as_sys(&self) -> sys::GDExtensionPropertyInfo {
        sys::GDExtensionPropertyInfo {
            type_: self.variant_type.sys(),
            name: self.name.as_ptr() as sys::GDExtensionStringNamePtr,
            class_name: self.class_name.as_ptr() as sys::GDExtensionStringNamePtr,
            hint: self.hint,
            hint_string: self.hint_string.as_ptr() as sys::GDExtensionStringPtr,
            usage: self.usage,
        }
    }
}

impl std::fmt::Debug for PropertyInfoStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyInfoStorage")
            .field("name", &self.name_text)
            .field("variant_type", &self.variant_type)
            .finish()
    }
}

// ============================================================================
// Method Info
// ============================================================================

/// Owned storage behind a `GDExtensionClassMethodInfo`
pub struct MethodInfoStorage {
    bind: Arc<MethodBind>,
    _name: Box<StringName>,
    _return_info: Option<PropertyInfoStorage>,
    _return_sys: Option<Box<sys::GDExtensionPropertyInfo>>,
    _args: Vec<PropertyInfoStorage>,
    _args_sys: Box<[sys::GDExtensionPropertyInfo]>,
    _args_metadata: Box<[sys::GDExtensionClassMethodArgumentMetadata]>,
    _defaults: Box<[sys::GDExtensionVariantPtr]>,
    info: Box<sys::GDExtensionClassMethodInfo>,
}

// Raw pointers only point into storage owned by this struct or by `bind`.
unsafe impl Send for MethodInfoStorage {}
unsafe impl Sync for MethodInfoStorage {}

impl MethodInfoStorage {
    /// Build the descriptor for `bind`. `userdata` is handed back to the
    /// call trampolines.
    pub fn new(wire: &WireTable, bind: Arc<MethodBind>, userdata: *mut c_void) -> Self {
        let meta = bind.metadata();

        let name = Box::new(StringName::new(wire, &meta.exposed_name));

        let return_info = meta
            .return_type
            .as_ref()
            .map(|ty| PropertyInfoStorage::for_type(wire, ty, ""));
        let mut return_sys = return_info.as_ref().map(|info| Box::new(info.as_sys()));

        let (args, mut args_metadata): (Vec<_>, Box<[_]>) = if meta.is_variadic {
            (
                vec![PropertyInfoStorage::new(wire, VariantType::Nil, "varargs", "")],
                vec![sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_NONE].into_boxed_slice(),
            )
        } else {
            (
                meta.params
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| PropertyInfoStorage::for_type(wire, ty, &meta.arg_name(i)))
                    .collect(),
                meta.params.iter().map(|ty| ty.metadata.sys()).collect(),
            )
        };
        let mut args_sys: Box<[sys::GDExtensionPropertyInfo]> =
            args.iter().map(PropertyInfoStorage::as_sys).collect();

        let mut defaults: Box<[sys::GDExtensionVariantPtr]> = meta
            .default_arguments
            .iter()
            .map(|v| v.as_ptr() as sys::GDExtensionVariantPtr)
            .collect();

        let info = Box::new(sys::GDExtensionClassMethodInfo {
            name: name.as_ptr() as sys::GDExtensionStringNamePtr,
            method_userdata: userdata,
            call_func: Some(ffi::method_call),
            ptrcall_func: if meta.is_variadic {
                None
            } else {
                Some(ffi::method_ptrcall)
            },
            method_flags: meta.flags.bits(),
            has_return_value: return_sys.is_some() as sys::GDExtensionBool,
            return_value_info: return_sys
                .as_deref_mut()
                .map_or(std::ptr::null_mut(), |p| p as *mut sys::GDExtensionPropertyInfo),
            return_value_metadata: meta
                .return_type
                .as_ref()
                .map_or(sys::GDEXTENSION_METHOD_ARGUMENT_METADATA_NONE, |ty| ty.metadata.sys()),
            argument_count: args_sys.len() as u32,
            arguments_info: slice_ptr(&mut args_sys),
            arguments_metadata: slice_ptr(&mut args_metadata),
            default_argument_count: defaults.len() as u32,
            default_arguments: slice_ptr(&mut defaults),
        });

        Self {
            bind,
            _name: name,
            _return_info: return_info,
            _return_sys: return_sys,
            _args: args,
            _args_sys: args_sys,
            _args_metadata: args_metadata,
            _defaults: defaults,
            info,
        }
    }

    #[inline]
    pub fn bind(&self) -> &Arc<MethodBind> {
        &self.bind
    }

    /// The host view. Valid while `self` is alive.
    #[inline]
    pub fn as_sys(&self) -> *const sys::GDExtensionClassMethodInfo {
        &*self.info
    }
}

fn slice_ptr<T>(slice: &mut [T]) -> *mut T {
    if slice.is_empty() {
        std::ptr::null_mut()
    } else {
        slice.as_mut_ptr()
    }
}
