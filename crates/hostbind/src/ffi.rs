//! C trampolines handed to the host
//!
//! Every function here is installed in a host-facing table: the method info
//! of a bound method, the creation info of a class, or the instance binding
//! callbacks. They recover the [`Bridge`] from the pointer the host hands
//! back, forward to the Rust API, and translate the result.
//!
//! A [`BindingError`] reaching this layer is a contract violation. It is
//! logged and, unless the configuration says otherwise, aborts the process.

use crate::binding;
use crate::classdb::{CallTarget, ClassUserdata};
use crate::dispatch;
use crate::error::{BindResult, BindingError, CallError, CallFailure};
use crate::handle::GString;
use crate::instance::{InstanceHandle, Wrapped};
use crate::types::ObjectHandle;
use crate::variant::Variant;
use crate::wire::WireTable;
use crate::Bridge;
use hostbind_sys as sys;
use std::ffi::c_void;
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a contract violation and apply the configured policy.
fn contract_violation(bridge: Option<&Bridge>, context: &str, err: &BindingError) {
    log::error!("{}: {}", context, err);
    let abort = bridge.map_or(true, |bridge| bridge.config().abort_on_contract_violation);
    if abort {
        std::process::abort();
    }
}

/// View a host argument array of `len` entries
unsafe fn raw_slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

/// Text of a string name handed in by the host
unsafe fn name_text(wire: &WireTable, name: sys::GDExtensionConstStringNamePtr) -> String {
    if name.is_null() {
        return String::new();
    }
    GString::new_with(|dst| wire.string_from_string_name(dst, name)).to_rust_string(wire)
}

/// Run `f` on the wrapper behind `instance`, or return `fallback` for a
/// null instance. A pointer no live bridge issued is a contract violation.
unsafe fn with_instance<R>(
    instance: sys::GDExtensionClassInstancePtr,
    fallback: R,
    f: impl FnOnce(&Bridge, &Wrapped) -> R,
) -> R {
    let Some(handle) = InstanceHandle::from_sys(instance) else {
        return fallback;
    };
    match binding::resolve_instance(instance) {
        Some((bridge, wrapped)) => f(&bridge, &wrapped),
        None => {
            let err = BindingError::UnknownInstance(handle.get() as usize);
            contract_violation(None, "instance callback", &err);
            fallback
        }
    }
}

/// The live wrapper behind `instance` in `bridge`'s table. The Arc keeps
/// it alive for the whole call even if the host frees it meanwhile.
fn lookup_instance(bridge: &Bridge, instance: sys::GDExtensionClassInstancePtr) -> BindResult<Arc<Wrapped>> {
    let handle = InstanceHandle::from_sys(instance).ok_or(BindingError::UnknownInstance(0))?;
    bridge
        .bindings()
        .get(handle)
        .ok_or(BindingError::UnknownInstance(handle.get() as usize))
}

unsafe fn write_call_error(r_error: *mut sys::GDExtensionCallError, error: Option<CallError>) {
    if r_error.is_null() {
        return;
    }
    *r_error = match error {
        Some(error) => error.to_sys(),
        None => sys::GDExtensionCallError::default(),
    };
}

// ============================================================================
// Method Calls
// ============================================================================

/// `call_func` of every bound method
pub(crate) unsafe extern "C" fn method_call(
    method_userdata: *mut c_void,
    p_instance: sys::GDExtensionClassInstancePtr,
    p_args: *const sys::GDExtensionConstVariantPtr,
    p_argument_count: sys::GDExtensionInt,
    r_return: sys::GDExtensionVariantPtr,
    r_error: *mut sys::GDExtensionCallError,
) {
    let target = &*(method_userdata as *const CallTarget);
    let Some(bridge) = target.bridge.upgrade() else {
        write_call_error(r_error, Some(CallError::InvalidMethod));
        return;
    };
    if p_instance.is_null() {
        write_call_error(r_error, Some(CallError::InstanceIsNull));
        return;
    }
    let wrapped = match lookup_instance(&bridge, p_instance) {
        Ok(wrapped) => wrapped,
        Err(err) => {
            contract_violation(Some(&bridge), &target.bind.metadata().to_string(), &err);
            write_call_error(r_error, Some(CallError::InstanceIsNull));
            return;
        }
    };

    let args: Vec<&Variant> = raw_slice(p_args, p_argument_count.max(0) as usize)
        .iter()
        .map(|ptr| Variant::borrow_sys(*ptr))
        .collect();

    match dispatch::call(&bridge, &target.bind, &wrapped, &args) {
        Ok(value) => {
            if !r_return.is_null() {
                value.move_into_sys(r_return);
            }
            write_call_error(r_error, None);
        }
        Err(CallFailure::Call(error)) => {
            log::debug!("{}: {}", target.bind.metadata(), error);
            write_call_error(r_error, Some(error));
        }
        Err(CallFailure::Contract(err)) => {
            contract_violation(Some(&bridge), &target.bind.metadata().to_string(), &err);
            write_call_error(r_error, Some(CallError::InvalidMethod));
        }
    }
}

/// `ptrcall_func` of every non-variadic bound method
pub(crate) unsafe extern "C" fn method_ptrcall(
    method_userdata: *mut c_void,
    p_instance: sys::GDExtensionClassInstancePtr,
    p_args: *const sys::GDExtensionConstTypePtr,
    r_ret: sys::GDExtensionTypePtr,
) {
    let target = &*(method_userdata as *const CallTarget);
    let Some(bridge) = target.bridge.upgrade() else {
        return;
    };
    ptrcall_target(&bridge, target, p_instance, p_args, r_ret);
}

unsafe fn ptrcall_target(
    bridge: &Bridge,
    target: &CallTarget,
    p_instance: sys::GDExtensionClassInstancePtr,
    p_args: *const sys::GDExtensionConstTypePtr,
    r_ret: sys::GDExtensionTypePtr,
) {
    let meta = target.bind.metadata();
    let result = if p_instance.is_null() {
        Err(BindingError::InstanceIsNull(meta.class_name.clone()))
    } else {
        lookup_instance(bridge, p_instance).and_then(|wrapped| {
            let args = raw_slice(p_args, meta.param_count());
            dispatch::ptrcall(bridge, &target.bind, &wrapped, args, r_ret)
        })
    };
    if let Err(err) = result {
        contract_violation(Some(bridge), &meta.to_string(), &err);
    }
}

// ============================================================================
// Instance Lifecycle
// ============================================================================

/// `create_instance_func`: build a host object with fresh Rust state
pub(crate) unsafe extern "C" fn create_instance(p_class_userdata: *mut c_void) -> sys::GDExtensionObjectPtr {
    let userdata = &*(p_class_userdata as *const ClassUserdata);
    let Some(bridge) = userdata.bridge.upgrade() else {
        return std::ptr::null_mut();
    };
    match bridge.classes().create_instance(&bridge, &userdata.class_name) {
        Ok(object) => object.as_sys(),
        Err(err) => {
            contract_violation(Some(&bridge), &userdata.class_name, &err);
            std::ptr::null_mut()
        }
    }
}

/// `free_instance_func`: release the Rust state of a dying object
pub(crate) unsafe extern "C" fn free_instance(
    p_class_userdata: *mut c_void,
    p_instance: sys::GDExtensionClassInstancePtr,
) {
    let userdata = &*(p_class_userdata as *const ClassUserdata);
    let Some(bridge) = userdata.bridge.upgrade() else {
        return;
    };
    let result = match InstanceHandle::from_sys(p_instance) {
        Some(handle) => bridge.bindings().free(handle),
        None => Err(BindingError::UnknownInstance(0)),
    };
    if let Err(err) = result {
        contract_violation(Some(&bridge), &userdata.class_name, &err);
    }
}

// ============================================================================
// Instance Callbacks
// ============================================================================

pub(crate) unsafe extern "C" fn instance_set(
    p_instance: sys::GDExtensionClassInstancePtr,
    p_name: sys::GDExtensionConstStringNamePtr,
    p_value: sys::GDExtensionConstVariantPtr,
) -> sys::GDExtensionBool {
    with_instance(p_instance, sys::GDEXTENSION_FALSE, |bridge, wrapped| {
        if p_value.is_null() {
            return sys::GDEXTENSION_FALSE;
        }
        let name = name_text(bridge.wire(), p_name);
        match dispatch::set_property(bridge, wrapped, &name, Variant::borrow_sys(p_value)) {
            Ok(handled) => handled as sys::GDExtensionBool,
            Err(err) => {
                contract_violation(Some(bridge), wrapped.class_name(), &err);
                sys::GDEXTENSION_FALSE
            }
        }
    })
}

pub(crate) unsafe extern "C" fn instance_get(
    p_instance: sys::GDExtensionClassInstancePtr,
    p_name: sys::GDExtensionConstStringNamePtr,
    r_ret: sys::GDExtensionVariantPtr,
) -> sys::GDExtensionBool {
    with_instance(p_instance, sys::GDEXTENSION_FALSE, |bridge, wrapped| {
        let name = name_text(bridge.wire(), p_name);
        match dispatch::get_property(bridge, wrapped, &name) {
            Ok(Some(value)) if !r_ret.is_null() => {
                value.move_into_sys(r_ret);
                sys::GDEXTENSION_TRUE
            }
            Ok(_) => sys::GDEXTENSION_FALSE,
            Err(err) => {
                contract_violation(Some(bridge), wrapped.class_name(), &err);
                sys::GDEXTENSION_FALSE
            }
        }
    })
}

pub(crate) unsafe extern "C" fn instance_get_property_list(
    p_instance: sys::GDExtensionClassInstancePtr,
    r_count: *mut u32,
) -> *const sys::GDExtensionPropertyInfo {
    let (list, count) = with_instance(p_instance, (std::ptr::null(), 0), |bridge, wrapped| {
        bridge.classes().property_list(wrapped.class_name())
    });
    if !r_count.is_null() {
        *r_count = count;
    }
    list
}

/// The list is owned by the class record, so there is nothing to free.
pub(crate) unsafe extern "C" fn instance_free_property_list(
    _p_instance: sys::GDExtensionClassInstancePtr,
    _p_list: *const sys::GDExtensionPropertyInfo,
    _p_count: u32,
) {
}

pub(crate) unsafe extern "C" fn instance_property_can_revert(
    _p_instance: sys::GDExtensionClassInstancePtr,
    _p_name: sys::GDExtensionConstStringNamePtr,
) -> sys::GDExtensionBool {
    sys::GDEXTENSION_FALSE
}

pub(crate) unsafe extern "C" fn instance_property_get_revert(
    _p_instance: sys::GDExtensionClassInstancePtr,
    _p_name: sys::GDExtensionConstStringNamePtr,
    _r_ret: sys::GDExtensionVariantPtr,
) -> sys::GDExtensionBool {
    sys::GDEXTENSION_FALSE
}

pub(crate) unsafe extern "C" fn instance_validate_property(
    p_instance: sys::GDExtensionClassInstancePtr,
    p_property: *mut sys::GDExtensionPropertyInfo,
) -> sys::GDExtensionBool {
    with_instance(p_instance, sys::GDEXTENSION_FALSE, |bridge, wrapped| {
        match (bridge.classes().validate_hook(wrapped.class_name()), p_property.as_mut()) {
            (Some(hook), Some(property)) => hook(property) as sys::GDExtensionBool,
            _ => sys::GDEXTENSION_FALSE,
        }
    })
}

pub(crate) unsafe extern "C" fn instance_notification(
    p_instance: sys::GDExtensionClassInstancePtr,
    p_what: i32,
    p_reversed: sys::GDExtensionBool,
) {
    with_instance(p_instance, (), |bridge, wrapped| {
        let (Some(notify), Some(state)) = (bridge.classes().notifier(wrapped.class_name()), wrapped.state())
        else {
            return;
        };
        log::trace!("notification {} for {} instance {}", p_what, wrapped.class_name(), wrapped.handle());
        notify(&mut **state.lock(), p_what, p_reversed != 0);
    })
}

pub(crate) unsafe extern "C" fn instance_to_string(
    p_instance: sys::GDExtensionClassInstancePtr,
    r_is_valid: *mut sys::GDExtensionBool,
    p_out: sys::GDExtensionStringPtr,
) {
    with_instance(p_instance, (), |bridge, wrapped| {
        if p_out.is_null() {
            return;
        }
        let text = format!(
            "[ GDExtension::{} <--> Instance ID:{} ]",
            wrapped.class_name(),
            wrapped.instance_id()
        );
        bridge.host().string_new_with_utf8_chars_and_len(p_out, text.as_bytes());
        if !r_is_valid.is_null() {
            *r_is_valid = sys::GDEXTENSION_TRUE;
        }
    })
}

pub(crate) unsafe extern "C" fn instance_reference(p_instance: sys::GDExtensionClassInstancePtr) {
    log::trace!("reference {:p}", p_instance);
}

pub(crate) unsafe extern "C" fn instance_unreference(p_instance: sys::GDExtensionClassInstancePtr) {
    log::trace!("unreference {:p}", p_instance);
}

pub(crate) unsafe extern "C" fn instance_get_rid(_p_instance: sys::GDExtensionClassInstancePtr) -> u64 {
    0
}

// ============================================================================
// Virtual Methods
// ============================================================================

/// `get_virtual_call_data_func`: the call target of a virtual override, or
/// null to let the host fall back
pub(crate) unsafe extern "C" fn get_virtual_call_data(
    p_class_userdata: *mut c_void,
    p_name: sys::GDExtensionConstStringNamePtr,
) -> *mut c_void {
    let userdata = &*(p_class_userdata as *const ClassUserdata);
    let Some(bridge) = userdata.bridge.upgrade() else {
        return std::ptr::null_mut();
    };
    let name = name_text(bridge.wire(), p_name);
    let data = bridge.classes().virtual_call_data(&userdata.class_name, &name);
    log::trace!(
        "virtual lookup {}.{}: {}",
        userdata.class_name,
        name,
        if data.is_null() { "miss" } else { "hit" }
    );
    data
}

/// `call_virtual_with_data_func`: raw call of a virtual override
pub(crate) unsafe extern "C" fn call_virtual_with_data(
    p_instance: sys::GDExtensionClassInstancePtr,
    _p_name: sys::GDExtensionConstStringNamePtr,
    p_virtual_call_userdata: *mut c_void,
    p_args: *const sys::GDExtensionConstTypePtr,
    r_ret: sys::GDExtensionTypePtr,
) {
    let target = &*(p_virtual_call_userdata as *const CallTarget);
    let Some(bridge) = target.bridge.upgrade() else {
        return;
    };
    ptrcall_target(&bridge, target, p_instance, p_args, r_ret);
}

// ============================================================================
// Instance Bindings
// ============================================================================

/// `create_callback`: wrap an object the bridge has not seen yet. The token
/// is the bridge itself.
pub(crate) unsafe extern "C" fn binding_create(p_token: *mut c_void, p_instance: *mut c_void) -> *mut c_void {
    let Some(bridge) = (p_token as *const Bridge).as_ref() else {
        return std::ptr::null_mut();
    };
    match bridge.bindings().insert_foreign(bridge, ObjectHandle::from_sys(p_instance)) {
        Ok(handle) => handle.as_sys(),
        Err(err) => {
            contract_violation(Some(bridge), "binding create", &err);
            std::ptr::null_mut()
        }
    }
}

/// `free_callback` for native classes: the binding owns its wrapper
pub(crate) unsafe extern "C" fn binding_free(
    p_token: *mut c_void,
    _p_instance: *mut c_void,
    p_binding: *mut c_void,
) {
    let Some(bridge) = (p_token as *const Bridge).as_ref() else {
        return;
    };
    let result = match InstanceHandle::from_sys(p_binding) {
        Some(handle) => bridge.bindings().free(handle),
        None => Err(BindingError::UnknownInstance(0)),
    };
    if let Err(err) = result {
        contract_violation(Some(bridge), "binding free", &err);
    }
}

/// `free_callback` for extension classes: `free_instance` already released
/// the wrapper
pub(crate) unsafe extern "C" fn extension_binding_free(
    _p_token: *mut c_void,
    _p_instance: *mut c_void,
    _p_binding: *mut c_void,
) {
}

pub(crate) unsafe extern "C" fn binding_reference(
    _p_token: *mut c_void,
    _p_binding: *mut c_void,
    _p_reference: sys::GDExtensionBool,
) -> sys::GDExtensionBool {
    sys::GDEXTENSION_TRUE
}
