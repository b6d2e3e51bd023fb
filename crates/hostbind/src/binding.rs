//! Object binding table
//!
//! Maps the instance handles handed to the host to live [`Wrapped`]
//! instances. The host keeps one binding per object under the bridge's
//! token, so asking twice for the same object yields the same wrapper.

use crate::error::{BindResult, BindingError};
use crate::ffi;
use crate::handle::StringName;
use crate::instance::{InstanceHandle, Wrapped};
use crate::types::ObjectHandle;
use crate::wire::WireTable;
use crate::Bridge;
use dashmap::DashMap;
use hostbind_sys::{self as sys, VariantType};
use once_cell::sync::Lazy;
use std::sync::{Arc, Weak};

/// Bridge owning each live handle. Instance callbacks only receive the
/// handle, so this is how they find the table to look it up in.
static HANDLE_OWNERS: Lazy<DashMap<InstanceHandle, Weak<Bridge>>> = Lazy::new(DashMap::new);

/// The bridge and wrapper behind an instance pointer handed back by the
/// host. `None` for null, freed or foreign pointers; the pointer itself
/// is never dereferenced.
pub fn resolve_instance(ptr: sys::GDExtensionClassInstancePtr) -> Option<(Arc<Bridge>, Arc<Wrapped>)> {
    let handle = InstanceHandle::from_sys(ptr)?;
    let bridge = HANDLE_OWNERS.get(&handle)?.upgrade()?;
    let wrapped = bridge.bindings().get(handle)?;
    Some((bridge, wrapped))
}

/// Callbacks for native classes. The binding owns its wrapper, so freeing
/// the binding releases it.
pub static INSTANCE_BINDING_CALLBACKS: sys::GDExtensionInstanceBindingCallbacks =
    sys::GDExtensionInstanceBindingCallbacks {
        create_callback: Some(ffi::binding_create),
        free_callback: Some(ffi::binding_free),
        reference_callback: Some(ffi::binding_reference),
    };

/// Callbacks for extension classes. `free_instance` owns the wrapper, so
/// freeing the binding does nothing.
pub static EXTENSION_BINDING_CALLBACKS: sys::GDExtensionInstanceBindingCallbacks =
    sys::GDExtensionInstanceBindingCallbacks {
        create_callback: Some(ffi::binding_create),
        free_callback: Some(ffi::extension_binding_free),
        reference_callback: Some(ffi::binding_reference),
    };

/// Handle table of live instances
pub struct BindingTable {
    /// Map of instance handle to wrapper
    instances: DashMap<InstanceHandle, Arc<Wrapped>>,
    /// Binding callbacks by class name
    binding_callbacks: DashMap<String, &'static sys::GDExtensionInstanceBindingCallbacks>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
            binding_callbacks: DashMap::new(),
        }
    }

    /// The wrapper of `object`, creating it through the host binding if
    /// this is the first time the bridge sees the object.
    pub fn bind(&self, bridge: &Bridge, object: ObjectHandle) -> BindResult<Arc<Wrapped>> {
        let host = bridge.host();
        let token = bridge.token();

        let existing = unsafe { host.object_get_instance_binding(object.as_sys(), token, std::ptr::null()) };
        if let Some(handle) = InstanceHandle::from_sys(existing) {
            return self.get(handle).ok_or(BindingError::UnknownInstance(handle.get() as usize));
        }

        let class_name = object_class_name(bridge.wire(), object)?;
        let callbacks = self
            .callbacks_for(&class_name)
            .ok_or_else(|| BindingError::UnknownClass(class_name.clone()))?;

        log::debug!("creating binding for {} object {:p}", class_name, object.as_sys());
        let raw = unsafe { host.object_get_instance_binding(object.as_sys(), token, callbacks) };
        let handle = InstanceHandle::from_sys(raw).ok_or(BindingError::ConstructFailed(class_name))?;
        self.get(handle).ok_or(BindingError::UnknownInstance(handle.get() as usize))
    }

    /// Wrap a foreign object. Called from the binding create callback.
    pub(crate) fn insert_foreign(&self, bridge: &Bridge, object: ObjectHandle) -> BindResult<InstanceHandle> {
        let class_name = object_class_name(bridge.wire(), object)?;
        let instance_id = unsafe { bridge.host().object_get_instance_id(object.as_sys()) };
        let wrapped = Wrapped::create(bridge.weak(), class_name, object, instance_id, None);
        Ok(self.insert(wrapped))
    }

    /// Track a wrapper
    pub fn insert(&self, wrapped: Arc<Wrapped>) -> InstanceHandle {
        let handle = wrapped.handle();
        log::trace!("binding {} instance {}", wrapped.class_name(), handle);
        HANDLE_OWNERS.insert(handle, wrapped.bridge_weak());
        self.instances.insert(handle, wrapped);
        handle
    }

    /// Get a wrapper by handle
    pub fn get(&self, handle: InstanceHandle) -> Option<Arc<Wrapped>> {
        self.instances.get(&handle).map(|entry| entry.clone())
    }

    /// Release a wrapper. Unknown or already freed handles are an error.
    pub fn free(&self, handle: InstanceHandle) -> BindResult<()> {
        match self.instances.remove(&handle) {
            Some((_, wrapped)) => {
                HANDLE_OWNERS.remove(&handle);
                log::trace!("freeing {} instance {}", wrapped.class_name(), handle);
                Ok(())
            }
            None => Err(BindingError::UnknownInstance(handle.get() as usize)),
        }
    }

    /// Number of live wrappers
    pub fn count(&self) -> usize {
        self.instances.len()
    }

    /// Binding callbacks used for objects of `class_name`
    pub fn register_callbacks(
        &self,
        class_name: &str,
        callbacks: &'static sys::GDExtensionInstanceBindingCallbacks,
    ) {
        self.binding_callbacks.insert(class_name.to_string(), callbacks);
    }

    pub fn callbacks_for(&self, class_name: &str) -> Option<&'static sys::GDExtensionInstanceBindingCallbacks> {
        self.binding_callbacks.get(class_name).map(|entry| *entry.value())
    }

    pub fn remove_callbacks(&self, class_name: &str) {
        self.binding_callbacks.remove(class_name);
    }

    /// Drop every wrapper (for shutdown)
    pub fn clear(&self) {
        self.instances.retain(|handle, _| {
            HANDLE_OWNERS.remove(handle);
            false
        });
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Class name the host reports for `object`
pub(crate) fn object_class_name(wire: &WireTable, object: ObjectHandle) -> BindResult<String> {
    let mut known = false;
    let name = unsafe {
        StringName::new_with(|dst| {
            known = wire.host().object_get_class_name(object.as_sys(), dst);
            if !known {
                wire.construct_default(VariantType::StringName, dst);
            }
        })
    };
    if !known {
        return Err(BindingError::UnknownClass(format!("{:p}", object.as_sys())));
    }
    Ok(name.to_rust_string(wire))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(class: &str) -> Arc<Wrapped> {
        Wrapped::create(Weak::new(), class, ObjectHandle::null(), 0, None)
    }

    #[test]
    fn test_table_creation() {
        let table = BindingTable::new();
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let table = BindingTable::new();
        let wrapped = wrapper("Node");
        let handle = table.insert(wrapped.clone());
        assert_eq!(table.count(), 1);
        assert!(Arc::ptr_eq(&table.get(handle).unwrap(), &wrapped));
    }

    #[test]
    fn test_free_is_strict() {
        let table = BindingTable::new();
        let handle = table.insert(wrapper("Node"));
        table.free(handle).unwrap();
        assert_eq!(table.count(), 0);
        assert_eq!(
            table.free(handle).unwrap_err(),
            BindingError::UnknownInstance(handle.get() as usize)
        );
    }

    #[test]
    fn test_callbacks_registry() {
        let table = BindingTable::new();
        assert!(table.callbacks_for("Node").is_none());
        table.register_callbacks("Node", &INSTANCE_BINDING_CALLBACKS);
        assert!(std::ptr::eq(
            table.callbacks_for("Node").unwrap(),
            &INSTANCE_BINDING_CALLBACKS
        ));
        table.remove_callbacks("Node");
        assert!(table.callbacks_for("Node").is_none());
    }
}
