//! Extension classes and their live instances
//!
//! An [`ExtensionClass`] is a Rust type the host can instantiate by name.
//! Each live instance is held by a [`Wrapped`]: the host object that owns
//! it plus the Rust state behind a mutex. Wrappers for foreign engine
//! objects carry no state.

use crate::classdb::ClassDb;
use crate::error::{BindResult, BindingError};
use crate::types::ObjectHandle;
use crate::Bridge;
use hostbind_sys as sys;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::{Arc, Weak};

/// A Rust type exposed to the host as a class
pub trait ExtensionClass: Any + Send + Sized {
    /// Host-visible class name
    const CLASS_NAME: &'static str;

    /// Native or registered parent class
    const PARENT_CLASS_NAME: &'static str;

    /// Build the Rust state for a freshly created host object.
    fn construct(owner: ObjectHandle) -> Self;

    /// Host notification, e.g. `NOTIFICATION_READY`.
    fn on_notification(&mut self, _what: i32, _reversed: bool) {}

    /// Bind methods, properties, signals and constants. Runs right after
    /// the class is registered.
    fn bind_methods(_db: &ClassDb) -> BindResult<()> {
        Ok(())
    }
}

/// Builds the state of a new instance
pub type ConstructFn = fn(ObjectHandle) -> Box<dyn Any + Send>;

/// Forwards a host notification to instance state
pub type NotifyFn = fn(&mut (dyn Any + Send), i32, bool);

pub(crate) fn construct_erased<T: ExtensionClass>(owner: ObjectHandle) -> Box<dyn Any + Send> {
    Box::new(T::construct(owner))
}

pub(crate) fn notify_erased<T: ExtensionClass>(state: &mut (dyn Any + Send), what: i32, reversed: bool) {
    if let Some(state) = state.downcast_mut::<T>() {
        state.on_notification(what, reversed);
    }
}

// ============================================================================
// Instance Handle
// ============================================================================

/// Key of a live wrapper in the binding table. Handed to the host as the
/// instance pointer; its value is the wrapper's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle(NonZeroU64);

impl InstanceHandle {
    #[inline]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// The instance pointer the host hands back. `None` for null.
    #[inline]
    pub fn from_sys(ptr: sys::GDExtensionClassInstancePtr) -> Option<Self> {
        Self::new(ptr as usize as u64)
    }

    #[inline]
    pub fn as_sys(self) -> sys::GDExtensionClassInstancePtr {
        self.0.get() as usize as sys::GDExtensionClassInstancePtr
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

// ============================================================================
// Wrapped
// ============================================================================

/// A live instance known to the bridge
pub struct Wrapped {
    handle: InstanceHandle,
    bridge: Weak<Bridge>,
    class_name: String,
    owner: ObjectHandle,
    instance_id: u64,
    state: Option<Mutex<Box<dyn Any + Send>>>,
}

impl Wrapped {
    /// Allocate a wrapper. Its handle is fixed by the allocation.
    pub fn create(
        bridge: Weak<Bridge>,
        class_name: impl Into<String>,
        owner: ObjectHandle,
        instance_id: u64,
        state: Option<Box<dyn Any + Send>>,
    ) -> Arc<Self> {
        let class_name = class_name.into();
        Arc::new_cyclic(|this: &Weak<Wrapped>| {
            let addr = this.as_ptr() as usize as u64;
            Self {
                // An allocation is never at address zero
                handle: InstanceHandle(NonZeroU64::new(addr).unwrap_or(NonZeroU64::MIN)),
                bridge,
                class_name,
                owner,
                instance_id,
                state: state.map(Mutex::new),
            }
        })
    }

    /// The bridge this instance belongs to, if it is still alive
    #[inline]
    pub fn bridge(&self) -> Option<Arc<Bridge>> {
        self.bridge.upgrade()
    }

    pub(crate) fn bridge_weak(&self) -> Weak<Bridge> {
        self.bridge.clone()
    }

    #[inline]
    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    #[inline]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[inline]
    pub fn owner(&self) -> ObjectHandle {
        self.owner
    }

    #[inline]
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    /// Whether this wraps an extension instance rather than a foreign object
    #[inline]
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn state(&self) -> Option<&Mutex<Box<dyn Any + Send>>> {
        self.state.as_ref()
    }

    /// Run `f` on the instance state, locked for the duration.
    pub fn with_state<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> BindResult<R> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| BindingError::InstanceIsNull(self.class_name.clone()))?;
        let mut guard = state.lock();
        let typed = guard
            .downcast_mut::<T>()
            .ok_or_else(|| BindingError::InstanceTypeMismatch {
                class: self.class_name.clone(),
                expected: std::any::type_name::<T>(),
            })?;
        Ok(f(typed))
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("handle", &self.handle)
            .field("class_name", &self.class_name)
            .field("instance_id", &self.instance_id)
            .field("has_state", &self.has_state())
            .finish()
    }
}

impl Drop for Wrapped {
    fn drop(&mut self) {
        log::trace!("dropping {} instance {}", self.class_name, self.handle);
    }
}
