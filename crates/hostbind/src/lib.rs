//! Marshaling and dispatch bridge between Rust and a host engine's
//! extension ABI
//!
//! The crate turns Rust types and methods into classes the host can
//! instantiate and call:
//!
//! - **Value codecs** ([`codec`]) move values between Rust, raw typed
//!   slots and boxed [`Variant`]s.
//! - **Method binding** ([`method`]) captures a Rust callable's signature
//!   once, at bind time.
//! - **Dispatch** ([`dispatch`]) runs boxed and raw calls against live
//!   instances.
//! - **Class registry** ([`classdb`]) registers classes and their members
//!   with the host.
//! - **Binding table** ([`binding`]) maps host objects to Rust instances.
//!
//! [`Bridge`] owns the registries and is what the host's callbacks find
//! their way back to. The library entry point lives in [`entry`].

pub mod binding;
pub mod classdb;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod entry;
pub mod error;
pub(crate) mod ffi;
pub mod handle;
pub mod host;
pub mod instance;
pub mod logging;
pub mod method;
pub mod reflect;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod variant;
pub mod wire;

pub use hostbind_sys as sys;

pub use binding::BindingTable;
pub use classdb::{ClassDb, ClassInfo, SignalParam, ValidatePropertyHook};
pub use codec::{NativeValue, WireType};
pub use config::{BridgeConfig, InitializationLevel, LogConfig};
pub use entry::ExtensionInit;
pub use error::{BindResult, BindingError, CallError, CallFailure, ConfigError, VariantError};
pub use handle::{GString, StringName};
pub use host::{HostApi, HostVersion, InterfaceHost};
pub use instance::{ExtensionClass, InstanceHandle, Wrapped};
pub use method::{MethodBind, MethodFlags, MethodMetadata, VarArgs};
pub use types::ObjectHandle;
pub use variant::Variant;
pub use wire::WireTable;

use std::ffi::c_void;
use std::sync::{Arc, Weak};

/// Native classes every bridge knows about from the start
pub const CORE_NATIVE_CLASSES: &[&str] = &["Object", "RefCounted", "Node", "Resource"];

/// Registries and settings of one loaded extension
pub struct Bridge {
    wire: &'static WireTable,
    config: BridgeConfig,
    classes: ClassDb,
    bindings: Arc<BindingTable>,
    this: Weak<Bridge>,
}

impl Bridge {
    /// Create a bridge over an installed wire table. The core native
    /// classes are registered up front.
    pub fn new(wire: &'static WireTable, config: BridgeConfig) -> Arc<Self> {
        let bridge = Arc::new_cyclic(|this: &Weak<Bridge>| {
            let bindings = Arc::new(BindingTable::new());
            Self {
                wire,
                config,
                classes: ClassDb::new(this.clone(), wire, bindings.clone()),
                bindings,
                this: this.clone(),
            }
        });
        for name in CORE_NATIVE_CLASSES {
            bridge.classes.register_native_class(name);
        }
        log::debug!("bridge created, token {:p}", bridge.token());
        bridge
    }

    #[inline]
    pub fn wire(&self) -> &'static WireTable {
        self.wire
    }

    #[inline]
    pub fn host(&self) -> &'static dyn HostApi {
        self.wire.host()
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[inline]
    pub fn classes(&self) -> &ClassDb {
        &self.classes
    }

    #[inline]
    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Key under which this bridge's instance bindings are stored on host
    /// objects. It is the bridge's own address.
    #[inline]
    pub fn token(&self) -> *mut c_void {
        self as *const Bridge as *mut c_void
    }

    pub(crate) fn weak(&self) -> Weak<Bridge> {
        self.this.clone()
    }

    /// Register an extension class at `level`.
    pub fn register_class<T: ExtensionClass>(&self, level: InitializationLevel) -> BindResult<()> {
        self.classes.register_class::<T>(level)
    }

    /// Make a host class usable as a parent and as a bindable object class.
    pub fn register_native_class(&self, name: &str) {
        self.classes.register_native_class(name)
    }

    /// Create an instance of a registered class through the host.
    pub fn instantiate(&self, class_name: &str) -> BindResult<ObjectHandle> {
        self.classes.create_instance(self, class_name)
    }

    /// The wrapper of a host object, creating it on first sight.
    pub fn bind(&self, object: ObjectHandle) -> BindResult<Arc<Wrapped>> {
        self.bindings.bind(self, object)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("token", &self.token())
            .field("classes", &self.classes.count())
            .field("instances", &self.bindings.count())
            .finish()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.bindings.clear();
        log::debug!("bridge dropped");
    }
}
