//! Class registry
//!
//! [`ClassDb`] records every extension class the bridge registers with the
//! host, together with its bound methods, properties, signals and
//! constants. Everything the host holds a pointer to (names, method infos,
//! property lists, callback userdata) is boxed and owned by the class's
//! [`ClassInfo`] until the class is torn down.
//!
//! Registration runs during initialization; dispatch only reads.

use crate::binding::{BindingTable, EXTENSION_BINDING_CALLBACKS, INSTANCE_BINDING_CALLBACKS};
use crate::config::InitializationLevel;
use crate::error::{BindResult, BindingError};
use crate::ffi;
use crate::handle::{GString, StringName};
use crate::instance::{construct_erased, notify_erased, ConstructFn, ExtensionClass, NotifyFn, Wrapped};
use crate::method::{MethodBind, MethodFlags, MethodInfoStorage, NativeMethod, PropertyInfoStorage};
use crate::types::ObjectHandle;
use crate::variant::Variant;
use crate::wire::WireTable;
use crate::Bridge;
use dashmap::DashMap;
use hostbind_sys::{self as sys, VariantType};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ffi::c_void;
use std::sync::{Arc, Weak};

/// Prefix that marks a declared method name as virtual
pub const VIRTUAL_PREFIX: &str = "V_";

/// Hook that may adjust a property descriptor before the host shows it
pub type ValidatePropertyHook = fn(&mut sys::GDExtensionPropertyInfo) -> bool;

/// One argument of a signal
#[derive(Debug, Clone, Copy)]
pub struct SignalParam<'a> {
    pub variant_type: VariantType,
    pub name: &'a str,
}

impl<'a> SignalParam<'a> {
    pub fn new(variant_type: VariantType, name: &'a str) -> Self {
        Self { variant_type, name }
    }
}

// ============================================================================
// Userdata
// ============================================================================

/// What the host hands back as `method_userdata` and virtual call data
pub(crate) struct CallTarget {
    pub(crate) bridge: Weak<Bridge>,
    pub(crate) bind: Arc<MethodBind>,
}

/// What the host hands back as `class_userdata`
pub(crate) struct ClassUserdata {
    pub(crate) bridge: Weak<Bridge>,
    pub(crate) class_name: String,
}

struct MethodEntry {
    bind: Arc<MethodBind>,
    target: Box<CallTarget>,
    /// Host registration; virtual methods are not registered
    _info: Option<MethodInfoStorage>,
}

impl MethodEntry {
    fn target_ptr(&self) -> *mut c_void {
        &*self.target as *const CallTarget as *mut c_void
    }
}

// ============================================================================
// Class Info
// ============================================================================

/// Everything registered for one class
pub struct ClassInfo {
    name: String,
    parent_name: String,
    /// Nearest native ancestor, constructed on instantiation
    native_base: String,
    level: InitializationLevel,
    name_sn: Box<StringName>,
    _parent_sn: Box<StringName>,
    methods: FxHashMap<String, MethodEntry>,
    virtual_methods: FxHashMap<String, MethodEntry>,
    property_names: FxHashSet<String>,
    signal_names: FxHashSet<String>,
    constant_names: FxHashSet<String>,
    property_list: Vec<PropertyInfoStorage>,
    property_list_sys: Box<[sys::GDExtensionPropertyInfo]>,
    validate_property: Option<ValidatePropertyHook>,
    constructor: ConstructFn,
    notify: NotifyFn,
    _userdata: Box<ClassUserdata>,
    _creation_info: Box<sys::GDExtensionClassCreationInfo3>,
}

// Raw pointers in the creation info and property list point into storage
// owned by this record.
unsafe impl Send for ClassInfo {}
unsafe impl Sync for ClassInfo {}

impl ClassInfo {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent_name(&self) -> &str {
        &self.parent_name
    }

    #[inline]
    pub fn level(&self) -> InitializationLevel {
        self.level
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn has_virtual_method(&self, name: &str) -> bool {
        self.virtual_methods.contains_key(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property_names.contains(name)
    }

    pub fn has_signal(&self, name: &str) -> bool {
        self.signal_names.contains(name)
    }

    pub fn has_constant(&self, name: &str) -> bool {
        self.constant_names.contains(name)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Property descriptors in binding order
    pub fn properties(&self) -> &[PropertyInfoStorage] {
        &self.property_list
    }

    fn rebuild_property_list(&mut self) {
        self.property_list_sys = self.property_list.iter().map(PropertyInfoStorage::as_sys).collect();
    }
}

impl std::fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("parent_name", &self.parent_name)
            .field("level", &self.level)
            .field("methods", &self.methods.len())
            .field("virtual_methods", &self.virtual_methods.len())
            .field("properties", &self.property_list.len())
            .finish()
    }
}

// ============================================================================
// Class Database
// ============================================================================

/// Registry of extension classes
pub struct ClassDb {
    bridge: Weak<Bridge>,
    wire: &'static WireTable,
    bindings: Arc<BindingTable>,
    classes: DashMap<String, ClassInfo>,
    /// Registration order, for teardown
    order: RwLock<Vec<String>>,
    /// Native classes that can be constructed as a base
    native_classes: DashMap<String, Box<StringName>>,
}

impl ClassDb {
    pub fn new(bridge: Weak<Bridge>, wire: &'static WireTable, bindings: Arc<BindingTable>) -> Self {
        Self {
            bridge,
            wire,
            bindings,
            classes: DashMap::new(),
            order: RwLock::new(Vec::new()),
            native_classes: DashMap::new(),
        }
    }

    /// Make a host class usable as a parent and bindable as a foreign
    /// object.
    pub fn register_native_class(&self, name: &str) {
        if self.native_classes.contains_key(name) {
            return;
        }
        self.native_classes
            .insert(name.to_string(), Box::new(StringName::new(self.wire, name)));
        self.bindings.register_callbacks(name, &INSTANCE_BINDING_CALLBACKS);
        log::debug!("registered native class {}", name);
    }

    pub fn is_native_class(&self, name: &str) -> bool {
        self.native_classes.contains_key(name)
    }

    /// Register `T` with the host, then let it bind its members.
    pub fn register_class<T: ExtensionClass>(&self, level: InitializationLevel) -> BindResult<()> {
        let name = T::CLASS_NAME;
        let parent = T::PARENT_CLASS_NAME;

        if name == parent {
            return Err(BindingError::SelfParent(name.to_string()));
        }
        let native_base = if self.native_classes.contains_key(parent) {
            parent.to_string()
        } else if let Some(info) = self.classes.get(parent) {
            info.native_base.clone()
        } else {
            return Err(BindingError::MissingParent {
                class: name.to_string(),
                parent: parent.to_string(),
            });
        };
        if self.classes.contains_key(name) {
            return Err(BindingError::DuplicateClass(name.to_string()));
        }

        let name_sn = Box::new(StringName::new(self.wire, name));
        let parent_sn = Box::new(StringName::new(self.wire, parent));
        let userdata = Box::new(ClassUserdata {
            bridge: self.bridge.clone(),
            class_name: name.to_string(),
        });
        let creation_info = Box::new(creation_info(&*userdata as *const ClassUserdata as *mut c_void));

        unsafe {
            self.wire.host().classdb_register_extension_class(
                name_sn.as_ptr(),
                parent_sn.as_ptr(),
                &*creation_info,
            );
        }

        let info = ClassInfo {
            name: name.to_string(),
            parent_name: parent.to_string(),
            native_base,
            level,
            name_sn,
            _parent_sn: parent_sn,
            methods: FxHashMap::default(),
            virtual_methods: FxHashMap::default(),
            property_names: FxHashSet::default(),
            signal_names: FxHashSet::default(),
            constant_names: FxHashSet::default(),
            property_list: Vec::new(),
            property_list_sys: Box::new([]),
            validate_property: None,
            constructor: construct_erased::<T>,
            notify: notify_erased::<T>,
            _userdata: userdata,
            _creation_info: creation_info,
        };
        self.classes.insert(name.to_string(), info);
        self.order.write().push(name.to_string());
        self.bindings.register_callbacks(name, &EXTENSION_BINDING_CALLBACKS);
        log::info!("registered class {} extends {} at {:?}", name, parent, level);

        T::bind_methods(self)
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Bind a regular method with default flags.
    pub fn bind_method<C, F, M>(
        &self,
        class_name: &str,
        declared_name: &str,
        exposed_name: &str,
        method: F,
        arg_names: &[&str],
        default_arguments: Vec<Variant>,
    ) -> BindResult<Arc<MethodBind>>
    where
        C: ExtensionClass,
        F: NativeMethod<C, M>,
        M: 'static,
    {
        self.bind_method_with_flags(
            class_name,
            declared_name,
            exposed_name,
            method,
            arg_names,
            default_arguments,
            MethodFlags::DEFAULT,
        )
    }

    /// Bind a method taking `VarArgs`.
    pub fn bind_method_varargs<C, F, M>(
        &self,
        class_name: &str,
        declared_name: &str,
        exposed_name: &str,
        method: F,
    ) -> BindResult<Arc<MethodBind>>
    where
        C: ExtensionClass,
        F: NativeMethod<C, M>,
        M: 'static,
    {
        self.bind_method_with_flags(
            class_name,
            declared_name,
            exposed_name,
            method,
            &[],
            Vec::new(),
            MethodFlags::DEFAULT | MethodFlags::VARARG,
        )
    }

    /// Bind a regular method and register it with the host.
    #[allow(clippy::too_many_arguments)]
    pub fn bind_method_with_flags<C, F, M>(
        &self,
        class_name: &str,
        declared_name: &str,
        exposed_name: &str,
        method: F,
        arg_names: &[&str],
        default_arguments: Vec<Variant>,
        flags: MethodFlags,
    ) -> BindResult<Arc<MethodBind>>
    where
        C: ExtensionClass,
        F: NativeMethod<C, M>,
        M: 'static,
    {
        if flags.contains(MethodFlags::VIRTUAL) {
            // The host never fills in arguments of a virtual call
            if !default_arguments.is_empty() {
                return Err(BindingError::VirtualDefaults {
                    class: class_name.to_string(),
                    method: declared_name.to_string(),
                    defaults: default_arguments.len(),
                });
            }
            return self.bind_virtual_method(class_name, declared_name, exposed_name, method, arg_names);
        }
        self.ensure_class(class_name)?;
        if declared_name.starts_with(VIRTUAL_PREFIX) {
            return Err(BindingError::UnexpectedVirtualPrefix {
                class: class_name.to_string(),
                method: declared_name.to_string(),
            });
        }
        let bind = Arc::new(MethodBind::new(
            class_name,
            declared_name,
            exposed_name,
            method,
            arg_names,
            default_arguments,
            flags,
        )?);
        self.insert_method(class_name, bind, false)
    }

    /// Bind an implementation of a virtual method. The host asks for it by
    /// `exposed_name` when it looks the class up.
    pub fn bind_virtual_method<C, F, M>(
        &self,
        class_name: &str,
        declared_name: &str,
        exposed_name: &str,
        method: F,
        arg_names: &[&str],
    ) -> BindResult<Arc<MethodBind>>
    where
        C: ExtensionClass,
        F: NativeMethod<C, M>,
        M: 'static,
    {
        self.ensure_class(class_name)?;
        if !declared_name.starts_with(VIRTUAL_PREFIX) {
            return Err(BindingError::VirtualPrefixMissing {
                class: class_name.to_string(),
                method: declared_name.to_string(),
            });
        }
        let mut flags = MethodFlags::DEFAULT | MethodFlags::VIRTUAL;
        if F::IS_VARIADIC {
            flags = flags | MethodFlags::VARARG;
        }
        let bind = Arc::new(MethodBind::new(
            class_name,
            declared_name,
            exposed_name,
            method,
            arg_names,
            Vec::new(),
            flags,
        )?);
        self.insert_method(class_name, bind, true)
    }

    fn insert_method(&self, class_name: &str, bind: Arc<MethodBind>, is_virtual: bool) -> BindResult<Arc<MethodBind>> {
        let exposed = bind.metadata().exposed_name.clone();
        let class_sn = {
            let class = self.class(class_name)?;
            let (same, other, other_kind) = if is_virtual {
                (&class.virtual_methods, &class.methods, "regular")
            } else {
                (&class.methods, &class.virtual_methods, "virtual")
            };
            if same.contains_key(&exposed) {
                return Err(BindingError::DuplicateMethod {
                    class: class_name.to_string(),
                    method: exposed,
                });
            }
            if other.contains_key(&exposed) {
                return Err(BindingError::MethodAlreadyVirtual {
                    class: class_name.to_string(),
                    method: exposed,
                    existing: other_kind,
                });
            }
            class.name_sn.as_ptr()
        };

        let target = Box::new(CallTarget {
            bridge: self.bridge.clone(),
            bind: bind.clone(),
        });
        let mut entry = MethodEntry {
            bind: bind.clone(),
            target,
            _info: None,
        };

        // No registry guard is held while the host runs
        if !is_virtual {
            let info = MethodInfoStorage::new(self.wire, bind.clone(), entry.target_ptr());
            unsafe {
                self.wire
                    .host()
                    .classdb_register_extension_class_method(class_sn, info.as_sys());
            }
            entry._info = Some(info);
        }

        let mut class = self.class_mut(class_name)?;
        if is_virtual {
            log::debug!("bound virtual {}", bind.metadata());
            class.virtual_methods.insert(exposed, entry);
        } else {
            log::debug!("bound {}", bind.metadata());
            class.methods.insert(exposed, entry);
        }
        Ok(bind)
    }

    /// A regular method of `class_name` or one of its registered ancestors
    pub fn method(&self, class_name: &str, name: &str) -> Option<Arc<MethodBind>> {
        self.find_in_chain(class_name, |class| class.methods.get(name).map(|e| e.bind.clone()))
    }

    /// Virtual implementation for `name` bound on `class_name` itself.
    /// `None` lets the host fall back.
    ///
    /// Ancestors are not consulted: an ancestor's bind expects the
    /// ancestor's state, which a subclass instance does not carry.
    pub fn virtual_method(&self, class_name: &str, name: &str) -> Option<Arc<MethodBind>> {
        let class = self.classes.get(class_name)?;
        class.virtual_methods.get(name).map(|e| e.bind.clone())
    }

    /// Call data for the host's virtual lookup; null when `class_name`
    /// does not bind `name` itself.
    pub(crate) fn virtual_call_data(&self, class_name: &str, name: &str) -> *mut c_void {
        self.classes
            .get(class_name)
            .and_then(|class| class.virtual_methods.get(name).map(|e| e.target_ptr()))
            .unwrap_or(std::ptr::null_mut())
    }

    fn find_in_chain<R>(&self, class_name: &str, mut find: impl FnMut(&ClassInfo) -> Option<R>) -> Option<R> {
        let mut current = class_name.to_string();
        // Each step moves to a class registered earlier, so the walk ends.
        loop {
            let class = self.classes.get(&current)?;
            if let Some(found) = find(&class) {
                return Some(found);
            }
            current = class.parent_name.clone();
        }
    }

    // ========================================================================
    // Properties, Signals, Constants
    // ========================================================================

    /// Expose a property backed by bound getter and setter methods. An
    /// empty `setter` makes the property read-only.
    pub fn bind_property(
        &self,
        class_name: &str,
        variant_type: VariantType,
        name: &str,
        setter: &str,
        getter: &str,
    ) -> BindResult<()> {
        let class = self.class(class_name)?;

        if class.property_names.contains(name) {
            return Err(BindingError::DuplicateProperty {
                class: class_name.to_string(),
                property: name.to_string(),
            });
        }
        let getter_bind = class.methods.get(getter).map(|e| e.bind.clone());
        match getter_bind {
            None => {
                return Err(BindingError::GetterMissing {
                    class: class_name.to_string(),
                    property: name.to_string(),
                    getter: getter.to_string(),
                })
            }
            Some(bind) if bind.metadata().param_count() != 0 => {
                return Err(BindingError::GetterInvalid {
                    class: class_name.to_string(),
                    property: name.to_string(),
                    getter: getter.to_string(),
                    arity: bind.metadata().param_count(),
                })
            }
            Some(_) => {}
        }
        if !setter.is_empty() {
            let valid = class
                .methods
                .get(setter)
                .map_or(false, |e| e.bind.metadata().param_count() == 1);
            if !valid {
                return Err(BindingError::SetterInvalid {
                    class: class_name.to_string(),
                    property: name.to_string(),
                    setter: setter.to_string(),
                });
            }
        }

        let class_sn = class.name_sn.as_ptr();
        drop(class);

        let info = PropertyInfoStorage::new(self.wire, variant_type, name, "");
        let setter_sn = StringName::new(self.wire, setter);
        let getter_sn = StringName::new(self.wire, getter);
        unsafe {
            self.wire.host().classdb_register_extension_class_property(
                class_sn,
                &info.as_sys(),
                setter_sn.as_ptr(),
                getter_sn.as_ptr(),
            );
        }

        let mut class = self.class_mut(class_name)?;
        class.property_names.insert(name.to_string());
        class.property_list.push(info);
        class.rebuild_property_list();
        log::debug!("bound property {}.{}", class_name, name);
        Ok(())
    }

    /// Start a property group in the editor
    pub fn add_property_group(&self, class_name: &str, group: &str, prefix: &str) -> BindResult<()> {
        let class_sn = self.class_sn(class_name)?;
        let group = GString::from_str(self.wire, group);
        let prefix = GString::from_str(self.wire, prefix);
        unsafe {
            self.wire.host().classdb_register_extension_class_property_group(
                class_sn,
                group.as_ptr(),
                prefix.as_ptr(),
            );
        }
        Ok(())
    }

    /// Start a property subgroup in the editor
    pub fn add_property_subgroup(&self, class_name: &str, subgroup: &str, prefix: &str) -> BindResult<()> {
        let class_sn = self.class_sn(class_name)?;
        let subgroup = GString::from_str(self.wire, subgroup);
        let prefix = GString::from_str(self.wire, prefix);
        unsafe {
            self.wire.host().classdb_register_extension_class_property_subgroup(
                class_sn,
                subgroup.as_ptr(),
                prefix.as_ptr(),
            );
        }
        Ok(())
    }

    pub fn bind_signal(&self, class_name: &str, name: &str, params: &[SignalParam<'_>]) -> BindResult<()> {
        let class_sn = {
            let class = self.class(class_name)?;
            if class.signal_names.contains(name) {
                return Err(BindingError::DuplicateSignal {
                    class: class_name.to_string(),
                    signal: name.to_string(),
                });
            }
            class.name_sn.as_ptr()
        };

        let args: Vec<PropertyInfoStorage> = params
            .iter()
            .map(|p| PropertyInfoStorage::new(self.wire, p.variant_type, p.name, ""))
            .collect();
        let args_sys: Vec<sys::GDExtensionPropertyInfo> = args.iter().map(PropertyInfoStorage::as_sys).collect();
        let name_sn = StringName::new(self.wire, name);
        unsafe {
            self.wire.host().classdb_register_extension_class_signal(
                class_sn,
                name_sn.as_ptr(),
                if args_sys.is_empty() { std::ptr::null() } else { args_sys.as_ptr() },
                args_sys.len() as i64,
            );
        }

        self.class_mut(class_name)?.signal_names.insert(name.to_string());
        log::debug!("bound signal {}.{}", class_name, name);
        Ok(())
    }

    /// Class-level integer constant
    pub fn bind_integer_constant(&self, class_name: &str, name: &str, value: i64) -> BindResult<()> {
        self.add_constant(class_name, "", name, value, false)
    }

    /// Constant belonging to enum `enum_name`
    pub fn bind_enum_constant(&self, class_name: &str, enum_name: &str, name: &str, value: i64) -> BindResult<()> {
        self.add_constant(class_name, enum_name, name, value, false)
    }

    /// Flag belonging to bitfield `enum_name`
    pub fn bind_bitfield_flag(&self, class_name: &str, enum_name: &str, name: &str, value: i64) -> BindResult<()> {
        self.add_constant(class_name, enum_name, name, value, true)
    }

    fn add_constant(
        &self,
        class_name: &str,
        enum_name: &str,
        name: &str,
        value: i64,
        is_bitfield: bool,
    ) -> BindResult<()> {
        let class_sn = {
            let class = self.class(class_name)?;
            if class.constant_names.contains(name) {
                return Err(BindingError::DuplicateConstant {
                    class: class_name.to_string(),
                    constant: name.to_string(),
                });
            }
            class.name_sn.as_ptr()
        };
        let enum_sn = StringName::new(self.wire, enum_name);
        let name_sn = StringName::new(self.wire, name);
        unsafe {
            self.wire.host().classdb_register_extension_class_integer_constant(
                class_sn,
                enum_sn.as_ptr(),
                name_sn.as_ptr(),
                value,
                is_bitfield,
            );
        }
        self.class_mut(class_name)?.constant_names.insert(name.to_string());
        Ok(())
    }

    /// Install the property validation hook of a class
    pub fn set_validate_property(&self, class_name: &str, hook: ValidatePropertyHook) -> BindResult<()> {
        self.class_mut(class_name)?.validate_property = Some(hook);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Get the number of registered classes
    pub fn count(&self) -> usize {
        self.classes.len()
    }

    /// Registered class names in registration order
    pub fn class_names(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Run `f` on the record of `class_name`
    pub fn with_class<R>(&self, class_name: &str, f: impl FnOnce(&ClassInfo) -> R) -> Option<R> {
        self.classes.get(class_name).map(|class| f(&class))
    }

    fn class(&self, class_name: &str) -> BindResult<dashmap::mapref::one::Ref<'_, String, ClassInfo>> {
        self.classes
            .get(class_name)
            .ok_or_else(|| BindingError::UnknownClass(class_name.to_string()))
    }

    /// Host name of a registered class. It is boxed in the class record,
    /// so the pointer outlives the shard guard until the class is
    /// destroyed.
    fn class_sn(&self, class_name: &str) -> BindResult<sys::GDExtensionConstStringNamePtr> {
        Ok(self.class(class_name)?.name_sn.as_ptr())
    }

    fn class_mut(&self, class_name: &str) -> BindResult<dashmap::mapref::one::RefMut<'_, String, ClassInfo>> {
        self.classes
            .get_mut(class_name)
            .ok_or_else(|| BindingError::UnknownClass(class_name.to_string()))
    }

    fn ensure_class(&self, class_name: &str) -> BindResult<()> {
        if self.classes.contains_key(class_name) {
            Ok(())
        } else {
            Err(BindingError::UnknownClass(class_name.to_string()))
        }
    }

    pub(crate) fn notifier(&self, class_name: &str) -> Option<NotifyFn> {
        self.classes.get(class_name).map(|class| class.notify)
    }

    pub(crate) fn validate_hook(&self, class_name: &str) -> Option<ValidatePropertyHook> {
        self.classes.get(class_name).and_then(|class| class.validate_property)
    }

    /// The pinned property list of a class and its length
    pub(crate) fn property_list(&self, class_name: &str) -> (*const sys::GDExtensionPropertyInfo, u32) {
        match self.classes.get(class_name) {
            Some(class) if !class.property_list_sys.is_empty() => {
                (class.property_list_sys.as_ptr(), class.property_list_sys.len() as u32)
            }
            _ => (std::ptr::null(), 0),
        }
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Create a host object of `class_name` with fresh Rust state attached.
    pub fn create_instance(&self, bridge: &Bridge, class_name: &str) -> BindResult<ObjectHandle> {
        let (constructor, class_sn, base_sn) = {
            let class = self.class(class_name)?;
            let base = self
                .native_classes
                .get(&class.native_base)
                .ok_or_else(|| BindingError::ConstructFailed(class_name.to_string()))?;
            (class.constructor, class.name_sn.as_ptr(), base.as_ptr())
        };

        let host = self.wire.host();
        let object = unsafe { host.classdb_construct_object(base_sn) };
        if object.is_null() {
            return Err(BindingError::ConstructFailed(class_name.to_string()));
        }
        let owner = ObjectHandle::from_sys(object);
        let instance_id = unsafe { host.object_get_instance_id(object) };

        let wrapped = Wrapped::create(
            bridge.weak(),
            class_name,
            owner,
            instance_id,
            Some(constructor(owner)),
        );
        let handle = self.bindings.insert(wrapped);

        unsafe {
            host.object_set_instance(object, class_sn, handle.as_sys());
            host.object_set_instance_binding(
                object,
                bridge.token(),
                handle.as_sys(),
                &EXTENSION_BINDING_CALLBACKS,
            );
        }
        log::trace!("created {} instance {}", class_name, handle);
        Ok(owner)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Called when the host reaches `level`. Returns the number of classes
    /// registered at that level.
    pub fn initialize(&self, level: InitializationLevel) -> usize {
        let count = self.classes.iter().filter(|class| class.level == level).count();
        log::info!("initialized {} classes at {:?}", count, level);
        count
    }

    /// Unregister every class of `level`, children before parents. Returns
    /// the number of classes removed.
    pub fn deinitialize(&self, level: InitializationLevel) -> usize {
        let names: Vec<String> = self
            .order
            .read()
            .iter()
            .rev()
            .filter(|name| self.with_class(name, |class| class.level == level).unwrap_or(false))
            .cloned()
            .collect();
        let removed = names.iter().filter(|name| self.destroy_class(name)).count();
        log::info!("deinitialized {} classes at {:?}", removed, level);
        removed
    }

    /// Unregister one class. `false` when it was not registered.
    pub fn destroy_class(&self, class_name: &str) -> bool {
        let Some((_, class)) = self.classes.remove(class_name) else {
            return false;
        };
        unsafe {
            self.wire
                .host()
                .classdb_unregister_extension_class(class.name_sn.as_ptr());
        }
        self.order.write().retain(|name| name != class_name);
        self.bindings.remove_callbacks(class_name);
        log::info!("unregistered class {}", class_name);
        drop(class);
        true
    }
}

fn creation_info(userdata: *mut c_void) -> sys::GDExtensionClassCreationInfo3 {
    sys::GDExtensionClassCreationInfo3 {
        is_virtual: sys::GDEXTENSION_FALSE,
        is_abstract: sys::GDEXTENSION_FALSE,
        is_exposed: sys::GDEXTENSION_TRUE,
        is_runtime: sys::GDEXTENSION_FALSE,
        set_func: Some(ffi::instance_set),
        get_func: Some(ffi::instance_get),
        get_property_list_func: Some(ffi::instance_get_property_list),
        free_property_list_func: Some(ffi::instance_free_property_list),
        property_can_revert_func: Some(ffi::instance_property_can_revert),
        property_get_revert_func: Some(ffi::instance_property_get_revert),
        validate_property_func: Some(ffi::instance_validate_property),
        notification_func: Some(ffi::instance_notification),
        to_string_func: Some(ffi::instance_to_string),
        reference_func: Some(ffi::instance_reference),
        unreference_func: Some(ffi::instance_unreference),
        create_instance_func: Some(ffi::create_instance),
        free_instance_func: Some(ffi::free_instance),
        recreate_instance_func: None,
        get_virtual_func: None,
        get_virtual_call_data_func: Some(ffi::get_virtual_call_data),
        call_virtual_with_data_func: Some(ffi::call_virtual_with_data),
        get_rid_func: Some(ffi::instance_get_rid),
        class_userdata: userdata,
    }
}
