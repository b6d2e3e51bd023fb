//! In-process host for tests
//!
//! [`MockHost`] implements [`HostApi`] without an engine behind it. It keeps
//! just enough state to drive the bridge end to end: variants, strings,
//! objects with their instance bindings, and the class database the bridge
//! registers into. The driving helpers (`call`, `ptrcall`, `get`, `set`,
//! `notify`, ...) invoke the registered C callbacks the way the host would.
//!
//! Variant layout: a `u32` tag at offset 0 and a 16-byte payload at offset
//! 8. Text types (`String`, `StringName`, `NodePath`) are a pointer to a
//! heap `String`, null meaning empty. Values wider than the payload are
//! boxed.
//!
//! The host is process-wide, like a real one. Tests running in parallel
//! share it, so each test should use its own class names.

use crate::host::{HostApi, HostVersion};
use crate::types::ObjectHandle;
use crate::variant::Variant;
use crate::wire::{self, WireTable};
use crate::CORE_NATIVE_CLASSES;
use hostbind_sys::{self as sys, VariantType, VARIANT_TYPE_COUNT};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::ptr;

static HOST: Lazy<MockHost> = Lazy::new(MockHost::new);

/// The process mock host and the wire table built over it.
pub fn install() -> (&'static MockHost, &'static WireTable) {
    let host: &'static MockHost = &HOST;
    (host, wire::get_or_install(|| host as &'static dyn HostApi))
}

// ============================================================================
// Raw Value Layout
// ============================================================================

const PAYLOAD_OFFSET: usize = 8;
const PAYLOAD_SIZE: usize = 16;

fn is_text(tag: u32) -> bool {
    matches!(
        VariantType::from_sys(tag),
        Some(VariantType::String | VariantType::StringName | VariantType::NodePath)
    )
}

fn raw_size(tag: u32) -> usize {
    VariantType::from_sys(tag).map_or(0, VariantType::type_ptr_size)
}

fn is_boxed(tag: u32) -> bool {
    !is_text(tag) && raw_size(tag) > PAYLOAD_SIZE
}

unsafe fn text_new(slot: *mut c_void, text: String) {
    ptr::write_unaligned(slot as *mut *mut String, Box::into_raw(Box::new(text)));
}

unsafe fn text_ref<'a>(slot: *const c_void) -> &'a str {
    if slot.is_null() {
        return "";
    }
    match ptr::read_unaligned(slot as *const *const String).as_ref() {
        Some(text) => text.as_str(),
        None => "",
    }
}

unsafe fn text_free(slot: *mut c_void) {
    let text = ptr::read_unaligned(slot as *const *mut String);
    if !text.is_null() {
        drop(Box::from_raw(text));
    }
    ptr::write_unaligned(slot as *mut *mut String, ptr::null_mut());
}

/// Default-construct a raw value of type `tag`
unsafe fn default_raw(tag: u32, dst: *mut c_void) {
    if is_text(tag) {
        text_new(dst, String::new());
    } else {
        ptr::write_bytes(dst as *mut u8, 0, raw_size(tag));
    }
}

/// Copy-construct a raw value of type `tag`
unsafe fn copy_raw(tag: u32, dst: *mut c_void, src: *const c_void) {
    if is_text(tag) {
        text_new(dst, text_ref(src).to_owned());
    } else {
        ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, raw_size(tag));
    }
}

unsafe fn tag_of(variant: *const c_void) -> u32 {
    ptr::read_unaligned(variant as *const u32)
}

unsafe fn payload(variant: *const c_void) -> *mut c_void {
    (variant as *mut u8).add(PAYLOAD_OFFSET) as *mut c_void
}

/// Where the raw value of a variant lives
unsafe fn raw_of(variant: *const c_void) -> *const c_void {
    let payload = payload(variant);
    if is_boxed(tag_of(variant)) {
        ptr::read_unaligned(payload as *const *const c_void)
    } else {
        payload
    }
}

/// Box the raw value at `src` into the variant storage at `dst`
unsafe fn write_variant(dst: *mut c_void, tag: u32, src: *const c_void) {
    ptr::write_bytes(dst as *mut u8, 0, sys::VARIANT_SIZE);
    ptr::write_unaligned(dst as *mut u32, tag);
    let payload = payload(dst);
    if is_boxed(tag) {
        let bytes = std::slice::from_raw_parts(src as *const u8, raw_size(tag));
        let boxed = Box::into_raw(bytes.to_vec().into_boxed_slice()) as *mut u8;
        ptr::write_unaligned(payload as *mut *mut u8, boxed);
    } else {
        copy_raw(tag, payload, src);
    }
}

unsafe fn clear_variant(variant: *mut c_void) {
    let tag = tag_of(variant);
    let payload = payload(variant);
    if is_text(tag) {
        text_free(payload);
    } else if is_boxed(tag) {
        let boxed = ptr::read_unaligned(payload as *const *mut u8);
        if !boxed.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(boxed, raw_size(tag))));
        }
    }
    ptr::write_bytes(variant as *mut u8, 0, sys::VARIANT_SIZE);
}

unsafe fn copy_variant(dst: *mut c_void, src: *const c_void) {
    match tag_of(src) {
        0 => ptr::write_bytes(dst as *mut u8, 0, sys::VARIANT_SIZE),
        tag => write_variant(dst, tag, raw_of(src)),
    }
}

/// A string name owned by the mock, for calling back into the bridge
struct OwnedText(*mut String);

impl OwnedText {
    fn new(text: &str) -> Self {
        Self(Box::into_raw(Box::new(text.to_owned())))
    }

    fn empty() -> Self {
        Self(ptr::null_mut())
    }

    fn as_ptr(&self) -> *const c_void {
        &self.0 as *const *mut String as *const c_void
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        &mut self.0 as *mut *mut String as *mut c_void
    }

    fn text(&self) -> String {
        unsafe { text_ref(self.as_ptr()).to_owned() }
    }
}

impl Drop for OwnedText {
    fn drop(&mut self) {
        unsafe { text_free(self.as_mut_ptr()) };
    }
}

// ============================================================================
// Per-Type Constructors
// ============================================================================

macro_rules! per_tag {
    ($f:ident) => {
        [
            $f::<0>, $f::<1>, $f::<2>, $f::<3>, $f::<4>, $f::<5>, $f::<6>, $f::<7>,
            $f::<8>, $f::<9>, $f::<10>, $f::<11>, $f::<12>, $f::<13>, $f::<14>, $f::<15>,
            $f::<16>, $f::<17>, $f::<18>, $f::<19>, $f::<20>, $f::<21>, $f::<22>, $f::<23>,
            $f::<24>, $f::<25>, $f::<26>, $f::<27>, $f::<28>, $f::<29>, $f::<30>, $f::<31>,
            $f::<32>, $f::<33>, $f::<34>, $f::<35>, $f::<36>, $f::<37>,
        ]
    };
}

type FromTypeFn = unsafe extern "C" fn(sys::GDExtensionUninitializedVariantPtr, sys::GDExtensionTypePtr);
type ToTypeFn = unsafe extern "C" fn(sys::GDExtensionUninitializedTypePtr, sys::GDExtensionVariantPtr);
type PtrConstructorFn =
    unsafe extern "C" fn(sys::GDExtensionUninitializedTypePtr, *const sys::GDExtensionConstTypePtr);

const FROM_TYPE: [FromTypeFn; VARIANT_TYPE_COUNT] = per_tag!(from_type);
const TO_TYPE: [ToTypeFn; VARIANT_TYPE_COUNT] = per_tag!(to_type);
const DEFAULT_CONSTRUCTOR: [PtrConstructorFn; VARIANT_TYPE_COUNT] = per_tag!(construct_default);
const COPY_CONSTRUCTOR: [PtrConstructorFn; VARIANT_TYPE_COUNT] = per_tag!(construct_copy);

unsafe extern "C" fn from_type<const TAG: u32>(
    dst: sys::GDExtensionUninitializedVariantPtr,
    src: sys::GDExtensionTypePtr,
) {
    write_variant(dst, TAG, src);
}

/// A variant of another type unboxes to the default value.
unsafe extern "C" fn to_type<const TAG: u32>(
    dst: sys::GDExtensionUninitializedTypePtr,
    src: sys::GDExtensionVariantPtr,
) {
    if tag_of(src) == TAG {
        copy_raw(TAG, dst, raw_of(src));
    } else {
        default_raw(TAG, dst);
    }
}

unsafe extern "C" fn construct_default<const TAG: u32>(
    dst: sys::GDExtensionUninitializedTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
) {
    default_raw(TAG, dst);
}

/// Also serves `String(StringName)` and `StringName(String)`, which share
/// a representation here.
unsafe extern "C" fn construct_copy<const TAG: u32>(
    dst: sys::GDExtensionUninitializedTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
) {
    copy_raw(TAG, dst, *args);
}

unsafe extern "C" fn destroy_text(value: sys::GDExtensionTypePtr) {
    text_free(value);
}

// ============================================================================
// Recorded State
// ============================================================================

/// A method as the host recorded it
#[derive(Debug, Clone)]
pub struct MockMethod {
    pub name: String,
    pub userdata: usize,
    pub call_func: sys::GDExtensionClassMethodCall,
    pub ptrcall_func: sys::GDExtensionClassMethodPtrCall,
    pub flags: u32,
    pub return_type: Option<u32>,
    /// Name and type tag of each argument
    pub arguments: Vec<(String, u32)>,
    pub argument_metadata: Vec<u32>,
    pub default_argument_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockProperty {
    pub name: String,
    pub variant_type: u32,
    pub hint: u32,
    pub hint_string: String,
    pub usage: u32,
    pub setter: String,
    pub getter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSignal {
    pub name: String,
    pub arguments: Vec<(String, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConstant {
    pub enum_name: String,
    pub name: String,
    pub value: i64,
    pub is_bitfield: bool,
}

struct MockClass {
    parent: String,
    info: sys::GDExtensionClassCreationInfo3,
    methods: FxHashMap<String, MockMethod>,
    properties: Vec<MockProperty>,
    groups: Vec<(String, String)>,
    subgroups: Vec<(String, String)>,
    signals: Vec<MockSignal>,
    constants: Vec<MockConstant>,
}

struct MockBinding {
    token: usize,
    binding: usize,
    callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
}

struct MockObject {
    id: u64,
    class: String,
    instance: usize,
    bindings: Vec<MockBinding>,
}

struct MockState {
    next_id: u64,
    natives: FxHashSet<String>,
    classes: FxHashMap<String, MockClass>,
    objects: FxHashMap<usize, MockObject>,
    unregistered: Vec<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

// Raw pointers in the state are only dereferenced by the callbacks they
// came with, outside the lock.
unsafe impl Send for MockState {}

impl MockState {
    fn knows_class(&self, name: &str) -> bool {
        self.natives.contains(name) || self.classes.contains_key(name)
    }

    fn find_method(&self, class: &str, method: &str) -> Option<MockMethod> {
        let mut current = self.classes.get(class);
        while let Some(class) = current {
            if let Some(found) = class.methods.get(method) {
                return Some(found.clone());
            }
            current = self.classes.get(&class.parent);
        }
        None
    }

    /// Creation info of the class behind `object`, with its instance
    fn instance_info(&self, object: ObjectHandle) -> Option<(sys::GDExtensionClassCreationInfo3, *mut c_void)> {
        let object = self.objects.get(&(object.as_sys() as usize))?;
        let class = self.classes.get(&object.class)?;
        Some((class.info, object.instance as *mut c_void))
    }

    fn class_mut(&mut self, name: &str) -> Option<&mut MockClass> {
        if !self.classes.contains_key(name) {
            self.errors.push(format!("class {} is not registered", name));
        }
        self.classes.get_mut(name)
    }
}

unsafe fn ptrcall_method(
    method: &MockMethod,
    instance: sys::GDExtensionClassInstancePtr,
    args: &[sys::GDExtensionConstTypePtr],
    ret: sys::GDExtensionTypePtr,
) -> bool {
    match method.ptrcall_func {
        Some(ptrcall) => {
            ptrcall(method.userdata as *mut c_void, instance, args.as_ptr(), ret);
            true
        }
        None => false,
    }
}

// ============================================================================
// Mock Host
// ============================================================================

/// Called with the class and member name of every member registration
type MemberHook = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Host stand-in
pub struct MockHost {
    state: Mutex<MockState>,
    member_hooks: Mutex<Vec<MemberHook>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            member_hooks: Mutex::new(Vec::new()),
            state: Mutex::new(MockState {
                next_id: 1,
                natives: CORE_NATIVE_CLASSES.iter().map(|name| name.to_string()).collect(),
                classes: FxHashMap::default(),
                objects: FxHashMap::default(),
                unregistered: Vec::new(),
                errors: Vec::new(),
                warnings: Vec::new(),
            }),
        }
    }

    /// Let the host construct objects of native class `name`.
    pub fn add_native_class(&self, name: &str) {
        self.state.lock().natives.insert(name.to_string());
    }

    /// Text of the string name at `ptr`
    pub fn string_name_text(&self, ptr: sys::GDExtensionConstStringNamePtr) -> String {
        unsafe { text_ref(ptr).to_owned() }
    }

    /// Text of the string at `ptr`
    pub fn string_text(&self, ptr: sys::GDExtensionConstStringPtr) -> String {
        unsafe { text_ref(ptr).to_owned() }
    }

    /// Run `hook` after each method, property, signal or constant
    /// registration, outside the host lock. Hooks see every class.
    pub fn on_member_registered(&self, hook: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.member_hooks.lock().push(Box::new(hook));
    }

    fn member_registered(&self, class: &str, member: &str) {
        for hook in self.member_hooks.lock().iter() {
            hook(class, member);
        }
    }

    /// Errors reported through `print_error`
    pub fn errors(&self) -> Vec<String> {
        self.state.lock().errors.clone()
    }

    /// Warnings reported through `print_warning`
    pub fn warnings(&self) -> Vec<String> {
        self.state.lock().warnings.clone()
    }

    // ========================================================================
    // Class Database Queries
    // ========================================================================

    /// Classes unregistered so far, in order
    pub fn unregistered(&self) -> Vec<String> {
        self.state.lock().unregistered.clone()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.state.lock().classes.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<String> {
        self.state.lock().classes.get(name).map(|class| class.parent.clone())
    }

    /// A method registered on `class` or one of its registered parents
    pub fn method(&self, class: &str, name: &str) -> Option<MockMethod> {
        self.state.lock().find_method(class, name)
    }

    pub fn method_names(&self, class: &str) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .classes
            .get(class)
            .map(|class| class.methods.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn properties(&self, class: &str) -> Vec<MockProperty> {
        self.with_class(class, |class| class.properties.clone())
    }

    /// `(name, prefix)` of each property group
    pub fn groups(&self, class: &str) -> Vec<(String, String)> {
        self.with_class(class, |class| class.groups.clone())
    }

    /// `(name, prefix)` of each property subgroup
    pub fn subgroups(&self, class: &str) -> Vec<(String, String)> {
        self.with_class(class, |class| class.subgroups.clone())
    }

    pub fn signals(&self, class: &str) -> Vec<MockSignal> {
        self.with_class(class, |class| class.signals.clone())
    }

    pub fn constants(&self, class: &str) -> Vec<MockConstant> {
        self.with_class(class, |class| class.constants.clone())
    }

    fn with_class<R: Default>(&self, name: &str, f: impl FnOnce(&MockClass) -> R) -> R {
        self.state.lock().classes.get(name).map(f).unwrap_or_default()
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Construct an object the way the host's `ClassDB` does
    pub fn construct_object(&self, class: &str) -> ObjectHandle {
        let name = OwnedText::new(class);
        ObjectHandle::from_sys(unsafe { self.classdb_construct_object(name.as_ptr()) })
    }

    pub fn destroy_object(&self, object: ObjectHandle) {
        unsafe { self.object_destroy(object.as_sys()) }
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn class_of(&self, object: ObjectHandle) -> Option<String> {
        let state = self.state.lock();
        state
            .objects
            .get(&(object.as_sys() as usize))
            .map(|object| object.class.clone())
    }

    /// Extension instance attached to `object`, or null
    pub fn instance_of(&self, object: ObjectHandle) -> sys::GDExtensionClassInstancePtr {
        let state = self.state.lock();
        state
            .objects
            .get(&(object.as_sys() as usize))
            .map_or(ptr::null_mut(), |object| object.instance as *mut c_void)
    }

    /// Binding stored under `token`, without creating one
    pub fn binding_of(&self, object: ObjectHandle, token: *mut c_void) -> *mut c_void {
        unsafe { self.object_get_instance_binding(object.as_sys(), token, ptr::null()) }
    }

    // ========================================================================
    // Driving Registered Callbacks
    // ========================================================================

    /// Call `method` with boxed arguments through its `call_func`.
    pub fn call(
        &self,
        object: ObjectHandle,
        method: &str,
        args: &[&Variant],
    ) -> Result<Variant, crate::error::CallError> {
        match self.object_method(object, method) {
            Some((method, instance)) => self.call_method(&method, instance as *mut c_void, args),
            None => Err(crate::error::CallError::InvalidMethod),
        }
    }

    /// Call `method` of `class` on whatever `instance` points at, the way
    /// a host holding a stale or foreign instance pointer would.
    pub fn call_on_instance(
        &self,
        class: &str,
        method: &str,
        instance: sys::GDExtensionClassInstancePtr,
        args: &[&Variant],
    ) -> Result<Variant, crate::error::CallError> {
        let found = self.state.lock().find_method(class, method);
        match found {
            Some(method) => self.call_method(&method, instance, args),
            None => Err(crate::error::CallError::InvalidMethod),
        }
    }

    fn call_method(
        &self,
        method: &MockMethod,
        instance: sys::GDExtensionClassInstancePtr,
        args: &[&Variant],
    ) -> Result<Variant, crate::error::CallError> {
        let Some(call) = method.call_func else {
            return Err(crate::error::CallError::InvalidMethod);
        };

        let raw_args: Vec<sys::GDExtensionConstVariantPtr> = args.iter().map(|arg| arg.as_ptr()).collect();
        let mut error = sys::GDExtensionCallError::default();
        let ret = unsafe {
            Variant::new_with(|dst| {
                self.variant_new_nil(dst);
                call(
                    method.userdata as *mut c_void,
                    instance,
                    raw_args.as_ptr(),
                    raw_args.len() as sys::GDExtensionInt,
                    dst,
                    &mut error,
                );
            })
        };
        match crate::error::CallError::from_sys(&error) {
            Some(error) => Err(error),
            None => Ok(ret),
        }
    }

    /// Call `method` with raw slots through its `ptrcall_func`. Returns
    /// false when the method has none.
    ///
    /// # Safety
    ///
    /// `args` and `ret` must match the method's signature.
    pub unsafe fn ptrcall(
        &self,
        object: ObjectHandle,
        method: &str,
        args: &[sys::GDExtensionConstTypePtr],
        ret: sys::GDExtensionTypePtr,
    ) -> bool {
        match self.object_method(object, method) {
            Some((method, instance)) => ptrcall_method(&method, instance as *mut c_void, args, ret),
            None => false,
        }
    }

    /// Raw-call `method` of `class` on whatever `instance` points at.
    ///
    /// # Safety
    ///
    /// `args` and `ret` must match the method's signature.
    pub unsafe fn ptrcall_on_instance(
        &self,
        class: &str,
        method: &str,
        instance: sys::GDExtensionClassInstancePtr,
        args: &[sys::GDExtensionConstTypePtr],
        ret: sys::GDExtensionTypePtr,
    ) -> bool {
        let found = self.state.lock().find_method(class, method);
        match found {
            Some(method) => ptrcall_method(&method, instance, args, ret),
            None => false,
        }
    }

    /// Method `name` as resolved on `object`'s class, with its instance
    fn object_method(&self, object: ObjectHandle, name: &str) -> Option<(MockMethod, usize)> {
        let state = self.state.lock();
        let target = state.objects.get(&(object.as_sys() as usize))?;
        Some((state.find_method(&target.class, name)?, target.instance))
    }

    /// Ask `class` for the call data of virtual `name`
    pub fn virtual_call_data(&self, class: &str, name: &str) -> *mut c_void {
        let info = self.state.lock().classes.get(class).map(|class| class.info);
        let Some(info) = info else {
            return ptr::null_mut();
        };
        let name = OwnedText::new(name);
        match info.get_virtual_call_data_func {
            Some(lookup) => unsafe { lookup(info.class_userdata, name.as_ptr()) },
            None => ptr::null_mut(),
        }
    }

    /// Run a virtual override found through [`virtual_call_data`](Self::virtual_call_data).
    ///
    /// # Safety
    ///
    /// `data` must come from the virtual lookup of `object`'s class; `args` and
    /// `ret` must match the method's signature.
    pub unsafe fn call_virtual(
        &self,
        object: ObjectHandle,
        name: &str,
        data: *mut c_void,
        args: &[sys::GDExtensionConstTypePtr],
        ret: sys::GDExtensionTypePtr,
    ) -> bool {
        let found = self.state.lock().instance_info(object);
        let Some((info, instance)) = found else {
            return false;
        };
        let name = OwnedText::new(name);
        match info.call_virtual_with_data_func {
            Some(call) => {
                call(instance, name.as_ptr(), data, args.as_ptr(), ret);
                true
            }
            None => false,
        }
    }

    /// Read a property through the class's `get_func`
    pub fn get(&self, object: ObjectHandle, name: &str) -> Option<Variant> {
        let (info, instance) = self.state.lock().instance_info(object)?;
        let get = info.get_func?;
        let name = OwnedText::new(name);
        let mut found = false;
        let value = unsafe {
            Variant::new_with(|dst| {
                self.variant_new_nil(dst);
                found = get(instance, name.as_ptr(), dst) != 0;
            })
        };
        found.then_some(value)
    }

    /// Write a property through the class's `set_func`
    pub fn set(&self, object: ObjectHandle, name: &str, value: &Variant) -> bool {
        let found = self.state.lock().instance_info(object);
        let Some((info, instance)) = found else {
            return false;
        };
        let name = OwnedText::new(name);
        match info.set_func {
            Some(set) => unsafe { set(instance, name.as_ptr(), value.as_ptr()) != 0 },
            None => false,
        }
    }

    pub fn notify(&self, object: ObjectHandle, what: i32, reversed: bool) {
        let found = self.state.lock().instance_info(object);
        if let Some((info, instance)) = found {
            if let Some(notify) = info.notification_func {
                unsafe { notify(instance, what, reversed as sys::GDExtensionBool) };
            }
        }
    }

    /// Text from the class's `to_string_func`
    pub fn describe(&self, object: ObjectHandle) -> Option<String> {
        let (info, instance) = self.state.lock().instance_info(object)?;
        let to_string = info.to_string_func?;
        let mut out = OwnedText::empty();
        let mut valid = sys::GDEXTENSION_FALSE;
        unsafe { to_string(instance, &mut valid, out.as_mut_ptr()) };
        (valid != 0).then(|| out.text())
    }

    /// Name and type tag of each entry of the class's property list
    pub fn property_list(&self, object: ObjectHandle) -> Vec<(String, u32)> {
        let found = self.state.lock().instance_info(object);
        let Some((info, instance)) = found else {
            return Vec::new();
        };
        let Some(get_list) = info.get_property_list_func else {
            return Vec::new();
        };
        unsafe {
            let mut count = 0u32;
            let list = get_list(instance, &mut count);
            if list.is_null() {
                return Vec::new();
            }
            let entries = std::slice::from_raw_parts(list, count as usize)
                .iter()
                .map(|entry| (text_ref(entry.name).to_owned(), entry.type_))
                .collect();
            if let Some(free_list) = info.free_property_list_func {
                free_list(instance, list, count);
            }
            entries
        }
    }

    /// Run the class's `validate_property_func` on `property`
    pub fn validate_property(&self, object: ObjectHandle, property: &mut sys::GDExtensionPropertyInfo) -> bool {
        let found = self.state.lock().instance_info(object);
        match found {
            Some((info, instance)) => match info.validate_property_func {
                Some(validate) => unsafe { validate(instance, property) != 0 },
                None => false,
            },
            None => false,
        }
    }

    /// Build a property info whose name is owned by the mock. Release it
    /// with [`free_property_info`](Self::free_property_info).
    pub fn property_info(&self, name: &str, ty: VariantType) -> sys::GDExtensionPropertyInfo {
        let mut name_slot: *mut String = ptr::null_mut();
        let mut hint_slot: *mut String = ptr::null_mut();
        let mut class_slot: *mut String = ptr::null_mut();
        unsafe {
            text_new(&mut name_slot as *mut *mut String as *mut c_void, name.to_owned());
            text_new(&mut hint_slot as *mut *mut String as *mut c_void, String::new());
            text_new(&mut class_slot as *mut *mut String as *mut c_void, String::new());
        }
        sys::GDExtensionPropertyInfo {
            type_: ty.sys(),
            name: Box::into_raw(Box::new(name_slot)) as *mut c_void,
            class_name: Box::into_raw(Box::new(class_slot)) as *mut c_void,
            hint: sys::PROPERTY_HINT_NONE,
            hint_string: Box::into_raw(Box::new(hint_slot)) as *mut c_void,
            usage: sys::PROPERTY_USAGE_DEFAULT,
        }
    }

    pub fn free_property_info(&self, info: sys::GDExtensionPropertyInfo) {
        for slot in [info.name, info.class_name, info.hint_string] {
            if !slot.is_null() {
                unsafe {
                    text_free(slot);
                    drop(Box::from_raw(slot as *mut *mut String));
                }
            }
        }
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockHost")
            .field("classes", &state.classes.len())
            .field("objects", &state.objects.len())
            .finish()
    }
}

fn stringify(variant: *const c_void) -> String {
    unsafe {
        let tag = tag_of(variant);
        let raw = raw_of(variant);
        match VariantType::from_sys(tag) {
            Some(VariantType::Nil) | None => "<null>".to_string(),
            Some(VariantType::Bool) => (*(raw as *const u8) != 0).to_string(),
            Some(VariantType::Int) => ptr::read_unaligned(raw as *const i64).to_string(),
            Some(VariantType::Float) => ptr::read_unaligned(raw as *const f64).to_string(),
            Some(VariantType::Object) if ptr::read_unaligned(raw as *const usize) == 0 => "<null>".to_string(),
            Some(_) if is_text(tag) => text_ref(raw).to_owned(),
            Some(ty) => format!("<{:?}>", ty),
        }
    }
}

fn booleanize(variant: *const c_void) -> bool {
    unsafe {
        let tag = tag_of(variant);
        let raw = raw_of(variant);
        match VariantType::from_sys(tag) {
            Some(VariantType::Nil) | None => false,
            Some(VariantType::Bool) => *(raw as *const u8) != 0,
            Some(VariantType::Int) => ptr::read_unaligned(raw as *const i64) != 0,
            Some(VariantType::Float) => ptr::read_unaligned(raw as *const f64) != 0.0,
            Some(VariantType::Object) => ptr::read_unaligned(raw as *const usize) != 0,
            Some(_) if is_text(tag) => !text_ref(raw).is_empty(),
            Some(_) => true,
        }
    }
}

impl HostApi for MockHost {
    fn library(&self) -> sys::GDExtensionClassLibraryPtr {
        ptr::null_mut()
    }

    fn version(&self) -> HostVersion {
        HostVersion {
            major: 4,
            minor: 3,
            patch: 0,
            string: "mock 4.3.0".to_string(),
        }
    }

    fn print_error(&self, message: &str, function: &str, _file: &str, _line: u32) {
        self.state.lock().errors.push(format!("{}: {}", function, message));
    }

    fn print_warning(&self, message: &str, function: &str, _file: &str, _line: u32) {
        self.state.lock().warnings.push(format!("{}: {}", function, message));
    }

    // ========================================================================
    // Variants
    // ========================================================================

    unsafe fn variant_new_copy(
        &self,
        dst: sys::GDExtensionUninitializedVariantPtr,
        src: sys::GDExtensionConstVariantPtr,
    ) {
        copy_variant(dst, src);
    }

    unsafe fn variant_new_nil(&self, dst: sys::GDExtensionUninitializedVariantPtr) {
        ptr::write_bytes(dst as *mut u8, 0, sys::VARIANT_SIZE);
    }

    unsafe fn variant_destroy(&self, value: sys::GDExtensionVariantPtr) {
        clear_variant(value);
    }

    unsafe fn variant_get_type(&self, value: sys::GDExtensionConstVariantPtr) -> u32 {
        tag_of(value)
    }

    unsafe fn variant_booleanize(&self, value: sys::GDExtensionConstVariantPtr) -> bool {
        booleanize(value)
    }

    unsafe fn variant_stringify(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        dst: sys::GDExtensionUninitializedStringPtr,
    ) {
        text_new(dst, stringify(value));
    }

    /// Strings index by character; nothing else is indexable.
    unsafe fn variant_get_indexed(
        &self,
        value: sys::GDExtensionConstVariantPtr,
        index: i64,
        dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> (bool, bool) {
        if tag_of(value) != VariantType::String.sys() {
            return (false, false);
        }
        let text = text_ref(raw_of(value));
        let found = usize::try_from(index).ok().and_then(|i| text.chars().nth(i));
        match found {
            Some(c) => {
                let mut slot = OwnedText::new(&c.to_string());
                clear_variant(dst);
                write_variant(dst, VariantType::String.sys(), slot.as_mut_ptr());
                (true, false)
            }
            None => (false, true),
        }
    }

    unsafe fn variant_set_indexed(
        &self,
        _value: sys::GDExtensionVariantPtr,
        _index: i64,
        _element: sys::GDExtensionConstVariantPtr,
    ) -> (bool, bool) {
        (false, false)
    }

    unsafe fn variant_get_keyed(
        &self,
        _value: sys::GDExtensionConstVariantPtr,
        _key: sys::GDExtensionConstVariantPtr,
        _dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> bool {
        false
    }

    unsafe fn variant_set_keyed(
        &self,
        _value: sys::GDExtensionVariantPtr,
        _key: sys::GDExtensionConstVariantPtr,
        _element: sys::GDExtensionConstVariantPtr,
    ) -> bool {
        false
    }

    unsafe fn variant_get_named(
        &self,
        _value: sys::GDExtensionConstVariantPtr,
        _name: sys::GDExtensionConstStringNamePtr,
        _dst: sys::GDExtensionUninitializedVariantPtr,
    ) -> bool {
        false
    }

    unsafe fn variant_set_named(
        &self,
        _value: sys::GDExtensionVariantPtr,
        _name: sys::GDExtensionConstStringNamePtr,
        _element: sys::GDExtensionConstVariantPtr,
    ) -> bool {
        false
    }

    // ========================================================================
    // Type Constructors
    // ========================================================================

    fn variant_from_type_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
    ) -> sys::GDExtensionVariantFromTypeConstructorFunc {
        FROM_TYPE.get(ty as usize).copied()
    }

    fn variant_to_type_constructor(
        &self,
        ty: sys::GDExtensionVariantType,
    ) -> sys::GDExtensionTypeFromVariantConstructorFunc {
        TO_TYPE.get(ty as usize).copied()
    }

    fn ptr_constructor(&self, ty: sys::GDExtensionVariantType, index: i32) -> sys::GDExtensionPtrConstructor {
        match index {
            0 => DEFAULT_CONSTRUCTOR.get(ty as usize).copied(),
            1 => COPY_CONSTRUCTOR.get(ty as usize).copied(),
            2 if ty == VariantType::String.sys() || ty == VariantType::StringName.sys() => {
                COPY_CONSTRUCTOR.get(ty as usize).copied()
            }
            _ => None,
        }
    }

    fn ptr_destructor(&self, ty: sys::GDExtensionVariantType) -> sys::GDExtensionPtrDestructor {
        if is_text(ty) {
            Some(destroy_text)
        } else {
            None
        }
    }

    // ========================================================================
    // Strings
    // ========================================================================

    unsafe fn string_new_with_utf8_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &[u8],
    ) {
        text_new(dst, String::from_utf8_lossy(text).into_owned());
    }

    unsafe fn string_new_with_latin1_chars(&self, dst: sys::GDExtensionUninitializedStringPtr, text: &CStr) {
        text_new(dst, text.to_bytes().iter().map(|b| *b as char).collect());
    }

    unsafe fn string_new_with_utf32_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringPtr,
        text: &[u32],
    ) {
        let decoded = text
            .iter()
            .map(|c| char::from_u32(*c).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        text_new(dst, decoded);
    }

    unsafe fn string_to_utf8_chars(&self, value: sys::GDExtensionConstStringPtr, buf: *mut c_char, max: i64) -> i64 {
        let bytes = text_ref(value).as_bytes();
        if !buf.is_null() {
            let n = bytes.len().min(max.max(0) as usize);
            ptr::copy_nonoverlapping(bytes.as_ptr(), buf as *mut u8, n);
        }
        bytes.len() as i64
    }

    unsafe fn string_to_utf32_chars(&self, value: sys::GDExtensionConstStringPtr, buf: *mut u32, max: i64) -> i64 {
        let chars: Vec<u32> = text_ref(value).chars().map(u32::from).collect();
        if !buf.is_null() {
            let n = chars.len().min(max.max(0) as usize);
            ptr::copy_nonoverlapping(chars.as_ptr(), buf, n);
        }
        chars.len() as i64
    }

    unsafe fn string_name_new_with_utf8_chars_and_len(
        &self,
        dst: sys::GDExtensionUninitializedStringNamePtr,
        text: &[u8],
    ) {
        text_new(dst, String::from_utf8_lossy(text).into_owned());
    }

    // ========================================================================
    // Objects
    // ========================================================================

    unsafe fn object_get_instance_binding(
        &self,
        object: sys::GDExtensionObjectPtr,
        token: *mut c_void,
        callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
    ) -> *mut c_void {
        {
            let state = self.state.lock();
            let Some(target) = state.objects.get(&(object as usize)) else {
                return ptr::null_mut();
            };
            if let Some(found) = target.bindings.iter().find(|b| b.token == token as usize) {
                return found.binding as *mut c_void;
            }
        }
        let Some(create) = callbacks.as_ref().and_then(|callbacks| callbacks.create_callback) else {
            return ptr::null_mut();
        };
        let binding = create(token, object);
        if !binding.is_null() {
            self.object_set_instance_binding(object, token, binding, callbacks);
        }
        binding
    }

    unsafe fn object_set_instance_binding(
        &self,
        object: sys::GDExtensionObjectPtr,
        token: *mut c_void,
        binding: *mut c_void,
        callbacks: *const sys::GDExtensionInstanceBindingCallbacks,
    ) {
        let mut state = self.state.lock();
        let Some(target) = state.objects.get_mut(&(object as usize)) else {
            return;
        };
        target.bindings.retain(|b| b.token != token as usize);
        target.bindings.push(MockBinding {
            token: token as usize,
            binding: binding as usize,
            callbacks,
        });
    }

    unsafe fn object_set_instance(
        &self,
        object: sys::GDExtensionObjectPtr,
        class_name: sys::GDExtensionConstStringNamePtr,
        instance: sys::GDExtensionClassInstancePtr,
    ) {
        let class = text_ref(class_name).to_owned();
        let mut state = self.state.lock();
        if let Some(target) = state.objects.get_mut(&(object as usize)) {
            target.class = class;
            target.instance = instance as usize;
        }
    }

    unsafe fn object_get_class_name(
        &self,
        object: sys::GDExtensionConstObjectPtr,
        dst: sys::GDExtensionUninitializedStringNamePtr,
    ) -> bool {
        let class = {
            let state = self.state.lock();
            state.objects.get(&(object as usize)).map(|target| target.class.clone())
        };
        match class {
            Some(class) => {
                text_new(dst, class);
                true
            }
            None => false,
        }
    }

    unsafe fn object_get_instance_id(&self, object: sys::GDExtensionConstObjectPtr) -> u64 {
        let state = self.state.lock();
        state.objects.get(&(object as usize)).map_or(0, |target| target.id)
    }

    /// Frees the extension instance first, then every binding.
    unsafe fn object_destroy(&self, object: sys::GDExtensionObjectPtr) {
        let (target, free_instance) = {
            let mut state = self.state.lock();
            let Some(target) = state.objects.remove(&(object as usize)) else {
                state.errors.push(format!("destroy of unknown object {:p}", object));
                return;
            };
            let free_instance = state
                .classes
                .get(&target.class)
                .and_then(|class| Some((class.info.free_instance_func?, class.info.class_userdata)));
            (target, free_instance)
        };

        if let (Some((free, userdata)), true) = (free_instance, target.instance != 0) {
            free(userdata, target.instance as *mut c_void);
        }
        for binding in &target.bindings {
            if let Some(free) = binding.callbacks.as_ref().and_then(|callbacks| callbacks.free_callback) {
                free(binding.token as *mut c_void, object, binding.binding as *mut c_void);
            }
        }
        drop(Box::from_raw(object as *mut u64));
    }

    // ========================================================================
    // Class Database
    // ========================================================================

    unsafe fn classdb_construct_object(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
    ) -> sys::GDExtensionObjectPtr {
        let class = text_ref(class_name).to_owned();
        let create = {
            let mut state = self.state.lock();
            if let Some(registered) = state.classes.get(&class) {
                Some((registered.info.create_instance_func, registered.info.class_userdata))
            } else if state.natives.contains(&class) {
                None
            } else {
                state.errors.push(format!("cannot construct unknown class {}", class));
                return ptr::null_mut();
            }
        };

        match create {
            Some((Some(create), userdata)) => create(userdata),
            Some((None, _)) => ptr::null_mut(),
            None => {
                let mut state = self.state.lock();
                let id = state.next_id;
                state.next_id += 1;
                let object = Box::into_raw(Box::new(id)) as *mut c_void;
                state.objects.insert(
                    object as usize,
                    MockObject {
                        id,
                        class,
                        instance: 0,
                        bindings: Vec::new(),
                    },
                );
                object
            }
        }
    }

    unsafe fn classdb_register_extension_class(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        parent_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionClassCreationInfo3,
    ) {
        let name = text_ref(class_name).to_owned();
        let parent = text_ref(parent_name).to_owned();
        let mut state = self.state.lock();
        let Some(info) = info.as_ref() else {
            state.errors.push(format!("class {} registered without creation info", name));
            return;
        };
        if !state.knows_class(&parent) {
            state.errors.push(format!("parent {} of class {} is not registered", parent, name));
            return;
        }
        state.classes.insert(
            name,
            MockClass {
                parent,
                info: *info,
                methods: FxHashMap::default(),
                properties: Vec::new(),
                groups: Vec::new(),
                subgroups: Vec::new(),
                signals: Vec::new(),
                constants: Vec::new(),
            },
        );
    }

    unsafe fn classdb_register_extension_class_method(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionClassMethodInfo,
    ) {
        let class = text_ref(class_name).to_owned();
        let Some(info) = info.as_ref() else {
            return;
        };
        let count = info.argument_count as usize;
        let arguments = if info.arguments_info.is_null() {
            Vec::new()
        } else {
            std::slice::from_raw_parts(info.arguments_info, count)
                .iter()
                .map(|arg| (text_ref(arg.name).to_owned(), arg.type_))
                .collect()
        };
        let argument_metadata = if info.arguments_metadata.is_null() {
            Vec::new()
        } else {
            std::slice::from_raw_parts(info.arguments_metadata, count).to_vec()
        };
        let return_type = if info.has_return_value != 0 {
            info.return_value_info.as_ref().map(|ret| ret.type_)
        } else {
            None
        };
        let method = MockMethod {
            name: text_ref(info.name).to_owned(),
            userdata: info.method_userdata as usize,
            call_func: info.call_func,
            ptrcall_func: info.ptrcall_func,
            flags: info.method_flags,
            return_type,
            arguments,
            argument_metadata,
            default_argument_count: info.default_argument_count,
        };

        let name = method.name.clone();
        {
            let mut state = self.state.lock();
            if let Some(class) = state.class_mut(&class) {
                class.methods.insert(name.clone(), method);
            }
        }
        self.member_registered(&class, &name);
    }

    unsafe fn classdb_register_extension_class_integer_constant(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        enum_name: sys::GDExtensionConstStringNamePtr,
        constant_name: sys::GDExtensionConstStringNamePtr,
        value: i64,
        is_bitfield: bool,
    ) {
        let constant = MockConstant {
            enum_name: text_ref(enum_name).to_owned(),
            name: text_ref(constant_name).to_owned(),
            value,
            is_bitfield,
        };
        let class = text_ref(class_name).to_owned();
        let name = constant.name.clone();
        {
            let mut state = self.state.lock();
            if let Some(class) = state.class_mut(&class) {
                class.constants.push(constant);
            }
        }
        self.member_registered(&class, &name);
    }

    unsafe fn classdb_register_extension_class_property(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        info: *const sys::GDExtensionPropertyInfo,
        setter: sys::GDExtensionConstStringNamePtr,
        getter: sys::GDExtensionConstStringNamePtr,
    ) {
        let Some(info) = info.as_ref() else {
            return;
        };
        let property = MockProperty {
            name: text_ref(info.name).to_owned(),
            variant_type: info.type_,
            hint: info.hint,
            hint_string: text_ref(info.hint_string).to_owned(),
            usage: info.usage,
            setter: text_ref(setter).to_owned(),
            getter: text_ref(getter).to_owned(),
        };
        let class = text_ref(class_name).to_owned();
        let name = property.name.clone();
        {
            let mut state = self.state.lock();
            if let Some(class) = state.class_mut(&class) {
                class.properties.push(property);
            }
        }
        self.member_registered(&class, &name);
    }

    unsafe fn classdb_register_extension_class_property_group(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        group_name: sys::GDExtensionConstStringPtr,
        prefix: sys::GDExtensionConstStringPtr,
    ) {
        let group = (text_ref(group_name).to_owned(), text_ref(prefix).to_owned());
        let mut state = self.state.lock();
        if let Some(class) = state.class_mut(text_ref(class_name)) {
            class.groups.push(group);
        }
    }

    unsafe fn classdb_register_extension_class_property_subgroup(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        subgroup_name: sys::GDExtensionConstStringPtr,
        prefix: sys::GDExtensionConstStringPtr,
    ) {
        let subgroup = (text_ref(subgroup_name).to_owned(), text_ref(prefix).to_owned());
        let mut state = self.state.lock();
        if let Some(class) = state.class_mut(text_ref(class_name)) {
            class.subgroups.push(subgroup);
        }
    }

    unsafe fn classdb_register_extension_class_signal(
        &self,
        class_name: sys::GDExtensionConstStringNamePtr,
        signal_name: sys::GDExtensionConstStringNamePtr,
        arguments: *const sys::GDExtensionPropertyInfo,
        argument_count: i64,
    ) {
        let arguments = if arguments.is_null() || argument_count <= 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(arguments, argument_count as usize)
                .iter()
                .map(|arg| (text_ref(arg.name).to_owned(), arg.type_))
                .collect()
        };
        let signal = MockSignal {
            name: text_ref(signal_name).to_owned(),
            arguments,
        };
        let class = text_ref(class_name).to_owned();
        let name = signal.name.clone();
        {
            let mut state = self.state.lock();
            if let Some(class) = state.class_mut(&class) {
                class.signals.push(signal);
            }
        }
        self.member_registered(&class, &name);
    }

    unsafe fn classdb_unregister_extension_class(&self, class_name: sys::GDExtensionConstStringNamePtr) {
        let name = text_ref(class_name).to_owned();
        let mut state = self.state.lock();
        if state.classes.remove(&name).is_none() {
            state.errors.push(format!("unregister of unknown class {}", name));
            return;
        }
        state.unregistered.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{GString, StringName};

    #[test]
    fn test_text_variant_copies_are_independent() {
        let (_host, wire) = install();
        let text = GString::from_str(wire, "abc");
        let boxed = unsafe { Variant::new_with(|dst| wire.from_type(VariantType::String, dst, text.as_ptr())) };
        drop(text);
        let copy = boxed.clone();
        drop(boxed);
        assert_eq!(copy.get_type(wire), VariantType::String);
        assert_eq!(copy.stringify(wire), "abc");
    }

    #[test]
    fn test_wide_values_are_boxed() {
        let (_host, wire) = install();
        let raw = [7u8; 48];
        let boxed = unsafe {
            Variant::new_with(|dst| {
                wire.from_type(VariantType::Transform3D, dst, raw.as_ptr() as sys::GDExtensionConstTypePtr)
            })
        };
        let mut out = [0u8; 48];
        unsafe {
            wire.to_type(
                VariantType::Transform3D,
                out.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr,
                boxed.as_ptr(),
            )
        };
        assert_eq!(out, raw);
    }

    #[test]
    fn test_indexed_string_access() {
        let (_host, wire) = install();
        let text = GString::from_str(wire, "hey");
        let boxed = unsafe { Variant::new_with(|dst| wire.from_type(VariantType::String, dst, text.as_ptr())) };
        assert_eq!(boxed.get_indexed(wire, 1).unwrap().stringify(wire), "e");
        assert!(boxed.get_indexed(wire, 3).is_err());
    }

    #[test]
    fn test_native_objects() {
        let (host, wire) = install();
        let object = host.construct_object("Node");
        assert!(!object.is_null());
        assert_eq!(host.class_of(object).as_deref(), Some("Node"));

        let name = StringName::new(wire, "NoSuchNativeClass");
        let missing = unsafe { host.classdb_construct_object(name.as_ptr()) };
        assert!(missing.is_null());

        host.destroy_object(object);
        assert_eq!(host.class_of(object), None);
    }
}
