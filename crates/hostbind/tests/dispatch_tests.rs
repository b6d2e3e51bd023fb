//! Dispatch tests: the host drives registered callbacks on live objects
//!
//! Objects are created and destroyed through the mock host exactly the
//! way the engine would, so these tests exercise the full callback path.

use hostbind::codec::{ObjectWrapper, WireType};
use hostbind::sys::{self, VariantType};
use hostbind::testing;
use hostbind::types::ObjectHandle;
use hostbind::{
    BindResult, Bridge, BridgeConfig, CallError, ClassDb, ExtensionClass, InitializationLevel, VarArgs, Variant,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

fn bridge() -> Arc<Bridge> {
    let config = BridgeConfig {
        abort_on_contract_violation: false,
        ..BridgeConfig::default()
    };
    Bridge::new(testing::install().1, config)
}

// ============================================================================
// Test Class
// ============================================================================

struct Counter {
    total: i64,
    label: String,
    notifications: Vec<(i32, bool)>,
}

impl ExtensionClass for Counter {
    const CLASS_NAME: &'static str = "Counter";
    const PARENT_CLASS_NAME: &'static str = "Node";

    fn construct(_owner: ObjectHandle) -> Self {
        Counter {
            total: 0,
            label: String::new(),
            notifications: Vec::new(),
        }
    }

    fn on_notification(&mut self, what: i32, reversed: bool) {
        self.notifications.push((what, reversed));
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        let wire = testing::install().1;
        db.bind_method(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &["amount", "times"],
            vec![1i32.encode_variant(wire)],
        )?;
        db.bind_method("Counter", "GetTotal", "get_total", Counter::get_total, &[], vec![])?;
        db.bind_method_varargs("Counter", "CountArgs", "count_args", Counter::count_args)?;
        db.bind_virtual_method("Counter", "V_Get", "_get", Counter::get, &["property"])?;
        db.bind_virtual_method("Counter", "V_Set", "_set", Counter::set, &["property", "value"])?;
        db.bind_property("Counter", VariantType::Int, "total", "", "get_total")?;
        db.set_validate_property("Counter", hide_integers)?;
        Ok(())
    }
}

impl Counter {
    fn add(&mut self, amount: i64, times: i32) -> i64 {
        self.total += amount * times as i64;
        self.total
    }

    fn get_total(&mut self) -> i64 {
        self.total
    }

    fn count_args(&mut self, args: VarArgs<'_>) -> i64 {
        args.len() as i64
    }

    fn get(&mut self, property: String) -> (Variant, bool) {
        let wire = testing::install().1;
        match property.as_str() {
            "label" => (self.label.clone().encode_variant(wire), true),
            _ => (Variant::nil(), false),
        }
    }

    fn set(&mut self, property: String, value: Variant) -> bool {
        let wire = testing::install().1;
        if property != "label" || value.get_type(wire) != VariantType::String {
            return false;
        }
        self.label = String::decode_variant(wire, &value);
        true
    }
}

fn hide_integers(property: &mut sys::GDExtensionPropertyInfo) -> bool {
    if property.type_ == VariantType::Int.sys() {
        property.usage = sys::PROPERTY_USAGE_NONE;
        return true;
    }
    false
}

/// One bridge owns `Counter` for the whole file.
static COUNTER_BRIDGE: Lazy<Arc<Bridge>> = Lazy::new(|| {
    let bridge = bridge();
    bridge.register_class::<Counter>(InitializationLevel::Scene).unwrap();
    bridge
});

fn counter_bridge() -> Arc<Bridge> {
    COUNTER_BRIDGE.clone()
}

fn int(value: i64) -> Variant {
    value.encode_variant(testing::install().1)
}

// ============================================================================
// Boxed Calls
// ============================================================================

#[test]
fn test_call_with_defaults() {
    let (host, wire) = testing::install();
    let bridge = counter_bridge();
    let object = host.construct_object("Counter");

    let ret = host.call(object, "add", &[&int(5), &int(3)]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 15);
    // `times` falls back to its default of 1
    let ret = host.call(object, "add", &[&int(2)]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 17);

    let wrapped = bridge.bind(object).unwrap();
    assert_eq!(wrapped.with_state(|c: &mut Counter| c.total).unwrap(), 17);
    host.destroy_object(object);
}

#[test]
fn test_call_errors() {
    let (host, wire) = testing::install();
    let _bridge = counter_bridge();
    let object = host.construct_object("Counter");

    // `amount` has no default
    assert_eq!(host.call(object, "add", &[]).unwrap_err(), CallError::InvalidMethod);
    assert_eq!(
        host.call(object, "add", &[&int(1), &int(2), &int(3)]).unwrap_err(),
        CallError::TooManyArguments { expected: 2 }
    );
    let text = "five".to_string().encode_variant(wire);
    assert_eq!(
        host.call(object, "add", &[&text]).unwrap_err(),
        CallError::InvalidArgument {
            argument: 0,
            expected: VariantType::Int.sys() as i32,
        }
    );
    assert_eq!(host.call(object, "missing", &[]).unwrap_err(), CallError::InvalidMethod);

    let ret = host.call(object, "get_total", &[]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 0);
    host.destroy_object(object);
}

#[test]
fn test_variadic_call() {
    let (host, wire) = testing::install();
    let _bridge = counter_bridge();
    let object = host.construct_object("Counter");

    let text = "x".to_string().encode_variant(wire);
    let ret = host.call(object, "count_args", &[&int(1), &text, &Variant::nil()]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 3);
    let ret = host.call(object, "count_args", &[]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 0);

    // Variadic methods have no raw entry point
    let mut out = 0i64;
    assert!(!unsafe { host.ptrcall(object, "count_args", &[], &mut out as *mut i64 as _) });

    let method = host.method("Counter", "count_args").unwrap();
    assert_eq!(method.arguments, vec![("varargs".to_string(), VariantType::Nil.sys())]);
    host.destroy_object(object);
}

struct Mixer {
    last: (i64, i64, i64),
}

impl ExtensionClass for Mixer {
    const CLASS_NAME: &'static str = "Mixer";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Mixer { last: (0, 0, 0) }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        let wire = testing::install().1;
        db.bind_method(
            "Mixer",
            "Mix",
            "mix",
            Mixer::mix,
            &["a", "b", "c"],
            vec![20i64.encode_variant(wire), 300i64.encode_variant(wire)],
        )?;
        db.bind_method("Mixer", "MixStrict", "mix_strict", Mixer::mix, &["a", "b", "c"], vec![])?;
        Ok(())
    }
}

impl Mixer {
    fn mix(&mut self, a: i64, b: i64, c: i64) -> i64 {
        self.last = (a, b, c);
        a + b + c
    }
}

#[test]
fn test_trailing_defaults() {
    let (host, wire) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Mixer>(InitializationLevel::Scene).unwrap();
    let object = host.construct_object("Mixer");

    let ret = host.call(object, "mix", &[&int(1)]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 321);
    let ret = host.call(object, "mix", &[&int(1), &int(2)]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 303);
    let wrapped = bridge.bind(object).unwrap();
    assert_eq!(wrapped.with_state(|m: &mut Mixer| m.last).unwrap(), (1, 2, 300));

    assert_eq!(host.method("Mixer", "mix").unwrap().default_argument_count, 2);
    assert_eq!(
        host.call(object, "mix_strict", &[&int(1)]).unwrap_err(),
        CallError::InvalidMethod
    );
    host.destroy_object(object);
}

// ============================================================================
// Raw Calls
// ============================================================================

struct Widget {
    count: i64,
}

impl ExtensionClass for Widget {
    const CLASS_NAME: &'static str = "Widget";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Widget { count: 42 }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_method("Widget", "GetCount", "get_count", Widget::get_count, &[], vec![])?;
        Ok(())
    }
}

impl Widget {
    fn get_count(&mut self) -> i32 {
        self.count as i32
    }
}

#[test]
fn test_widget_ptrcall() {
    let (host, _) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Widget>(InitializationLevel::Scene).unwrap();
    let object = host.construct_object("Widget");

    // An i32 return fills the whole 64-bit slot
    let mut out = -1i64;
    assert!(unsafe { host.ptrcall(object, "get_count", &[], &mut out as *mut i64 as _) });
    assert_eq!(out, 42);
    host.destroy_object(object);
}

#[test]
fn test_ptrcall() {
    let (host, _) = testing::install();
    let bridge = counter_bridge();
    let object = host.construct_object("Counter");

    let amount = 4i64;
    let times = 2i64;
    let mut out = 0i64;
    let args: [sys::GDExtensionConstTypePtr; 2] = [&amount as *const i64 as _, &times as *const i64 as _];
    assert!(unsafe { host.ptrcall(object, "add", &args, &mut out as *mut i64 as _) });
    assert_eq!(out, 8);

    // A null return slot still runs the method
    assert!(unsafe { host.ptrcall(object, "add", &args, std::ptr::null_mut()) });
    let wrapped = bridge.bind(object).unwrap();
    assert_eq!(wrapped.with_state(|c: &mut Counter| c.total).unwrap(), 16);
    host.destroy_object(object);
}

// ============================================================================
// Property Protocol
// ============================================================================

#[test]
fn test_get_and_set_protocol() {
    let (host, wire) = testing::install();
    let _bridge = counter_bridge();
    let object = host.construct_object("Counter");

    let label = "north".to_string().encode_variant(wire);
    assert!(host.set(object, "label", &label));
    let value = host.get(object, "label").unwrap();
    assert_eq!(String::decode_variant(wire, &value), "north");

    // Declined names fall through to the host
    assert!(host.get(object, "unknown").is_none());
    assert!(!host.set(object, "unknown", &label));
    assert!(!host.set(object, "label", &int(3)));
    host.destroy_object(object);
}

#[test]
fn test_property_list_and_validation() {
    let (host, _) = testing::install();
    let _bridge = counter_bridge();
    let object = host.construct_object("Counter");

    assert_eq!(
        host.property_list(object),
        vec![("total".to_string(), VariantType::Int.sys())]
    );

    let mut property = host.property_info("total", VariantType::Int);
    assert!(host.validate_property(object, &mut property));
    assert_eq!(property.usage, sys::PROPERTY_USAGE_NONE);
    host.free_property_info(property);

    let mut property = host.property_info("label", VariantType::String);
    assert!(!host.validate_property(object, &mut property));
    assert_eq!(property.usage, sys::PROPERTY_USAGE_DEFAULT);
    host.free_property_info(property);
    host.destroy_object(object);
}

// ============================================================================
// Instance Callbacks
// ============================================================================

#[test]
fn test_notification_and_to_string() {
    let (host, _) = testing::install();
    let bridge = counter_bridge();
    let object = host.construct_object("Counter");

    host.notify(object, 13, false);
    host.notify(object, 1, true);
    let wrapped = bridge.bind(object).unwrap();
    assert_eq!(
        wrapped.with_state(|c: &mut Counter| c.notifications.clone()).unwrap(),
        vec![(13, false), (1, true)]
    );

    assert_eq!(
        host.describe(object).unwrap(),
        format!("[ GDExtension::Counter <--> Instance ID:{} ]", wrapped.instance_id())
    );
    host.destroy_object(object);
}

// ============================================================================
// Object Lifecycle
// ============================================================================

struct Beacon;

impl ExtensionClass for Beacon {
    const CLASS_NAME: &'static str = "Beacon";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Beacon
    }
}

#[test]
fn test_extension_object_lifecycle() {
    let (host, _) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Beacon>(InitializationLevel::Scene).unwrap();

    let object = host.construct_object("Beacon");
    assert!(!object.is_null());
    assert_eq!(host.class_of(object).as_deref(), Some("Beacon"));
    assert_eq!(bridge.bindings().count(), 1);
    assert!(!host.instance_of(object).is_null());
    assert_eq!(host.binding_of(object, bridge.token()), host.instance_of(object) as *mut _);

    let wrapped = bridge.bind(object).unwrap();
    assert!(wrapped.has_state());
    assert_eq!(wrapped.class_name(), "Beacon");
    assert_eq!(wrapped.owner(), object);

    host.destroy_object(object);
    assert_eq!(bridge.bindings().count(), 0);

    let object = bridge.instantiate("Beacon").unwrap();
    assert_eq!(bridge.bindings().count(), 1);
    host.destroy_object(object);
    assert_eq!(bridge.bindings().count(), 0);
}

#[test]
fn test_native_object_binding() {
    let (host, _) = testing::install();
    let bridge = bridge();

    let object = host.construct_object("Node");
    assert!(host.binding_of(object, bridge.token()).is_null());

    let first = bridge.bind(object).unwrap();
    let second = bridge.bind(object).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.has_state());
    assert_eq!(first.class_name(), "Node");
    assert_eq!(bridge.bindings().count(), 1);

    // Destroying the object frees the binding and its wrapper
    host.destroy_object(object);
    assert_eq!(bridge.bindings().count(), 0);
}

#[test]
fn test_unknown_class() {
    let (host, _) = testing::install();
    let bridge = bridge();
    assert!(bridge.instantiate("Phantom").is_err());
    assert!(host.construct_object("Phantom").is_null());
}

// ============================================================================
// Instance Pointers
// ============================================================================

#[test]
fn test_unknown_instance_pointer_is_rejected() {
    let (host, wire) = testing::install();
    let bridge = counter_bridge();

    // Memory that was never handed out as an instance
    let mut foreign = [0u64; 8];
    let instance = foreign.as_mut_ptr() as sys::GDExtensionClassInstancePtr;
    assert_eq!(
        host.call_on_instance("Counter", "get_total", instance, &[]).unwrap_err(),
        CallError::InstanceIsNull
    );
    assert_eq!(
        host.call_on_instance("Counter", "get_total", std::ptr::null_mut(), &[]).unwrap_err(),
        CallError::InstanceIsNull
    );
    let mut out = -1i64;
    assert!(unsafe { host.ptrcall_on_instance("Counter", "get_total", instance, &[], &mut out as *mut i64 as _) });
    assert_eq!(out, -1);
    assert_eq!(foreign, [0u64; 8]);

    // A freed instance is no longer reachable, even while its memory lives
    let object = host.construct_object("Counter");
    let live = host.instance_of(object);
    let ret = host.call_on_instance("Counter", "add", live, &[&int(4)]).unwrap();
    assert_eq!(i64::decode_variant(wire, &ret), 4);

    let wrapped = bridge.bind(object).unwrap();
    host.destroy_object(object);
    assert!(bridge.bindings().get(wrapped.handle()).is_none());
    assert_eq!(
        host.call_on_instance("Counter", "add", live, &[&int(4)]).unwrap_err(),
        CallError::InstanceIsNull
    );
    assert_eq!(wrapped.with_state(|counter: &mut Counter| counter.total).unwrap(), 4);
}

// ============================================================================
// Object Wrappers
// ============================================================================

/// Typed handle to a host `Node`
#[derive(Debug, Clone, Copy, PartialEq)]
struct NodeRef(ObjectHandle);

impl ObjectWrapper for NodeRef {
    fn from_handle(handle: ObjectHandle) -> Self {
        NodeRef(handle)
    }

    fn handle(&self) -> ObjectHandle {
        self.0
    }
}

hostbind::impl_object_wire_type!(NodeRef);

struct Linker {
    target: NodeRef,
}

impl ExtensionClass for Linker {
    const CLASS_NAME: &'static str = "Linker";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Linker {
            target: NodeRef(ObjectHandle::null()),
        }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_method("Linker", "Relink", "relink", Linker::relink, &["target"], vec![])?;
        Ok(())
    }
}

impl Linker {
    /// Point at `target`, returning the previous node
    fn relink(&mut self, target: NodeRef) -> NodeRef {
        std::mem::replace(&mut self.target, target)
    }
}

#[test]
fn test_object_wrapper_arguments() {
    let (host, wire) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Linker>(InitializationLevel::Scene).unwrap();

    let relink = host.method("Linker", "relink").unwrap();
    assert_eq!(relink.arguments, vec![("target".to_string(), VariantType::Object.sys())]);
    assert_eq!(relink.return_type, Some(VariantType::Object.sys()));

    let linker = host.construct_object("Linker");
    let node = host.construct_object("Node");

    // Boxed: the initial null handle comes back as nil
    let ret = host.call(linker, "relink", &[&NodeRef(node).encode_variant(wire)]).unwrap();
    assert!(ret.is_nil(wire));
    // Nil goes in as the null handle
    let ret = host.call(linker, "relink", &[&Variant::nil()]).unwrap();
    assert_eq!(ret.get_type(wire), VariantType::Object);
    assert_eq!(NodeRef::decode_variant(wire, &ret), NodeRef(node));
    assert!(NodeRef::decode_variant(wire, &Variant::nil()).0.is_null());

    // Raw: one object pointer per slot
    let node_ptr = node.as_sys();
    let args: [sys::GDExtensionConstTypePtr; 1] = [&node_ptr as *const sys::GDExtensionObjectPtr as _];
    let mut out = node.as_sys();
    assert!(unsafe { host.ptrcall(linker, "relink", &args, &mut out as *mut sys::GDExtensionObjectPtr as _) });
    assert!(out.is_null());

    let null_ptr: sys::GDExtensionObjectPtr = std::ptr::null_mut();
    let args: [sys::GDExtensionConstTypePtr; 1] = [&null_ptr as *const sys::GDExtensionObjectPtr as _];
    assert!(unsafe { host.ptrcall(linker, "relink", &args, &mut out as *mut sys::GDExtensionObjectPtr as _) });
    assert_eq!(out, node.as_sys());

    let wrapped = bridge.bind(linker).unwrap();
    assert!(wrapped.with_state(|linker: &mut Linker| linker.target.0.is_null()).unwrap());

    host.destroy_object(linker);
    host.destroy_object(node);
}
