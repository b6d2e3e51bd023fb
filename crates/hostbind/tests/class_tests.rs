//! Class registration tests against the mock host
//!
//! The mock host is shared by every test in this file, so each test
//! registers classes under names of its own.

use hostbind::codec::WireType;
use hostbind::dispatch;
use hostbind::sys::{self, VariantType};
use hostbind::testing;
use hostbind::types::ObjectHandle;
use hostbind::{
    BindResult, BindingError, Bridge, BridgeConfig, ClassDb, ExtensionClass, InitializationLevel, MethodFlags,
    SignalParam, Variant,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn bridge() -> Arc<Bridge> {
    let config = BridgeConfig {
        abort_on_contract_violation: false,
        ..BridgeConfig::default()
    };
    Bridge::new(testing::install().1, config)
}

// ============================================================================
// Members
// ============================================================================

struct Gadget {
    count: i64,
}

impl ExtensionClass for Gadget {
    const CLASS_NAME: &'static str = "Gadget";
    const PARENT_CLASS_NAME: &'static str = "Node";

    fn construct(_owner: ObjectHandle) -> Self {
        Gadget { count: 0 }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_method("Gadget", "GetCount", "get_count", Gadget::get_count, &[], vec![])?;
        db.bind_method("Gadget", "SetCount", "set_count", Gadget::set_count, &["count"], vec![])?;
        db.add_property_group("Gadget", "Counting", "count_")?;
        db.add_property_subgroup("Gadget", "Limits", "count_limit_")?;
        db.bind_property("Gadget", VariantType::Int, "count", "set_count", "get_count")?;
        db.bind_signal(
            "Gadget",
            "count_changed",
            &[
                SignalParam::new(VariantType::Int, "old"),
                SignalParam::new(VariantType::Int, "new"),
            ],
        )?;
        db.bind_integer_constant("Gadget", "MAX_COUNT", 100)?;
        db.bind_enum_constant("Gadget", "Mode", "MODE_FAST", 1)?;
        db.bind_bitfield_flag("Gadget", "Flags", "FLAG_LOUD", 4)?;
        Ok(())
    }
}

impl Gadget {
    fn get_count(&mut self) -> i64 {
        self.count
    }

    fn set_count(&mut self, count: i64) {
        self.count = count;
    }
}

#[test]
fn test_register_class_with_members() {
    let (host, _) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Gadget>(InitializationLevel::Scene).unwrap();

    assert!(host.has_class("Gadget"));
    assert_eq!(host.parent_of("Gadget").as_deref(), Some("Node"));
    assert_eq!(host.method_names("Gadget"), vec!["get_count", "set_count"]);

    let setter = host.method("Gadget", "set_count").unwrap();
    assert_eq!(setter.arguments, vec![("count".to_string(), VariantType::Int.sys())]);
    assert_eq!(setter.return_type, None);
    assert!(setter.ptrcall_func.is_some());
    let getter = host.method("Gadget", "get_count").unwrap();
    assert_eq!(getter.return_type, Some(VariantType::Int.sys()));
    assert_eq!(getter.argument_metadata, Vec::<u32>::new());

    let properties = host.properties("Gadget");
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].name, "count");
    assert_eq!(properties[0].setter, "set_count");
    assert_eq!(properties[0].getter, "get_count");
    assert_eq!(properties[0].usage, sys::PROPERTY_USAGE_DEFAULT);

    assert_eq!(host.groups("Gadget"), vec![("Counting".to_string(), "count_".to_string())]);
    assert_eq!(
        host.subgroups("Gadget"),
        vec![("Limits".to_string(), "count_limit_".to_string())]
    );

    let signals = host.signals("Gadget");
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].name, "count_changed");
    assert_eq!(signals[0].arguments.len(), 2);
    assert_eq!(signals[0].arguments[1].0, "new");

    let constants = host.constants("Gadget");
    assert_eq!(constants.len(), 3);
    assert_eq!(constants[0].enum_name, "");
    assert_eq!(constants[0].value, 100);
    assert_eq!(constants[1].enum_name, "Mode");
    assert!(!constants[1].is_bitfield);
    assert!(constants[2].is_bitfield);

    let info = bridge
        .classes()
        .with_class("Gadget", |class| {
            (class.method_count(), class.has_property("count"), class.has_signal("count_changed"))
        })
        .unwrap();
    assert_eq!(info, (2, true, true));
}

// ============================================================================
// Registration Errors
// ============================================================================

struct Ouroboros;

impl ExtensionClass for Ouroboros {
    const CLASS_NAME: &'static str = "Ouroboros";
    const PARENT_CLASS_NAME: &'static str = "Ouroboros";

    fn construct(_owner: ObjectHandle) -> Self {
        Ouroboros
    }
}

struct Orphan;

impl ExtensionClass for Orphan {
    const CLASS_NAME: &'static str = "Orphan";
    const PARENT_CLASS_NAME: &'static str = "Nowhere";

    fn construct(_owner: ObjectHandle) -> Self {
        Orphan
    }
}

struct Twice;

impl ExtensionClass for Twice {
    const CLASS_NAME: &'static str = "Twice";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Twice
    }
}

#[test]
fn test_registration_errors() {
    let (host, _) = testing::install();
    let bridge = bridge();

    assert_eq!(
        bridge.register_class::<Ouroboros>(InitializationLevel::Scene).unwrap_err(),
        BindingError::SelfParent("Ouroboros".into())
    );
    assert!(matches!(
        bridge.register_class::<Orphan>(InitializationLevel::Scene).unwrap_err(),
        BindingError::MissingParent { .. }
    ));
    assert!(!host.has_class("Orphan"));

    bridge.register_class::<Twice>(InitializationLevel::Scene).unwrap();
    assert_eq!(
        bridge.register_class::<Twice>(InitializationLevel::Scene).unwrap_err(),
        BindingError::DuplicateClass("Twice".into())
    );
    assert_eq!(bridge.classes().count(), 1);
}

struct Sprocket {
    size: i64,
}

impl ExtensionClass for Sprocket {
    const CLASS_NAME: &'static str = "Sprocket";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Sprocket { size: 1 }
    }
}

impl Sprocket {
    fn size(&mut self) -> i64 {
        self.size
    }

    fn resize(&mut self, size: i64, _grow: bool) {
        self.size = size;
    }

    fn measure(&mut self) -> (i64, i64) {
        (self.size, 0)
    }

    fn ready(&mut self) {}
}

#[test]
fn test_member_errors() {
    let bridge = bridge();
    bridge.register_class::<Sprocket>(InitializationLevel::Scene).unwrap();
    let db = bridge.classes();

    // Three names for two parameters
    assert!(matches!(
        db.bind_method("Sprocket", "Resize", "resize", Sprocket::resize, &["size", "grow", "extra"], vec![]),
        Err(BindingError::ArgumentNameMismatch { names: 3, params: 2, .. })
    ));
    assert!(matches!(
        db.bind_method("Sprocket", "Measure", "measure", Sprocket::measure, &[], vec![]),
        Err(BindingError::SecondReturnNotBool { .. })
    ));
    assert!(matches!(
        db.bind_method("Gizmo", "Size", "size", Sprocket::size, &[], vec![]),
        Err(BindingError::UnknownClass(_))
    ));

    db.bind_method("Sprocket", "Size", "size", Sprocket::size, &[], vec![]).unwrap();
    db.bind_method("Sprocket", "Resize", "resize", Sprocket::resize, &["size", "grow"], vec![])
        .unwrap();
    assert!(matches!(
        db.bind_method("Sprocket", "Size", "size", Sprocket::size, &[], vec![]),
        Err(BindingError::DuplicateMethod { .. })
    ));

    assert!(matches!(
        db.bind_property("Sprocket", VariantType::Int, "width", "", "width"),
        Err(BindingError::GetterMissing { .. })
    ));
    assert!(matches!(
        db.bind_property("Sprocket", VariantType::Int, "width", "", "resize"),
        Err(BindingError::GetterInvalid { arity: 2, .. })
    ));
    assert!(matches!(
        db.bind_property("Sprocket", VariantType::Int, "width", "resize", "size"),
        Err(BindingError::SetterInvalid { .. })
    ));
    db.bind_property("Sprocket", VariantType::Int, "width", "", "size").unwrap();
    assert!(matches!(
        db.bind_property("Sprocket", VariantType::Int, "width", "", "size"),
        Err(BindingError::DuplicateProperty { .. })
    ));

    db.bind_signal("Sprocket", "spun", &[]).unwrap();
    assert!(matches!(
        db.bind_signal("Sprocket", "spun", &[]),
        Err(BindingError::DuplicateSignal { .. })
    ));
    db.bind_integer_constant("Sprocket", "TEETH", 12).unwrap();
    assert!(matches!(
        db.bind_integer_constant("Sprocket", "TEETH", 13),
        Err(BindingError::DuplicateConstant { .. })
    ));

    // Virtual implementations follow the `V_` convention
    assert!(matches!(
        db.bind_virtual_method("Sprocket", "Ready", "_ready", Sprocket::ready, &[]),
        Err(BindingError::VirtualPrefixMissing { .. })
    ));
    assert!(matches!(
        db.bind_method("Sprocket", "V_Ready", "_ready", Sprocket::ready, &[], vec![]),
        Err(BindingError::UnexpectedVirtualPrefix { .. })
    ));
    // Virtual binds have no defaults to carry
    assert_eq!(
        db.bind_method_with_flags(
            "Sprocket",
            "V_Spin",
            "_spin",
            Sprocket::size,
            &[],
            vec![Variant::nil()],
            MethodFlags::DEFAULT | MethodFlags::VIRTUAL,
        )
        .unwrap_err(),
        BindingError::VirtualDefaults {
            class: "Sprocket".to_string(),
            method: "V_Spin".to_string(),
            defaults: 1,
        }
    );
    assert!(db.virtual_method("Sprocket", "_spin").is_none());
    db.bind_method_with_flags(
        "Sprocket",
        "V_Spin",
        "_spin",
        Sprocket::size,
        &[],
        vec![],
        MethodFlags::DEFAULT | MethodFlags::VIRTUAL,
    )
    .unwrap();
    assert!(db.virtual_method("Sprocket", "_spin").is_some());

    db.bind_virtual_method("Sprocket", "V_Ready", "_ready", Sprocket::ready, &[])
        .unwrap();
    assert!(db.virtual_method("Sprocket", "_ready").is_some());
    assert!(db.method("Sprocket", "_ready").is_none());
}

struct Lookout {
    range: i64,
}

impl ExtensionClass for Lookout {
    const CLASS_NAME: &'static str = "Lookout";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Lookout { range: 10 }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_method("Lookout", "GetRange", "get_range", Lookout::get_range, &[], vec![])?;
        db.bind_property("Lookout", VariantType::Int, "range", "", "get_range")?;
        db.bind_signal("Lookout", "spotted", &[])?;
        db.bind_integer_constant("Lookout", "MAX_RANGE", 10)?;
        Ok(())
    }
}

impl Lookout {
    fn get_range(&mut self) -> i64 {
        self.range
    }
}

#[test]
fn test_host_reads_registry_during_registration() {
    let (host, _) = testing::install();
    let bridge = bridge();
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let bridge = Arc::downgrade(&bridge);
        let seen = seen.clone();
        host.on_member_registered(move |class, member| {
            if class != "Lookout" {
                return;
            }
            let Some(bridge) = bridge.upgrade() else {
                return;
            };
            let methods = bridge.classes().with_class(class, |info| info.method_count());
            seen.lock().push((member.to_string(), methods));
        });
    }

    bridge.register_class::<Lookout>(InitializationLevel::Scene).unwrap();

    // Each member is recorded only after the host has accepted it
    assert_eq!(
        *seen.lock(),
        vec![
            ("get_range".to_string(), Some(0)),
            ("range".to_string(), Some(1)),
            ("spotted".to_string(), Some(1)),
            ("MAX_RANGE".to_string(), Some(1)),
        ]
    );
    let recorded = bridge
        .classes()
        .with_class("Lookout", |info| {
            (info.has_property("range"), info.has_signal("spotted"), info.has_constant("MAX_RANGE"))
        })
        .unwrap();
    assert_eq!(recorded, (true, true, true));
}

// ============================================================================
// Virtual Lookup
// ============================================================================

struct Engine {
    started: u32,
}

impl ExtensionClass for Engine {
    const CLASS_NAME: &'static str = "Engine";
    const PARENT_CLASS_NAME: &'static str = "Node";

    fn construct(_owner: ObjectHandle) -> Self {
        Engine { started: 0 }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_virtual_method("Engine", "V_Ready", "_ready", Engine::ready, &[])?;
        Ok(())
    }
}

impl Engine {
    fn ready(&mut self) {
        self.started += 1;
    }
}

struct TurboEngine;

impl ExtensionClass for TurboEngine {
    const CLASS_NAME: &'static str = "TurboEngine";
    const PARENT_CLASS_NAME: &'static str = "Engine";

    fn construct(_owner: ObjectHandle) -> Self {
        TurboEngine
    }
}

#[test]
fn test_virtual_lookup() {
    let (host, _) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Engine>(InitializationLevel::Scene).unwrap();
    bridge.register_class::<TurboEngine>(InitializationLevel::Scene).unwrap();

    assert!(!host.virtual_call_data("Engine", "_ready").is_null());
    assert!(host.virtual_call_data("Engine", "_process").is_null());
    // Only the class that binds an override answers for it
    assert!(host.virtual_call_data("TurboEngine", "_ready").is_null());
    assert!(bridge.classes().virtual_method("TurboEngine", "_ready").is_none());
    // Virtuals are not registered as regular methods
    assert!(host.method("Engine", "_ready").is_none());

    let object = host.construct_object("Engine");
    let data = host.virtual_call_data("Engine", "_ready");
    assert!(unsafe { host.call_virtual(object, "_ready", data, &[], std::ptr::null_mut()) });

    let wrapped = bridge.bind(object).unwrap();
    assert_eq!(wrapped.with_state(|engine: &mut Engine| engine.started).unwrap(), 1);
    host.destroy_object(object);
}

// ============================================================================
// Subclass Instances
// ============================================================================

struct Lantern {
    lit: bool,
}

impl ExtensionClass for Lantern {
    const CLASS_NAME: &'static str = "Lantern";
    const PARENT_CLASS_NAME: &'static str = "Node";

    fn construct(_owner: ObjectHandle) -> Self {
        Lantern { lit: false }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_virtual_method("Lantern", "V_Ready", "_ready", Lantern::ready, &[])?;
        db.bind_virtual_method("Lantern", "V_Get", "_get", Lantern::get, &["property"])?;
        db.bind_virtual_method("Lantern", "V_Set", "_set", Lantern::set, &["property", "value"])?;
        Ok(())
    }
}

impl Lantern {
    fn ready(&mut self) {
        self.lit = true;
    }

    fn get(&mut self, property: String) -> (Variant, bool) {
        match property.as_str() {
            "lit" => (self.lit.encode_variant(testing::install().1), true),
            _ => (Variant::nil(), false),
        }
    }

    fn set(&mut self, property: String, _value: Variant) -> bool {
        property == "lit"
    }
}

struct StormLantern {
    gusts: i64,
}

impl ExtensionClass for StormLantern {
    const CLASS_NAME: &'static str = "StormLantern";
    const PARENT_CLASS_NAME: &'static str = "Lantern";

    fn construct(_owner: ObjectHandle) -> Self {
        StormLantern { gusts: 3 }
    }

    fn bind_methods(db: &ClassDb) -> BindResult<()> {
        db.bind_virtual_method("StormLantern", "V_Get", "_get", StormLantern::get, &["property"])?;
        Ok(())
    }
}

impl StormLantern {
    fn get(&mut self, property: String) -> (Variant, bool) {
        match property.as_str() {
            "gusts" => (self.gusts.encode_variant(testing::install().1), true),
            _ => (Variant::nil(), false),
        }
    }
}

struct PaperLantern;

impl ExtensionClass for PaperLantern {
    const CLASS_NAME: &'static str = "PaperLantern";
    const PARENT_CLASS_NAME: &'static str = "Lantern";

    fn construct(_owner: ObjectHandle) -> Self {
        PaperLantern
    }
}

#[test]
fn test_subclass_instances_use_own_virtuals() {
    let (host, wire) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Lantern>(InitializationLevel::Scene).unwrap();
    bridge.register_class::<StormLantern>(InitializationLevel::Scene).unwrap();
    bridge.register_class::<PaperLantern>(InitializationLevel::Scene).unwrap();

    // An inherited `_ready` is left to the host
    assert!(!host.virtual_call_data("Lantern", "_ready").is_null());
    assert!(host.virtual_call_data("StormLantern", "_ready").is_null());
    assert!(host.virtual_call_data("PaperLantern", "_ready").is_null());

    let storm = host.construct_object("StormLantern");
    let paper = host.construct_object("PaperLantern");

    // The subclass answers with its own `_get` and declines the rest
    let gusts = host.get(storm, "gusts").unwrap();
    assert_eq!(i64::decode_variant(wire, &gusts), 3);
    assert!(host.get(storm, "lit").is_none());

    // Without its own `_get` or `_set` the subclass reports nothing
    let wrapped = bridge.bind(paper).unwrap();
    assert!(matches!(dispatch::get_property(&bridge, &wrapped, "lit"), Ok(None)));
    assert_eq!(dispatch::set_property(&bridge, &wrapped, "lit", &Variant::nil()), Ok(false));
    assert!(host.get(paper, "lit").is_none());
    assert!(!host.set(paper, "lit", &Variant::nil()));

    // The base class still runs its own overrides
    let lantern = host.construct_object("Lantern");
    let data = host.virtual_call_data("Lantern", "_ready");
    assert!(unsafe { host.call_virtual(lantern, "_ready", data, &[], std::ptr::null_mut()) });
    let lit = host.get(lantern, "lit").unwrap();
    assert!(bool::decode_variant(wire, &lit));

    host.destroy_object(storm);
    host.destroy_object(paper);
    host.destroy_object(lantern);
}

// ============================================================================
// Teardown
// ============================================================================

struct Frame;

impl ExtensionClass for Frame {
    const CLASS_NAME: &'static str = "Frame";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Frame
    }
}

struct Panel;

impl ExtensionClass for Panel {
    const CLASS_NAME: &'static str = "Panel";
    const PARENT_CLASS_NAME: &'static str = "Frame";

    fn construct(_owner: ObjectHandle) -> Self {
        Panel
    }
}

struct Tooling;

impl ExtensionClass for Tooling {
    const CLASS_NAME: &'static str = "Tooling";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Tooling
    }
}

#[test]
fn test_deinitialize_children_first() {
    let (host, _) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Frame>(InitializationLevel::Scene).unwrap();
    bridge.register_class::<Panel>(InitializationLevel::Scene).unwrap();
    bridge.register_class::<Tooling>(InitializationLevel::Editor).unwrap();

    assert_eq!(bridge.classes().initialize(InitializationLevel::Scene), 2);
    assert_eq!(bridge.classes().deinitialize(InitializationLevel::Scene), 2);

    let order: Vec<String> = host
        .unregistered()
        .into_iter()
        .filter(|name| name == "Frame" || name == "Panel")
        .collect();
    assert_eq!(order, vec!["Panel", "Frame"]);
    assert!(bridge.classes().contains("Tooling"));
    assert_eq!(bridge.classes().class_names(), vec!["Tooling"]);
}

struct Ephemeral;

impl ExtensionClass for Ephemeral {
    const CLASS_NAME: &'static str = "Ephemeral";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Ephemeral
    }
}

#[test]
fn test_destroy_class_twice() {
    let (host, _) = testing::install();
    let bridge = bridge();
    bridge.register_class::<Ephemeral>(InitializationLevel::Core).unwrap();

    assert!(bridge.classes().destroy_class("Ephemeral"));
    assert!(!host.has_class("Ephemeral"));
    assert!(!bridge.classes().destroy_class("Ephemeral"));
    assert_eq!(
        host.unregistered().iter().filter(|name| *name == "Ephemeral").count(),
        1
    );
}
