//! Configuration loading and the library entry sequence

use hostbind::config::{ENV_ABORT_ON_VIOLATION, ENV_MIN_LEVEL};
use hostbind::entry::{self, ExtensionInit};
use hostbind::sys;
use hostbind::testing;
use hostbind::types::ObjectHandle;
use hostbind::{BridgeConfig, ConfigError, ExtensionClass, InitializationLevel, LogConfig};
use log::LevelFilter;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
minimum_initialization_level = "servers"
abort_on_contract_violation = false

[log]
level = "trace"
forward_to_host = false
"#
    )
    .unwrap();

    let config = BridgeConfig::load(file.path()).unwrap();
    assert_eq!(config.minimum_initialization_level, InitializationLevel::Servers);
    assert!(!config.abort_on_contract_violation);
    assert_eq!(config.log.level, LevelFilter::Trace);
    assert!(!config.log.forward_to_host);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match BridgeConfig::load(&path) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path.display().to_string()),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_load_invalid_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "minimum_initialization_level = \"sometimes\"").unwrap();
    assert!(matches!(BridgeConfig::load(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_env_overrides() {
    let mut config = BridgeConfig::default();
    config
        .apply_env(|var| match var {
            ENV_MIN_LEVEL => Some("Core".to_string()),
            ENV_ABORT_ON_VIOLATION => Some("off".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.minimum_initialization_level, InitializationLevel::Core);
    assert!(!config.abort_on_contract_violation);
    assert_eq!(config.log, LogConfig::default());
}

// ============================================================================
// Entry Sequence
// ============================================================================

struct Relay;

impl ExtensionClass for Relay {
    const CLASS_NAME: &'static str = "Relay";
    const PARENT_CLASS_NAME: &'static str = "Object";

    fn construct(_owner: ObjectHandle) -> Self {
        Relay
    }
}

fn quiet_config() -> BridgeConfig {
    BridgeConfig {
        abort_on_contract_violation: false,
        log: LogConfig {
            level: LevelFilter::Warn,
            forward_to_host: false,
        },
        ..BridgeConfig::default()
    }
}

fn empty_initialization() -> sys::GDExtensionInitialization {
    sys::GDExtensionInitialization {
        minimum_initialization_level: 0,
        userdata: std::ptr::null_mut(),
        initialize: None,
        deinitialize: None,
    }
}

#[test]
fn test_entry_runs_levels() {
    let (host, _) = testing::install();
    let initialized = Arc::new(AtomicUsize::new(0));
    let terminated = Arc::new(AtomicUsize::new(0));

    let init = {
        let initialized = initialized.clone();
        let terminated = terminated.clone();
        ExtensionInit::new()
            .with_config(quiet_config())
            .on_initialize(InitializationLevel::Scene, move |bridge| {
                initialized.fetch_add(1, Ordering::SeqCst);
                bridge.register_class::<Relay>(InitializationLevel::Scene)
            })
            .on_deinitialize(InitializationLevel::Scene, move |_| {
                terminated.fetch_add(1, Ordering::SeqCst);
            })
    };

    let mut record = empty_initialization();
    let bridge = unsafe { entry::initialize_with_host(host, &mut record, init) }.unwrap();
    assert_eq!(record.minimum_initialization_level, InitializationLevel::Scene.sys());
    assert!(!record.userdata.is_null());

    let (Some(initialize), Some(deinitialize)) = (record.initialize, record.deinitialize) else {
        panic!("level callbacks not set");
    };
    unsafe {
        initialize(record.userdata, InitializationLevel::Scene.sys());
        initialize(record.userdata, InitializationLevel::Editor.sys());
    }
    assert_eq!(initialized.load(Ordering::SeqCst), 1);
    assert!(host.has_class("Relay"));
    assert!(bridge.classes().contains("Relay"));

    // The minimum level is torn down last and releases the entry state
    unsafe {
        deinitialize(record.userdata, InitializationLevel::Editor.sys());
        deinitialize(record.userdata, InitializationLevel::Scene.sys());
    }
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
    assert!(!host.has_class("Relay"));
    assert!(!bridge.classes().contains("Relay"));
    assert_eq!(Arc::strong_count(&bridge), 1);
}

#[test]
fn test_entry_minimum_level_is_capped() {
    let (host, _) = testing::install();
    let config = BridgeConfig {
        minimum_initialization_level: InitializationLevel::Servers,
        ..quiet_config()
    };
    let init = ExtensionInit::new()
        .with_config(config)
        .on_initialize(InitializationLevel::Editor, |_| Ok(()));

    let mut record = empty_initialization();
    let bridge = unsafe { entry::initialize_with_host(host, &mut record, init) }.unwrap();
    assert_eq!(record.minimum_initialization_level, InitializationLevel::Servers.sys());
    assert_eq!(bridge.config().minimum_initialization_level, InitializationLevel::Servers);

    // Tear down so the entry state is released
    if let Some(deinitialize) = record.deinitialize {
        unsafe { deinitialize(record.userdata, InitializationLevel::Servers.sys()) };
    }
    assert_eq!(Arc::strong_count(&bridge), 1);
}
