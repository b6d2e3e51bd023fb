//! Library entry point
//!
//! The host calls the extension's entry function once, with its
//! `get_proc_address` loader. [`initialize`] loads the host table, builds
//! the [`Bridge`] and fills in the initialization record so the host calls
//! back at every level:
//!
//! ```ignore
//! #[no_mangle]
//! pub unsafe extern "C" fn my_extension_init(
//!     get_proc_address: sys::GDExtensionInterfaceGetProcAddress,
//!     library: sys::GDExtensionClassLibraryPtr,
//!     r_initialization: *mut sys::GDExtensionInitialization,
//! ) -> sys::GDExtensionBool {
//!     let init = ExtensionInit::new().on_initialize(InitializationLevel::Scene, |bridge| {
//!         bridge.register_class::<Widget>(InitializationLevel::Scene)
//!     });
//!     hostbind::entry::initialize(get_proc_address, library, r_initialization, init).is_ok() as _
//! }
//! ```

use crate::config::{BridgeConfig, InitializationLevel};
use crate::error::{BindResult, BindingError};
use crate::host::{HostApi, InterfaceHost};
use crate::{logging, wire, Bridge};
use hostbind_sys as sys;
use std::collections::BTreeMap;
use std::ffi::c_void;
use std::sync::Arc;

/// Runs when the host reaches a level, before the level's classes are
/// initialized
pub type LevelInitializer = Box<dyn Fn(&Bridge) -> BindResult<()> + Send + Sync>;

/// Runs when the host leaves a level, after the level's classes are torn
/// down
pub type LevelTerminator = Box<dyn Fn(&Bridge) + Send + Sync>;

/// Per-level hooks of an extension
#[derive(Default)]
pub struct ExtensionInit {
    config: Option<BridgeConfig>,
    initializers: BTreeMap<InitializationLevel, LevelInitializer>,
    terminators: BTreeMap<InitializationLevel, LevelTerminator>,
}

impl ExtensionInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of reading the environment.
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn on_initialize(
        mut self,
        level: InitializationLevel,
        f: impl Fn(&Bridge) -> BindResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.initializers.insert(level, Box::new(f));
        self
    }

    pub fn on_deinitialize(mut self, level: InitializationLevel, f: impl Fn(&Bridge) + Send + Sync + 'static) -> Self {
        self.terminators.insert(level, Box::new(f));
        self
    }

    /// Lowest level with an initializer
    pub fn lowest_level(&self) -> Option<InitializationLevel> {
        self.initializers.keys().next().copied()
    }
}

impl std::fmt::Debug for ExtensionInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionInit")
            .field("config", &self.config)
            .field("initializers", &self.initializers.keys().collect::<Vec<_>>())
            .field("terminators", &self.terminators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What the host hands back to the level callbacks
struct EntryState {
    bridge: Arc<Bridge>,
    init: ExtensionInit,
    /// Last level torn down; the state is released after it
    minimum: InitializationLevel,
}

/// Load the host through `get_proc_address` and fill in `r_initialization`.
///
/// # Safety
///
/// The arguments must be the ones the host passed to the entry function.
pub unsafe fn initialize(
    get_proc_address: sys::GDExtensionInterfaceGetProcAddress,
    library: sys::GDExtensionClassLibraryPtr,
    r_initialization: *mut sys::GDExtensionInitialization,
    init: ExtensionInit,
) -> BindResult<Arc<Bridge>> {
    if init.lowest_level().is_none() {
        return Err(BindingError::NoInitializer);
    }
    let host: &'static InterfaceHost = Box::leak(Box::new(InterfaceHost::load(get_proc_address, library)?));
    initialize_with_host(host, r_initialization, init)
}

/// Entry sequence over an already loaded host.
///
/// # Safety
///
/// `r_initialization` must be null or writable.
pub unsafe fn initialize_with_host(
    host: &'static dyn HostApi,
    r_initialization: *mut sys::GDExtensionInitialization,
    init: ExtensionInit,
) -> BindResult<Arc<Bridge>> {
    let lowest = init.lowest_level().ok_or(BindingError::NoInitializer)?;

    let wire = wire::get_or_install(|| host);
    let (config, env_error) = match &init.config {
        Some(config) => (config.clone(), None),
        None => match BridgeConfig::from_env() {
            Ok(config) => (config, None),
            Err(err) => (BridgeConfig::default(), Some(err)),
        },
    };
    logging::init(&config.log, Some(host));
    if let Some(err) = env_error {
        log::warn!("{}, using default configuration", err);
    }

    let version = host.version();
    log::info!(
        "host {}.{}.{} ({})",
        version.major,
        version.minor,
        version.patch,
        version.string
    );

    let minimum = lowest.min(config.minimum_initialization_level);
    let bridge = Bridge::new(wire, config);
    let state = Box::new(EntryState {
        bridge: bridge.clone(),
        init,
        minimum,
    });

    if let Some(out) = r_initialization.as_mut() {
        *out = sys::GDExtensionInitialization {
            minimum_initialization_level: minimum.sys(),
            userdata: Box::into_raw(state) as *mut c_void,
            initialize: Some(initialize_level),
            deinitialize: Some(deinitialize_level),
        };
    }
    log::info!("extension loaded, minimum level {:?}", minimum);
    Ok(bridge)
}

unsafe extern "C" fn initialize_level(userdata: *mut c_void, p_level: sys::GDExtensionInitializationLevel) {
    let Some(state) = (userdata as *const EntryState).as_ref() else {
        return;
    };
    let Some(level) = InitializationLevel::from_sys(p_level) else {
        log::warn!("unknown initialization level {}", p_level);
        return;
    };
    if let Some(initializer) = state.init.initializers.get(&level) {
        if let Err(err) = initializer(&state.bridge) {
            log::error!("initializer for {:?} failed: {}", level, err);
            if state.bridge.config().abort_on_contract_violation {
                std::process::abort();
            }
        }
    }
    state.bridge.classes().initialize(level);
}

unsafe extern "C" fn deinitialize_level(userdata: *mut c_void, p_level: sys::GDExtensionInitializationLevel) {
    let Some(state) = (userdata as *const EntryState).as_ref() else {
        return;
    };
    let Some(level) = InitializationLevel::from_sys(p_level) else {
        return;
    };
    state.bridge.classes().deinitialize(level);
    if let Some(terminator) = state.init.terminators.get(&level) {
        terminator(&state.bridge);
    }
    if level == state.minimum {
        log::info!("extension unloaded");
        drop(Box::from_raw(userdata as *mut EntryState));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_level() {
        let init = ExtensionInit::new()
            .on_initialize(InitializationLevel::Editor, |_| Ok(()))
            .on_initialize(InitializationLevel::Servers, |_| Ok(()));
        assert_eq!(init.lowest_level(), Some(InitializationLevel::Servers));
        assert_eq!(ExtensionInit::new().lowest_level(), None);
    }

    #[test]
    fn test_no_initializer() {
        let init = ExtensionInit::new().on_deinitialize(InitializationLevel::Scene, |_| {});
        let err = unsafe { initialize(None, std::ptr::null_mut(), std::ptr::null_mut(), init) }.unwrap_err();
        assert_eq!(err, BindingError::NoInitializer);
    }

    #[test]
    fn test_missing_loader() {
        let init = ExtensionInit::new().on_initialize(InitializationLevel::Scene, |_| Ok(()));
        let err = unsafe { initialize(None, std::ptr::null_mut(), std::ptr::null_mut(), init) }.unwrap_err();
        assert_eq!(err, BindingError::MissingEntryPoint("get_proc_address"));
    }
}
