//! Bridge configuration
//!
//! Settings are read from TOML, either a string or a file, and may be
//! overridden from the environment:
//!
//! ```toml
//! minimum_initialization_level = "scene"
//! abort_on_contract_violation = true
//!
//! [log]
//! level = "debug"
//! forward_to_host = true
//! ```

use crate::error::ConfigError;
use hostbind_sys as sys;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `log.level`
pub const ENV_LOG: &str = "HOSTBIND_LOG";
/// Environment variable overriding `minimum_initialization_level`
pub const ENV_MIN_LEVEL: &str = "HOSTBIND_MIN_LEVEL";
/// Environment variable overriding `abort_on_contract_violation`
pub const ENV_ABORT_ON_VIOLATION: &str = "HOSTBIND_ABORT_ON_VIOLATION";

/// Host initialization phases, in ascending order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitializationLevel {
    Core,
    Servers,
    #[default]
    Scene,
    Editor,
}

impl InitializationLevel {
    /// Every level in ascending order.
    pub const ALL: [InitializationLevel; 4] = [
        InitializationLevel::Core,
        InitializationLevel::Servers,
        InitializationLevel::Scene,
        InitializationLevel::Editor,
    ];

    /// Convert a raw host level.
    pub fn from_sys(level: sys::GDExtensionInitializationLevel) -> Option<Self> {
        Self::ALL.get(level as usize).copied()
    }

    /// Raw host level.
    pub fn sys(self) -> sys::GDExtensionInitializationLevel {
        match self {
            InitializationLevel::Core => sys::GDEXTENSION_INITIALIZATION_CORE,
            InitializationLevel::Servers => sys::GDEXTENSION_INITIALIZATION_SERVERS,
            InitializationLevel::Scene => sys::GDEXTENSION_INITIALIZATION_SCENE,
            InitializationLevel::Editor => sys::GDEXTENSION_INITIALIZATION_EDITOR,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "core" => Some(InitializationLevel::Core),
            "servers" => Some(InitializationLevel::Servers),
            "scene" => Some(InitializationLevel::Scene),
            "editor" => Some(InitializationLevel::Editor),
            _ => None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level emitted
    pub level: LevelFilter,
    /// Send errors and warnings to the host's own log
    pub forward_to_host: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            forward_to_host: true,
        }
    }
}

/// Bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Highest level the host may be asked to start at. The lowest level
    /// with an initializer is reported when it is lower.
    pub minimum_initialization_level: InitializationLevel,
    /// Abort the process on a contract violation at the C boundary
    pub abort_on_contract_violation: bool,
    /// Logging
    pub log: LogConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            minimum_initialization_level: InitializationLevel::Editor,
            abort_on_contract_violation: true,
            log: LogConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_LOG) {
            self.log.level = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_LOG,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_MIN_LEVEL) {
            self.minimum_initialization_level =
                InitializationLevel::parse(&value).ok_or_else(|| ConfigError::InvalidEnv {
                    var: ENV_MIN_LEVEL,
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup(ENV_ABORT_ON_VIOLATION) {
            self.abort_on_contract_violation = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_ABORT_ON_VIOLATION,
                        value,
                    })
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.minimum_initialization_level, InitializationLevel::Editor);
        assert!(config.abort_on_contract_violation);
        assert_eq!(config.log.level, LevelFilter::Info);
        assert!(config.log.forward_to_host);
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            minimum_initialization_level = "core"

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.minimum_initialization_level, InitializationLevel::Core);
        assert!(config.abort_on_contract_violation);
        assert_eq!(config.log.level, LevelFilter::Debug);
        assert!(config.log.forward_to_host);
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = BridgeConfig::from_toml_str(r#"minimum_initialization_level = "bogus""#);
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_LOG, "trace"),
            (ENV_MIN_LEVEL, "Servers"),
            (ENV_ABORT_ON_VIOLATION, "off"),
        ]
        .into_iter()
        .collect();
        let mut config = BridgeConfig::default();
        config
            .apply_env(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.log.level, LevelFilter::Trace);
        assert_eq!(config.minimum_initialization_level, InitializationLevel::Servers);
        assert!(!config.abort_on_contract_violation);
    }

    #[test]
    fn test_env_invalid_value() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_env(|var| (var == ENV_ABORT_ON_VIOLATION).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { var: ENV_ABORT_ON_VIOLATION, .. }
        ));
    }

    #[test]
    fn test_level_sys_roundtrip() {
        for level in InitializationLevel::ALL {
            assert_eq!(InitializationLevel::from_sys(level.sys()), Some(level));
        }
        assert_eq!(InitializationLevel::from_sys(sys::GDEXTENSION_MAX_INITIALIZATION_LEVEL), None);
    }

    #[test]
    fn test_default_level() {
        assert_eq!(InitializationLevel::default(), InitializationLevel::Scene);
        // Classes register at scene level unless told otherwise
        #[derive(Deserialize)]
        struct Registration {
            #[serde(default)]
            level: InitializationLevel,
        }
        let registration: Registration = toml::from_str("").unwrap();
        assert_eq!(registration.level, InitializationLevel::Scene);
    }
}
