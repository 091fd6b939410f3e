mod loader;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_yaml::Value;

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, message: String },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, message } => {
                write!(f, "Config type mismatch for '{key}': {message}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration loaded from YAML files, `.env` files and the environment.
///
/// Resolution order (lowest to highest priority):
/// 1. `application.yaml`
/// 2. `application-{profile}.yaml`
/// 3. `.env`, then `.env.{profile}` (never overwriting variables already set)
/// 4. Environment variables: `DATA_MANAGERS_PRIMARY_URL` overrides `data.managers.primary.url`
///
/// The profile comes from `REPOWIRE_PROFILE`, falling back to the argument.
#[derive(Debug, Clone)]
pub struct RepowireConfig {
    values: HashMap<String, Value>,
    profile: String,
}

impl RepowireConfig {
    /// Load configuration for `profile` from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load configuration for `profile` from the YAML files found in `dir`.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile =
            std::env::var("REPOWIRE_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("application.yaml"), &mut values)?;
        loader::load_yaml_file(
            &dir.join(format!("application-{active_profile}.yaml")),
            &mut values,
        )?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        for (env_key, env_val) in std::env::vars() {
            let key = env_key.to_lowercase().replace('_', ".");
            values.insert(key, loader::env_value(&env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");
        Ok(Self {
            values,
            profile: active_profile,
        })
    }

    /// Build a config from a YAML string, without file or environment lookup.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(Self {
            values,
            profile: profile.to_string(),
        })
    }

    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    /// Set a value programmatically, e.g. `config.set("data.default", "primary")`.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Deserialize the value stored under a dot-separated key.
    ///
    /// # Errors
    ///
    /// `NotFound` if the key is absent, `TypeMismatch` if it does not
    /// deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        serde_yaml::from_value(value.clone()).map_err(|e| ConfigError::TypeMismatch {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Like [`get`](Self::get), but a missing key yields `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Ok(v) => Ok(Some(v)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Names of the direct children of a section (`"data.managers"` →
    /// `["primary", "reporting"]`), sorted.
    pub fn children(&self, section: &str) -> Vec<String> {
        let prefix = format!("{section}.");
        let mut names: Vec<String> = self
            .values
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|rest| rest.split('.').next().unwrap_or(rest).to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}
