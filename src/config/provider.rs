//! Layered configuration sources and mapping lookup
//!
//! Precedence, lowest to highest:
//! 1. serde defaults declared on the mapping
//! 2. discovered YAML files (`application.yaml` / `config/application.yaml`)
//! 3. files added with [`ConfigBuilder::with_file`]
//! 4. `QABASE_*` environment variables
//! 5. explicit properties
//!
//! Environment keys use `__` between segments and `_` inside a segment, so
//! `QABASE_WEBUI__BASE_URL` becomes `qabase.webui.base-url`.

use figment::providers::{Env, Format as _, Serialized, Yaml};
use figment::value::{Dict, Value};
use figment::Figment;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::{ConfigError, ConfigMapping};

/// Names probed below the project root by [`ConfigBuilder::add_discovered_sources`]
const DISCOVERED_FILES: &[&str] = &[
    "application.yaml",
    "application.yml",
    "config/application.yaml",
    "config/application.yml",
];

/// Points at one more YAML file to treat as discovered
pub const CONFIG_FILE_ENV: &str = "QABASE_CONFIG_FILE";

const ENV_PREFIX: &str = "QABASE_";

static CURRENT: RwLock<Option<Arc<ConfigProvider>>> = parking_lot::const_rwlock(None);

type Registration = fn(&Figment) -> Result<Arc<dyn Any + Send + Sync>, ConfigError>;

/// Resolved configuration plus the mappings registered at build time
pub struct ConfigProvider {
    figment: Figment,
    mappings: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("mappings", &self.mappings.len())
            .finish()
    }
}

impl ConfigProvider {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Make this provider the ambient one consulted by [`load_mapping`].
    pub fn install(self) -> Arc<ConfigProvider> {
        let provider = Arc::new(self);
        *CURRENT.write() = Some(provider.clone());
        provider
    }

    pub fn current() -> Option<Arc<ConfigProvider>> {
        CURRENT.read().clone()
    }

    pub fn uninstall() -> Option<Arc<ConfigProvider>> {
        CURRENT.write().take()
    }

    /// Return the mapping registered for `T`.
    pub fn mapping<T: ConfigMapping>(&self) -> Result<T, ConfigError> {
        self.mappings
            .get(&TypeId::of::<T>())
            .and_then(|m| m.downcast_ref::<T>())
            .cloned()
            .ok_or(ConfigError::Unregistered(std::any::type_name::<T>()))
    }

    pub fn is_registered<T: ConfigMapping>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<T>())
    }

    /// Raw lookup of a dotted key, rendered as a string
    pub fn value(&self, key: &str) -> Option<String> {
        let value = self.figment.find_value(key).ok()?;
        match value {
            Value::String(_, s) => Some(s),
            other => serde_json::to_value(&other).ok().map(|json| match json {
                serde_json::Value::String(s) => s,
                json => json.to_string(),
            }),
        }
    }

    pub fn value_or(&self, key: &str, default: &str) -> String {
        self.value(key).unwrap_or_else(|| default.to_string())
    }

    pub fn bool_value(&self, key: &str, default: bool) -> bool {
        self.figment.extract_inner::<bool>(key).unwrap_or(default)
    }
}

/// Builder mirroring the ambient provider's bootstrap path
#[derive(Default)]
pub struct ConfigBuilder {
    default_sources: bool,
    discovered_sources: bool,
    root: Option<PathBuf>,
    files: Vec<PathBuf>,
    properties: Vec<(String, String)>,
    registrations: Vec<(TypeId, Registration)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `QABASE_*` environment variables
    pub fn add_default_sources(mut self) -> Self {
        self.default_sources = true;
        self
    }

    /// Read `application.yaml` style files below the project root
    pub fn add_discovered_sources(mut self) -> Self {
        self.discovered_sources = true;
        self
    }

    /// Directory searched for discovered files (default: current directory)
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Set one dotted key, e.g. `qabase.webui.headless` = `true`
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Register `T`; it is extracted and validated by [`ConfigBuilder::build`].
    pub fn with_mapping<T: ConfigMapping>(mut self) -> Self {
        let id = TypeId::of::<T>();
        if !self.registrations.iter().any(|(existing, _)| *existing == id) {
            self.registrations.push((id, register::<T>));
        }
        self
    }

    pub fn build(self) -> Result<ConfigProvider, ConfigError> {
        let figment = self.figment();
        let mut mappings = HashMap::new();
        for (id, registration) in &self.registrations {
            mappings.insert(*id, registration(&figment)?);
        }
        Ok(ConfigProvider { figment, mappings })
    }

    fn figment(&self) -> Figment {
        let mut figment = Figment::new();

        if self.discovered_sources {
            let root = self
                .root
                .clone()
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from("."));
            for path in discovered_files(&root) {
                debug!("Using config file {}", path.display());
                figment = figment.merge(Yaml::file(path));
            }
        }

        for path in &self.files {
            figment = figment.merge(Yaml::file(path));
        }

        if self.default_sources {
            figment = figment.merge(env_source());
        }

        for (key, value) in &self.properties {
            figment = figment.merge(Serialized::default(key.as_str(), parse_scalar(value)));
        }

        figment
    }
}

/// Load `T` from the ambient provider, or bootstrap one from default and
/// discovered sources.
pub fn load_mapping<T: ConfigMapping>() -> Result<T, ConfigError> {
    load_mapping_with::<T, _>(|builder| builder)
}

/// Like [`load_mapping`]; `customize` can add sources to the bootstrap builder.
pub fn load_mapping_with<T, F>(customize: F) -> Result<T, ConfigError>
where
    T: ConfigMapping,
    F: FnOnce(ConfigBuilder) -> ConfigBuilder,
{
    if let Some(current) = ConfigProvider::current() {
        if let Ok(mapped) = current.mapping::<T>() {
            return Ok(mapped);
        }
        debug!(
            "Mapping {} not registered with ambient provider, bootstrapping",
            std::any::type_name::<T>()
        );
    }

    let builder = ConfigBuilder::new()
        .add_default_sources()
        .add_discovered_sources()
        .with_mapping::<T>();
    customize(builder).build()?.mapping::<T>()
}

fn register<T: ConfigMapping>(figment: &Figment) -> Result<Arc<dyn Any + Send + Sync>, ConfigError> {
    Ok(Arc::new(extract::<T>(figment)?))
}

fn extract<T: ConfigMapping>(figment: &Figment) -> Result<T, ConfigError> {
    // An empty section lets a mapping made only of defaults resolve with no sources.
    let mapping: T = figment
        .clone()
        .join(Serialized::default(T::PREFIX, Dict::new()))
        .extract_inner(T::PREFIX)
        .map_err(|e| ConfigError::lookup(T::PREFIX, e))?;
    mapping.validate()?;
    Ok(mapping)
}

fn discovered_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = DISCOVERED_FILES
        .iter()
        .map(|name| root.join(name))
        .filter(|path| path.is_file())
        .collect();

    if let Ok(extra) = std::env::var(CONFIG_FILE_ENV) {
        let extra = PathBuf::from(extra);
        if extra.is_file() {
            files.push(extra);
        }
    }

    files
}

fn env_source() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        let nested = key
            .as_str()
            .to_ascii_lowercase()
            .split("__")
            .map(|segment| segment.replace('_', "-"))
            .collect::<Vec<_>>()
            .join(".");
        format!("qabase.{}", nested).into()
    })
}

/// Properties are strings; numbers and booleans keep their YAML meaning.
/// A number whose text does not round-trip (`0042`, `1.50`) stays a string.
fn parse_scalar(raw: &str) -> serde_yaml::Value {
    match serde_yaml::from_str::<serde_yaml::Value>(raw) {
        Ok(serde_yaml::Value::Number(n)) if n.to_string() == raw.trim() => {
            serde_yaml::Value::Number(n)
        }
        Ok(value @ (serde_yaml::Value::Bool(_) | serde_yaml::Value::String(_))) => value,
        _ => serde_yaml::Value::String(raw.to_string()),
    }
}
