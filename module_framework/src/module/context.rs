//! Per-session service locator handed to every lifecycle hook.
//!
//! A [`ModuleContext`] is read-only: services and config are registered on a
//! [`ModuleContextBuilder`] by the host, and modules can only look them up.
//! Anything modules need to tell each other goes through
//! [`ModuleContainer::send_message`](super::ModuleContainer::send_message).

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};

type Service = Arc<dyn Any + Send + Sync>;

/// Severity for [`ModuleContext::log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Read-only services, config and side flag for one session.
#[derive(Clone, Default)]
pub struct ModuleContext {
    typed_services: HashMap<TypeId, Service>,
    named_services: HashMap<String, Service>,
    config: HashMap<String, Value>,
    client_side: bool,
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("typed_services", &self.typed_services.len())
            .field("named_services", &self.named_services.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("client_side", &self.client_side)
            .finish()
    }
}

impl ModuleContext {
    pub fn builder() -> ModuleContextBuilder {
        ModuleContextBuilder::default()
    }

    /// Look up a service registered by type.
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.typed_services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Look up a service registered by name. Returns `None` if the name is
    /// unknown or the service has a different type.
    pub fn named_service<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.named_services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Read a config value, falling back to `default` when the key is missing
    /// or holds a value of another type.
    pub fn config_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.config.get(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!(key, error = %e, "config value has unexpected type, using default");
                    default
                }
            },
            None => default,
        }
    }

    pub fn is_client_side(&self) -> bool {
        self.client_side
    }

    /// Log through the host's tracing subscriber.
    pub fn log(&self, level: LogLevel, message: &str) {
        let side = if self.client_side { "client" } else { "server" };
        match level {
            LogLevel::Trace => tracing::trace!(side, "{}", message),
            LogLevel::Debug => tracing::debug!(side, "{}", message),
            LogLevel::Info => tracing::info!(side, "{}", message),
            LogLevel::Warn => tracing::warn!(side, "{}", message),
            LogLevel::Error => tracing::error!(side, "{}", message),
        }
    }
}

/// Host-side builder; the only way to register services and config.
#[derive(Default)]
pub struct ModuleContextBuilder {
    context: ModuleContext,
}

impl ModuleContextBuilder {
    pub fn with_service<T: Any + Send + Sync>(mut self, service: Arc<T>) -> Self {
        self.context
            .typed_services
            .insert(TypeId::of::<T>(), service);
        self
    }

    pub fn with_named_service<T: Any + Send + Sync>(
        mut self,
        name: impl Into<String>,
        service: Arc<T>,
    ) -> Self {
        self.context.named_services.insert(name.into(), service);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.config.insert(key.into(), value);
        self
    }

    /// Merge a TOML document into the config. Nested tables become dotted
    /// keys, so `[jetpack] thrust = 2` is read back as `"jetpack.thrust"`.
    pub fn with_config_toml(mut self, source: &str) -> ConfigResult<Self> {
        let table: toml::Table = source.parse()?;
        flatten_table("", &table, &mut self.context.config)?;
        Ok(self)
    }

    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        self.with_config_toml(&source)
    }

    pub fn client_side(mut self, client_side: bool) -> Self {
        self.context.client_side = client_side;
        self
    }

    pub fn build(self) -> ModuleContext {
        self.context
    }
}

fn flatten_table(
    prefix: &str,
    table: &toml::Table,
    out: &mut HashMap<String, Value>,
) -> ConfigResult<()> {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(nested) => flatten_table(&full_key, nested, out)?,
            other => {
                let converted = toml_to_json(&full_key, other)?;
                out.insert(full_key, converted);
            }
        }
    }
    Ok(())
}

fn toml_to_json(key: &str, value: &toml::Value) -> ConfigResult<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
            ConfigError::UnsupportedValue {
                key: key.to_string(),
                reason: format!("non-finite float {}", f),
            }
        })?,
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| toml_to_json(key, item))
                .collect::<ConfigResult<Vec<_>>>()?,
        ),
        toml::Value::Table(table) => {
            let mut map = serde_json::Map::new();
            for (k, v) in table {
                map.insert(k.clone(), toml_to_json(key, v)?);
            }
            Value::Object(map)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EnergyLedger {
        capacity: u32,
    }

    #[test]
    fn test_typed_service_lookup() {
        let context = ModuleContext::builder()
            .with_service(Arc::new(EnergyLedger { capacity: 500 }))
            .build();

        let ledger = context.service::<EnergyLedger>().unwrap();
        assert_eq!(ledger.capacity, 500);
        assert!(context.service::<String>().is_none());
    }

    #[test]
    fn test_named_service_lookup() {
        let context = ModuleContext::builder()
            .with_named_service("ledger", Arc::new(EnergyLedger { capacity: 42 }))
            .build();

        assert_eq!(context.named_service::<EnergyLedger>("ledger").unwrap().capacity, 42);
        // Wrong type under a known name.
        assert!(context.named_service::<String>("ledger").is_none());
        assert!(context.named_service::<EnergyLedger>("missing").is_none());
    }

    #[test]
    fn test_config_or_defaults() {
        let context = ModuleContext::builder()
            .with_config("tick_interval", json!(20))
            .with_config("label", json!("core"))
            .build();

        assert_eq!(context.config_or("tick_interval", 1u32), 20);
        assert_eq!(context.config_or("missing", 7u32), 7);
        // Type mismatch falls back to the default.
        assert_eq!(context.config_or("label", 3u32), 3);
    }

    #[test]
    fn test_config_from_toml() {
        let source = r#"
            debug = true

            [jetpack]
            thrust = 2.5
            fuel = 400
            tags = ["air", "mobility"]
        "#;
        let context = ModuleContext::builder()
            .with_config_toml(source)
            .unwrap()
            .build();

        assert!(context.config_or("debug", false));
        assert_eq!(context.config_or("jetpack.fuel", 0u32), 400);
        assert!((context.config_or("jetpack.thrust", 0.0f64) - 2.5).abs() < 1e-9);
        assert_eq!(
            context.config_value("jetpack.tags"),
            Some(&json!(["air", "mobility"]))
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = ModuleContext::builder().with_config_toml("not = [valid");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_client_side_flag() {
        let context = ModuleContext::builder().client_side(true).build();
        assert!(context.is_client_side());
        assert!(!ModuleContext::default().is_client_side());
    }
}
