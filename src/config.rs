//! Resolver configuration.
//!
//! [`ResolverConfig`] can be built in code, deserialized with `serde` from any
//! format, or read from environment variables through
//! [`ResolverConfig::from_env`].

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on dependency nesting.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "FERROUS_DEPENDS";

/// Errors produced while loading configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration key `{key}` expects {expected}, got `{value}`")]
    InvalidValue {
        key: String,
        expected: &'static str,
        value: String,
    },
}

/// Tunables for a [`Resolver`](crate::Resolver).
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::ResolverConfig;
/// use std::time::Duration;
///
/// let config: ResolverConfig = serde_json::from_str(r#"{ "timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.max_depth, 1024);
/// assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
///
/// // A depth of zero would reject every resolution.
/// assert!(serde_json::from_str::<ResolverConfig>(r#"{ "max_depth": 0 }"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedConfig")]
pub struct ResolverConfig {
    /// Deepest dependency nesting allowed before resolution fails.
    pub max_depth: usize,
    /// Default time limit for one resolution, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout_ms: None,
        }
    }
}

/// Deserialized form of [`ResolverConfig`] before its values are checked.
#[derive(Deserialize)]
#[serde(default)]
struct UncheckedConfig {
    max_depth: usize,
    timeout_ms: Option<u64>,
}

impl Default for UncheckedConfig {
    fn default() -> Self {
        let ResolverConfig { max_depth, timeout_ms } = ResolverConfig::default();
        Self { max_depth, timeout_ms }
    }
}

impl TryFrom<UncheckedConfig> for ResolverConfig {
    type Error = ConfigError;

    fn try_from(unchecked: UncheckedConfig) -> Result<Self, ConfigError> {
        if unchecked.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_depth".to_string(),
                expected: "a positive integer",
                value: "0".to_string(),
            });
        }
        Ok(Self {
            max_depth: unchecked.max_depth,
            timeout_ms: unchecked.timeout_ms,
        })
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Reads `FERROUS_DEPENDS_MAX_DEPTH` and `FERROUS_DEPENDS_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Reads `<PREFIX>_MAX_DEPTH` and `<PREFIX>_TIMEOUT_MS`.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_source(&EnvironmentConfigSource::with_prefix(prefix))
    }

    /// Reads `max_depth` and `timeout_ms` from `source`, keeping defaults for
    /// absent keys.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = source.get("max_depth") {
            let depth = value.as_i64().filter(|depth| *depth > 0).ok_or_else(|| ConfigError::InvalidValue {
                key: "max_depth".to_string(),
                expected: "a positive integer",
                value: value.to_string(),
            })?;
            config.max_depth = depth as usize;
        }

        if let Some(value) = source.get("timeout_ms") {
            let timeout = value.as_i64().filter(|ms| *ms >= 0).ok_or_else(|| ConfigError::InvalidValue {
                key: "timeout_ms".to_string(),
                expected: "a non-negative integer",
                value: value.to_string(),
            })?;
            config.timeout_ms = Some(timeout as u64);
        }

        Ok(config)
    }
}

/// A raw configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ConfigValue {
    /// Parses a textual value, preferring integers, then booleans.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A source of configuration values keyed by lower-case names.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<ConfigValue>;
}

/// Reads `<PREFIX>_<KEY>` environment variables.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| ConfigValue::parse(&value))
    }
}

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_integers_then_booleans() {
        assert_eq!(ConfigValue::parse("42"), ConfigValue::Integer(42));
        assert_eq!(ConfigValue::parse("true"), ConfigValue::Boolean(true));
        assert_eq!(ConfigValue::parse("fast"), ConfigValue::String("fast".into()));
    }

    #[test]
    fn from_source_keeps_defaults_for_absent_keys() {
        let source = MapConfigSource::new().set("timeout_ms", ConfigValue::Integer(50));
        let config = ResolverConfig::from_source(&source).unwrap();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.timeout(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let source = MapConfigSource::new().set("max_depth", ConfigValue::Integer(0));
        let err = ResolverConfig::from_source(&source).unwrap_err();
        assert!(err.to_string().contains("max_depth"));

        let source = MapConfigSource::new().set("timeout_ms", ConfigValue::String("soon".into()));
        assert!(ResolverConfig::from_source(&source).is_err());
    }
}
