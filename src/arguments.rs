//! Resolved argument mappings.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{DependError, DependResult};
use crate::security::SecurityScopes;

/// Type-erased shared value produced by a field, model or dependency.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Ordered name → value mapping.
///
/// The resolver builds one of these for every callable it invokes, in the
/// callable's declaration order, and hands the endpoint's mapping back to the
/// caller. Request fields are stored as [`serde_json::Value`]; dependencies
/// and models are stored as whatever type they produced.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::Arguments;
/// use serde_json::json;
///
/// let mut args = Arguments::new();
/// args.insert("limit", std::sync::Arc::new(json!(25)));
/// args.insert("greeting", std::sync::Arc::new(String::from("hello")));
///
/// assert_eq!(args.deserialize::<u32>("limit").unwrap(), 25);
/// assert_eq!(args.get::<String>("greeting").unwrap().as_str(), "hello");
/// assert!(args.get::<u64>("greeting").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Arguments {
    entries: Vec<(&'static str, AnyArc)>,
    scopes: SecurityScopes,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_scopes(scopes: SecurityScopes) -> Self {
        Self {
            entries: Vec::new(),
            scopes,
        }
    }

    /// Adds a value. A later insert under the same name replaces the earlier one.
    pub fn insert(&mut self, name: &'static str, value: AnyArc) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the value stored under `name` as a `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> DependResult<Arc<T>> {
        let any = self
            .get_any(name)
            .ok_or_else(|| DependError::MissingArgument(name.to_string()))?;
        any.clone().downcast::<T>().map_err(|_| DependError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn get_any(&self, name: &str) -> Option<&AnyArc> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| value)
    }

    /// Returns a raw request field.
    pub fn json(&self, name: &str) -> DependResult<Arc<serde_json::Value>> {
        self.get::<serde_json::Value>(name)
    }

    /// Deserializes a raw request field into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> DependResult<T> {
        let raw = self.json(name)?;
        T::deserialize(raw.as_ref()).map_err(|_| DependError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Scopes declared by the callable receiving these arguments.
    pub fn security_scopes(&self) -> &SecurityScopes {
        &self.scopes
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_any(name).is_some()
    }

    /// Argument names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AnyArc)> {
        self.entries.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("names", &self.names().collect::<Vec<_>>())
            .field("scopes", &self.scopes.scopes())
            .finish()
    }
}
