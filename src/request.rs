//! Normalized request values handed to the resolver by an HTTP adapter.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::Location;

/// Read-only view of one request's extracted fields.
///
/// The adapter that owns the HTTP request fills this in once; the resolver
/// only reads from it. Header names are stored lower-cased so lookups are
/// case-insensitive.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{Location, RequestData};
/// use serde_json::json;
///
/// let request = RequestData::new()
///     .with_path("item_id", json!(7))
///     .with_query("q", json!("shoes"))
///     .with_header("X-Token", json!("secret"))
///     .with_body(json!({ "name": "boots" }));
///
/// assert_eq!(request.get(Location::Path, "item_id"), Some(&json!(7)));
/// assert_eq!(request.get(Location::Header, "x-token"), Some(&json!("secret")));
/// assert_eq!(request.get(Location::Body, "name"), Some(&json!("boots")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    path: HashMap<String, Value>,
    query: HashMap<String, Value>,
    headers: HashMap<String, Value>,
    cookies: HashMap<String, Value>,
    body: Option<Value>,
}

impl RequestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, key: impl Into<String>, value: Value) -> Self {
        self.path.insert(key.into(), value);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: Value) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value);
        self
    }

    pub fn with_cookie(mut self, key: impl Into<String>, value: Value) -> Self {
        self.cookies.insert(key.into(), value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Reads one field.
    ///
    /// For [`Location::Body`] the key selects a member of a JSON object body.
    pub fn get(&self, location: Location, key: &str) -> Option<&Value> {
        match location {
            Location::Path => self.path.get(key),
            Location::Query => self.query.get(key),
            Location::Header => self.headers.get(&key.to_ascii_lowercase()),
            Location::Cookie => self.cookies.get(key),
            Location::Body => self.body.as_ref().and_then(|body| body.get(key)),
        }
    }

    /// The whole request body, if one was sent.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}
