//! Scope plumbing for authorization-aware dependencies.
//!
//! The engine does not decide whether a request is authorized. A dependency
//! declares the scopes it needs, the engine hands them to its body as
//! [`SecurityScopes`], and the body reports a [`ScopeDenied`] when the request
//! lacks one of them. The resolver turns that signal into
//! [`DependError::Security`](crate::DependError::Security).

use std::sync::Arc;

use crate::error::{BoxError, SecurityError};
use crate::key::CallableId;

/// Ordered, de-duplicated set of scopes declared by one dependency.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::SecurityScopes;
///
/// let scopes = SecurityScopes::new(["items:read", "admin", "items:read"]);
/// assert_eq!(scopes.scopes(), ["items:read", "admin"]);
/// assert_eq!(scopes.scope_str(), "items:read admin");
///
/// assert!(scopes.require(["admin", "items:read", "users:write"]).is_ok());
/// let denied = scopes.require(["items:read"]).unwrap_err();
/// assert_eq!(denied.missing, vec!["admin".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityScopes {
    scopes: Arc<[String]>,
}

impl SecurityScopes {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for scope in scopes {
            let scope = scope.into();
            if !ordered.contains(&scope) {
                ordered.push(scope);
            }
        }
        Self { scopes: ordered.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Scopes in declaration order.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Space-separated form, as carried by OAuth2 tokens.
    pub fn scope_str(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Checks the declared scopes against the scopes a request was granted.
    ///
    /// Returns the scope-failure signal listing every declared scope that was
    /// not granted, in declaration order.
    pub fn require<I, S>(&self, granted: I) -> Result<(), ScopeDenied>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let granted: Vec<S> = granted.into_iter().collect();
        let missing: Vec<String> = self
            .scopes
            .iter()
            .filter(|required| !granted.iter().any(|g| g.as_ref() == required.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScopeDenied { missing })
        }
    }
}

/// Signal returned by a dependency body when the request lacks required scopes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing scopes: {}", .missing.join(" "))]
pub struct ScopeDenied {
    pub missing: Vec<String>,
}

impl ScopeDenied {
    pub fn new<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }
}

/// Translates a scope-failure signal raised by `callable` into a
/// [`SecurityError`]. Any other error is handed back untouched.
pub(crate) fn check_scopes(
    callable: CallableId,
    required: &SecurityScopes,
    error: BoxError,
) -> Result<SecurityError, BoxError> {
    match error.downcast::<ScopeDenied>() {
        Ok(denied) => Ok(SecurityError {
            callable,
            required: required.scopes().to_vec(),
            missing: denied.missing,
        }),
        Err(other) => Err(other),
    }
}

/// Validates one declared scope token.
pub(crate) fn validate_scope(scope: &str) -> Result<(), String> {
    if scope.is_empty() {
        return Err("scope must not be empty".to_string());
    }
    if scope.chars().any(char::is_whitespace) {
        return Err(format!("scope `{}` must not contain whitespace", scope));
    }
    Ok(())
}
