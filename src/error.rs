//! Error types for dependency resolution.

use std::time::Duration;

use crate::key::CallableId;

/// Boxed error returned by dependency bodies, endpoints and teardowns.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where a request field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Header => "header",
            Location::Cookie => "cookie",
            Location::Body => "body",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dependency graph itself is malformed.
///
/// Raised the first time a callable is introspected. The failure is cached
/// alongside successful descriptors, so every later use of the same callable
/// reports the same error without introspecting again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid signature for {callable}: {reason}")]
pub struct ConfigurationError {
    pub callable: CallableId,
    pub reason: String,
}

/// A dependency's scope requirement was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{callable} requires scopes [{}]; missing [{}]", .required.join(" "), .missing.join(" "))]
pub struct SecurityError {
    pub callable: CallableId,
    /// Scopes declared by the dependency, in declaration order.
    pub required: Vec<String>,
    /// Scopes the dependency reported as missing.
    pub missing: Vec<String>,
}

/// A missing or invalid request field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{location} field `{key}`: {message}")]
pub struct ValidationError {
    pub location: Location,
    pub key: String,
    pub message: String,
}

/// A teardown that failed while the cleanup coordinator unwound a resolution.
#[derive(Debug, thiserror::Error)]
#[error("teardown of {callable} failed: {source}")]
pub struct TeardownFailure {
    pub callable: CallableId,
    #[source]
    pub source: BoxError,
}

/// Dependency resolution errors.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::DependError;
///
/// let circular = DependError::Circular(vec!["Session", "CurrentUser", "Session"]);
/// assert_eq!(circular.to_string(), "circular dependency: Session -> CurrentUser -> Session");
///
/// let depth = DependError::DepthExceeded(1024);
/// assert_eq!(depth.to_string(), "max resolution depth 1024 exceeded");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DependError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Callable names along the cycle; the first and last entries are equal.
    #[error("circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The body of a dependency failed. The original error is kept as the source.
    #[error("dependency {callable} failed: {source}")]
    Dependency {
        callable: CallableId,
        #[source]
        source: BoxError,
    },

    /// The handler passed to [`Resolver::run`](crate::Resolver::run) failed.
    #[error("endpoint failed: {0}")]
    Endpoint(#[source] BoxError),

    /// The request itself succeeded but this many teardowns failed
    /// afterwards. The failures are in [`ResolveError::teardown_failures`].
    #[error("{0} teardown(s) failed")]
    Teardown(usize),

    #[error("argument `{name}` is not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    #[error("argument `{0}` was not resolved")]
    MissingArgument(String),

    #[error("max resolution depth {0} exceeded")]
    DepthExceeded(usize),

    #[error("resolution was cancelled")]
    Cancelled,

    #[error("resolution timed out after {0:?}")]
    Timeout(Duration),
}

impl DependError {
    /// True for failures caused by a scope check.
    pub fn is_security(&self) -> bool {
        matches!(self, DependError::Security(_))
    }

    /// True when the dependency graph is malformed rather than the request.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DependError::Configuration(_) | DependError::Circular(_))
    }

    /// Returns the error raised by a dependency body, if that is what failed.
    pub fn dependency_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DependError::Dependency { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type for resolution operations.
pub type DependResult<T> = Result<T, DependError>;

/// A failed resolution together with whatever its cleanup reported.
///
/// The primary error is always the one that ended resolution; teardown
/// failures collected while releasing already-acquired resources are kept
/// alongside it rather than replacing it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ResolveError {
    #[source]
    pub error: DependError,
    pub teardown_failures: Vec<TeardownFailure>,
}

impl ResolveError {
    pub(crate) fn new(error: DependError, teardown_failures: Vec<TeardownFailure>) -> Self {
        Self { error, teardown_failures }
    }

    /// The error that ended resolution.
    pub fn error(&self) -> &DependError {
        &self.error
    }

    pub fn into_error(self) -> DependError {
        self.error
    }
}

impl From<DependError> for ResolveError {
    fn from(error: DependError) -> Self {
        Self::new(error, Vec::new())
    }
}
