//! # ferrous-depends
//!
//! Request-scoped dependency resolution for async Rust services, in the style
//! of declarative `Depends` parameters.
//!
//! ## Features
//!
//! - **Declared signatures**: every endpoint and dependency describes its
//!   parameters once; the description is cached for the life of the process
//! - **Per-request caching**: a dependency used many times in one request runs once
//! - **Generators**: two-phase dependencies whose resources are always
//!   released, in reverse order, with the request's outcome
//! - **Circular dependency detection**: cycles fail with the full chain instead
//!   of overflowing the stack
//! - **Scopes**: dependencies declare authorization scopes and report missing
//!   ones as a typed [`SecurityError`]
//! - **Cancellation and timeouts**: abandoned resolutions still clean up
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_depends::{
//!     async_trait, Arguments, BoxError, Callable, Depends, Exit, Field, GeneratorDependency, RequestData,
//!     Resolver, SignatureBuilder,
//! };
//! use serde_json::json;
//!
//! struct Connection { url: String }
//!
//! // A generator: opens a connection, closes it after the request.
//! struct Database;
//!
//! impl Callable for Database {
//!     fn declare(_sig: &mut SignatureBuilder) {}
//! }
//!
//! #[async_trait]
//! impl GeneratorDependency for Database {
//!     type Output = Connection;
//!
//!     async fn start(_args: Arguments) -> Result<(Self, Connection), BoxError> {
//!         Ok((Database, Connection { url: "postgres://localhost".into() }))
//!     }
//!
//!     async fn finish(self, _exit: Exit) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! // The endpoint only declares what it needs.
//! struct ReadUser;
//!
//! impl Callable for ReadUser {
//!     fn declare(sig: &mut SignatureBuilder) {
//!         sig.param("user_id", Field::path())
//!             .param("db", Depends::generator::<Database>());
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let resolver = Resolver::new();
//! let request = RequestData::new().with_path("user_id", json!(42));
//!
//! let url = resolver
//!     .run::<ReadUser, _, _, _>(&request, |args| async move {
//!         let user_id: u64 = args.deserialize("user_id")?;
//!         let db = args.get::<Connection>("db")?;
//!         Ok::<_, BoxError>(format!("{}/users/{}", db.url, user_id))
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(url, "postgres://localhost/users/42");
//! # }
//! ```
//!
//! ## Resolution Order
//!
//! Parameters resolve in declaration order, depth first: a dependency's own
//! parameters resolve before it runs. Generators are released in exactly the
//! reverse of the order they started.

// Module declarations
pub mod arguments;
pub mod cancellation;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod observer;
pub mod request;
pub mod resolver;
pub mod security;
pub mod signature;
pub mod signature_cache;
pub mod traits;

// Internal modules
mod internal;

// Re-export core types
pub use arguments::{AnyArc, Arguments};
pub use cancellation::CancellationToken;
pub use config::{ConfigError, ConfigSource, ConfigValue, EnvironmentConfigSource, MapConfigSource, ResolverConfig};
pub use descriptors::{CallableRef, DependencyDescriptor, DependencyKind};
pub use error::{
    BoxError, ConfigurationError, DependError, DependResult, Location, ResolveError, SecurityError, TeardownFailure,
    ValidationError,
};
pub use key::{callable_id, CallableId};
pub use observer::{ResolutionObserver, TracingObserver};
pub use request::RequestData;
pub use resolver::{ResolveOptions, Resolved, Resolver, ResolverBuilder};
pub use security::{ScopeDenied, SecurityScopes};
pub use signature::{Depends, Field, Model, ParamSource, Parameter, SignatureBuilder};
pub use signature_cache::SignatureCache;
pub use traits::{Callable, Dependency, Exit, GeneratorDependency};

pub use async_trait::async_trait;
