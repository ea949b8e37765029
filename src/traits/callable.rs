//! Callable and plain-dependency traits.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::arguments::{AnyArc, Arguments};
use crate::error::BoxError;
use crate::signature::SignatureBuilder;

/// Anything whose parameters the resolver can introspect.
///
/// Endpoints implement only this trait; the resolver computes their arguments
/// and hands them back without invoking anything. Dependencies additionally
/// implement [`Dependency`] or
/// [`GeneratorDependency`](crate::GeneratorDependency).
///
/// `declare` is the introspection entry point. It runs once per type for the
/// lifetime of the process (the result is kept by the
/// [`SignatureCache`](crate::SignatureCache)), so it must be a pure
/// description of the parameter list.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{Callable, Field, SignatureBuilder};
///
/// struct ListItems;
///
/// impl Callable for ListItems {
///     fn declare(sig: &mut SignatureBuilder) {
///         sig.param("q", Field::query().optional())
///             .param("limit", Field::query().default(serde_json::json!(10)));
///     }
/// }
/// ```
pub trait Callable: 'static {
    fn declare(sig: &mut SignatureBuilder);
}

/// A dependency that returns its value directly.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{async_trait, Arguments, BoxError, Callable, Dependency, Field, SignatureBuilder};
///
/// struct Pagination { skip: u64, limit: u64 }
///
/// struct Paginate;
///
/// impl Callable for Paginate {
///     fn declare(sig: &mut SignatureBuilder) {
///         sig.param("skip", Field::query().default(serde_json::json!(0)))
///             .param("limit", Field::query().default(serde_json::json!(100)));
///     }
/// }
///
/// #[async_trait]
/// impl Dependency for Paginate {
///     type Output = Pagination;
///
///     async fn call(args: Arguments) -> Result<Pagination, BoxError> {
///         Ok(Pagination {
///             skip: args.deserialize("skip")?,
///             limit: args.deserialize("limit")?,
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Dependency: Callable + Send + Sync {
    type Output: Send + Sync + 'static;

    async fn call(args: Arguments) -> Result<Self::Output, BoxError>;
}

/// Erased entry point of a plain dependency.
pub(crate) type PlainFn = fn(Arguments) -> BoxFuture<'static, Result<AnyArc, BoxError>>;

pub(crate) fn invoke_plain<D: Dependency>(args: Arguments) -> BoxFuture<'static, Result<AnyArc, BoxError>> {
    Box::pin(async move {
        let value = D::call(args).await?;
        Ok(Arc::new(value) as AnyArc)
    })
}
