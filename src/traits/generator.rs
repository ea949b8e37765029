//! Two-phase setup/teardown dependencies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::arguments::{AnyArc, Arguments};
use crate::error::BoxError;
use crate::traits::Callable;

/// How the work that used a generator's value ended.
///
/// Passed to [`GeneratorDependency::finish`] so release logic can commit,
/// roll back or simply close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// Resolution and the endpoint both succeeded.
    Success,
    /// Resolution or the endpoint failed; carries the rendered error.
    Failure(String),
    /// The request was cancelled, timed out, or its resolution was dropped.
    Cancelled,
}

impl Exit {
    pub fn is_success(&self) -> bool {
        matches!(self, Exit::Success)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Success => f.write_str("success"),
            Exit::Failure(message) => write!(f, "failure: {}", message),
            Exit::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A dependency that acquires a resource, yields one value, and releases the
/// resource once the request is done with it.
///
/// `start` is the setup phase: it builds the guard object (`Self`) and the
/// value handed to dependents. `finish` is the release phase and runs exactly
/// once for every successful `start`, in reverse acquisition order relative
/// to the other generators of the same request. A failed `start` registers
/// nothing to release.
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{async_trait, Arguments, BoxError, Callable, Exit, GeneratorDependency, SignatureBuilder};
///
/// struct Connection { id: u32 }
///
/// struct DbSession { conn: u32 }
///
/// impl Callable for DbSession {
///     fn declare(_sig: &mut SignatureBuilder) {}
/// }
///
/// #[async_trait]
/// impl GeneratorDependency for DbSession {
///     type Output = Connection;
///
///     async fn start(_args: Arguments) -> Result<(Self, Connection), BoxError> {
///         Ok((DbSession { conn: 1 }, Connection { id: 1 }))
///     }
///
///     async fn finish(self, exit: Exit) -> Result<(), BoxError> {
///         if exit.is_success() {
///             // commit
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait GeneratorDependency: Callable + Send + Sized {
    type Output: Send + Sync + 'static;

    async fn start(args: Arguments) -> Result<(Self, Self::Output), BoxError>;

    async fn finish(self, exit: Exit) -> Result<(), BoxError>;
}

/// Resume handle of a started generator.
pub(crate) trait ErasedTeardown: Send {
    fn finish(self: Box<Self>, exit: Exit) -> BoxFuture<'static, Result<(), BoxError>>;
}

struct GeneratorHandle<G>(G);

impl<G: GeneratorDependency> ErasedTeardown for GeneratorHandle<G> {
    fn finish(self: Box<Self>, exit: Exit) -> BoxFuture<'static, Result<(), BoxError>> {
        self.0.finish(exit)
    }
}

pub(crate) type Started = (AnyArc, Box<dyn ErasedTeardown>);

/// Erased entry point of a generator dependency.
pub(crate) type GeneratorFn = fn(Arguments) -> BoxFuture<'static, Result<Started, BoxError>>;

pub(crate) fn invoke_generator<G: GeneratorDependency>(
    args: Arguments,
) -> BoxFuture<'static, Result<Started, BoxError>> {
    Box::pin(async move {
        let (handle, value) = G::start(args).await?;
        let handle: Box<dyn ErasedTeardown> = Box::new(GeneratorHandle(handle));
        Ok((Arc::new(value) as AnyArc, handle))
    })
}
