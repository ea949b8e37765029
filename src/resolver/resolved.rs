//! The successful outcome of a resolution.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::arguments::Arguments;
use crate::error::{DependError, DependResult, ResolveError, TeardownFailure};
use crate::internal::TeardownStack;
use crate::observer::Observers;
use crate::traits::Exit;

use super::cleanup;

/// Resolved endpoint arguments plus the generator resources backing them.
///
/// The resources stay acquired until [`close`](Resolved::close) is awaited.
/// Dropping a `Resolved` without closing it releases them anyway, with
/// [`Exit::Cancelled`].
///
/// # Examples
///
/// ```rust
/// use ferrous_depends::{Callable, Exit, Field, RequestData, Resolver, SignatureBuilder};
/// use serde_json::json;
///
/// struct ReadItem;
///
/// impl Callable for ReadItem {
///     fn declare(sig: &mut SignatureBuilder) {
///         sig.param("item_id", Field::path());
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let resolver = Resolver::new();
/// let request = RequestData::new().with_path("item_id", json!(3));
///
/// let resolved = resolver.resolve::<ReadItem>(&request).await.unwrap();
/// assert_eq!(resolved.arguments().deserialize::<u32>("item_id").unwrap(), 3);
/// resolved.close(Exit::Success).await.unwrap();
/// # }
/// ```
pub struct Resolved {
    arguments: Arguments,
    teardowns: TeardownStack,
    observers: Observers,
}

impl Resolved {
    pub(crate) fn new(arguments: Arguments, teardowns: TeardownStack, observers: Observers) -> Self {
        Self {
            arguments,
            teardowns,
            observers,
        }
    }

    /// The endpoint's arguments, in declaration order.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Shorthand for `arguments().get::<T>(name)`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> DependResult<Arc<T>> {
        self.arguments.get(name)
    }

    /// Number of generators still waiting to be released.
    pub fn pending_teardowns(&self) -> usize {
        self.teardowns.len()
    }

    /// Releases every generator resource, passing `exit` to each.
    ///
    /// Fails with [`DependError::Teardown`] if any teardown failed; all of
    /// them have run regardless.
    pub async fn close(self, exit: Exit) -> Result<(), ResolveError> {
        let failures = self.release(exit).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::new(DependError::Teardown(failures.len()), failures))
        }
    }

    pub(crate) async fn release(self, exit: Exit) -> Vec<TeardownFailure> {
        let Resolved {
            teardowns, observers, ..
        } = self;
        cleanup::run_teardowns(teardowns, &exit, &observers).await
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("arguments", &self.arguments)
            .field("pending_teardowns", &self.teardowns.len())
            .finish()
    }
}
