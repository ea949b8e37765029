//! Releasing generator resources after a resolution.

use crate::error::TeardownFailure;
use crate::internal::TeardownStack;
use crate::observer::Observers;
use crate::traits::Exit;

/// Runs every pending teardown in reverse acquisition order.
///
/// A failing teardown does not stop the others; all failures are returned.
/// If this future is dropped part-way, the stack's drop handling finishes the
/// release in progress and runs the ones not yet started with
/// [`Exit::Cancelled`].
pub(crate) async fn run_teardowns(
    mut teardowns: TeardownStack,
    exit: &Exit,
    observers: &Observers,
) -> Vec<TeardownFailure> {
    let mut failures = Vec::new();

    while let Some((callable, outcome)) = teardowns.release_next(exit.clone()).await {
        match outcome {
            Ok(()) => observers.torn_down(callable, None),
            Err(failure) => {
                tracing::warn!(callable = callable.short_name(), error = %failure.source, "teardown failed");
                observers.torn_down(callable, Some(&failure));
                failures.push(failure);
            }
        }
    }

    failures
}
