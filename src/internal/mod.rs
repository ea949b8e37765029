//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod once_map;
pub(crate) mod teardown;

pub(crate) use circular::ResolutionStack;
pub(crate) use once_map::OnceMap;
pub(crate) use teardown::TeardownStack;
