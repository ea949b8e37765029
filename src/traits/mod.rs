//! Traits implemented by endpoints and dependencies.

pub mod callable;
pub mod generator;

pub use callable::{Callable, Dependency};
pub use generator::{Exit, GeneratorDependency};
