//! Scoped fork-join parallelism.

#[allow(clippy::module_inception)]
mod scope;

pub use scope::{scope, Scope};

pub(crate) use scope::scope_in;
