//! Concurrent reduction: per-worker partials merged at join points.

pub mod ops;
pub mod reducer;

pub use ops::{Extremum, ExtremumOp, MaxWithIndex, MinWithIndex, VecAccumulate};
pub use reducer::{ReduceOp, Reducer};
