//! Parallel iteration over index ranges.

pub mod par_for;

pub use par_for::{par_for, IndexRange};
