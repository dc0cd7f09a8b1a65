//! Parallel algorithms built on the scheduler and reducers.

pub mod accumulate;
pub mod extremum;
pub mod sort;

pub use accumulate::parallel_accumulate;
pub use extremum::{parallel_extremum, parallel_max, parallel_min};
pub use sort::{parallel_sort, parallel_sort_with_cutoff};
