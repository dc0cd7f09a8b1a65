//! tine - fork-join parallel execution engine
//!
//! A fixed pool of workers cooperating via work stealing, scoped
//! `spawn`/`sync` fork-join, and Cilk-style reducers that let many
//! concurrent workers contribute to one logical result without locking on
//! the hot path.
//!
//! # Quick Start
//!
//! ```no_run
//! use tine::prelude::*;
//!
//! tine::init().unwrap();
//!
//! let mut data = vec![5, 3, 8, 1, 9, 2];
//! parallel_sort(&mut data).unwrap();
//! assert_eq!(data, vec![1, 2, 3, 5, 8, 9]);
//!
//! let min = parallel_min(&[5, 3, 8, 1, 9, 2]).unwrap();
//! assert_eq!((min.value, min.index), (1, 3));
//!
//! tine::shutdown();
//! ```
//!
//! # Features
//!
//! - **Fork-join scopes**: `spawn` children, `sync` joins them all, with
//!   panics deferred to the join point
//! - **Work stealing**: depth-first own-queue execution, breadth-first
//!   randomized stealing
//! - **Reducers**: per-worker partials merged associatively at join points
//!   (min/max with index, vector accumulation)
//! - **Parallel quicksort**: in-place partition-and-spawn sorting

#![warn(missing_debug_implementations)]

pub mod algo;
pub mod config;
pub mod error;
pub mod executor;
pub mod iter;
pub mod prelude;
pub mod reduce;
pub mod runtime;
pub mod scope;
pub mod util;

pub use algo::{
    parallel_accumulate, parallel_extremum, parallel_max, parallel_min, parallel_sort,
    parallel_sort_with_cutoff,
};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use iter::{par_for, IndexRange};
pub use reduce::{Extremum, MaxWithIndex, MinWithIndex, ReduceOp, Reducer, VecAccumulate};
pub use runtime::{
    init, init_thread_local, init_thread_local_with_config, init_with_config, shutdown,
};
pub use scope::scope;
