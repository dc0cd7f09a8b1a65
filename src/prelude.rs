//! One-stop imports for the common API surface.

pub use crate::algo::{
    parallel_accumulate, parallel_extremum, parallel_max, parallel_min, parallel_sort,
    parallel_sort_with_cutoff,
};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::iter::{par_for, IndexRange};
pub use crate::reduce::{Extremum, MaxWithIndex, MinWithIndex, ReduceOp, Reducer, VecAccumulate};
pub use crate::scope::{scope, Scope};
pub use crate::{init, init_with_config, shutdown};
