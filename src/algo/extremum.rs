use crate::error::{Error, Result};
use crate::iter::par_for;
use crate::reduce::{Extremum, ExtremumOp, MaxWithIndex, MinWithIndex, ReduceOp, Reducer};

/// Minimum of `data` with the smallest index at which it occurs.
///
/// Empty input is a usage error: no extremum exists.
pub fn parallel_min<T>(data: &[T]) -> Result<Extremum<T>>
where
    T: Ord + Clone + Send + Sync,
{
    reduce_extremum(data, MinWithIndex::default())
}

/// Maximum of `data` with the smallest index at which it occurs.
pub fn parallel_max<T>(data: &[T]) -> Result<Extremum<T>>
where
    T: Ord + Clone + Send + Sync,
{
    reduce_extremum(data, MaxWithIndex::default())
}

/// Extremum under a caller-supplied comparator: `better(a, b)` is true when
/// `a` should win over `b`. Ties resolve to the lower index, so results are
/// identical across worker counts.
pub fn parallel_extremum<T, F>(data: &[T], better: F) -> Result<Extremum<T>>
where
    T: Clone + Send + Sync,
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    reduce_extremum(data, ExtremumOp::new(better))
}

fn reduce_extremum<T, Op>(data: &[T], op: Op) -> Result<Extremum<T>>
where
    T: Clone + Send + Sync,
    Op: ReduceOp<Item = Extremum<T>, Value = Option<Extremum<T>>>,
{
    if data.is_empty() {
        return Err(Error::usage("extremum of empty input"));
    }

    let reducer = Reducer::new(op)?;
    par_for(0..data.len(), |i| {
        reducer.update(Extremum::new(data[i].clone(), i));
    })?;

    // Non-empty input touched at least one slot.
    reducer
        .finalize()
        .ok_or_else(|| Error::executor("extremum reduction produced no value"))
}
