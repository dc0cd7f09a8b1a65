use crate::error::Result;
use crate::iter::par_for;
use crate::reduce::{Reducer, VecAccumulate};

/// Evaluate `generator(i)` for every `i` in `0..count`, in parallel, and
/// collect the results.
///
/// The returned vector always has length `count` and contains exactly the
/// multiset `{generator(0), ..., generator(count - 1)}`. Elements produced
/// by one worker stay in index order relative to each other; the interleave
/// of blocks from different workers is unspecified.
pub fn parallel_accumulate<T, G>(count: usize, generator: G) -> Result<Vec<T>>
where
    T: Send,
    G: Fn(usize) -> T + Send + Sync,
{
    let reducer = Reducer::new(VecAccumulate::default())?;

    par_for(0..count, |i| {
        reducer.update(generator(i));
    })?;

    Ok(reducer.finalize())
}
