use crate::error::{Error, Result};
use crate::runtime::current_pool;
use crate::scope::scope_in;
use std::ops::Range;

/// Tasks to cut an index range into, per worker. A few chunks of slack per
/// worker lets stealing even out skewed per-element cost.
const CHUNKS_PER_WORKER: usize = 4;

/// A validated `[start, end)` index range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    start: usize,
    end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(Error::usage(format!(
                "invalid index range: start {} > end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl TryFrom<Range<usize>> for IndexRange {
    type Error = Error;

    fn try_from(range: Range<usize>) -> Result<Self> {
        IndexRange::new(range.start, range.end)
    }
}

/// Apply `body` to every index in `range`, in parallel.
///
/// The range is split into chunks sized off the pool width; callers never
/// chunk manually. Returns once every index has been visited; a panicking
/// body surfaces as `Error::TaskPanicked` after the remaining chunks have
/// still been processed.
pub fn par_for<F>(range: Range<usize>, body: F) -> Result<()>
where
    F: Fn(usize) + Sync,
{
    let range = IndexRange::try_from(range)?;
    if range.is_empty() {
        return Ok(());
    }

    let pool = current_pool()?;
    let chunk = chunk_size(range.len(), pool.num_workers());

    scope_in(pool, |s| {
        let body = &body;
        let mut lo = range.start();
        while lo < range.end() {
            let hi = (lo + chunk).min(range.end());
            s.spawn(move || {
                for i in lo..hi {
                    body(i);
                }
            });
            lo = hi;
        }
    })?;

    Ok(())
}

fn chunk_size(len: usize, workers: usize) -> usize {
    (len / (workers * CHUNKS_PER_WORKER).max(1)).max(1)
}
