use crate::error::Result;
use crate::executor::PoolShared;
use crate::runtime::current_pool;
use crate::scope::scope_in;
use std::sync::Arc;

/// Ranges at or below this length are sorted sequentially; spawning a task
/// per tiny subrange would cost more than the sort itself.
const DEFAULT_SEQUENTIAL_CUTOFF: usize = 1024;

/// Sort `data` in place, in non-descending order, using fork-join
/// quicksort: partition, spawn one partition as a child task, sort the
/// other in the calling task, then sync.
///
/// The pivot is always the last element of the range, so already-sorted,
/// reverse-sorted, and all-equal input degrade to quadratic work. The
/// spawned side is always the smaller partition, which keeps stack depth
/// logarithmic even on those inputs.
pub fn parallel_sort<T: Ord + Send>(data: &mut [T]) -> Result<()> {
    parallel_sort_with_cutoff(data, DEFAULT_SEQUENTIAL_CUTOFF)
}

/// [`parallel_sort`] with an explicit sequential cutoff, mainly so tests
/// can force the spawning path on small inputs.
pub fn parallel_sort_with_cutoff<T: Ord + Send>(data: &mut [T], cutoff: usize) -> Result<()> {
    if data.len() <= 1 {
        return Ok(());
    }
    let pool = current_pool()?;
    quicksort(data, &pool, cutoff.max(1))
}

fn quicksort<T: Ord + Send>(data: &mut [T], pool: &Arc<PoolShared>, cutoff: usize) -> Result<()> {
    if data.len() <= cutoff {
        data.sort_unstable();
        return Ok(());
    }

    scope_in(pool.clone(), |s| {
        // Spawn the smaller partition and keep the larger one in this
        // task. A spawned range is at most half its parent, so neither
        // this loop's children nor a join helping them inline can nest
        // more than log2(len) sort frames deep, even when a degenerate
        // pivot leaves one side nearly the whole range.
        let mut rest = data;
        while rest.len() > cutoff {
            let mid = partition_last(rest);
            let (left, tail) = std::mem::take(&mut rest).split_at_mut(mid);
            // tail[0] is the pivot, already in its final position.
            let right = &mut tail[1..];

            let (small, large) = if left.len() <= right.len() {
                (left, right)
            } else {
                (right, left)
            };

            // The partitions are disjoint views, so sorting them
            // concurrently cannot race.
            s.spawn(move || {
                if let Err(e) = quicksort(small, pool, cutoff) {
                    std::panic::panic_any(e);
                }
            });
            rest = large;
        }
        rest.sort_unstable();
    })?;

    Ok(())
}

/// Partition around the last element: everything `< pivot` first, then the
/// pivot, then the rest. Returns the pivot's final index.
fn partition_last<T: Ord>(data: &mut [T]) -> usize {
    let pivot = data.len() - 1;
    let mut boundary = 0;

    for i in 0..pivot {
        if data[i] < data[pivot] {
            data.swap(i, boundary);
            boundary += 1;
        }
    }

    data.swap(boundary, pivot);
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_places_pivot() {
        let mut data = vec![5, 3, 8, 1, 9, 2];
        let mid = partition_last(&mut data);

        assert_eq!(data[mid], 2);
        assert!(data[..mid].iter().all(|&x| x < 2));
        assert!(data[mid + 1..].iter().all(|&x| x >= 2));
    }

    #[test]
    fn test_partition_all_equal() {
        let mut data = vec![4, 4, 4, 4];
        let mid = partition_last(&mut data);
        // Nothing is strictly less than the pivot.
        assert_eq!(mid, 0);
        assert_eq!(data, vec![4, 4, 4, 4]);
    }

    #[test]
    fn test_partition_two_elements() {
        let mut data = vec![2, 1];
        let mid = partition_last(&mut data);
        assert_eq!(mid, 0);
        assert_eq!(data, vec![1, 2]);

        let mut data = vec![1, 2];
        let mid = partition_last(&mut data);
        assert_eq!(mid, 1);
        assert_eq!(data, vec![1, 2]);
    }
}
