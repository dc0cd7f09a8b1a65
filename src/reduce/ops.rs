//! Concrete reduction operators.

use super::reducer::ReduceOp;
use std::marker::PhantomData;

/// A value coupled with the index it was observed at.
///
/// Kept as one small record so combine operations move it atomically
/// instead of tracking two parallel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extremum<T> {
    pub value: T,
    pub index: usize,
}

impl<T> Extremum<T> {
    pub fn new(value: T, index: usize) -> Self {
        Self { value, index }
    }
}

/// Pick the winner between two located values.
///
/// `better(a, b)` means `a` beats `b`. Equal values resolve to the lower
/// index, so the result is the first occurrence in the original sequence
/// no matter how the work was split across workers.
fn pick<T>(
    current: Extremum<T>,
    candidate: Extremum<T>,
    better: impl Fn(&T, &T) -> bool,
) -> Extremum<T> {
    if better(&candidate.value, &current.value) {
        candidate
    } else if !better(&current.value, &candidate.value) && candidate.index < current.index {
        candidate
    } else {
        current
    }
}

fn fold_option<T>(
    acc: &mut Option<Extremum<T>>,
    item: Extremum<T>,
    better: impl Fn(&T, &T) -> bool,
) {
    *acc = Some(match acc.take() {
        Some(current) => pick(current, item, better),
        None => item,
    });
}

/// Running minimum with the index of its first occurrence.
#[derive(Debug)]
pub struct MinWithIndex<T>(PhantomData<fn() -> T>);

impl<T> Default for MinWithIndex<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Ord + Send> ReduceOp for MinWithIndex<T> {
    type Item = Extremum<T>;
    type Value = Option<Extremum<T>>;

    fn identity(&self) -> Self::Value {
        None
    }

    fn fold(&self, acc: &mut Self::Value, item: Self::Item) {
        fold_option(acc, item, |a, b| a < b);
    }

    fn combine(&self, a: Self::Value, b: Self::Value) -> Self::Value {
        match (a, b) {
            (Some(a), Some(b)) => Some(pick(a, b, |x, y| x < y)),
            (a, b) => a.or(b),
        }
    }
}

/// Running maximum with the index of its first occurrence.
#[derive(Debug)]
pub struct MaxWithIndex<T>(PhantomData<fn() -> T>);

impl<T> Default for MaxWithIndex<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Ord + Send> ReduceOp for MaxWithIndex<T> {
    type Item = Extremum<T>;
    type Value = Option<Extremum<T>>;

    fn identity(&self) -> Self::Value {
        None
    }

    fn fold(&self, acc: &mut Self::Value, item: Self::Item) {
        fold_option(acc, item, |a, b| a > b);
    }

    fn combine(&self, a: Self::Value, b: Self::Value) -> Self::Value {
        match (a, b) {
            (Some(a), Some(b)) => Some(pick(a, b, |x, y| x > y)),
            (a, b) => a.or(b),
        }
    }
}

/// Extremum under a caller-supplied comparator; `better(a, b)` is true when
/// `a` should win over `b`. Same tie-break as the `Ord`-based operators.
pub struct ExtremumOp<T, F> {
    better: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ExtremumOp<T, F> {
    pub fn new(better: F) -> Self {
        Self {
            better,
            _marker: PhantomData,
        }
    }
}

impl<T, F> std::fmt::Debug for ExtremumOp<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtremumOp").finish_non_exhaustive()
    }
}

impl<T, F> ReduceOp for ExtremumOp<T, F>
where
    T: Send,
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    type Item = Extremum<T>;
    type Value = Option<Extremum<T>>;

    fn identity(&self) -> Self::Value {
        None
    }

    fn fold(&self, acc: &mut Self::Value, item: Self::Item) {
        fold_option(acc, item, &self.better);
    }

    fn combine(&self, a: Self::Value, b: Self::Value) -> Self::Value {
        match (a, b) {
            (Some(a), Some(b)) => Some(pick(a, b, &self.better)),
            (a, b) => a.or(b),
        }
    }
}

/// Order-independent accumulation into a vector.
///
/// Elements contributed by one worker keep their relative order; the order
/// of blocks from different workers is unspecified.
#[derive(Debug)]
pub struct VecAccumulate<T>(PhantomData<fn() -> T>);

impl<T> Default for VecAccumulate<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Send> ReduceOp for VecAccumulate<T> {
    type Item = T;
    type Value = Vec<T>;

    fn identity(&self) -> Self::Value {
        Vec::new()
    }

    fn fold(&self, acc: &mut Self::Value, item: Self::Item) {
        acc.push(item);
    }

    fn combine(&self, mut a: Self::Value, mut b: Self::Value) -> Self::Value {
        if a.is_empty() {
            return b;
        }
        a.append(&mut b);
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_combine_prefers_smaller_value() {
        let op = MinWithIndex::<i32>::default();
        let merged = op.combine(
            Some(Extremum::new(3, 0)),
            Some(Extremum::new(1, 5)),
        );
        assert_eq!(merged, Some(Extremum::new(1, 5)));
    }

    #[test]
    fn test_min_tie_breaks_to_lower_index() {
        let op = MinWithIndex::<i32>::default();
        let merged = op.combine(
            Some(Extremum::new(1, 7)),
            Some(Extremum::new(1, 2)),
        );
        assert_eq!(merged, Some(Extremum::new(1, 2)));

        // Associativity under the tie-break: grouping does not matter.
        let a = Some(Extremum::new(1, 7));
        let b = Some(Extremum::new(1, 2));
        let c = Some(Extremum::new(1, 4));
        let left = op.combine(op.combine(a, b), c);
        let right = op.combine(a, op.combine(b, c));
        assert_eq!(left, right);
        assert_eq!(left, Some(Extremum::new(1, 2)));
    }

    #[test]
    fn test_max_fold_tracks_first_occurrence() {
        let op = MaxWithIndex::<i32>::default();
        let mut acc = op.identity();
        for (i, &v) in [2, 9, 4, 9, 1].iter().enumerate() {
            op.fold(&mut acc, Extremum::new(v, i));
        }
        assert_eq!(acc, Some(Extremum::new(9, 1)));
    }

    #[test]
    fn test_identity_is_neutral() {
        let op = MaxWithIndex::<i32>::default();
        let x = Some(Extremum::new(5, 3));
        assert_eq!(op.combine(op.identity(), x), x);
        assert_eq!(op.combine(x, op.identity()), x);
    }

    #[test]
    fn test_comparator_op_matches_ord_op() {
        let by_less = ExtremumOp::new(|a: &i32, b: &i32| a < b);
        let ord = MinWithIndex::<i32>::default();

        let a = Some(Extremum::new(4, 1));
        let b = Some(Extremum::new(4, 0));
        assert_eq!(by_less.combine(a, b), ord.combine(a, b));
    }

    #[test]
    fn test_vec_accumulate_concat_preserves_block_order() {
        let op = VecAccumulate::<u32>::default();
        let merged = op.combine(vec![1, 2], vec![3, 4]);
        assert_eq!(merged, vec![1, 2, 3, 4]);

        let merged = op.combine(Vec::new(), vec![7]);
        assert_eq!(merged, vec![7]);
    }
}
