use crate::error::Result;
use crate::executor::with_worker_context;
use crate::runtime::current_pool;
use crate::util::CachePadded;
use parking_lot::Mutex;

/// An associative reduction operator.
///
/// `combine` must be associative and `combine(identity(), x)` must equal
/// `x`; under those laws the final value is independent of how work was
/// distributed across workers.
pub trait ReduceOp: Send + Sync {
    type Item: Send;
    type Value: Send;

    fn identity(&self) -> Self::Value;

    /// Fold one element into a per-worker partial.
    fn fold(&self, acc: &mut Self::Value, item: Self::Item);

    /// Merge two partials.
    fn combine(&self, a: Self::Value, b: Self::Value) -> Self::Value;
}

/// A concurrent accumulator: one private partial per worker, merged once
/// after the parallel region has joined.
///
/// Each slot is touched only by its owning worker during the region, so the
/// slot mutexes are uncontended; they exist to satisfy the borrow rules,
/// not to arbitrate access. [`finalize`](Reducer::finalize) consumes the
/// reducer, so a region still borrowing it for updates cannot be collapsed
/// early: collapse-before-read holds at compile time.
pub struct Reducer<Op: ReduceOp> {
    op: Op,
    slots: Box<[CachePadded<Mutex<Option<Op::Value>>>]>,
}

impl<Op: ReduceOp> Reducer<Op> {
    /// Create a reducer sized for the current pool: one slot per worker
    /// plus one for threads outside the pool.
    pub fn new(op: Op) -> Result<Self> {
        let pool = current_pool()?;
        Ok(Self::with_slots(op, pool.num_workers() + 1))
    }

    pub fn with_slots(op: Op, slots: usize) -> Self {
        let slots = (0..slots.max(1))
            .map(|_| CachePadded::new(Mutex::new(None)))
            .collect();
        Self { op, slots }
    }

    fn slot_index(&self) -> usize {
        with_worker_context(|ctx| match ctx {
            Some(ctx) if ctx.id + 1 < self.slots.len() => ctx.id,
            _ => self.slots.len() - 1,
        })
    }

    /// Fold `item` into the calling worker's partial.
    pub fn update(&self, item: Op::Item) {
        let mut guard = self.slots[self.slot_index()].lock();
        let view = guard.get_or_insert_with(|| self.op.identity());
        self.op.fold(view, item);
    }

    /// Run `f` against the calling worker's partial, lazily initialized to
    /// the identity on first access.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut Op::Value) -> R) -> R {
        let mut guard = self.slots[self.slot_index()].lock();
        let view = guard.get_or_insert_with(|| self.op.identity());
        f(view)
    }

    /// Collapse all partials into one value.
    ///
    /// Callable only once the parallel region has joined, enforced by
    /// ownership, since in-flight tasks hold `&Reducer`.
    pub fn finalize(self) -> Op::Value {
        let Reducer { op, slots } = self;

        let mut acc = op.identity();
        for slot in slots.into_vec() {
            if let Some(partial) = slot.into_inner().into_inner() {
                acc = op.combine(acc, partial);
            }
        }
        acc
    }
}

impl<Op: ReduceOp> std::fmt::Debug for Reducer<Op> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reducer")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plain sum, used only to exercise the arena mechanics.
    struct SumOp;

    impl ReduceOp for SumOp {
        type Item = u64;
        type Value = u64;

        fn identity(&self) -> u64 {
            0
        }

        fn fold(&self, acc: &mut u64, item: u64) {
            *acc += item;
        }

        fn combine(&self, a: u64, b: u64) -> u64 {
            a + b
        }
    }

    #[test]
    fn test_untouched_reducer_finalizes_to_identity() {
        let reducer = Reducer::with_slots(SumOp, 4);
        assert_eq!(reducer.finalize(), 0);
    }

    #[test]
    fn test_updates_accumulate() {
        let reducer = Reducer::with_slots(SumOp, 4);
        for i in 1..=10 {
            reducer.update(i);
        }
        assert_eq!(reducer.finalize(), 55);
    }

    #[test]
    fn test_with_view_initializes_lazily() {
        let reducer = Reducer::with_slots(SumOp, 2);
        let seen = reducer.with_view(|view| {
            let initial = *view;
            *view = 9;
            initial
        });
        assert_eq!(seen, 0);
        assert_eq!(reducer.finalize(), 9);
    }
}
