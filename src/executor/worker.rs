//! Worker threads and the thread-local worker context.

use super::cpu_pool::PoolShared;
use super::task::Task;
use crate::util::Backoff;
use crossbeam_deque::{Steal, Worker as WorkerQueue};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;
use tracing::{trace, warn};

pub type WorkerId = usize;

/// Per-thread state owned by a single pool worker.
///
/// The queue is only pushed and popped by the owning thread; other threads
/// reach it exclusively through the pool's stealers.
pub(crate) struct WorkerContext {
    pub(crate) id: WorkerId,
    pub(crate) queue: WorkerQueue<Task>,
    pub(crate) shared: Arc<PoolShared>,
}

thread_local! {
    static CURRENT: Cell<*const WorkerContext> = const { Cell::new(ptr::null()) };
}

/// Run `f` with the calling thread's worker context, if it is a pool worker.
///
/// The pointer is installed by `Worker::run` for the lifetime of the worker
/// loop and cleared before the loop returns, so the dereference is confined
/// to the owning thread while the context is live.
pub(crate) fn with_worker_context<R>(f: impl FnOnce(Option<&WorkerContext>) -> R) -> R {
    CURRENT.with(|slot| {
        let ptr = slot.get();
        if ptr.is_null() {
            f(None)
        } else {
            f(Some(unsafe { &*ptr }))
        }
    })
}

struct ContextGuard;

impl ContextGuard {
    fn install(ctx: &WorkerContext) -> Self {
        CURRENT.with(|slot| slot.set(ctx as *const WorkerContext));
        ContextGuard
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|slot| slot.set(ptr::null()));
    }
}

pub(crate) struct Worker {
    ctx: WorkerContext,
}

impl Worker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    /// Main loop: own queue first, then the global injector, then steal.
    pub fn run(&self) {
        let _guard = ContextGuard::install(&self.ctx);
        let mut backoff = Backoff::new();

        loop {
            if self.ctx.shared.is_shut_down() {
                break;
            }

            if let Some(task) = self.find_task() {
                backoff.reset();
                self.execute(task);
            } else {
                backoff.wait();
            }
        }

        trace!(worker = self.ctx.id, "worker exiting");
    }

    fn find_task(&self) -> Option<Task> {
        // Own queue pops newest-first: depth-first descent keeps the working
        // set cache-resident.
        if let Some(task) = self.ctx.queue.pop() {
            return Some(task);
        }

        loop {
            match self.ctx.shared.injector.steal_batch_and_pop(&self.ctx.queue) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        self.steal_from_peers()
    }

    /// Steal from peers in randomized order; stealers take the oldest task,
    /// which under recursive splitting is the largest remaining subproblem.
    fn steal_from_peers(&self) -> Option<Task> {
        use rand::seq::SliceRandom;
        use rand::thread_rng;

        let stealers = &self.ctx.shared.stealers;
        if stealers.len() <= 1 {
            return None;
        }

        let mut order: Vec<usize> = (0..stealers.len()).collect();
        order.shuffle(&mut thread_rng());

        for &idx in &order {
            if idx == self.ctx.id {
                continue;
            }

            loop {
                match stealers[idx].steal_batch_and_pop(&self.ctx.queue) {
                    Steal::Success(task) => {
                        trace!(worker = self.ctx.id, victim = idx, "stole work");
                        return Some(task);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    fn execute(&self, task: Task) {
        let id = task.id;
        let result = catch_unwind(AssertUnwindSafe(|| task.execute()));
        if result.is_err() {
            warn!(worker = self.ctx.id, task = ?id, "task body panicked outside any scope");
        }
        self.ctx
            .shared
            .finish_task();
    }
}
