//! Task representation.

use std::sync::atomic::{AtomicU64, Ordering};

static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A unit of work queued on the pool.
///
/// The body runs exactly once; completion is observed by the scope that
/// spawned it, not by the task itself.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) body: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            id: TaskId::next(),
            body: Box::new(f),
        }
    }

    pub fn execute(self) {
        (self.body)();
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = Task::new(|| {});
        let b = Task::new(|| {});
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_execute_runs_body() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        Task::new(move || flag.store(true, Ordering::SeqCst)).execute();
        assert!(ran.load(Ordering::SeqCst));
    }
}
