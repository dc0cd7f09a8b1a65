use crate::error::Result;
use crate::executor::panic_handler::TaskFault;
use crate::executor::{PoolShared, Task};
use crate::runtime::current_pool;
use crate::util::Backoff;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A fork-join scope: tasks spawned through it are all joined before the
/// scope is released.
///
/// A panic in a spawned task does not abort its siblings; it is recorded
/// and re-raised from [`sync`](Scope::sync) (or the enclosing [`scope`]
/// call) once every task in the scope has completed.
pub struct Scope<'scope> {
    pool: Arc<PoolShared>,
    tx: Sender<()>,
    rx: Receiver<()>,
    spawned: usize,
    completed: usize,
    faults: Arc<Mutex<Vec<TaskFault>>>,
    _marker: PhantomData<&'scope mut &'scope ()>,
}

impl<'scope> Scope<'scope> {
    fn new(pool: Arc<PoolShared>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            pool,
            tx,
            rx,
            spawned: 0,
            completed: 0,
            faults: Arc::new(Mutex::new(Vec::new())),
            _marker: PhantomData,
        }
    }

    /// Fork a child task.
    ///
    /// Never blocks. The child's start is unordered with the caller's
    /// continuation: it may run immediately on another worker or later on
    /// this one.
    pub fn spawn<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        let tx = self.tx.clone();
        let faults = self.faults.clone();
        self.spawned += 1;

        // Erase 'scope. sync() runs before any borrow in `f` can expire,
        // and Drop joins as a backstop if the scope body unwinds first.
        let f: Box<dyn FnOnce() + Send + 'static> =
            unsafe { std::mem::transmute(Box::new(f) as Box<dyn FnOnce() + Send + 'scope>) };

        self.pool.schedule(Task::new(move || {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
                faults.lock().push(TaskFault::from_payload(payload.as_ref()));
            }
            let _ = tx.send(());
        }));
    }

    /// Join every task spawned so far.
    ///
    /// On return, all child writes are visible to the caller. If any child
    /// panicked, the first recorded fault is returned as
    /// [`Error::TaskPanicked`](crate::Error::TaskPanicked), but only after
    /// the remaining siblings have run to completion.
    pub fn sync(&mut self) -> Result<()> {
        self.join_all();

        let fault = self.faults.lock().drain(..).next();
        match fault {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }

    fn join_all(&mut self) {
        let mut backoff = Backoff::new();

        while self.completed < self.spawned {
            if self.rx.try_recv().is_ok() {
                self.completed += 1;
                backoff.reset();
            } else if self.pool.try_run_one() {
                // Helped another task along while our children finish;
                // keeps nested joins from idling the whole pool.
                backoff.reset();
            } else {
                backoff.wait();
            }
        }
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("spawned", &self.spawned)
            .field("completed", &self.completed)
            .finish()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        // Borrows handed to spawn() must not outlive the scope even when
        // sync() was skipped (e.g. the scope body panicked).
        self.join_all();
    }
}

/// Run `f` with a fork-join scope on the current pool, joining all spawned
/// tasks before returning.
pub fn scope<'scope, F, R>(f: F) -> Result<R>
where
    F: FnOnce(&mut Scope<'scope>) -> R,
{
    scope_in(current_pool()?, f)
}

pub(crate) fn scope_in<'scope, F, R>(pool: Arc<PoolShared>, f: F) -> Result<R>
where
    F: FnOnce(&mut Scope<'scope>) -> R,
{
    let mut scope = Scope::new(pool);
    let result = f(&mut scope);
    scope.sync()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runtime::{init_thread_local_with_config, shutdown};
    use crate::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn with_runtime(test: impl FnOnce()) {
        init_thread_local_with_config(Config::builder().num_threads(4).build().unwrap()).unwrap();
        test();
        shutdown();
    }

    #[test]
    fn test_spawn_and_join() {
        with_runtime(|| {
            let counter = AtomicUsize::new(0);

            scope(|s| {
                for _ in 0..32 {
                    s.spawn(|| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
            .unwrap();

            assert_eq!(counter.load(Ordering::SeqCst), 32);
        });
    }

    #[test]
    fn test_empty_scope_is_noop() {
        with_runtime(|| {
            let result = scope(|_| 7).unwrap();
            assert_eq!(result, 7);
        });
    }

    #[test]
    fn test_explicit_sync_mid_scope() {
        with_runtime(|| {
            let first = AtomicUsize::new(0);
            let second = AtomicUsize::new(0);

            scope(|s| {
                s.spawn(|| {
                    first.fetch_add(1, Ordering::SeqCst);
                });
                s.sync().unwrap();
                // The first wave is joined; its writes are visible here.
                assert_eq!(first.load(Ordering::SeqCst), 1);

                s.spawn(|| {
                    second.fetch_add(1, Ordering::SeqCst);
                });
            })
            .unwrap();

            assert_eq!(second.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn test_nested_scopes() {
        with_runtime(|| {
            let counter = AtomicUsize::new(0);

            scope(|outer| {
                for _ in 0..4 {
                    outer.spawn(|| {
                        scope(|inner| {
                            for _ in 0..4 {
                                inner.spawn(|| {
                                    counter.fetch_add(1, Ordering::SeqCst);
                                });
                            }
                        })
                        .unwrap();
                    });
                }
            })
            .unwrap();

            assert_eq!(counter.load(Ordering::SeqCst), 16);
        });
    }

    #[test]
    fn test_fault_deferred_until_siblings_finish() {
        with_runtime(|| {
            let healthy = AtomicUsize::new(0);

            let result = scope(|s| {
                s.spawn(|| {
                    healthy.fetch_add(1, Ordering::SeqCst);
                });
                s.spawn(|| panic!("deliberate fault"));
                s.spawn(|| {
                    healthy.fetch_add(1, Ordering::SeqCst);
                });
            });

            match result {
                Err(Error::TaskPanicked(msg)) => assert_eq!(msg, "deliberate fault"),
                other => panic!("expected TaskPanicked, got {:?}", other),
            }
            assert_eq!(healthy.load(Ordering::SeqCst), 2);
        });
    }
}
