use super::task::Task;
use super::worker::{with_worker_context, Worker, WorkerContext, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result};
use crossbeam_deque::{Injector, Steal, Stealer, Worker as WorkerQueue};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use tracing::{debug, warn};

/// Queue state shared between the pool handle, its worker threads, and any
/// scope currently joining on spawned work.
pub(crate) struct PoolShared {
    pub(crate) injector: Injector<Task>,
    pub(crate) stealers: Vec<Stealer<Task>>,
    shutdown: AtomicBool,
    pending: AtomicUsize,
    unparkers: RwLock<Vec<Thread>>,
    unpark_cursor: AtomicUsize,
}

impl PoolShared {
    fn new(stealers: Vec<Stealer<Task>>) -> Self {
        Self {
            injector: Injector::new(),
            stealers,
            shutdown: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            unparkers: RwLock::new(Vec::new()),
            unpark_cursor: AtomicUsize::new(0),
        }
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.stealers.len()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn pending_tasks(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Enqueue a task for execution.
    ///
    /// Called from one of this pool's workers, the task goes to the worker's
    /// own queue (depth-first pop, stolen breadth-first by peers). Called
    /// from any other thread, it goes to the global injector.
    pub(crate) fn schedule(&self, task: Task) {
        self.pending.fetch_add(1, Ordering::Relaxed);

        let overflow = with_worker_context(|ctx| match ctx {
            Some(ctx) if std::ptr::eq(Arc::as_ptr(&ctx.shared), self) => {
                ctx.queue.push(task);
                None
            }
            _ => Some(task),
        });

        if let Some(task) = overflow {
            self.injector.push(task);
        }

        self.unpark_one();
    }

    /// Execute one queued task inline, if any is available.
    ///
    /// This is how a thread blocked in `sync` keeps the pool moving: it
    /// drains its own queue first, then the injector, then steals from
    /// workers. Nested fork-join therefore never idles every thread.
    pub(crate) fn try_run_one(&self) -> bool {
        let task = with_worker_context(|ctx| match ctx {
            Some(ctx) if std::ptr::eq(Arc::as_ptr(&ctx.shared), self) => ctx.queue.pop(),
            _ => None,
        })
        .or_else(|| self.steal_global())
        .or_else(|| self.steal_any_worker());

        match task {
            Some(task) => {
                self.run_task(task);
                true
            }
            None => false,
        }
    }

    fn steal_global(&self) -> Option<Task> {
        loop {
            match self.injector.steal() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    fn steal_any_worker(&self) -> Option<Task> {
        for stealer in &self.stealers {
            loop {
                match stealer.steal() {
                    Steal::Success(task) => return Some(task),
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }
        None
    }

    /// Run a task to completion, absorbing panics.
    ///
    /// Scope-spawned bodies catch their own panics and record them for the
    /// join point; this catch is the backstop for anything that slips
    /// through, so one bad task never takes a worker thread down.
    pub(crate) fn run_task(&self, task: Task) {
        let id = task.id;
        let result = catch_unwind(AssertUnwindSafe(|| task.execute()));
        if result.is_err() {
            warn!(task = ?id, "task body panicked outside any scope");
        }
        self.finish_task();
    }

    pub(crate) fn finish_task(&self) {
        self.pending.fetch_sub(1, Ordering::Release);
    }

    fn unpark_one(&self) {
        let unparkers = self.unparkers.read();
        if unparkers.is_empty() {
            return;
        }
        let idx = self.unpark_cursor.fetch_add(1, Ordering::Relaxed) % unparkers.len();
        unparkers[idx].unpark();
    }

    fn set_unparkers(&self, unparkers: Vec<Thread>) {
        *self.unparkers.write() = unparkers;
    }

    fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        for unparker in self.unparkers.read().iter() {
            unparker.unpark();
        }
    }
}

/// Fixed-size worker pool with work stealing.
pub struct CpuPool {
    shared: Arc<PoolShared>,
    workers: Vec<WorkerHandle>,
    num_threads: usize,
}

struct WorkerHandle {
    #[allow(dead_code)]
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

impl CpuPool {
    pub fn new(config: &Config) -> Result<Self> {
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::executor("need at least 1 worker thread"));
        }

        let queues: Vec<WorkerQueue<Task>> =
            (0..num_threads).map(|_| WorkerQueue::new_lifo()).collect();
        let stealers = queues.iter().map(|q| q.stealer()).collect();
        let shared = Arc::new(PoolShared::new(stealers));

        let mut handles = Vec::with_capacity(num_threads);
        let mut unparkers = Vec::with_capacity(num_threads);

        for (id, queue) in queues.into_iter().enumerate() {
            let worker = Worker::new(WorkerContext {
                id,
                queue,
                shared: shared.clone(),
            });
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let thread = builder
                .spawn(move || worker.run())
                .map_err(|e| Error::executor(format!("worker spawn failed: {}", e)))?;

            unparkers.push(thread.thread().clone());
            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        shared.set_unparkers(unparkers);
        debug!(workers = num_threads, "worker pool started");

        Ok(Self {
            shared,
            workers: handles,
            num_threads,
        })
    }

    pub(crate) fn shared(&self) -> &Arc<PoolShared> {
        &self.shared
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared.pending_tasks()
    }

    pub fn shutdown(&mut self) {
        if self.shared.is_shut_down() {
            return;
        }
        self.shared.begin_shutdown();

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
        debug!("worker pool stopped");
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("num_threads", &self.num_threads)
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
