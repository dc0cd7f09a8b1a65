//! Task execution infrastructure: the worker pool, worker threads, task
//! representation, and panic capture.

pub mod cpu_pool;
pub mod panic_handler;
pub mod task;
pub mod worker;

pub use cpu_pool::CpuPool;
pub use panic_handler::TaskFault;
pub use task::TaskId;
pub use worker::WorkerId;

pub(crate) use cpu_pool::PoolShared;
pub(crate) use task::Task;
pub(crate) use worker::with_worker_context;
