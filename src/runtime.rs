use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{with_worker_context, CpuPool, PoolShared};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;
use tracing::debug;

pub struct Runtime {
    pub(crate) pool: Arc<CpuPool>,
    config: Config,
}

impl Runtime {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let pool = CpuPool::new(&config)?;

        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.pool.num_threads()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("pool", &self.pool)
            .finish()
    }
}

// Global runtime for the simple API
static GLOBAL_RUNTIME: RwLock<Option<Arc<Runtime>>> = RwLock::new(None);

// Thread-local runtime for isolated tests
thread_local! {
    static THREAD_RUNTIME: std::cell::RefCell<Option<Arc<Runtime>>> =
        const { std::cell::RefCell::new(None) };
}

// Track which threads have opted into thread-local runtimes
static THREAD_RUNTIME_MAP: OnceLock<Mutex<HashMap<ThreadId, bool>>> = OnceLock::new();

fn thread_runtime_map() -> &'static Mutex<HashMap<ThreadId, bool>> {
    THREAD_RUNTIME_MAP.get_or_init(|| Mutex::new(HashMap::new()))
}

fn uses_thread_local() -> bool {
    let thread_id = std::thread::current().id();
    thread_runtime_map()
        .lock()
        .get(&thread_id)
        .copied()
        .unwrap_or(false)
}

/// Initialize the global runtime with the default configuration.
pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

pub fn init_with_config(config: Config) -> Result<()> {
    if uses_thread_local() {
        let occupied = THREAD_RUNTIME.with(|rt| rt.borrow().is_some());
        if occupied {
            return Err(Error::AlreadyInitialized);
        }

        let rt = Runtime::new(config)?;
        THREAD_RUNTIME.with(|cell| {
            *cell.borrow_mut() = Some(Arc::new(rt));
        });
        Ok(())
    } else {
        let mut runtime = GLOBAL_RUNTIME.write();

        if runtime.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let rt = Runtime::new(config)?;
        debug!(workers = rt.num_threads(), "runtime initialized");
        *runtime = Some(Arc::new(rt));
        Ok(())
    }
}

/// Initialize a runtime visible only to the calling thread.
///
/// Tests run on separate threads; thread-local mode keeps one test's
/// `shutdown` from tearing down another test's pool.
pub fn init_thread_local() -> Result<()> {
    init_thread_local_with_config(Config::default())
}

pub fn init_thread_local_with_config(config: Config) -> Result<()> {
    let thread_id = std::thread::current().id();
    thread_runtime_map().lock().insert(thread_id, true);

    let occupied = THREAD_RUNTIME.with(|rt| rt.borrow().is_some());
    if occupied {
        return Err(Error::AlreadyInitialized);
    }

    let rt = Runtime::new(config)?;
    THREAD_RUNTIME.with(|cell| {
        *cell.borrow_mut() = Some(Arc::new(rt));
    });
    Ok(())
}

pub(crate) fn current_runtime() -> Result<Arc<Runtime>> {
    if uses_thread_local() {
        THREAD_RUNTIME.with(|rt| rt.borrow().as_ref().cloned().ok_or(Error::NotInitialized))
    } else {
        GLOBAL_RUNTIME
            .read()
            .as_ref()
            .cloned()
            .ok_or(Error::NotInitialized)
    }
}

/// Resolve the pool the calling thread should schedule onto.
///
/// A pool worker always belongs to the pool that spawned it, regardless of
/// which runtime registry the thread could otherwise see.
pub(crate) fn current_pool() -> Result<Arc<PoolShared>> {
    if let Some(shared) = with_worker_context(|ctx| ctx.map(|c| c.shared.clone())) {
        return Ok(shared);
    }
    Ok(current_runtime()?.pool.shared().clone())
}

/// Tear down the calling thread's runtime (thread-local mode) or the global
/// runtime. Idle pools shut down immediately; a pool still referenced by an
/// in-flight scope drains through the scope's own joining.
pub fn shutdown() {
    if uses_thread_local() {
        THREAD_RUNTIME.with(|cell| {
            *cell.borrow_mut() = None;
        });
        let thread_id = std::thread::current().id();
        thread_runtime_map().lock().remove(&thread_id);
    } else {
        let mut runtime = GLOBAL_RUNTIME.write();
        *runtime = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_local_init_and_double_init() {
        init_thread_local().unwrap();
        assert!(matches!(
            init_thread_local(),
            Err(Error::AlreadyInitialized)
        ));
        shutdown();
    }

    #[test]
    fn test_custom_config() {
        let config = Config::builder().num_threads(2).build().unwrap();
        init_thread_local_with_config(config).unwrap();

        let rt = current_runtime().unwrap();
        assert_eq!(rt.num_threads(), 2);
        assert_eq!(rt.config().worker_threads(), 2);

        shutdown();
    }

    #[test]
    fn test_not_initialized() {
        // Opt into thread-local mode without creating a runtime.
        let thread_id = std::thread::current().id();
        thread_runtime_map().lock().insert(thread_id, true);

        assert!(matches!(current_runtime(), Err(Error::NotInitialized)));
        assert!(matches!(current_pool(), Err(Error::NotInitialized)));

        shutdown();
    }
}
