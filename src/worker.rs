use crate::config::Config;
use crate::error::{GachaError, GachaResult};
use log::{error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Bounded rayon pool that turns panics inside a job into errors.
pub struct GoodJobWorker {
    pool: Arc<ThreadPool>,
    num_threads: usize,
}

impl GoodJobWorker {
    /// Sizes the pool as `cores - worker_reserve_cores`, never above
    /// `worker_max_threads` and never below one.
    pub fn new_with_config(config: &Config) -> GachaResult<Self> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let num_threads = cores
            .saturating_sub(config.worker_reserve_cores)
            .clamp(1, config.worker_max_threads.max(1));
        Self::build_pool(num_threads)
    }

    pub fn with_threads(num_threads: usize) -> GachaResult<Self> {
        Self::build_pool(num_threads.max(1))
    }

    fn build_pool(num_threads: usize) -> GachaResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("trial-worker-{}", i))
            .panic_handler(|err| {
                error!("Worker thread panicked: {:?}", err);
            })
            .build()
            .map_err(|e| GachaError::ParallelDispatchFailure(e.to_string()))?;

        info!("[Worker] Initialized with {} threads.", num_threads);

        Ok(Self {
            pool: Arc::new(pool),
            num_threads,
        })
    }

    pub fn execute<F, R>(&self, f: F) -> Result<R, String>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let result = self
            .pool
            .install(|| panic::catch_unwind(AssertUnwindSafe(f)));

        match result {
            Ok(val) => Ok(val),
            Err(err) => {
                let msg = if let Some(s) = err.downcast_ref::<&str>() {
                    format!("Task panicked: {}", s)
                } else if let Some(s) = err.downcast_ref::<String>() {
                    format!("Task panicked: {}", s)
                } else {
                    "Task panicked with unknown error".to_string()
                };
                Err(msg)
            }
        }
    }

    pub fn thread_count(&self) -> usize {
        self.num_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_respects_cap() {
        let config = Config { worker_max_threads: 2, worker_reserve_cores: 0, ..Config::default() };
        let worker = GoodJobWorker::new_with_config(&config).unwrap();
        assert!(worker.thread_count() >= 1 && worker.thread_count() <= 2);
    }

    #[test]
    fn panics_become_errors() {
        let worker = GoodJobWorker::with_threads(1).unwrap();
        let res: Result<u32, String> = worker.execute(|| panic!("boom"));
        assert_eq!(res.unwrap_err(), "Task panicked: boom");
        assert_eq!(worker.execute(|| 7).unwrap(), 7);
    }
}
