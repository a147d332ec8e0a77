//! Runs N independent trials, in parallel when a worker is available.
//!
//! Trial `i` always draws from `Rng::for_stream(base_seed, i)`, so the
//! parallel path and the sequential fallback produce the same results.

use crate::error::{GachaError, GachaResult};
use crate::rng::Rng;
use crate::worker::GoodJobWorker;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::Instant;

const CHUNK_SIZE: usize = 64;

pub struct SimulationDriver<'a> {
    worker: Option<&'a GoodJobWorker>,
    base_seed: u64,
}

impl<'a> SimulationDriver<'a> {
    pub fn new(worker: Option<&'a GoodJobWorker>, seed: u64) -> Self {
        let mut master_rng = Rng::from_seed(seed);
        SimulationDriver {
            worker,
            base_seed: master_rng.next_u64(),
        }
    }

    /// Runs `trial` for indices `0..n` and returns the `n` results in index
    /// order. A trial error aborts the whole run. A failure of the parallel
    /// machinery itself (a panicking worker) is retried sequentially.
    pub fn run<T, F>(&self, n: usize, trial: F) -> GachaResult<Vec<T>>
    where
        T: Send,
        F: Fn(&mut Rng) -> GachaResult<T> + Sync,
    {
        let start_time = Instant::now();
        let results = match self.worker {
            Some(worker) => match self.run_parallel(worker, n, &trial) {
                Ok(results) => results,
                Err(GachaError::ParallelDispatchFailure(msg)) => {
                    warn!("[Driver] Parallel dispatch failed ({}), rerunning {} trials sequentially", msg, n);
                    self.run_sequential(n, &trial)?
                }
                Err(e) => return Err(e),
            },
            None => self.run_sequential(n, &trial)?,
        };

        let elapsed = start_time.elapsed();
        info!(
            "[Driver] {} trials in {:.2?} ({:.0} trials/sec)",
            results.len(),
            elapsed,
            results.len() as f64 / elapsed.as_secs_f64().max(1e-9)
        );
        Ok(results)
    }

    fn run_parallel<T, F>(&self, worker: &GoodJobWorker, n: usize, trial: &F) -> GachaResult<Vec<T>>
    where
        T: Send,
        F: Fn(&mut Rng) -> GachaResult<T> + Sync,
    {
        let base_seed = self.base_seed;
        let chunk_count = n.div_ceil(CHUNK_SIZE);
        debug!("[Driver] {} trials in {} chunks on {} threads", n, chunk_count, worker.thread_count());

        let outcome = worker.execute(|| {
            (0..chunk_count)
                .into_par_iter()
                .map(|chunk_idx| {
                    let start = chunk_idx * CHUNK_SIZE;
                    let end = (start + CHUNK_SIZE).min(n);
                    (start..end)
                        .map(|i| trial(&mut Rng::for_stream(base_seed, i as u64)))
                        .collect::<GachaResult<Vec<T>>>()
                })
                .collect::<GachaResult<Vec<Vec<T>>>>()
        });

        match outcome {
            Ok(chunks) => Ok(chunks?.into_iter().flatten().collect()),
            Err(msg) => Err(GachaError::ParallelDispatchFailure(msg)),
        }
    }

    fn run_sequential<T, F>(&self, n: usize, trial: &F) -> GachaResult<Vec<T>>
    where
        F: Fn(&mut Rng) -> GachaResult<T>,
    {
        (0..n)
            .map(|i| trial(&mut Rng::for_stream(self.base_seed, i as u64)))
            .collect()
    }
}
