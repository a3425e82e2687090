//! Parallel processing strategies

use std::ops::Range;

use surtgrid_core::{Error, Result};

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for a user supplied thread count: 0 means all cores.
    pub fn from_threads(threads: usize) -> Self {
        match threads {
            0 => ProcessingMode::Parallel,
            1 => ProcessingMode::Sequential,
            n => ProcessingMode::ParallelWith(n),
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

/// Executes index ranges according to a [`ProcessingMode`].
///
/// A dedicated pool is built once for `ParallelWith`; `Parallel` uses the
/// global rayon pool. Without the `parallel` feature everything runs on the
/// calling thread.
#[derive(Debug)]
pub struct Executor {
    mode: ProcessingMode,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    pub fn new(mode: ProcessingMode) -> Result<Self> {
        #[cfg(feature = "parallel")]
        {
            let pool = match mode {
                ProcessingMode::ParallelWith(threads) => Some(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()
                        .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))?,
                ),
                _ => None,
            };
            Ok(Self { mode, pool })
        }
        #[cfg(not(feature = "parallel"))]
        {
            if let ProcessingMode::ParallelWith(0) = mode {
                return Err(Error::Other("Thread count must be positive".into()));
            }
            Ok(Self { mode })
        }
    }

    pub fn sequential() -> Self {
        Self {
            mode: ProcessingMode::Sequential,
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Number of worker threads that will share a `par_map` call
    pub fn threads(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            match (&self.mode, &self.pool) {
                (ProcessingMode::Sequential, _) => 1,
                (_, Some(pool)) => pool.current_num_threads(),
                (_, None) => rayon::current_num_threads(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::sequential()
    }
}

impl ParallelStrategy for Executor {
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            match (&self.mode, &self.pool) {
                (ProcessingMode::Sequential, _) => range.map(f).collect(),
                (_, Some(pool)) => pool.install(|| range.into_par_iter().map(f).collect()),
                (_, None) => range.into_par_iter().map(f).collect(),
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            range.map(f).collect()
        }
    }
}
