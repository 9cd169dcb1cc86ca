//! CPU client and its parallelism configuration

use crate::error::Result;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// Thread-level parallelism settings for CPU kernels
///
/// Kernels fan out over independent (batch, output-channel) work items. With the
/// `rayon` feature disabled these settings are accepted and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParallelismConfig {
    /// Upper bound on worker threads; `None` uses the global rayon pool
    max_threads: Option<usize>,
    /// Minimum number of work items handed to one worker at a time
    min_len: usize,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            max_threads: None,
            min_len: 1,
        }
    }
}

impl ParallelismConfig {
    /// Default configuration: global pool, one item per split
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every kernel on the calling thread
    pub fn sequential() -> Self {
        Self::default().with_max_threads(1)
    }

    /// Limit the number of worker threads (0 is treated as 1)
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = Some(threads.max(1));
        self
    }

    /// Set the minimum number of work items per split (0 is treated as 1)
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len.max(1);
        self
    }

    /// Configured thread limit
    pub fn max_threads(&self) -> Option<usize> {
        self.max_threads
    }

    /// Configured minimum split length
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Whether kernels must stay on the calling thread
    pub fn is_sequential(&self) -> bool {
        self.max_threads == Some(1)
    }
}

/// CPU client for operation dispatch
#[derive(Clone, Debug)]
pub struct CpuClient {
    parallelism: ParallelismConfig,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for CpuClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuClient {
    /// Create a client using the default parallelism settings
    pub fn new() -> Self {
        Self {
            parallelism: ParallelismConfig::default(),
            #[cfg(feature = "rayon")]
            pool: None,
        }
    }

    /// Create a client with explicit parallelism settings
    ///
    /// With the `rayon` feature, a dedicated thread pool is built when a thread
    /// limit above 1 is configured.
    pub fn with_parallelism(config: ParallelismConfig) -> Result<Self> {
        #[cfg(feature = "rayon")]
        let pool = match config.max_threads {
            Some(threads) if threads > 1 => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        crate::error::Error::invalid_argument("parallelism", e.to_string())
                    })?,
            )),
            _ => None,
        };
        Ok(Self {
            parallelism: config,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// Active parallelism settings
    pub fn parallelism(&self) -> &ParallelismConfig {
        &self.parallelism
    }

    /// Minimum number of work items per rayon split
    pub fn rayon_min_len(&self) -> usize {
        self.parallelism.min_len
    }

    /// Whether `items` independent work items should be spread over threads
    pub(crate) fn use_parallel(&self, items: usize) -> bool {
        cfg!(feature = "rayon") && !self.parallelism.is_sequential() && items > 1
    }

    /// Run `f` inside this client's thread pool (or the global one)
    #[cfg(feature = "rayon")]
    pub(crate) fn install_parallelism<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}
