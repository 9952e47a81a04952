//! Execution settings: worker threads and default partition count.

use crate::error::{Error, Result};

/// How much parallelism to use.
///
/// `None` fields fall back to the rayon global pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub threads: Option<usize>,
    pub partitions: Option<usize>,
}

impl ExecutionConfig {
    pub fn new(threads: Option<usize>, partitions: Option<usize>) -> Self {
        Self { threads, partitions }
    }

    /// Number of worker threads that will actually run.
    ///
    /// A request above the number of logical CPUs is capped with a warning.
    ///
    /// # Errors
    /// * [`Error::InvalidRange`] if zero threads were requested.
    pub fn effective_threads(&self) -> Result<usize> {
        match self.threads {
            Some(0) => Err(Error::InvalidRange(
                "number of threads must be a positive integer".to_string(),
            )),
            Some(n) => {
                let max_threads = num_cpus::get();
                if n > max_threads {
                    tracing::warn!(requested = n, max_threads, "limiting thread count");
                    Ok(max_threads)
                } else {
                    Ok(n)
                }
            }
            None => Ok(rayon::current_num_threads()),
        }
    }

    /// Partitions to split new datasets into; defaults to the thread count.
    pub fn partitions(&self) -> Result<usize> {
        match self.partitions {
            Some(0) => Err(Error::InvalidRange(
                "number of partitions must be a positive integer".to_string(),
            )),
            Some(n) => Ok(n),
            None => self.effective_threads(),
        }
    }

    /// Runs `op` on a dedicated pool when a thread count was given, else on
    /// the global pool.
    pub fn install<R, F>(&self, op: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.threads {
            Some(_) => Ok(configure_thread_pool(self.effective_threads()?)?.install(op)),
            None => Ok(op()),
        }
    }
}

/// Builds a rayon pool with exactly `num_threads` workers.
pub fn configure_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?)
}
