use log::debug;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParallelError {
    #[error("Thread error: {0}")]
    ThreadError(String),

    #[error("Invalid thread count: {0}")]
    InvalidThreadCount(usize),
}

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads to use
    pub threads: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            threads: rayon::current_num_threads(),
        }
    }
}

/// Runs `processor` over every item on a dedicated rayon pool.
///
/// Items are independent units of work; each item's own result is kept,
/// in input order, so one failure does not stop the others.
pub fn parallel_process<T, U, F, E>(
    items: &[T],
    processor: F,
    config: Option<ParallelConfig>,
) -> Result<Vec<Result<U, E>>, ParallelError>
where
    T: Sync,
    U: Send,
    E: Send,
    F: Fn(&T) -> Result<U, E> + Send + Sync,
{
    let config = config.unwrap_or_default();

    if config.threads == 0 {
        return Err(ParallelError::InvalidThreadCount(0));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| ParallelError::ThreadError(format!("Failed to build thread pool: {}", e)))?;

    debug!(
        "Processing {} items on {} threads",
        items.len(),
        config.threads
    );

    Ok(pool.install(|| items.par_iter().map(|item| processor(item)).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_input_order() {
        let items: Vec<u32> = (0..50).collect();
        let results = parallel_process(
            &items,
            |&n| if n % 7 == 0 { Err(n) } else { Ok(n * 2) },
            Some(ParallelConfig { threads: 4 }),
        )
        .unwrap();

        assert_eq!(results.len(), 50);
        assert_eq!(results[0], Err(0));
        assert_eq!(results[1], Ok(2));
        assert_eq!(results[49], Err(49));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 8);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let items = vec![1u32];
        let result = parallel_process(
            &items,
            |&n| Ok::<u32, String>(n),
            Some(ParallelConfig { threads: 0 }),
        );
        assert!(matches!(result, Err(ParallelError::InvalidThreadCount(0))));
    }
}
