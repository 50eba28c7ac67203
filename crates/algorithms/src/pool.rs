//! Bounded per-band worker pool

use rayon::prelude::*;

use landsat_core::{Error, Result};

/// Processing mode for per-band stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// One worker per band, capped at `max_workers`
    pub fn for_bands(bands: usize, max_workers: usize) -> Self {
        match bands.min(max_workers) {
            0 | 1 => ProcessingMode::Sequential,
            n => ProcessingMode::ParallelWith(n),
        }
    }

    /// Map a fallible function over `items`, keeping input order.
    ///
    /// The first error aborts the whole batch.
    pub fn try_map<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.into_iter().map(f).collect(),
            ProcessingMode::Parallel => items.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("cannot build worker pool: {}", e)))?;
                pool.install(|| items.into_par_iter().map(f).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_bands() {
        assert_eq!(ProcessingMode::for_bands(3, 4), ProcessingMode::ParallelWith(3));
        assert_eq!(ProcessingMode::for_bands(6, 4), ProcessingMode::ParallelWith(4));
        assert_eq!(ProcessingMode::for_bands(1, 4), ProcessingMode::Sequential);
    }

    #[test]
    fn test_order_is_kept() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.try_map((0..16).collect(), |i: i32| Ok(i * 2)).unwrap();
            assert_eq!(out, (0..16).map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_error_aborts() {
        let result = ProcessingMode::ParallelWith(2).try_map(vec![1, 2, 3], |i| {
            if i == 2 {
                Err(Error::Other("band failed".into()))
            } else {
                Ok(i)
            }
        });
        assert!(result.is_err());
    }
}
