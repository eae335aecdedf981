//! CPU engine using Rayon for shared-memory parallelism.

use ndarray::Array2;
use rayon::prelude::*;
use rayon::ThreadPool;

use tessera_matrix::{DenseBlock, SparseMatrix};

use crate::engine::{check_shapes, ComputeError, EngineInfo, EngineType, LocalMultiplyEngine};
use crate::naive::NaiveEngine;

/// Engine that computes the rows of `C` in parallel via Rayon.
///
/// Each output row depends only on the matching sparse row, so rows are
/// independent work items and no synchronisation is needed.
pub struct CpuEngine {
    pool: Option<ThreadPool>,
}

impl CpuEngine {
    /// Create a CPU engine on the global Rayon pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Create a CPU engine with a dedicated pool of `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("tessera-cpu-{}", i))
            .build()
            .map_err(|e| ComputeError::Unavailable(e.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    fn num_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, ThreadPool::current_num_threads)
    }
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CpuEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuEngine")
            .field("threads", &self.num_threads())
            .finish()
    }
}

impl LocalMultiplyEngine for CpuEngine {
    fn engine_info(&self) -> EngineInfo {
        let threads = self.num_threads();
        EngineInfo {
            name: format!("CPU ({} threads)", threads),
            engine_type: EngineType::Cpu,
            threads: Some(threads),
        }
    }

    fn multiply_accumulate(
        &self,
        a: &SparseMatrix,
        b: &DenseBlock,
        c: &mut DenseBlock,
    ) -> Result<(), ComputeError> {
        check_shapes(a, b, c)?;
        let width = c.column_count();
        if width == 0 || a.is_empty() {
            return Ok(());
        }
        if !c.values().is_standard_layout() {
            log::debug!("Output block is not row-major; using the sequential path");
            return NaiveEngine.multiply_accumulate(a, b, c);
        }

        let b_values = b.values();
        let Some(c_slice) = c.values_mut().as_slice_mut() else {
            return Err(ComputeError::Unavailable(
                "output block storage is not contiguous".into(),
            ));
        };

        match &self.pool {
            Some(pool) => pool.install(|| accumulate_rows(c_slice, width, a, b_values)),
            None => accumulate_rows(c_slice, width, a, b_values),
        }
        Ok(())
    }
}

/// `C[r, ..] += Σ A[r, k] · B[k, ..]` for every sparse row, rows in parallel.
fn accumulate_rows(c: &mut [f64], width: usize, a: &SparseMatrix, b: &Array2<f64>) {
    c.par_chunks_mut(width)
        .take(a.dim())
        .enumerate()
        .for_each(|(row, c_row)| {
            for (k, value) in a.row(row) {
                for (out, &rhs) in c_row.iter_mut().zip(b.row(k).iter()) {
                    *out += value * rhs;
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn banded(n: usize) -> SparseMatrix {
        let entries = (0..n).flat_map(|r| {
            [r.checked_sub(1), Some(r), (r + 1 < n).then_some(r + 1)]
                .into_iter()
                .flatten()
                .map(move |c| (r, c, 1.0 + (r * 3 + c) as f64 * 0.25))
        });
        SparseMatrix::from_triplets(n, entries).unwrap()
    }

    #[test]
    fn test_matches_naive_engine() {
        let a = banded(17);
        let b = DenseBlock::generate(18, 17, 4, 7, 99);
        let mut expected = DenseBlock::zeros(18, 17, 4, 7);
        let mut actual = expected.clone();

        NaiveEngine.multiply_accumulate(&a, &b, &mut expected).unwrap();
        CpuEngine::new()
            .multiply_accumulate(&a, &b, &mut actual)
            .unwrap();

        for (e, v) in expected.values().iter().zip(actual.values().iter()) {
            assert_relative_eq!(*e, *v, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dedicated_pool() {
        let engine = CpuEngine::with_threads(2).unwrap();
        assert_eq!(engine.engine_info().threads, Some(2));

        let a = SparseMatrix::identity(5);
        let b = DenseBlock::generate(5, 5, 0, 5, 3);
        let mut c = DenseBlock::zeros(5, 5, 0, 5);
        engine.multiply_accumulate(&a, &b, &mut c).unwrap();
        assert_eq!(c, b);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = SparseMatrix::identity(4);
        let b = DenseBlock::zeros(4, 4, 0, 2);
        let mut c = DenseBlock::zeros(4, 4, 2, 2);
        assert!(matches!(
            CpuEngine::new().multiply_accumulate(&a, &b, &mut c),
            Err(ComputeError::ShapeMismatch(_))
        ));
    }
}
