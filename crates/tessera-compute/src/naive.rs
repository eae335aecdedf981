//! Sequential reference engine.

use tessera_matrix::{DenseBlock, SparseMatrix};

use crate::engine::{check_shapes, ComputeError, EngineInfo, EngineType, LocalMultiplyEngine};

/// Single-threaded engine that walks the sparse entries in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveEngine;

impl LocalMultiplyEngine for NaiveEngine {
    fn engine_info(&self) -> EngineInfo {
        EngineInfo {
            name: "Naive (sequential)".into(),
            engine_type: EngineType::Naive,
            threads: Some(1),
        }
    }

    fn multiply_accumulate(
        &self,
        a: &SparseMatrix,
        b: &DenseBlock,
        c: &mut DenseBlock,
    ) -> Result<(), ComputeError> {
        check_shapes(a, b, c)?;
        if c.column_count() == 0 {
            return Ok(());
        }

        let b_values = b.values();
        let c_values = c.values_mut();
        for entry in a {
            c_values
                .row_mut(entry.row)
                .scaled_add(entry.value, &b_values.row(entry.column));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_identity_leaves_block_unchanged() {
        let a = SparseMatrix::identity(3);
        let b = DenseBlock::generate(3, 3, 0, 3, 3);
        let mut c = DenseBlock::zeros(3, 3, 0, 3);
        NaiveEngine.multiply_accumulate(&a, &b, &mut c).unwrap();
        assert_eq!(c, b);
    }

    #[test]
    fn test_accumulates_into_existing_values() {
        let a = SparseMatrix::from_triplets(2, [(0, 1, 2.0), (1, 0, -1.0)]).unwrap();
        let b = DenseBlock::from_values(2, 0, array![[1.0, 2.0], [3.0, 4.0]]);
        let mut c = DenseBlock::from_values(2, 0, array![[1.0, 1.0], [1.0, 1.0]]);
        NaiveEngine.multiply_accumulate(&a, &b, &mut c).unwrap();
        assert_relative_eq!(c.values()[[0, 0]], 7.0);
        assert_relative_eq!(c.values()[[0, 1]], 9.0);
        assert_relative_eq!(c.values()[[1, 0]], 0.0);
        assert_relative_eq!(c.values()[[1, 1]], -1.0);
    }

    #[test]
    fn test_padding_rows_untouched() {
        let a = SparseMatrix::from_triplets(3, [(2, 2, 5.0)]).unwrap();
        let b = DenseBlock::generate(4, 3, 2, 2, 1);
        let mut c = DenseBlock::zeros(4, 3, 2, 2);
        NaiveEngine.multiply_accumulate(&a, &b, &mut c).unwrap();
        assert_relative_eq!(c.get(2, 2), 5.0);
        assert_relative_eq!(c.get(2, 3), 0.0);
        assert!(c.values().row(3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_block_is_noop() {
        let a = SparseMatrix::identity(2);
        let b = DenseBlock::zeros(2, 2, 2, 0);
        let mut c = DenseBlock::zeros(2, 2, 2, 0);
        NaiveEngine.multiply_accumulate(&a, &b, &mut c).unwrap();
        assert_eq!(c.column_count(), 0);
    }
}
