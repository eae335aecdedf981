//! Engine trait and selection.
//!
//! A [`LocalMultiplyEngine`] computes `C += A × B` for one rank: `A` is a
//! sparse fragment with global indices and `B`, `C` are dense column blocks
//! over the same columns. Rows of `B` and `C` past the sparse dimension are
//! padding and are left untouched.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tessera_matrix::{DenseBlock, SparseMatrix};
use thiserror::Error;

/// Errors originating from multiply engines.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Engine not available: {0}")]
    Unavailable(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Describes a multiply engine.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub name: String,
    pub engine_type: EngineType,
    pub threads: Option<usize>,
}

/// The kind of multiply engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineType {
    #[default]
    Naive,
    Cpu,
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineType::Naive => write!(f, "naive"),
            EngineType::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for EngineType {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(EngineType::Naive),
            "cpu" => Ok(EngineType::Cpu),
            other => Err(ComputeError::Unavailable(format!(
                "unknown engine '{}', expected 'naive' or 'cpu'",
                other
            ))),
        }
    }
}

/// Local `C += A × B` kernel.
///
/// Engines are shared by every rank of a run, hence `Send + Sync`.
pub trait LocalMultiplyEngine: Send + Sync {
    /// Return information about the engine.
    fn engine_info(&self) -> EngineInfo;

    /// Accumulate the product of `a` and `b` into `c`.
    fn multiply_accumulate(
        &self,
        a: &SparseMatrix,
        b: &DenseBlock,
        c: &mut DenseBlock,
    ) -> Result<(), ComputeError>;
}

/// Check that `a`, `b` and `c` describe a valid accumulation.
pub fn check_shapes(a: &SparseMatrix, b: &DenseBlock, c: &DenseBlock) -> Result<(), ComputeError> {
    if a.dim() > b.logical_dim() {
        return Err(ComputeError::ShapeMismatch(format!(
            "sparse dimension {} exceeds dense dimension {}",
            a.dim(),
            b.logical_dim()
        )));
    }
    if b.logical_dim() != c.logical_dim() || b.column_range() != c.column_range() {
        return Err(ComputeError::ShapeMismatch(format!(
            "input block {}x{:?} does not match output block {}x{:?}",
            b.logical_dim(),
            b.column_range(),
            c.logical_dim(),
            c.column_range()
        )));
    }
    Ok(())
}

/// Build the engine of the requested type.
///
/// `threads` sizes a dedicated worker pool for parallel engines; `None` uses
/// the global pool. The naive engine ignores it.
pub fn create_engine(
    engine_type: EngineType,
    threads: Option<usize>,
) -> Result<Arc<dyn LocalMultiplyEngine>, ComputeError> {
    match engine_type {
        EngineType::Naive => Ok(Arc::new(crate::NaiveEngine)),
        EngineType::Cpu => {
            #[cfg(feature = "cpu")]
            {
                let engine = match threads {
                    Some(n) => crate::CpuEngine::with_threads(n)?,
                    None => crate::CpuEngine::new(),
                };
                Ok(Arc::new(engine))
            }
            #[cfg(not(feature = "cpu"))]
            {
                let _ = threads;
                Err(ComputeError::Unavailable(
                    "CPU engine requested but the 'cpu' feature is disabled".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_type_parses() {
        assert_eq!("naive".parse::<EngineType>().unwrap(), EngineType::Naive);
        assert_eq!("CPU".parse::<EngineType>().unwrap(), EngineType::Cpu);
        assert!("gpu".parse::<EngineType>().is_err());
        assert_eq!(EngineType::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_shape_checks() {
        let a = SparseMatrix::identity(4);
        let b = DenseBlock::zeros(4, 4, 0, 2);
        assert!(check_shapes(&a, &b, &DenseBlock::zeros(4, 4, 0, 2)).is_ok());
        assert!(check_shapes(&a, &b, &DenseBlock::zeros(4, 4, 1, 2)).is_err());
        assert!(check_shapes(&a, &b, &DenseBlock::zeros(4, 4, 0, 3)).is_err());

        let big = SparseMatrix::identity(6);
        assert!(matches!(
            check_shapes(&big, &b, &b.clone()),
            Err(ComputeError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_create_engine_reports_type() {
        let naive = create_engine(EngineType::Naive, None).unwrap();
        assert_eq!(naive.engine_info().engine_type, EngineType::Naive);
    }
}
