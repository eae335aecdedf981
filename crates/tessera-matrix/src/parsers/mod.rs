//! File format parsers for importing sparse matrices.
//!
//! Supported formats:
//! - [`csr`]: Plain-text compressed sparse row files

pub mod csr;

use thiserror::Error;

use crate::sparse::MatrixError;

/// Errors during matrix file parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    FormatError { line: usize, message: String },

    #[error("Invalid matrix structure: {0}")]
    InvalidMatrix(#[from] MatrixError),
}
