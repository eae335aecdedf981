//! # Tessera Matrix
//!
//! Matrix data structures for the Tessera framework. This crate provides:
//!
//! - **Sparse matrices** ([`sparse`]): Immutable CSR storage with an ordered
//!   entry iterator and a two-way merge of coordinate-disjoint matrices.
//! - **Dense blocks** ([`dense`]): Column-range slices of a dense matrix with
//!   generation, indexed access and block merging.
//! - **Partitioning** ([`partition`]): Ceiling-division block sizing and
//!   row/column splitting of sparse matrices.
//! - **Generator** ([`generator`]): The stateless, coordinate-addressed
//!   dense value generator.
//! - **File parsers** ([`parsers`]): Import sparse matrices from CSR text
//!   files.

pub mod dense;
pub mod generator;
pub mod parsers;
pub mod partition;
pub mod sparse;

pub use dense::DenseBlock;
pub use partition::SplitAxis;
pub use sparse::{Entry, MatrixError, SparseMatrix};
