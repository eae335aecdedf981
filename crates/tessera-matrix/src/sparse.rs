//! Compressed sparse row (CSR) matrices.
//!
//! A [`SparseMatrix`] is square and immutable once built. Nonzeros are stored
//! row by row with strictly increasing column indices inside each row. Global
//! indices are preserved when a matrix is split into fragments, so fragments
//! can be merged back together without renumbering.

use std::iter::{FusedIterator, Peekable};

use thiserror::Error;

/// Structural errors in CSR data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Expected {expected} row offsets, got {found}")]
    OffsetsLength { expected: usize, found: usize },

    #[error("Row offsets must start at 0, got {0}")]
    OffsetsStart(usize),

    #[error("Row offsets end at {found} but the matrix holds {expected} values")]
    OffsetsEnd { expected: usize, found: usize },

    #[error("Row offset {offset} at row {row} exceeds the {len} stored values")]
    OffsetOutOfRange { row: usize, offset: usize, len: usize },

    #[error("Row offsets decrease at row {row}")]
    OffsetsDecreasing { row: usize },

    #[error("Expected {expected} column indices, got {found}")]
    ColumnsLength { expected: usize, found: usize },

    #[error("Row index {row} is outside [0, {n})")]
    RowOutOfRange { row: usize, n: usize },

    #[error("Column index {column} in row {row} is outside [0, {n})")]
    ColumnOutOfRange { row: usize, column: usize, n: usize },

    #[error("Column indices in row {row} are not strictly ascending at column {column}")]
    ColumnsUnsorted { row: usize, column: usize },
}

/// A single nonzero entry with its global coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub row: usize,
    pub column: usize,
    pub value: f64,
}

impl Entry {
    /// The `(row, column)` key entries are ordered by.
    pub fn coordinate(&self) -> (usize, usize) {
        (self.row, self.column)
    }
}

/// A square sparse matrix in CSR layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n: usize,
    values: Vec<f64>,
    row_offsets: Vec<usize>,
    column_indices: Vec<usize>,
}

impl SparseMatrix {
    /// Build a matrix from raw CSR arrays, validating every structural invariant.
    pub fn new(
        n: usize,
        values: Vec<f64>,
        row_offsets: Vec<usize>,
        column_indices: Vec<usize>,
    ) -> Result<Self, MatrixError> {
        if column_indices.len() != values.len() {
            return Err(MatrixError::ColumnsLength {
                expected: values.len(),
                found: column_indices.len(),
            });
        }
        if n.checked_add(1) != Some(row_offsets.len()) {
            return Err(MatrixError::OffsetsLength {
                expected: n.saturating_add(1),
                found: row_offsets.len(),
            });
        }
        if row_offsets[0] != 0 {
            return Err(MatrixError::OffsetsStart(row_offsets[0]));
        }
        if row_offsets[n] != values.len() {
            return Err(MatrixError::OffsetsEnd {
                expected: values.len(),
                found: row_offsets[n],
            });
        }

        if let Some((row, &offset)) = row_offsets
            .iter()
            .enumerate()
            .find(|&(_, &offset)| offset > values.len())
        {
            return Err(MatrixError::OffsetOutOfRange {
                row,
                offset,
                len: values.len(),
            });
        }
        if let Some(row) = (0..n).find(|&row| row_offsets[row + 1] < row_offsets[row]) {
            return Err(MatrixError::OffsetsDecreasing { row });
        }

        for row in 0..n {
            let (start, end) = (row_offsets[row], row_offsets[row + 1]);
            let columns = &column_indices[start..end];
            for (i, &column) in columns.iter().enumerate() {
                if column >= n {
                    return Err(MatrixError::ColumnOutOfRange { row, column, n });
                }
                if i > 0 && columns[i - 1] >= column {
                    return Err(MatrixError::ColumnsUnsorted { row, column });
                }
            }
        }

        Ok(Self {
            n,
            values,
            row_offsets,
            column_indices,
        })
    }

    /// An `n × n` matrix without nonzeros.
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            values: Vec::new(),
            row_offsets: vec![0; n + 1],
            column_indices: Vec::new(),
        }
    }

    /// The `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            n,
            values: vec![1.0; n],
            row_offsets: (0..=n).collect(),
            column_indices: (0..n).collect(),
        }
    }

    /// Build a matrix from `(row, column, value)` triples given in any order.
    ///
    /// Duplicate coordinates are rejected as unsorted columns.
    pub fn from_triplets(
        n: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self, MatrixError> {
        let mut triplets: Vec<_> = triplets.into_iter().collect();
        triplets.sort_by_key(|&(row, column, _)| (row, column));

        let mut row_offsets = vec![0; n + 1];
        let mut values = Vec::with_capacity(triplets.len());
        let mut column_indices = Vec::with_capacity(triplets.len());
        for &(row, column, value) in &triplets {
            if row >= n {
                return Err(MatrixError::RowOutOfRange { row, n });
            }
            row_offsets[row + 1] += 1;
            values.push(value);
            column_indices.push(column);
        }
        for row in 0..n {
            row_offsets[row + 1] += row_offsets[row];
        }

        Self::new(n, values, row_offsets, column_indices)
    }

    /// Dimension of the (square) matrix.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of stored nonzeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    /// Number of nonzeros stored in `row`.
    pub fn row_len(&self, row: usize) -> usize {
        self.row_offsets[row + 1] - self.row_offsets[row]
    }

    /// `(column, value)` pairs of a single row, in ascending column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        self.column_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Ordered iterator over all nonzeros, row-major.
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            matrix: self,
            row: 0,
            index: 0,
        }
    }

    /// Merge two coordinate-disjoint matrices into one holding the union of
    /// their entries, still in row-major order.
    ///
    /// The two ordered iterators are interleaved by always taking the head
    /// with the smaller `(row, column)`; an exhausted iterator sorts last.
    ///
    /// # Panics
    /// Panics if the dimensions differ or if both matrices hold an entry at
    /// the same coordinate.
    pub fn merge(a: &SparseMatrix, b: &SparseMatrix) -> SparseMatrix {
        assert_eq!(
            a.n, b.n,
            "cannot merge matrices of dimension {} and {}",
            a.n, b.n
        );

        let mut left = a.iter().peekable();
        let mut right = b.iter().peekable();
        let mut builder = CsrBuilder::with_capacity(a.n, a.nnz() + b.nnz());

        while let Some(entry) = next_in_order(&mut left, &mut right) {
            builder.push(entry);
        }
        builder.finish()
    }
}

impl Default for SparseMatrix {
    fn default() -> Self {
        Self::empty(0)
    }
}

impl<'a> IntoIterator for &'a SparseMatrix {
    type Item = Entry;
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn next_in_order(
    left: &mut Peekable<Entries<'_>>,
    right: &mut Peekable<Entries<'_>>,
) -> Option<Entry> {
    match (left.peek().copied(), right.peek().copied()) {
        (Some(l), Some(r)) => {
            assert!(
                l.coordinate() != r.coordinate(),
                "merge inputs overlap at ({}, {})",
                l.row,
                l.column
            );
            if l.coordinate() < r.coordinate() {
                left.next()
            } else {
                right.next()
            }
        }
        (Some(_), None) => left.next(),
        (None, _) => right.next(),
    }
}

/// Lazy row-major iterator over the nonzeros of a [`SparseMatrix`].
///
/// Exhaustion (`None`) is the end-of-sequence sentinel; the iterator cannot
/// be restarted.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    matrix: &'a SparseMatrix,
    row: usize,
    index: usize,
}

impl Iterator for Entries<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let m = self.matrix;
        if self.index >= m.values.len() {
            return None;
        }
        // Skip rows without entries.
        while m.row_offsets[self.row + 1] <= self.index {
            self.row += 1;
        }
        let entry = Entry {
            row: self.row,
            column: m.column_indices[self.index],
            value: m.values[self.index],
        };
        self.index += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.matrix.values.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl FusedIterator for Entries<'_> {}

/// Incremental CSR construction from entries arriving in row-major order.
///
/// One offset is appended per row boundary crossed, so rows without entries
/// get equal consecutive offsets.
pub(crate) struct CsrBuilder {
    n: usize,
    row: usize,
    values: Vec<f64>,
    row_offsets: Vec<usize>,
    column_indices: Vec<usize>,
}

impl CsrBuilder {
    pub(crate) fn new(n: usize) -> Self {
        Self::with_capacity(n, 0)
    }

    pub(crate) fn with_capacity(n: usize, nnz: usize) -> Self {
        let mut row_offsets = Vec::with_capacity(n + 1);
        row_offsets.push(0);
        Self {
            n,
            row: 0,
            values: Vec::with_capacity(nnz),
            row_offsets,
            column_indices: Vec::with_capacity(nnz),
        }
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        debug_assert!(entry.row >= self.row, "entries must arrive in row order");
        debug_assert!(entry.row < self.n, "row {} outside matrix", entry.row);
        while self.row < entry.row {
            self.row_offsets.push(self.values.len());
            self.row += 1;
        }
        self.values.push(entry.value);
        self.column_indices.push(entry.column);
    }

    pub(crate) fn finish(mut self) -> SparseMatrix {
        while self.row_offsets.len() < self.n + 1 {
            self.row_offsets.push(self.values.len());
        }
        SparseMatrix {
            n: self.n,
            values: self.values,
            row_offsets: self.row_offsets,
            column_indices: self.column_indices,
        }
    }
}
