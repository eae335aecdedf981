//! Block partitioning of matrix index ranges.
//!
//! A dimension of width `w` is cut into `parts` contiguous blocks of
//! `ceil(w / parts)` indices each; the final block shrinks to fit, and
//! blocks that would start past the end are empty.

use std::ops::Range;

use crate::sparse::{CsrBuilder, SparseMatrix};

/// Which index a sparse matrix is split by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    Rows,
    Columns,
}

/// Width of each block: `ceil(width / parts)`.
///
/// # Panics
/// Panics if `parts == 0`.
pub fn block_size(width: usize, parts: usize) -> usize {
    assert!(parts > 0, "cannot partition into zero parts");
    width.div_ceil(parts)
}

/// First index of block `part`, shrinking `block_size` if the block would
/// overrun `width`.
pub fn block_base(width: usize, block_size: &mut usize, part: usize) -> usize {
    let base = (*block_size * part).min(width);
    if base + *block_size > width {
        *block_size = width - base;
    }
    base
}

/// Index range of block `part` out of `parts`.
pub fn block_range(width: usize, parts: usize, part: usize) -> Range<usize> {
    let mut size = block_size(width, parts);
    let base = block_base(width, &mut size, part);
    base..base + size
}

/// Split a matrix into `parts` fragments by row-block or column-block
/// membership of each nonzero.
///
/// Fragments keep global indices and the full dimension, so each has
/// `n + 1` row offsets and some may hold no entries at all. Input order is
/// scanned once, which keeps every fragment's rows sorted.
pub fn split(matrix: &SparseMatrix, parts: usize, axis: SplitAxis) -> Vec<SparseMatrix> {
    let n = matrix.dim();
    let width = block_size(n, parts).max(1);
    let mut builders: Vec<_> = (0..parts).map(|_| CsrBuilder::new(n)).collect();

    for entry in matrix.iter() {
        let index = match axis {
            SplitAxis::Rows => entry.row,
            SplitAxis::Columns => entry.column,
        };
        builders[index / width].push(entry);
    }

    builders.into_iter().map(CsrBuilder::finish).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triplets(m: &SparseMatrix) -> Vec<(usize, usize, f64)> {
        m.iter().map(|e| (e.row, e.column, e.value)).collect()
    }

    fn dense_pattern(n: usize) -> SparseMatrix {
        let entries = (0..n)
            .flat_map(|r| (0..n).map(move |c| (r, c)))
            .filter(|(r, c)| (r * 7 + c * 3) % 4 == 0)
            .map(|(r, c)| (r, c, (r * n + c) as f64 + 1.0));
        SparseMatrix::from_triplets(n, entries).unwrap()
    }

    #[test]
    fn test_block_size_is_ceiling() {
        assert_eq!(block_size(10, 3), 4);
        assert_eq!(block_size(9, 3), 3);
        assert_eq!(block_size(2, 4), 1);
        assert_eq!(block_size(0, 4), 0);
    }

    #[test]
    fn test_block_base_shrinks_last_block() {
        let mut size = block_size(10, 3);
        assert_eq!(block_base(10, &mut size, 2), 8);
        assert_eq!(size, 2);

        let mut size = block_size(10, 3);
        assert_eq!(block_base(10, &mut size, 1), 4);
        assert_eq!(size, 4);
    }

    #[test]
    fn test_block_range_past_end_is_empty() {
        assert_eq!(block_range(3, 8, 2), 2..3);
        assert_eq!(block_range(3, 8, 5), 3..3);
        assert!(block_range(3, 8, 7).is_empty());
    }

    #[test]
    fn test_block_ranges_tile_width() {
        for width in 0..20 {
            for parts in 1..9 {
                let mut next = 0;
                for part in 0..parts {
                    let range = block_range(width, parts, part);
                    assert_eq!(range.start, next.min(width));
                    next = range.end;
                }
                assert_eq!(next, width, "width={} parts={}", width, parts);
            }
        }
    }

    #[test]
    fn test_split_round_trip() {
        let m = dense_pattern(9);
        for axis in [SplitAxis::Rows, SplitAxis::Columns] {
            for parts in 1..6 {
                let fragments = split(&m, parts, axis);
                assert_eq!(fragments.len(), parts);
                assert_eq!(fragments.iter().map(SparseMatrix::nnz).sum::<usize>(), m.nnz());

                let mut all: Vec<_> = fragments.iter().flat_map(triplets).collect();
                all.sort_by_key(|&(r, c, _)| (r, c));
                assert_eq!(all, triplets(&m));

                let merged = fragments
                    .iter()
                    .fold(SparseMatrix::empty(9), |acc, f| SparseMatrix::merge(&acc, f));
                assert_eq!(merged, m);
            }
        }
    }

    #[test]
    fn test_split_by_column_respects_blocks() {
        let m = dense_pattern(8);
        let fragments = split(&m, 4, SplitAxis::Columns);
        for (part, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.row_offsets().len(), 9);
            let range = block_range(8, 4, part);
            assert!(fragment.iter().all(|e| range.contains(&e.column)));
        }
    }

    #[test]
    fn test_split_produces_empty_fragments() {
        let m = SparseMatrix::identity(2);
        let fragments = split(&m, 4, SplitAxis::Columns);
        assert_eq!(fragments[0].nnz(), 1);
        assert_eq!(fragments[1].nnz(), 1);
        for fragment in &fragments[2..] {
            assert!(fragment.is_empty());
            assert_eq!(fragment.row_offsets(), &[0, 0, 0]);
        }
    }
}
