//! Dense column blocks.
//!
//! A [`DenseBlock`] holds a contiguous range of full columns of a dense
//! `logical_dim × logical_dim` matrix, stored row-major as an
//! [`ndarray::Array2`] of shape `(logical_dim, column_count)`. Rows and
//! columns at or beyond `original_dim` are structural padding: they are
//! generated as zero and never rendered or counted.

use std::fmt;
use std::ops::Range;

use ndarray::{s, Array2, Zip};

use crate::generator::generate_double;

/// A column-range slice of a dense square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    original_dim: usize,
    column_base: usize,
    values: Array2<f64>,
}

impl DenseBlock {
    /// A zeroed block covering `column_count` columns starting at `column_base`.
    ///
    /// # Panics
    /// Panics if `original_dim > logical_dim` or the column range overruns
    /// `logical_dim`.
    pub fn zeros(
        logical_dim: usize,
        original_dim: usize,
        column_base: usize,
        column_count: usize,
    ) -> Self {
        Self::from_values(
            original_dim,
            column_base,
            Array2::zeros((logical_dim, column_count)),
        )
    }

    /// A block filled from the stateless generator.
    ///
    /// Each element is addressed by its global `(row, column)`, so any rank
    /// can materialise any block without communication. Padding positions
    /// are zero.
    pub fn generate(
        logical_dim: usize,
        original_dim: usize,
        column_base: usize,
        column_count: usize,
        seed: u32,
    ) -> Self {
        let values = Array2::from_shape_fn((logical_dim, column_count), |(row, j)| {
            let column = column_base + j;
            if row < original_dim && column < original_dim {
                generate_double(seed, row, column)
            } else {
                0.0
            }
        });
        Self::from_values(original_dim, column_base, values)
    }

    /// Wrap existing values; the logical dimension is the row count.
    pub fn from_values(original_dim: usize, column_base: usize, values: Array2<f64>) -> Self {
        let logical_dim = values.nrows();
        assert!(
            original_dim <= logical_dim,
            "original dimension {} exceeds logical dimension {}",
            original_dim,
            logical_dim
        );
        assert!(
            column_base + values.ncols() <= logical_dim,
            "columns {}..{} overrun dimension {}",
            column_base,
            column_base + values.ncols(),
            logical_dim
        );
        Self {
            original_dim,
            column_base,
            values,
        }
    }

    /// Padded row count.
    pub fn logical_dim(&self) -> usize {
        self.values.nrows()
    }

    /// True problem size.
    pub fn original_dim(&self) -> usize {
        self.original_dim
    }

    pub fn column_base(&self) -> usize {
        self.column_base
    }

    pub fn column_count(&self) -> usize {
        self.values.ncols()
    }

    /// Global columns held by this block.
    pub fn column_range(&self) -> Range<usize> {
        self.column_base..self.column_base + self.column_count()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }

    fn local_column(&self, column: usize) -> usize {
        assert!(
            self.column_range().contains(&column),
            "column {} outside block {:?}",
            column,
            self.column_range()
        );
        column - self.column_base
    }

    /// Value at global `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[[row, self.local_column(column)]]
    }

    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        let local = self.local_column(column);
        self.values[[row, local]] = value;
    }

    /// Add `value` to the element at global `(row, column)`.
    pub fn accumulate(&mut self, row: usize, column: usize, value: f64) {
        let local = self.local_column(column);
        self.values[[row, local]] += value;
    }

    pub fn fill_zero(&mut self) {
        self.values.fill(0.0);
    }

    /// Element-wise sum of a block covering the identical range.
    ///
    /// # Panics
    /// Panics if the shapes or column ranges differ.
    pub fn add_block(&mut self, other: &DenseBlock) {
        assert_eq!(
            (self.logical_dim(), self.column_range()),
            (other.logical_dim(), other.column_range()),
            "cannot add blocks with different shapes"
        );
        self.values += &other.values;
    }

    /// Count real (non-padding) entries `>= threshold` within `rows`.
    pub fn count_at_least(&self, threshold: f64, rows: Range<usize>) -> u64 {
        let row_end = rows.end.min(self.original_dim);
        let row_start = rows.start.min(row_end);
        let column_end = self
            .column_range()
            .end
            .min(self.original_dim)
            .saturating_sub(self.column_base);

        self.values
            .slice(s![row_start..row_end, 0..column_end])
            .iter()
            .filter(|&&v| v >= threshold)
            .count() as u64
    }

    /// Merge blocks produced by different ranks into one.
    ///
    /// The policy is chosen by comparing the first two blocks' column base:
    ///
    /// - **Same range**: every block covers the same columns and at most one
    ///   of them holds a nonzero at any position. The merged value is the
    ///   first nonzero found, never a sum.
    /// - **Concatenate**: blocks cover adjacent column ranges in order and
    ///   are joined row by row. Contiguity is not checked across empty blocks
    ///   or blocks starting in the padding.
    ///
    /// Returns `None` for an empty input.
    ///
    /// # Panics
    /// Panics if the blocks do not satisfy the selected policy's layout.
    pub fn merge(mut blocks: Vec<DenseBlock>) -> Option<DenseBlock> {
        match blocks.len() {
            0 => None,
            1 => blocks.pop(),
            _ if blocks[0].column_base == blocks[1].column_base => {
                Some(Self::merge_same_range(blocks))
            }
            _ => Some(Self::merge_concatenate(blocks)),
        }
    }

    fn merge_same_range(blocks: Vec<DenseBlock>) -> DenseBlock {
        let first = &blocks[0];
        for block in &blocks[1..] {
            assert!(
                block.logical_dim() == first.logical_dim()
                    && block.column_range() == first.column_range(),
                "same-range merge over blocks {:?} and {:?}",
                first.column_range(),
                block.column_range()
            );
        }

        let mut values = Array2::zeros(first.values.raw_dim());
        for block in &blocks {
            Zip::from(&mut values)
                .and(&block.values)
                .for_each(|merged, &v| {
                    if *merged == 0.0 && v != 0.0 {
                        *merged = v;
                    }
                });
        }
        Self::from_values(first.original_dim, first.column_base, values)
    }

    fn merge_concatenate(blocks: Vec<DenseBlock>) -> DenseBlock {
        let first = &blocks[0];
        let logical_dim = first.logical_dim();

        for pair in blocks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert_eq!(
                prev.logical_dim(),
                next.logical_dim(),
                "cannot concatenate blocks with different row counts"
            );
            if prev.column_count() == 0 || next.column_base >= prev.original_dim {
                continue;
            }
            assert_eq!(
                next.column_base,
                prev.column_range().end,
                "blocks {:?} and {:?} are not contiguous",
                prev.column_range(),
                next.column_range()
            );
        }

        let columns = blocks.iter().map(DenseBlock::column_count).sum();
        let mut values = Array2::zeros((logical_dim, columns));
        let mut offset = 0;
        for block in &blocks {
            let width = block.column_count();
            values
                .slice_mut(s![.., offset..offset + width])
                .assign(&block.values);
            offset += width;
        }
        Self::from_values(first.original_dim, first.column_base, values)
    }
}

impl Default for DenseBlock {
    fn default() -> Self {
        Self::zeros(0, 0, 0, 0)
    }
}

/// Renders the full `original_dim × original_dim` matrix, tab-separated,
/// with columns outside the block shown as zero.
impl fmt::Display for DenseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = self.column_range();
        for row in 0..self.original_dim {
            for column in 0..self.original_dim {
                if column > 0 {
                    f.write_str("\t")?;
                }
                let value = if range.contains(&column) {
                    self.values[[row, column - range.start]]
                } else {
                    0.0
                };
                write!(f, "{:.3}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_generate_uses_global_coordinates() {
        // Seed 3 yields 10 * row + col.
        let block = DenseBlock::generate(4, 4, 2, 2, 3);
        assert_eq!(block.column_range(), 2..4);
        assert_abs_diff_eq!(block.get(1, 2), 12.0);
        assert_abs_diff_eq!(block.get(3, 3), 33.0);
    }

    #[test]
    fn test_generate_zeroes_padding() {
        let block = DenseBlock::generate(4, 3, 2, 2, 1);
        assert_abs_diff_eq!(block.get(0, 2), 1.0);
        assert_abs_diff_eq!(block.get(0, 3), 0.0);
        assert_abs_diff_eq!(block.get(3, 2), 0.0);
    }

    #[test]
    fn test_get_set_accumulate() {
        let mut block = DenseBlock::zeros(3, 3, 1, 2);
        block.set(0, 1, 2.0);
        block.accumulate(0, 1, 0.5);
        block.accumulate(2, 2, -1.0);
        assert_abs_diff_eq!(block.get(0, 1), 2.5);
        assert_abs_diff_eq!(block.get(2, 2), -1.0);
        block.fill_zero();
        assert_abs_diff_eq!(block.get(0, 1), 0.0);
    }

    #[test]
    #[should_panic(expected = "outside block")]
    fn test_get_outside_range_panics() {
        let block = DenseBlock::zeros(3, 3, 1, 1);
        let _ = block.get(0, 0);
    }

    #[test]
    fn test_merge_same_range_takes_first_nonzero() {
        let a = DenseBlock::from_values(2, 0, array![[1.0, 0.0], [0.0, 0.0]]);
        let b = DenseBlock::from_values(2, 0, array![[0.0, 2.0], [0.0, 0.0]]);
        let c = DenseBlock::from_values(2, 0, array![[9.0, 0.0], [0.0, 3.0]]);
        let merged = DenseBlock::merge(vec![a, b, c]).unwrap();
        assert_eq!(merged.values(), &array![[1.0, 2.0], [0.0, 3.0]]);
    }

    #[test]
    fn test_merge_concatenates_adjacent_blocks() {
        let left = DenseBlock::generate(3, 3, 0, 1, 3);
        let middle = DenseBlock::generate(3, 3, 1, 1, 3);
        let right = DenseBlock::generate(3, 3, 2, 1, 3);
        let merged = DenseBlock::merge(vec![left, middle, right]).unwrap();
        assert_eq!(merged, DenseBlock::generate(3, 3, 0, 3, 3));
    }

    #[test]
    fn test_merge_skips_empty_and_padding_blocks() {
        // Logical dimension 4, real dimension 2: the last block is padding.
        let blocks = vec![
            DenseBlock::generate(4, 2, 0, 2, 1),
            DenseBlock::zeros(4, 2, 4, 0),
            DenseBlock::zeros(4, 2, 4, 0),
        ];
        let merged = DenseBlock::merge(blocks).unwrap();
        assert_eq!(merged.column_range(), 0..2);
    }

    #[test]
    #[should_panic(expected = "not contiguous")]
    fn test_merge_rejects_gaps() {
        let a = DenseBlock::zeros(4, 4, 0, 1);
        let b = DenseBlock::zeros(4, 4, 2, 1);
        let _ = DenseBlock::merge(vec![a, b]);
    }

    #[test]
    fn test_merge_trivial_inputs() {
        assert!(DenseBlock::merge(Vec::new()).is_none());
        let only = DenseBlock::generate(2, 2, 0, 2, 3);
        assert_eq!(DenseBlock::merge(vec![only.clone()]), Some(only));
    }

    #[test]
    fn test_add_block() {
        let mut a = DenseBlock::generate(2, 2, 0, 2, 1);
        a.add_block(&DenseBlock::generate(2, 2, 0, 2, 3));
        assert_eq!(a.values(), &array![[1.0, 2.0], [11.0, 12.0]]);
    }

    #[test]
    fn test_count_at_least_ignores_padding() {
        // Real 2x2 of seed 3 is [[0, 1], [10, 11]]; padding holds zeros.
        let block = DenseBlock::generate(4, 2, 0, 4, 3);
        assert_eq!(block.count_at_least(5.0, 0..4), 2);
        assert_eq!(block.count_at_least(0.0, 0..4), 4);
        assert_eq!(block.count_at_least(0.0, 1..2), 2);
    }

    #[test]
    fn test_display_renders_full_matrix() {
        let block = DenseBlock::generate(2, 2, 1, 1, 3);
        assert_eq!(block.to_string(), "0.000\t1.000\n0.000\t11.000\n");
    }
}
