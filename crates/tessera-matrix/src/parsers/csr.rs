//! Parser for plain-text CSR matrix files.
//!
//! The format is whitespace-separated:
//! ```text
//! <rows> <columns> <total_nonzeros> <max_row_nonzeros>
//! <value> <value> ...            (total_nonzeros doubles, row-major)
//! <offset> <offset> ...          (rows + 1 row offsets)
//! <column> <column> ...          (total_nonzeros 0-based column indices)
//! ```
//!
//! Only square matrices are accepted. The offsets line always holds
//! `rows + 1` entries, one per row boundary. It is not derived from
//! `total_nonzeros / max_row_nonzeros`, so files written with that shorter
//! offsets line are rejected. The header's per-row maximum is checked
//! against the parsed rows instead.

use std::path::Path;
use std::str::FromStr;

use super::ParseError;
use crate::sparse::SparseMatrix;

/// Token stream that remembers which line each token came from.
struct Tokens<'a> {
    tokens: Vec<(usize, &'a str)>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str) -> Self {
        let tokens = content
            .lines()
            .enumerate()
            .flat_map(|(idx, line)| line.split_whitespace().map(move |t| (idx + 1, t)))
            .collect();
        Self {
            tokens,
            position: 0,
        }
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.position.saturating_sub(1))
            .map_or(1, |&(line, _)| line)
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T, ParseError> {
        let Some(&(line, token)) = self.tokens.get(self.position) else {
            return Err(ParseError::FormatError {
                line: self.current_line(),
                message: format!("Unexpected end of file while reading {}", what),
            });
        };
        self.position += 1;
        token.parse().map_err(|_| ParseError::FormatError {
            line,
            message: format!("Invalid {}: '{}'", what, token),
        })
    }

    fn take<T: FromStr>(&mut self, count: usize, what: &str) -> Result<Vec<T>, ParseError> {
        (0..count).map(|_| self.next(what)).collect()
    }

    fn remaining(&self) -> Option<(usize, &'a str)> {
        self.tokens.get(self.position).copied()
    }
}

/// Parse a CSR matrix from a string.
pub fn parse_csr(content: &str) -> Result<SparseMatrix, ParseError> {
    let mut tokens = Tokens::new(content);

    let rows: usize = tokens.next("row count")?;
    let columns: usize = tokens.next("column count")?;
    let total: usize = tokens.next("nonzero count")?;
    let max_row: usize = tokens.next("maximum row nonzero count")?;

    if rows != columns {
        return Err(ParseError::FormatError {
            line: 1,
            message: format!("Matrix must be square, got {}x{}", rows, columns),
        });
    }

    let values: Vec<f64> = tokens.take(total, "value")?;
    let offset_count = rows.checked_add(1).ok_or_else(|| ParseError::FormatError {
        line: 1,
        message: format!("Row count {} is too large", rows),
    })?;
    let row_offsets: Vec<usize> = tokens.take(offset_count, "row offset")?;
    let column_indices: Vec<usize> = tokens.take(total, "column index")?;

    if let Some((line, token)) = tokens.remaining() {
        return Err(ParseError::FormatError {
            line,
            message: format!("Unexpected trailing data: '{}'", token),
        });
    }

    let matrix = SparseMatrix::new(rows, values, row_offsets, column_indices)?;

    if let Some(row) = (0..rows).find(|&r| matrix.row_len(r) > max_row) {
        return Err(ParseError::FormatError {
            line: 1,
            message: format!(
                "Header allows {} nonzeros per row but row {} holds {}",
                max_row,
                row,
                matrix.row_len(row)
            ),
        });
    }

    Ok(matrix)
}

/// Read and parse a CSR matrix file.
pub fn load_csr(path: &Path) -> Result<SparseMatrix, ParseError> {
    let content = std::fs::read_to_string(path)?;
    let matrix = parse_csr(&content)?;
    log::debug!(
        "Loaded {}: n={}, nnz={}",
        path.display(),
        matrix.dim(),
        matrix.nnz()
    );
    Ok(matrix)
}
