// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned columnar partitions.

extern crate alloc;

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::error::RasterError;

/// A column identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColId(pub u32);

/// One record, with values aligned to its frame's columns.
pub type Row = SmallVec<[f64; 4]>;

/// An owned numeric table: one partition of a dataset.
///
/// Missing values are represented as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<ColId>,
    data: Vec<Vec<f64>>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(columns: Vec<ColId>) -> Result<Self, RasterError> {
        if columns.is_empty() {
            return Err(RasterError::InvalidFrame);
        }
        let data = columns.iter().map(|_| Vec::new()).collect();
        Ok(Self { columns, data })
    }

    /// Build a frame from `(column, values)` pairs of equal length.
    pub fn from_columns(
        columns: impl IntoIterator<Item = (ColId, Vec<f64>)>,
    ) -> Result<Self, RasterError> {
        let (columns, data): (Vec<ColId>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        let Some(first) = data.first() else {
            return Err(RasterError::InvalidFrame);
        };
        if data.iter().any(|c| c.len() != first.len()) {
            return Err(RasterError::InvalidFrame);
        }
        Ok(Self { columns, data })
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.data.first().map_or(0, |c| c.len())
    }

    /// Returns the column ids, in storage order.
    pub fn columns(&self) -> &[ColId] {
        &self.columns
    }

    /// Returns a column index for a `ColId`, if present.
    pub fn column_index(&self, col: ColId) -> Option<usize> {
        self.columns.iter().position(|&c| c == col)
    }

    /// Borrows a whole column.
    pub fn column(&self, col: ColId) -> Option<&[f64]> {
        let ci = self.column_index(col)?;
        Some(&self.data[ci])
    }

    /// Errors with [`RasterError::MissingColumn`] unless every listed column is present.
    pub fn require_columns(&self, cols: &[ColId]) -> Result<(), RasterError> {
        match cols.iter().find(|&&c| self.column_index(c).is_none()) {
            Some(&missing) => Err(RasterError::MissingColumn(missing)),
            None => Ok(()),
        }
    }

    /// Gets a numeric value for a row/col if both exist.
    pub fn f64(&self, row: usize, col: ColId) -> Option<f64> {
        let ci = self.column_index(col)?;
        self.data.get(ci)?.get(row).copied()
    }

    /// Copies one row out of the frame.
    pub fn row(&self, row: usize) -> Option<Row> {
        if row >= self.row_count() {
            return None;
        }
        Some(self.data.iter().map(|c| c[row]).collect())
    }

    /// Copies the last row out of the frame, if any.
    pub fn last_row(&self) -> Option<Row> {
        self.row_count().checked_sub(1).and_then(|r| self.row(r))
    }

    /// Returns a new frame with `row` followed by all rows of `self`.
    pub fn with_leading_row(&self, row: &[f64]) -> Result<Self, RasterError> {
        if row.len() != self.columns.len() {
            return Err(RasterError::InvalidFrame);
        }
        let data = self
            .data
            .iter()
            .zip(row)
            .map(|(col, &head)| {
                let mut out = Vec::with_capacity(col.len() + 1);
                out.push(head);
                out.extend_from_slice(col);
                out
            })
            .collect();
        Ok(Self {
            columns: self.columns.clone(),
            data,
        })
    }

    /// Copies rows `start..end` into a new frame.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            data: self.data.iter().map(|c| c[start..end].to_vec()).collect(),
        }
    }
}
