// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-cell reductions.
//!
//! Reductions over a value column skip rows whose value is NaN. Cells that received no value
//! finalize to NaN for [`Sum`], [`Min`], [`Max`] and [`Mean`], and to `0` for [`Count`] and
//! [`Any`].

extern crate alloc;

use alloc::vec::Vec;

use vizir_raster::{AggregateBuffer, Backend, ColId, Frame, GridShape, Reduction};

/// Folds a batch into its first buffer, cell by cell.
fn merge_all(buffers: Vec<AggregateBuffer>, f: impl Fn(f64, f64) -> f64) -> AggregateBuffer {
    let mut iter = buffers.into_iter();
    let Some(mut acc) = iter.next() else {
        // Rejected by the layout check that follows every combine.
        return AggregateBuffer::zeros(GridShape::new(0, 0), Backend::default());
    };
    for b in iter {
        acc.zip_with(&b, |_, d, s| *d = f(*d, s));
    }
    acc
}

fn first_layer(buffer: AggregateBuffer) -> Vec<f64> {
    buffer.into_layers().into_iter().next().unwrap_or_default()
}

fn value(frame: &Frame, row: usize, col: ColId) -> f64 {
    frame.f64(row, col).unwrap_or(f64::NAN)
}

/// NaN-skipping addition; NaN only when both sides are NaN.
fn nan_add(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, _) => b,
        (_, true) => a,
        _ => a + b,
    }
}

/// Number of records per cell, or of non-NaN values of one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Count {
    column: Option<ColId>,
}

impl Count {
    /// Counts every record that reaches a cell.
    pub fn rows() -> Self {
        Self { column: None }
    }

    /// Counts records whose `column` value is not NaN.
    pub fn of(column: ColId) -> Self {
        Self {
            column: Some(column),
        }
    }
}

impl Reduction for Count {
    fn required_columns(&self) -> &[ColId] {
        self.column.as_slice()
    }

    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::zeros(shape, backend)
    }

    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame) {
        if let Some(col) = self.column
            && value(frame, row, col).is_nan()
        {
            return;
        }
        *buffer.cell_mut(0, y, x) += 1.0;
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        merge_all(buffers, |a, b| a + b)
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        first_layer(buffer)
    }
}

/// Sum of a column per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sum {
    column: [ColId; 1],
}

impl Sum {
    /// Sums `column`.
    pub fn new(column: ColId) -> Self {
        Self { column: [column] }
    }
}

impl Reduction for Sum {
    fn required_columns(&self) -> &[ColId] {
        &self.column
    }

    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::filled(shape, backend, &[f64::NAN])
    }

    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame) {
        let v = value(frame, row, self.column[0]);
        let cell = buffer.cell_mut(0, y, x);
        *cell = nan_add(*cell, v);
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        merge_all(buffers, nan_add)
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        first_layer(buffer)
    }
}

/// Smallest value of a column per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Min {
    column: [ColId; 1],
}

impl Min {
    /// Takes the minimum of `column`.
    pub fn new(column: ColId) -> Self {
        Self { column: [column] }
    }
}

impl Reduction for Min {
    fn required_columns(&self) -> &[ColId] {
        &self.column
    }

    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::filled(shape, backend, &[f64::NAN])
    }

    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame) {
        let v = value(frame, row, self.column[0]);
        let cell = buffer.cell_mut(0, y, x);
        *cell = cell.min(v);
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        merge_all(buffers, f64::min)
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        first_layer(buffer)
    }
}

/// Largest value of a column per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Max {
    column: [ColId; 1],
}

impl Max {
    /// Takes the maximum of `column`.
    pub fn new(column: ColId) -> Self {
        Self { column: [column] }
    }
}

impl Reduction for Max {
    fn required_columns(&self) -> &[ColId] {
        &self.column
    }

    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::filled(shape, backend, &[f64::NAN])
    }

    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame) {
        let v = value(frame, row, self.column[0]);
        let cell = buffer.cell_mut(0, y, x);
        *cell = cell.max(v);
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        merge_all(buffers, f64::max)
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        first_layer(buffer)
    }
}

/// Mean of a column per cell.
///
/// Keeps a running sum and count in two layers; the division happens at finalize, so partial
/// means are never averaged with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mean {
    column: [ColId; 1],
}

impl Mean {
    /// Averages `column`.
    pub fn new(column: ColId) -> Self {
        Self { column: [column] }
    }
}

impl Reduction for Mean {
    fn required_columns(&self) -> &[ColId] {
        &self.column
    }

    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::filled(shape, backend, &[0.0, 0.0])
    }

    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame) {
        let v = value(frame, row, self.column[0]);
        if v.is_nan() {
            return;
        }
        *buffer.cell_mut(0, y, x) += v;
        *buffer.cell_mut(1, y, x) += 1.0;
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        merge_all(buffers, |a, b| a + b)
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        let mut layers = buffer.into_layers().into_iter();
        let (Some(sums), Some(counts)) = (layers.next(), layers.next()) else {
            return Vec::new();
        };
        sums.into_iter()
            .zip(counts)
            .map(|(s, n)| if n > 0.0 { s / n } else { f64::NAN })
            .collect()
    }
}

/// `1` where any record (or any non-NaN value of a column) reached the cell, else `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Any {
    column: Option<ColId>,
}

impl Any {
    /// Flags cells reached by any record.
    pub fn rows() -> Self {
        Self { column: None }
    }

    /// Flags cells reached by a non-NaN `column` value.
    pub fn of(column: ColId) -> Self {
        Self {
            column: Some(column),
        }
    }
}

impl Reduction for Any {
    fn required_columns(&self) -> &[ColId] {
        self.column.as_slice()
    }

    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::zeros(shape, backend)
    }

    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame) {
        if let Some(col) = self.column
            && value(frame, row, col).is_nan()
        {
            return;
        }
        *buffer.cell_mut(0, y, x) = 1.0;
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        merge_all(buffers, f64::max)
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        first_layer(buffer)
    }
}
