// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compiled reduction contract.

extern crate alloc;

use alloc::vec::Vec;

use crate::buffer::{AggregateBuffer, Backend, GridShape};
use crate::frame::{ColId, Frame};

/// What is being aggregated per cell (count, sum of a column, ...).
///
/// Implementations must keep every buffer of a run at the layout returned by `create`, and
/// `combine` must be associative and commutative so that plan shape never changes the result.
pub trait Reduction: Sync {
    /// Columns read by [`Reduction::append`].
    fn required_columns(&self) -> &[ColId] {
        &[]
    }

    /// Allocates a buffer filled with the reduction's identity value.
    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer;

    /// Folds `frame[row]` into cell `(y, x)` of `buffer`. Only `buffer` is mutated.
    fn append(&self, buffer: &mut AggregateBuffer, row: usize, x: usize, y: usize, frame: &Frame);

    /// Merges a non-empty batch of same-layout buffers.
    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer;

    /// Collapses a fully merged buffer into one row-major value per cell.
    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64>;
}
