// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline errors.

extern crate alloc;

use alloc::string::String;
use core::fmt;

use crate::buffer::BufferLayout;
use crate::frame::ColId;
use crate::glyph::GlyphKind;
use crate::plan::TaskId;

/// Errors returned by bounds resolution, plan construction, and plan execution.
///
/// Any error aborts the whole pipeline call; no partially merged grid is ever returned.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterError {
    /// No plan builder is registered for this glyph kind (and backend).
    UnsupportedGlyph(GlyphKind),
    /// Bounds had to be inferred, but no partition yielded a finite extent.
    EmptyDataset,
    /// A buffer handed to `combine`/`finalize` does not match the layout of the run.
    IncompatibleAggregateShape {
        /// Layout every buffer of the run must have.
        expected: BufferLayout,
        /// Layout of the offending buffer.
        found: BufferLayout,
    },
    /// `combine` was called with an empty batch.
    EmptyCombine,
    /// An axis range maps to non-finite values (e.g. a log axis over a non-positive range).
    InvalidAxisRange {
        /// The offending `(min, max)` range, in data units.
        range: (f64, f64),
    },
    /// The canvas has more cells than `usize` can count.
    GridTooLarge {
        /// Requested number of rows.
        height: usize,
        /// Requested number of columns.
        width: usize,
    },
    /// The dataset has no partition with this index.
    MissingPartition(usize),
    /// A glyph or reduction requires a column that the partition frame lacks.
    MissingColumn(ColId),
    /// Frame construction failed (no columns, ragged columns, or a row of the wrong width).
    InvalidFrame,
    /// A plan violated its own invariants (a task input was missing or consumed twice).
    InvalidPlan(TaskId),
    /// The execution engine failed or is unavailable.
    Scheduler(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedGlyph(kind) => {
                write!(f, "no plan builder is registered for glyph kind {kind:?}")
            }
            Self::EmptyDataset => f.write_str(
                "cannot infer bounds: no partition yields a finite extent; supply x/y ranges",
            ),
            Self::IncompatibleAggregateShape { expected, found } => write!(
                f,
                "aggregate buffer layout {found:?} does not match the run's layout {expected:?}"
            ),
            Self::EmptyCombine => f.write_str("combine requires at least one aggregate buffer"),
            Self::InvalidAxisRange { range } => {
                write!(f, "axis range {range:?} does not map to finite values")
            }
            Self::GridTooLarge { height, width } => {
                write!(f, "a {height}x{width} grid has too many cells to index")
            }
            Self::MissingPartition(index) => write!(f, "dataset has no partition {index}"),
            Self::MissingColumn(col) => write!(f, "partition is missing column {col:?}"),
            Self::InvalidFrame => f.write_str("frame columns are empty or ragged"),
            Self::InvalidPlan(task) => {
                write!(f, "execution plan is malformed at task {}", task.0)
            }
            Self::Scheduler(msg) => write!(f, "scheduler failure: {msg}"),
        }
    }
}

impl core::error::Error for RasterError {}
