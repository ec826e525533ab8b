// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The combine/finalize protocol between partial aggregates and the labelled grid.
//!
//! Schedulers deliver merge inputs either batched or as a single partial (an identity merge
//! at the edge of some tree shapes). [`combine`] accepts both and checks every buffer
//! against the run's [`BufferLayout`] before handing it to the reduction. [`finalize`] is the
//! only place coordinates and dimension labels are attached.

extern crate alloc;

use alloc::vec::Vec;

use crate::buffer::{AggregateBuffer, BufferLayout, GridShape};
use crate::error::RasterError;
use crate::grid::{GridCoords, LabeledGrid};
use crate::reduction::Reduction;

/// Inputs of one merge step.
#[derive(Clone, Debug, PartialEq)]
pub enum CombineInput<T = AggregateBuffer> {
    /// Several partials to merge.
    Batch(Vec<T>),
    /// A single partial, passed through unchanged.
    Single(T),
}

impl<T> CombineInput<T> {
    /// Wraps a list, using [`CombineInput::Single`] for one element.
    pub fn from_vec(mut items: Vec<T>) -> Self {
        if items.len() == 1
            && let Some(only) = items.pop()
        {
            return Self::Single(only);
        }
        Self::Batch(items)
    }

    /// Number of partials carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Batch(items) => items.len(),
            Self::Single(_) => 1,
        }
    }

    /// Returns `true` for an empty batch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Folds the partials with `f`; errors with [`RasterError::EmptyCombine`] on an empty batch.
    pub fn fold(self, mut f: impl FnMut(T, T) -> T) -> Result<T, RasterError> {
        match self {
            Self::Single(item) => Ok(item),
            Self::Batch(items) => items
                .into_iter()
                .reduce(&mut f)
                .ok_or(RasterError::EmptyCombine),
        }
    }
}

impl<T> From<Vec<T>> for CombineInput<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

fn check_layout(buffer: &AggregateBuffer, expected: BufferLayout) -> Result<(), RasterError> {
    let found = buffer.layout();
    if found == expected {
        Ok(())
    } else {
        Err(RasterError::IncompatibleAggregateShape { expected, found })
    }
}

/// Merges partial aggregates of one run.
pub fn combine<R: Reduction + ?Sized>(
    reduction: &R,
    input: CombineInput,
    expected: BufferLayout,
) -> Result<AggregateBuffer, RasterError> {
    match input {
        CombineInput::Single(buffer) => {
            check_layout(&buffer, expected)?;
            Ok(buffer)
        }
        CombineInput::Batch(buffers) => {
            if buffers.is_empty() {
                return Err(RasterError::EmptyCombine);
            }
            for b in &buffers {
                check_layout(b, expected)?;
            }
            let merged = reduction.combine(buffers);
            check_layout(&merged, expected)?;
            Ok(merged)
        }
    }
}

/// Materializes a fully merged buffer as a [`LabeledGrid`].
///
/// Works for buffers of either [`crate::Backend`]; the backend is recorded on the grid.
pub fn finalize<R: Reduction + ?Sized>(
    reduction: &R,
    buffer: AggregateBuffer,
    expected: BufferLayout,
    coords: GridCoords,
) -> Result<LabeledGrid, RasterError> {
    check_layout(&buffer, expected)?;
    let shape = buffer.shape();
    let backend = buffer.backend();
    let values = reduction.finalize_values(buffer);
    if values.len() != shape.cells() {
        return Err(RasterError::IncompatibleAggregateShape {
            expected,
            found: BufferLayout {
                shape,
                layers: values.len() / shape.cells().max(1),
            },
        });
    }
    if coords.x.len() != shape.width || coords.y.len() != shape.height {
        return Err(RasterError::IncompatibleAggregateShape {
            expected,
            found: BufferLayout {
                shape: GridShape::new(coords.y.len(), coords.x.len()),
                layers: expected.layers,
            },
        });
    }
    Ok(LabeledGrid::new(values, shape, coords, backend))
}
