// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Global bounds resolution.
//!
//! Bounds must be concrete before the aggregation plan is built, because the grid geometry
//! depends on them. When the canvas does not supply both ranges, a small plan computing
//! per-partition extents runs to completion first.

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::canvas::Canvas;
use crate::dataset::Dataset;
use crate::error::RasterError;
use crate::glyph::{Extents, Glyph};
use crate::kernel::{Scheduler, TaskKernel};
use crate::plan::{LeafTask, PlanOptions, build_generic_plan};
use crate::protocol::CombineInput;

/// Computes per-partition [`Extents`] and reduces them to one.
pub struct BoundsKernel<'a, G: ?Sized, D: ?Sized> {
    glyph: &'a G,
    dataset: &'a D,
}

impl<G: ?Sized, D: ?Sized> fmt::Debug for BoundsKernel<'_, G, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundsKernel").finish_non_exhaustive()
    }
}

impl<'a, G: Glyph + ?Sized, D: Dataset + ?Sized> BoundsKernel<'a, G, D> {
    /// Creates a kernel reading `glyph`'s columns from `dataset`.
    pub fn new(glyph: &'a G, dataset: &'a D) -> Self {
        Self { glyph, dataset }
    }
}

impl<G: Glyph + ?Sized, D: Dataset + ?Sized> TaskKernel for BoundsKernel<'_, G, D> {
    type Partial = Extents;
    type Output = Extents;

    fn leaf(&self, task: &LeafTask) -> Result<Extents, RasterError> {
        let frame = self.dataset.partition(task.partition)?;
        frame.require_columns(self.glyph.required_columns())?;
        self.glyph.extents(frame)
    }

    fn merge(&self, input: CombineInput<Extents>) -> Result<Extents, RasterError> {
        input.fold(Extents::union)
    }

    fn finalize(&self, inputs: Vec<Extents>) -> Result<Extents, RasterError> {
        Ok(inputs.into_iter().fold(Extents::default(), Extents::union))
    }
}

/// Resolves the `(x, y)` bounds of a run.
///
/// Ranges given on the canvas are used as-is. If either is missing, the glyph's extents are
/// reduced over every partition through `scheduler`; a supplied range still wins for its own
/// axis. Fails with [`RasterError::EmptyDataset`] when an inferred axis has no finite value.
///
/// The result spans `x0..x1` for x and `y0..y1` for y.
pub fn resolve_bounds<G, D, S>(
    canvas: &Canvas,
    glyph: &G,
    dataset: &D,
    scheduler: &S,
) -> Result<Rect, RasterError>
where
    G: Glyph + ?Sized,
    D: Dataset + ?Sized,
    S: Scheduler + ?Sized,
{
    if let (Some(x), Some(y)) = (canvas.x_range, canvas.y_range) {
        log::debug!("bounds supplied by canvas: x {x:?}, y {y:?}");
        return Ok(Rect::new(x.0, y.0, x.1, y.1));
    }

    let plan = build_generic_plan(dataset.partition_count(), PlanOptions::default());
    let extents = scheduler.run(&plan, &BoundsKernel::new(glyph, dataset))?;
    log::debug!(
        "bounds inferred over {} partitions with {}: {extents:?}",
        dataset.partition_count(),
        scheduler.name()
    );

    let x = canvas.x_range.or(extents.x).ok_or(RasterError::EmptyDataset)?;
    let y = canvas.y_range.or(extents.y).ok_or(RasterError::EmptyDataset)?;
    Ok(Rect::new(x.0, y.0, x.1, y.1))
}
