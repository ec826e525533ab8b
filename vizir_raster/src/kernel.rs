// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Task kernels and schedulers.
//!
//! A [`TaskKernel`] says what leaf, merge, and finalize tasks compute; a [`Scheduler`] decides
//! when and where they run. Schedulers move each partial into exactly one consumer, so no
//! partial is ever read after it has been merged.

extern crate alloc;

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::buffer::{AggregateBuffer, Backend, BufferLayout};
use crate::canvas::{Canvas, Viewport};
use crate::dataset::Dataset;
use crate::error::RasterError;
use crate::frame::Frame;
use crate::glyph::Glyph;
use crate::grid::{GridCoords, LabeledGrid};
use crate::plan::{ExecutionPlan, LeafTask, TaskId, TaskKind};
use crate::protocol::{self, CombineInput};
use crate::reduction::Reduction;

/// The computation attached to the nodes of an [`ExecutionPlan`].
pub trait TaskKernel: Sync {
    /// Output of leaf and merge tasks.
    type Partial: Send;
    /// Output of the finalize task.
    type Output: Send;

    /// Runs a leaf task.
    fn leaf(&self, task: &LeafTask) -> Result<Self::Partial, RasterError>;

    /// Runs a merge task.
    fn merge(&self, input: CombineInput<Self::Partial>) -> Result<Self::Partial, RasterError>;

    /// Runs the finalize task; `inputs` may be empty.
    fn finalize(&self, inputs: Vec<Self::Partial>) -> Result<Self::Output, RasterError>;
}

/// An execution engine for plans.
///
/// The first failing task aborts the run and its error is returned unchanged. Schedulers do not
/// retry.
pub trait Scheduler {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs `plan` to completion and returns the finalize task's output.
    fn run<K: TaskKernel>(&self, plan: &ExecutionPlan, kernel: &K)
    -> Result<K::Output, RasterError>;
}

/// Moves the outputs of `inputs` out of `slots`.
///
/// Errors with [`RasterError::InvalidPlan`] if an output is missing or was already consumed.
pub fn take_inputs<T>(slots: &mut [Option<T>], inputs: &[TaskId]) -> Result<Vec<T>, RasterError> {
    inputs
        .iter()
        .map(|&id| {
            slots
                .get_mut(id.0)
                .and_then(Option::take)
                .ok_or(RasterError::InvalidPlan(id))
        })
        .collect()
}

/// Runs every task on the calling thread, in plan order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialScheduler;

impl Scheduler for SerialScheduler {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn run<K: TaskKernel>(
        &self,
        plan: &ExecutionPlan,
        kernel: &K,
    ) -> Result<K::Output, RasterError> {
        let mut slots: Vec<Option<K::Partial>> = (0..plan.len()).map(|_| None).collect();
        for (i, task) in plan.tasks().iter().enumerate() {
            log::trace!("serial: task {i}: {task:?}");
            match task {
                TaskKind::Leaf(leaf) => slots[i] = Some(kernel.leaf(leaf)?),
                TaskKind::Merge { inputs } => {
                    let parts = take_inputs(&mut slots, inputs)?;
                    slots[i] = Some(kernel.merge(CombineInput::from_vec(parts))?);
                }
                TaskKind::Finalize { inputs } => {
                    let parts = take_inputs(&mut slots, inputs)?;
                    return kernel.finalize(parts);
                }
            }
        }
        Err(RasterError::InvalidPlan(plan.terminal()))
    }
}

/// Rasterizes partitions into [`AggregateBuffer`]s and finalizes them into a [`LabeledGrid`].
///
/// This is the glue between a plan and the glyph/reduction collaborators: leaves allocate a
/// buffer, apply the boundary handoff, and let the glyph append into the buffer through the
/// reduction; merges and the finalize go through the [`protocol`] checks.
pub struct AggregationKernel<'a, G: ?Sized, R: ?Sized, D: ?Sized> {
    glyph: &'a G,
    reduction: &'a R,
    dataset: &'a D,
    viewport: Viewport,
    backend: Backend,
    layout: BufferLayout,
    coords: GridCoords,
}

impl<G: ?Sized, R: ?Sized, D: ?Sized> fmt::Debug for AggregationKernel<'_, G, R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationKernel")
            .field("viewport", &self.viewport)
            .field("backend", &self.backend)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<'a, G, R, D> AggregationKernel<'a, G, R, D>
where
    G: Glyph + ?Sized,
    R: Reduction + ?Sized,
    D: Dataset + ?Sized,
{
    /// Prepares a kernel for one run; `bounds` must already be resolved.
    pub fn new(
        canvas: &Canvas,
        bounds: Rect,
        glyph: &'a G,
        reduction: &'a R,
        dataset: &'a D,
    ) -> Result<Self, RasterError> {
        let viewport = Viewport::new(canvas, bounds)?;
        let layout = reduction.create(viewport.shape, canvas.backend).layout();
        let coords = viewport.coords(glyph.x_label(), glyph.y_label());
        Ok(Self {
            glyph,
            reduction,
            dataset,
            viewport,
            backend: canvas.backend,
            layout,
            coords,
        })
    }

    /// The resolved grid geometry.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The layout every buffer of this run has.
    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    fn leaf_frame(&self, task: &LeafTask) -> Result<Cow<'a, Frame>, RasterError> {
        let frame = self.dataset.partition(task.partition)?;
        let Some(handoff) = task.handoff else {
            return Ok(Cow::Borrowed(frame));
        };
        match self.dataset.boundary_row(handoff.source)? {
            Some(row) => Ok(Cow::Owned(frame.with_leading_row(&row)?)),
            None => Ok(Cow::Borrowed(frame)),
        }
    }

    /// Whether the leaf's first segment starts a line: the plan says so, or the row before the
    /// handed-off one breaks the line.
    fn plot_start(&self, task: &LeafTask) -> Result<bool, RasterError> {
        if task.plot_start {
            return Ok(true);
        }
        let Some(previous) = task.handoff.and_then(|h| h.previous) else {
            return Ok(false);
        };
        let frame = self.dataset.partition(previous.partition)?;
        self.glyph.breaks_line(frame, previous.row, &self.viewport)
    }
}

impl<G, R, D> TaskKernel for AggregationKernel<'_, G, R, D>
where
    G: Glyph + ?Sized,
    R: Reduction + ?Sized,
    D: Dataset + ?Sized,
{
    type Partial = AggregateBuffer;
    type Output = LabeledGrid;

    fn leaf(&self, task: &LeafTask) -> Result<AggregateBuffer, RasterError> {
        let frame = self.leaf_frame(task)?;
        let plot_start = self.plot_start(task)?;
        frame.require_columns(self.glyph.required_columns())?;
        frame.require_columns(self.reduction.required_columns())?;
        log::trace!(
            "leaf {}: {} rows, handoff {:?}, plot_start {plot_start}",
            task.partition,
            frame.row_count(),
            task.handoff
        );

        let reduction = self.reduction;
        let mut buffer = reduction.create(self.viewport.shape, self.backend);
        self.glyph.extend(
            &frame,
            &self.viewport,
            plot_start,
            &mut |row, x, y| reduction.append(&mut buffer, row, x, y, &frame),
        )?;
        Ok(buffer)
    }

    fn merge(&self, input: CombineInput) -> Result<AggregateBuffer, RasterError> {
        protocol::combine(self.reduction, input, self.layout)
    }

    fn finalize(&self, inputs: Vec<AggregateBuffer>) -> Result<LabeledGrid, RasterError> {
        let merged = if inputs.is_empty() {
            self.reduction.create(self.viewport.shape, self.backend)
        } else {
            protocol::combine(self.reduction, CombineInput::from_vec(inputs), self.layout)?
        };
        protocol::finalize(self.reduction, merged, self.layout, self.coords.clone())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;
    use core::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::dataset::PartitionedFrame;
    use crate::frame::ColId;
    use crate::glyph::{Extents, GlyphKind};
    use crate::plan::{PlanOptions, build_generic_plan, build_overlap_plan};
    use crate::test_support::{CountCells, TestPoints, points};

    #[test]
    fn serial_scheduler_counts_every_point() {
        let frame = points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let ds = PartitionedFrame::split_even(&frame, 3).unwrap();
        let canvas = Canvas::new(4, 4);
        let glyph = TestPoints::new();
        let kernel = AggregationKernel::new(
            &canvas,
            Rect::new(0.0, 0.0, 3.0, 3.0),
            &glyph,
            &CountCells,
            &ds,
        )
        .unwrap();
        let plan = build_generic_plan(3, PlanOptions::default().with_split_every(2));
        let grid = SerialScheduler.run(&plan, &kernel).unwrap();
        assert_eq!(grid.sum(), 4.0);
        assert_eq!(grid.get(3, 3), Some(1.0));
        assert_eq!(grid.dims(), ["y", "x"]);
    }

    #[test]
    fn finalize_without_inputs_is_the_identity_grid() {
        let ds = PartitionedFrame::new(Vec::new()).unwrap();
        let canvas = Canvas::new(3, 2);
        let glyph = TestPoints::new();
        let kernel = AggregationKernel::new(
            &canvas,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            &glyph,
            &CountCells,
            &ds,
        )
        .unwrap();
        let grid = SerialScheduler
            .run(&build_generic_plan(0, PlanOptions::default()), &kernel)
            .unwrap();
        assert_eq!(grid.values(), &[0.0; 6]);
    }

    #[test]
    fn handoff_prepends_the_boundary_row() {
        let frame = points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let ds = PartitionedFrame::split_at(&frame, &[1]).unwrap();
        let canvas = Canvas::new(3, 3);
        let glyph = TestPoints::new();
        let kernel = AggregationKernel::new(
            &canvas,
            Rect::new(0.0, 0.0, 2.0, 2.0),
            &glyph,
            &CountCells,
            &ds,
        )
        .unwrap();
        let plan = build_overlap_plan(&[1, 2]);
        let leaves: Vec<LeafTask> = plan.leaves().copied().collect();
        let second = kernel.leaf(&leaves[1]).unwrap();
        // Points draw every row, so the handed-off row shows up in the second leaf too.
        assert_eq!(second.layer(0).iter().sum::<f64>(), 3.0);
    }

    /// Ends a line at rows whose x is NaN and remembers the last `plot_start` it was given.
    #[derive(Debug, Default)]
    struct NanBreaks {
        started: AtomicBool,
    }

    impl Glyph for NanBreaks {
        fn kind(&self) -> GlyphKind {
            GlyphKind::LineAxis0
        }

        fn x_label(&self) -> &str {
            "x"
        }

        fn y_label(&self) -> &str {
            "y"
        }

        fn required_columns(&self) -> &[ColId] {
            &[]
        }

        fn extents(&self, _frame: &Frame) -> Result<Extents, RasterError> {
            Ok(Extents::default())
        }

        fn extend(
            &self,
            _frame: &Frame,
            _viewport: &Viewport,
            plot_start: bool,
            _append: &mut dyn FnMut(usize, usize, usize),
        ) -> Result<(), RasterError> {
            self.started.store(plot_start, Ordering::Relaxed);
            Ok(())
        }

        fn breaks_line(
            &self,
            frame: &Frame,
            row: usize,
            _viewport: &Viewport,
        ) -> Result<bool, RasterError> {
            Ok(frame.f64(row, ColId(0)).is_none_or(f64::is_nan))
        }
    }

    fn leaf_starts(frame: &Frame, cuts: &[usize]) -> Vec<bool> {
        let ds = PartitionedFrame::split_at(frame, cuts).unwrap();
        let canvas = Canvas::new(4, 1);
        let glyph = NanBreaks::default();
        let kernel = AggregationKernel::new(
            &canvas,
            Rect::new(0.0, 0.0, 4.0, 1.0),
            &glyph,
            &CountCells,
            &ds,
        )
        .unwrap();
        let lens: Vec<usize> = ds.partitions().iter().map(Frame::row_count).collect();
        build_overlap_plan(&lens)
            .leaves()
            .map(|leaf| {
                kernel.leaf(leaf).unwrap();
                glyph.started.load(Ordering::Relaxed)
            })
            .collect()
    }

    #[test]
    fn a_break_before_the_handoff_row_starts_the_line() {
        let frame = points(&[(0.5, 0.5), (f64::NAN, f64::NAN), (1.5, 0.5), (3.5, 0.5)]);
        // Row 2 is handed off; row 1 before it is NaN.
        assert_eq!(leaf_starts(&frame, &[3]), [true, true]);
        // Row 1 (NaN) is handed off; row 0 before it is finite.
        assert_eq!(leaf_starts(&frame, &[2]), [true, false]);
        // The look-back crosses the empty and the single-row partition.
        assert_eq!(leaf_starts(&frame, &[2, 2, 3]), [true, false, false, true]);
        // Row 0 handed off: nothing precedes it.
        assert_eq!(leaf_starts(&frame, &[1]), [true, true]);
    }

    #[test]
    fn missing_columns_fail_the_leaf() {
        let frame = Frame::from_columns([(crate::ColId(5), vec![1.0])]).unwrap();
        let ds = PartitionedFrame::new(vec![frame]).unwrap();
        let canvas = Canvas::new(1, 1);
        let glyph = TestPoints::new();
        let kernel = AggregationKernel::new(
            &canvas,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            &glyph,
            &CountCells,
            &ds,
        )
        .unwrap();
        let err = SerialScheduler
            .run(&build_generic_plan(1, PlanOptions::default()), &kernel)
            .unwrap_err();
        assert_eq!(err, RasterError::MissingColumn(crate::ColId(0)));
    }

    #[test]
    fn take_inputs_rejects_double_consumption() {
        let mut slots = vec![Some(1), Some(2)];
        assert_eq!(take_inputs(&mut slots, &[TaskId(1)]), Ok(vec![2]));
        assert_eq!(
            take_inputs(&mut slots, &[TaskId(0), TaskId(1)]),
            Err(RasterError::InvalidPlan(TaskId(1)))
        );
    }
}
