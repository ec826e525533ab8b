// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partitioned grid aggregation for VizIR.
//!
//! This crate rasterizes tabular records into a fixed-size grid when the table is split into
//! independent, ordered partitions. It owns the *decomposition* and *recomposition* of the
//! aggregation:
//! - **Bounds** are resolved first, from the canvas or by reducing per-partition extents.
//! - **Axis transforms** turn the bounds into per-axis scale/translate pairs and bin centers.
//! - **Plans** declare one leaf task per partition, merge tasks, and a single finalize task.
//!   Point-like glyphs get a tree reduction; line glyphs get a chain in which each leaf also
//!   sees the last row of its predecessor (a [`BoundaryHandoff`]).
//! - **The combine/finalize protocol** merges partial [`AggregateBuffer`]s and attaches
//!   coordinates to produce a [`LabeledGrid`].
//!
//! Per-row drawing ([`Glyph`]), the reduction math ([`Reduction`]), and the execution engine
//! ([`Scheduler`]) are traits; this crate ships a [`SerialScheduler`] and leaves parallel
//! engines to `vizir_raster_exec`.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod axis;
mod bounds;
mod buffer;
mod canvas;
mod dataset;
mod error;
#[cfg(not(feature = "std"))]
mod float;
mod frame;
mod glyph;
mod grid;
mod kernel;
mod plan;
mod protocol;
mod reduction;
mod strategy;
#[cfg(test)]
mod test_support;

pub use axis::{AxisKind, ScaleTranslate};
pub use bounds::{BoundsKernel, resolve_bounds};
pub use buffer::{AggregateBuffer, Backend, BufferLayout, GridShape};
pub use canvas::{Canvas, Viewport};
pub use dataset::{Dataset, ExecutionPolicy, PartitionedFrame};
pub use error::RasterError;
pub use frame::{ColId, Frame, Row};
pub use glyph::{Extents, Glyph, GlyphKind};
pub use grid::{GridCoords, LabeledGrid};
pub use kernel::{AggregationKernel, Scheduler, SerialScheduler, TaskKernel, take_inputs};
pub use plan::{
    BoundaryHandoff, ExecutionPlan, LeafTask, PlanOptions, RowRef, TaskId, TaskKind,
    build_generic_plan, build_overlap_plan, build_plan,
};
pub use protocol::{CombineInput, combine, finalize};
pub use reduction::Reduction;
pub use strategy::{Strategy, StrategyTable};
