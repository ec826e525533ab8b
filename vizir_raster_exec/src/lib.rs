// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Executors for `vizir_raster` plans.
//!
//! `vizir_raster` declares what a run computes; this crate decides how it runs:
//! - [`resolve_policy`] picks the [`ExecutionPolicy`] of a run (canvas override, else the
//!   dataset default).
//! - [`ThreadPoolScheduler`] runs plans on a `rayon` pool, wave by wave, and also offers the
//!   array-native `map` + `reduce` lowering for tree reductions.
//! - [`aggregate`] is the one-call pipeline: strategy lookup, bounds, plan, execution.
//!   Thread-pool runs reuse one pool per thread count; [`aggregate_on`] runs on a pool the
//!   caller owns instead.
//!
//! The thread pool lives behind the `multithreading` feature (on by default). Without it, a
//! thread-pool policy fails with [`RasterError::Scheduler`].
//!
//! ```
//! use vizir_raster::{Canvas, ColId, Frame, PartitionedFrame};
//! use vizir_raster_exec::aggregate;
//! use vizir_raster_glyphs::{Count, Point};
//!
//! let frame = Frame::from_columns([
//!     (ColId(0), vec![0.0, 1.0, 2.0, 3.0]),
//!     (ColId(1), vec![0.0, 1.0, 2.0, 3.0]),
//! ])?;
//! let dataset = PartitionedFrame::split_even(&frame, 2)?;
//! let grid = aggregate(
//!     &Canvas::new(4, 4),
//!     &dataset,
//!     &Point::new(ColId(0), ColId(1)),
//!     &Count::rows(),
//! )?;
//! assert_eq!(grid.sum(), 4.0);
//! # Ok::<(), vizir_raster::RasterError>(())
//! ```
//!
//! [`ExecutionPolicy`]: vizir_raster::ExecutionPolicy
//! [`RasterError::Scheduler`]: vizir_raster::RasterError::Scheduler

mod pipeline;
mod policy;
#[cfg(feature = "multithreading")]
mod thread_pool;

#[cfg(feature = "multithreading")]
pub use pipeline::aggregate_on;
pub use pipeline::{Lowering, aggregate, aggregate_with, select_lowering};
pub use policy::resolve_policy;
#[cfg(feature = "multithreading")]
pub use thread_pool::ThreadPoolScheduler;
