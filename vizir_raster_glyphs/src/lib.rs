// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference glyphs and reductions for `vizir_raster`.
//!
//! - [`Point`]: one cell per record.
//! - [`LineAxis0`]: a polyline through consecutive rows, clipped to the bounds and drawn with
//!   Bresenham's algorithm. Rows with a non-finite coordinate break the line.
//! - [`Count`], [`Sum`], [`Min`], [`Max`], [`Mean`], [`Any`]: per-cell reductions.
//!
//! Every glyph and reduction here is stateless per run, so one instance can be shared across
//! partitions and threads.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod line;
mod point;
mod reductions;

pub use line::LineAxis0;
pub use point::Point;
pub use reductions::{Any, Count, Max, Mean, Min, Sum};
