// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The glyph contract: how records become grid cells.

use crate::canvas::Viewport;
use crate::error::RasterError;
use crate::frame::{ColId, Frame};

/// Geometry variants.
///
/// The plan builder is picked from this tag (see [`crate::StrategyTable`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlyphKind {
    /// One cell per record; rasterization is partition-local.
    Point,
    /// A polyline through consecutive rows; segments may cross partition boundaries.
    LineAxis0,
    /// Triangle meshes indexing vertices anywhere in the dataset; no partitioned plan exists.
    Triangles,
}

/// Per-axis `(min, max)` of finite values, `None` when no finite value was seen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Extents {
    /// X extent.
    pub x: Option<(f64, f64)>,
    /// Y extent.
    pub y: Option<(f64, f64)>,
}

impl Extents {
    /// Extents of two columns, ignoring non-finite values.
    pub fn of_columns(xs: &[f64], ys: &[f64]) -> Self {
        Self {
            x: finite_range(xs),
            y: finite_range(ys),
        }
    }

    /// Smallest extents containing both `self` and `other`.
    pub fn union(self, other: Self) -> Self {
        Self {
            x: union_range(self.x, other.x),
            y: union_range(self.y, other.y),
        }
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if !v.is_finite() {
            continue;
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

fn union_range(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
        (a, None) => a,
        (None, b) => b,
    }
}

/// A geometry that can be rasterized one partition at a time.
pub trait Glyph: Sync {
    /// The geometry variant, used to pick a plan builder.
    fn kind(&self) -> GlyphKind;

    /// Dimension label of the x axis.
    fn x_label(&self) -> &str;

    /// Dimension label of the y axis.
    fn y_label(&self) -> &str;

    /// Columns read by [`Glyph::extents`] and [`Glyph::extend`].
    fn required_columns(&self) -> &[ColId];

    /// Local extents of one partition.
    fn extents(&self, frame: &Frame) -> Result<Extents, RasterError>;

    /// Rasterizes every row of `frame`, calling `append(row, x, y)` once per touched cell.
    ///
    /// `plot_start` is `true` when row 0 has no predecessor drawn by another task. Glyphs
    /// that only look at one row at a time ignore it.
    fn extend(
        &self,
        frame: &Frame,
        viewport: &Viewport,
        plot_start: bool,
        append: &mut dyn FnMut(usize, usize, usize),
    ) -> Result<(), RasterError>;

    /// Returns `true` if `frame[row]` ends a line, so that the segment leaving the next row
    /// starts a new one.
    ///
    /// Consulted for the row preceding a boundary handoff. Glyphs that do not connect rows
    /// never break.
    fn breaks_line(
        &self,
        _frame: &Frame,
        _row: usize,
        _viewport: &Viewport,
    ) -> Result<bool, RasterError> {
        Ok(false)
    }
}
