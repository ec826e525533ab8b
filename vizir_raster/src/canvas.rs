// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas configuration and the per-run viewport derived from it.

extern crate alloc;

use alloc::string::ToString;

use kurbo::Rect;

use crate::axis::{AxisKind, ScaleTranslate};
use crate::buffer::{Backend, GridShape};
use crate::dataset::ExecutionPolicy;
use crate::error::RasterError;
use crate::grid::GridCoords;

/// Output grid configuration.
///
/// Every optional field is resolved once, before the plan is built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    /// Number of x bins.
    pub plot_width: usize,
    /// Number of y bins.
    pub plot_height: usize,
    /// Explicit x range in data units; inferred from the data when `None`.
    pub x_range: Option<(f64, f64)>,
    /// Explicit y range in data units; inferred from the data when `None`.
    pub y_range: Option<(f64, f64)>,
    /// X axis kind.
    pub x_axis: AxisKind,
    /// Y axis kind.
    pub y_axis: AxisKind,
    /// Where aggregate buffers live.
    pub backend: Backend,
    /// Execution policy override; the dataset default is used when `None`.
    pub policy: Option<ExecutionPolicy>,
}

impl Canvas {
    /// Creates a linear, CPU-backed canvas with inferred ranges.
    pub fn new(plot_width: usize, plot_height: usize) -> Self {
        Self {
            plot_width,
            plot_height,
            x_range: None,
            y_range: None,
            x_axis: AxisKind::Linear,
            y_axis: AxisKind::Linear,
            backend: Backend::Cpu,
            policy: None,
        }
    }

    /// Sets an explicit x range.
    pub fn with_x_range(mut self, range: (f64, f64)) -> Self {
        self.x_range = Some(range);
        self
    }

    /// Sets an explicit y range.
    pub fn with_y_range(mut self, range: (f64, f64)) -> Self {
        self.y_range = Some(range);
        self
    }

    /// Sets both axis kinds.
    pub fn with_axes(mut self, x_axis: AxisKind, y_axis: AxisKind) -> Self {
        self.x_axis = x_axis;
        self.y_axis = y_axis;
        self
    }

    /// Sets the buffer backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Overrides the dataset's default execution policy.
    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Returns the output grid shape.
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.plot_height, self.plot_width)
    }
}

/// Resolved grid geometry for one run: bounds, scale/translate pairs and axis kinds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Resolved bounds; `x0..x1` is the x range and `y0..y1` the y range.
    pub bounds: Rect,
    /// X axis kind.
    pub x_axis: AxisKind,
    /// Y axis kind.
    pub y_axis: AxisKind,
    /// X scale/translate.
    pub x_st: ScaleTranslate,
    /// Y scale/translate.
    pub y_st: ScaleTranslate,
    /// Grid shape.
    pub shape: GridShape,
}

impl Viewport {
    /// Derives the viewport from a canvas and concrete bounds.
    ///
    /// Fails with [`RasterError::GridTooLarge`] if the cell count overflows `usize`.
    pub fn new(canvas: &Canvas, bounds: Rect) -> Result<Self, RasterError> {
        let shape = canvas.shape();
        if shape.checked_cells().is_none() {
            return Err(RasterError::GridTooLarge {
                height: shape.height,
                width: shape.width,
            });
        }
        let x_st = canvas
            .x_axis
            .compute_scale_and_translate((bounds.x0, bounds.x1), canvas.plot_width)?;
        let y_st = canvas
            .y_axis
            .compute_scale_and_translate((bounds.y0, bounds.y1), canvas.plot_height)?;
        Ok(Self {
            bounds,
            x_axis: canvas.x_axis,
            y_axis: canvas.y_axis,
            x_st,
            y_st,
            shape,
        })
    }

    /// Returns `true` if `(x, y)` lies inside the bounds, edges included.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let r = self.bounds.abs();
        x >= r.x0 && x <= r.x1 && y >= r.y0 && y <= r.y1
    }

    /// Maps a data-space point to its `(x, y)` cell, or `None` if it lies outside the bounds.
    pub fn bin(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.contains(x, y) {
            return None;
        }
        let xi = self.x_axis.bin(self.x_st, x, self.shape.width)?;
        let yi = self.y_axis.bin(self.y_st, y, self.shape.height)?;
        Some((xi, yi))
    }

    /// Bin-center coordinates and dimension labels for the finalized grid.
    pub fn coords(&self, x_label: &str, y_label: &str) -> GridCoords {
        GridCoords {
            x: self.x_axis.compute_index(self.x_st, self.shape.width),
            y: self.y_axis.compute_index(self.y_st, self.shape.height),
            dims: [y_label.to_string(), x_label.to_string()],
        }
    }
}
