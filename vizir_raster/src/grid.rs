// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The finalized, labelled output grid.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::buffer::{Backend, GridShape};

/// Per-axis bin-center coordinates and dimension labels.
#[derive(Clone, Debug, PartialEq)]
pub struct GridCoords {
    /// X bin centers, in data units.
    pub x: Vec<f64>,
    /// Y bin centers, in data units.
    pub y: Vec<f64>,
    /// Dimension labels, y first.
    pub dims: [String; 2],
}

/// A finalized aggregate: row-major values plus coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledGrid {
    values: Vec<f64>,
    shape: GridShape,
    coords: GridCoords,
    backend: Backend,
}

impl LabeledGrid {
    pub(crate) fn new(
        values: Vec<f64>,
        shape: GridShape,
        coords: GridCoords,
        backend: Backend,
    ) -> Self {
        debug_assert_eq!(values.len(), shape.cells(), "grid value count");
        Self {
            values,
            shape,
            coords,
            backend,
        }
    }

    /// Returns the shape.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Row-major values (`height * width`).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of cell `(y, x)`.
    pub fn get(&self, y: usize, x: usize) -> Option<f64> {
        if y >= self.shape.height || x >= self.shape.width {
            return None;
        }
        Some(self.values[self.shape.index(y, x)])
    }

    /// Coordinates and labels.
    pub fn coords(&self) -> &GridCoords {
        &self.coords
    }

    /// Dimension labels, y first.
    pub fn dims(&self) -> [&str; 2] {
        [&self.coords.dims[0], &self.coords.dims[1]]
    }

    /// Backend the aggregate buffers were produced on.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Sum of all non-NaN cells.
    pub fn sum(&self) -> f64 {
        self.values.iter().filter(|v| !v.is_nan()).sum()
    }

    /// Maximum non-NaN cell, if any.
    pub fn max(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f64::max)
    }

    /// Consumes the grid and returns its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
