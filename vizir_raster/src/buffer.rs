// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Aggregate buffers.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use smallvec::SmallVec;

/// Where aggregate buffers live while a run is in flight.
///
/// The flag is forwarded to [`crate::Reduction::create`], so a reduction can allocate
/// accelerator-resident storage. The finalize step accepts buffers from either backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Host memory.
    #[default]
    Cpu,
    /// Device memory owned by an accelerator-aware reduction.
    Accelerator,
}

/// The `(height, width)` of the output grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GridShape {
    /// Number of rows (y bins).
    pub height: usize,
    /// Number of columns (x bins).
    pub width: usize,
}

impl GridShape {
    /// Creates a shape.
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Returns `height * width`.
    ///
    /// Shapes reaching a buffer have been checked by [`crate::Viewport::new`]; use
    /// [`GridShape::checked_cells`] for unchecked ones.
    pub fn cells(&self) -> usize {
        self.height * self.width
    }

    /// Returns `height * width`, or `None` if it overflows `usize`.
    pub fn checked_cells(&self) -> Option<usize> {
        self.height.checked_mul(self.width)
    }

    /// Row-major cell index of `(y, x)`.
    pub fn index(&self, y: usize, x: usize) -> usize {
        debug_assert!(y < self.height && x < self.width, "cell out of range");
        y * self.width + x
    }
}

/// Shape plus layer count; every buffer of a run has the same layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferLayout {
    /// Grid shape of each layer.
    pub shape: GridShape,
    /// Number of layers (e.g. 2 for a mean: sum and count).
    pub layers: usize,
}

/// One or more row-major `f64` layers of a fixed [`GridShape`].
///
/// A buffer is owned by the task that created it until it is moved into a merge.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateBuffer {
    shape: GridShape,
    backend: Backend,
    layers: SmallVec<[Vec<f64>; 2]>,
}

impl AggregateBuffer {
    /// Creates a buffer with one layer per entry of `fills`, each filled with that value.
    pub fn filled(shape: GridShape, backend: Backend, fills: &[f64]) -> Self {
        let layers = fills.iter().map(|&v| vec![v; shape.cells()]).collect();
        Self {
            shape,
            backend,
            layers,
        }
    }

    /// Creates a single zero-filled layer.
    pub fn zeros(shape: GridShape, backend: Backend) -> Self {
        Self::filled(shape, backend, &[0.0])
    }

    /// Returns the grid shape.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Returns the backend the buffer was created for.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Returns the shape and layer count.
    pub fn layout(&self) -> BufferLayout {
        BufferLayout {
            shape: self.shape,
            layers: self.layers.len(),
        }
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Borrows a layer.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is out of range.
    pub fn layer(&self, layer: usize) -> &[f64] {
        &self.layers[layer]
    }

    /// Mutably borrows a layer.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is out of range.
    pub fn layer_mut(&mut self, layer: usize) -> &mut [f64] {
        &mut self.layers[layer]
    }

    /// Mutable access to cell `(y, x)` of `layer`.
    pub fn cell_mut(&mut self, layer: usize, y: usize, x: usize) -> &mut f64 {
        let i = self.shape.index(y, x);
        &mut self.layers[layer][i]
    }

    /// Merges `other` into `self` cell by cell, layer by layer.
    ///
    /// Layouts must already have been checked by the caller.
    pub fn zip_with(&mut self, other: &Self, mut f: impl FnMut(usize, &mut f64, f64)) {
        debug_assert_eq!(self.layout(), other.layout(), "zip_with layout mismatch");
        for (li, (dst, src)) in self.layers.iter_mut().zip(other.layers.iter()).enumerate() {
            for (d, &s) in dst.iter_mut().zip(src.iter()) {
                f(li, d, s);
            }
        }
    }

    /// Consumes the buffer and returns its layers.
    pub fn into_layers(self) -> SmallVec<[Vec<f64>; 2]> {
        self.layers
    }
}
