// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal glyph and reduction used by this crate's unit tests.

extern crate alloc;

use alloc::vec::Vec;

use crate::buffer::{AggregateBuffer, Backend, GridShape};
use crate::canvas::Viewport;
use crate::error::RasterError;
use crate::frame::{ColId, Frame};
use crate::glyph::{Extents, Glyph, GlyphKind};
use crate::reduction::Reduction;

const XY: [ColId; 2] = [ColId(0), ColId(1)];

/// Builds a two-column `(x, y)` frame.
pub(crate) fn points(xy: &[(f64, f64)]) -> Frame {
    Frame::from_columns([
        (XY[0], xy.iter().map(|p| p.0).collect::<Vec<_>>()),
        (XY[1], xy.iter().map(|p| p.1).collect::<Vec<_>>()),
    ])
    .unwrap()
}

/// One cell per row, read from columns 0 and 1.
#[derive(Debug)]
pub(crate) struct TestPoints;

impl TestPoints {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl Glyph for TestPoints {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Point
    }

    fn x_label(&self) -> &str {
        "x"
    }

    fn y_label(&self) -> &str {
        "y"
    }

    fn required_columns(&self) -> &[ColId] {
        &XY
    }

    fn extents(&self, frame: &Frame) -> Result<Extents, RasterError> {
        let xs = frame.column(XY[0]).ok_or(RasterError::MissingColumn(XY[0]))?;
        let ys = frame.column(XY[1]).ok_or(RasterError::MissingColumn(XY[1]))?;
        Ok(Extents::of_columns(xs, ys))
    }

    fn extend(
        &self,
        frame: &Frame,
        viewport: &Viewport,
        _plot_start: bool,
        append: &mut dyn FnMut(usize, usize, usize),
    ) -> Result<(), RasterError> {
        for row in 0..frame.row_count() {
            let x = frame.f64(row, XY[0]).unwrap_or(f64::NAN);
            let y = frame.f64(row, XY[1]).unwrap_or(f64::NAN);
            if let Some((xi, yi)) = viewport.bin(x, y) {
                append(row, xi, yi);
            }
        }
        Ok(())
    }
}

/// Counts appends per cell.
#[derive(Debug)]
pub(crate) struct CountCells;

impl Reduction for CountCells {
    fn create(&self, shape: GridShape, backend: Backend) -> AggregateBuffer {
        AggregateBuffer::zeros(shape, backend)
    }

    fn append(&self, buffer: &mut AggregateBuffer, _row: usize, x: usize, y: usize, _: &Frame) {
        *buffer.cell_mut(0, y, x) += 1.0;
    }

    fn combine(&self, buffers: Vec<AggregateBuffer>) -> AggregateBuffer {
        let mut iter = buffers.into_iter();
        let mut acc = iter.next().unwrap();
        for b in iter {
            acc.zip_with(&b, |_, d, s| *d += s);
        }
        acc
    }

    fn finalize_values(&self, buffer: AggregateBuffer) -> Vec<f64> {
        buffer.into_layers().swap_remove(0)
    }
}
