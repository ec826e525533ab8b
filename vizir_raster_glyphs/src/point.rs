// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

extern crate alloc;

use alloc::string::String;

use vizir_raster::{ColId, Extents, Frame, Glyph, GlyphKind, RasterError, Viewport};

/// Scatter points: each record lands in the cell containing `(x, y)`.
///
/// Records with a non-finite coordinate or outside the bounds are skipped. Points on the far
/// edge of the bounds are counted in the last row/column.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    columns: [ColId; 2],
    x_label: String,
    y_label: String,
}

impl Point {
    /// Reads x from column `x` and y from column `y`; the grid dimensions are labeled `"x"`
    /// and `"y"`.
    pub fn new(x: ColId, y: ColId) -> Self {
        Self {
            columns: [x, y],
            x_label: "x".into(),
            y_label: "y".into(),
        }
    }

    /// Sets the grid dimension labels.
    pub fn with_labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    fn xy<'f>(&self, frame: &'f Frame) -> Result<(&'f [f64], &'f [f64]), RasterError> {
        let [x, y] = self.columns;
        let xs = frame.column(x).ok_or(RasterError::MissingColumn(x))?;
        let ys = frame.column(y).ok_or(RasterError::MissingColumn(y))?;
        Ok((xs, ys))
    }
}

impl Glyph for Point {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Point
    }

    fn x_label(&self) -> &str {
        &self.x_label
    }

    fn y_label(&self) -> &str {
        &self.y_label
    }

    fn required_columns(&self) -> &[ColId] {
        &self.columns
    }

    fn extents(&self, frame: &Frame) -> Result<Extents, RasterError> {
        let (xs, ys) = self.xy(frame)?;
        Ok(Extents::of_columns(xs, ys))
    }

    fn extend(
        &self,
        frame: &Frame,
        viewport: &Viewport,
        _plot_start: bool,
        append: &mut dyn FnMut(usize, usize, usize),
    ) -> Result<(), RasterError> {
        let (xs, ys) = self.xy(frame)?;
        for (row, (&x, &y)) in xs.iter().zip(ys).enumerate() {
            if let Some((xi, yi)) = viewport.bin(x, y) {
                append(row, xi, yi);
            }
        }
        Ok(())
    }
}
