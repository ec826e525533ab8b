// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

extern crate alloc;

use alloc::string::String;

use kurbo::{Point, Rect};
use vizir_raster::{ColId, Extents, Frame, Glyph, GlyphKind, RasterError, Viewport};

/// A polyline through consecutive rows, in row order.
///
/// Each segment is clipped to the bounds in mapped space and drawn with Bresenham's algorithm.
/// A segment's first pixel is only drawn when the segment starts a line (the first row of the
/// dataset, or the row after a break) or when clipping moved its start; otherwise the previous
/// segment already drew it. The last pixel is always drawn. Rows with a non-finite coordinate
/// break the line.
///
/// Appended cells carry the row index of their segment's first vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct LineAxis0 {
    columns: [ColId; 2],
    x_label: String,
    y_label: String,
}

impl LineAxis0 {
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

impl Glyph for LineAxis0 {
    fn kind(&self) -> GlyphKind {
        GlyphKind::LineAxis0
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
        plot_start: bool,
        append: &mut dyn FnMut(usize, usize, usize),
    ) -> Result<(), RasterError> {
        let (xs, ys) = self.xy(frame)?;
        let shape = viewport.shape;
        if shape.cells() == 0 {
            return Ok(());
        }
        let (x_axis, y_axis) = (viewport.x_axis, viewport.y_axis);
        let b = viewport.bounds.abs();
        let clip = Rect::new(
            x_axis.mapper(b.x0),
            y_axis.mapper(b.y0),
            x_axis.mapper(b.x1),
            y_axis.mapper(b.y1),
        );
        let mapped = |i: usize| Point::new(x_axis.mapper(xs[i]), y_axis.mapper(ys[i]));
        let cell = |p: Point| {
            Some((
                viewport.x_st.clamped_index(p.x, shape.width)?,
                viewport.y_st.clamped_index(p.y, shape.height)?,
            ))
        };

        for i in 1..xs.len().min(ys.len()) {
            let (start, end) = (mapped(i - 1), mapped(i));
            if !start.is_finite() || !end.is_finite() {
                continue;
            }
            let starts_line = if i == 1 {
                plot_start
            } else {
                !mapped(i - 2).is_finite()
            };
            let Some(seg) = clip_segment(clip, start, end) else {
                continue;
            };
            let (Some(from), Some(to)) = (cell(seg.start), cell(seg.end)) else {
                continue;
            };
            let skip_first = !(starts_line || seg.start_clipped);
            bresenham(from, to, skip_first, &mut |x, y| append(i - 1, x, y));
        }
        Ok(())
    }

    fn breaks_line(
        &self,
        frame: &Frame,
        row: usize,
        viewport: &Viewport,
    ) -> Result<bool, RasterError> {
        let (xs, ys) = self.xy(frame)?;
        let (Some(&x), Some(&y)) = (xs.get(row), ys.get(row)) else {
            return Ok(true);
        };
        let p = Point::new(viewport.x_axis.mapper(x), viewport.y_axis.mapper(y));
        Ok(!p.is_finite())
    }
}

/// A segment after clipping.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Clipped {
    start: Point,
    end: Point,
    start_clipped: bool,
}

/// Liang-Barsky clipping of the segment `p0 → p1` against `rect` (edges inclusive).
///
/// Returns `None` when no part of the segment lies inside.
fn clip_segment(rect: Rect, p0: Point, p1: Point) -> Option<Clipped> {
    let d = p1 - p0;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let edges = [
        (-d.x, p0.x - rect.x0),
        (d.x, rect.x1 - p0.x),
        (-d.y, p0.y - rect.y0),
        (d.y, rect.y1 - p0.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            // Parallel to this edge: inside or entirely out.
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    Some(Clipped {
        start: if t0 > 0.0 { p0 + d * t0 } else { p0 },
        end: if t1 < 1.0 { p0 + d * t1 } else { p1 },
        start_clipped: t0 > 0.0,
    })
}

/// Walks the cells of the integer line `from → to`, end cell included.
fn bresenham(
    from: (usize, usize),
    to: (usize, usize),
    skip_first: bool,
    plot: &mut impl FnMut(usize, usize),
) {
    let (mut x, mut y) = from;
    let dx = x.abs_diff(to.0) as i64;
    let dy = -(y.abs_diff(to.1) as i64);
    let mut err = dx + dy;
    let mut skip = skip_first;
    loop {
        if !skip {
            plot(x, y);
        }
        skip = false;
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x = step_toward(x, to.0);
        }
        if e2 <= dx {
            err += dx;
            y = step_toward(y, to.1);
        }
    }
}

fn step_toward(v: usize, target: usize) -> usize {
    match v.cmp(&target) {
        core::cmp::Ordering::Less => v + 1,
        core::cmp::Ordering::Greater => v - 1,
        core::cmp::Ordering::Equal => v,
    }
}
