// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end runs of the aggregation pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};

use vizir_raster::{
    AxisKind, Backend, Canvas, ColId, Dataset, ExecutionPolicy, Extents, Frame, Glyph, GlyphKind,
    LabeledGrid, PartitionedFrame, PlanOptions, RasterError, Row, Viewport,
};
use vizir_raster_exec::{aggregate, aggregate_with};
use vizir_raster_glyphs::{Count, LineAxis0, Max, Mean, Sum};

const X: ColId = ColId(0);
const Y: ColId = ColId(1);
const V: ColId = ColId(2);

/// Deterministic `(x, y, v)` samples in `[0, 100)`.
fn samples(n: usize, seed: u64) -> Frame {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1_u64 << 53) as f64 * 100.0
    };
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    let mut vs = Vec::with_capacity(n);
    for _ in 0..n {
        xs.push(next());
        ys.push(next());
        vs.push(next() - 50.0);
    }
    Frame::from_columns([(X, xs), (Y, ys), (V, vs)]).unwrap()
}

fn xy(points: &[(f64, f64)]) -> Frame {
    Frame::from_columns([
        (X, points.iter().map(|p| p.0).collect::<Vec<_>>()),
        (Y, points.iter().map(|p| p.1).collect::<Vec<_>>()),
    ])
    .unwrap()
}

fn assert_close(a: &LabeledGrid, b: &LabeledGrid) {
    assert_eq!(a.shape(), b.shape());
    assert_eq!(a.coords(), b.coords());
    for (i, (p, q)) in a.values().iter().zip(b.values()).enumerate() {
        let ok = (p.is_nan() && q.is_nan()) || (p - q).abs() <= 1e-9 * p.abs().max(1.0);
        assert!(ok, "cell {i}: {p} != {q}");
    }
}

/// Counts partition reads.
struct Watched {
    inner: PartitionedFrame,
    reads: AtomicUsize,
}

impl Dataset for Watched {
    fn partition_count(&self) -> usize {
        self.inner.partition_count()
    }

    fn partition(&self, index: usize) -> Result<&Frame, RasterError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.partition(index)
    }

    fn boundary_row(&self, index: usize) -> Result<Option<Row>, RasterError> {
        self.inner.boundary_row(index)
    }
}

/// A mesh glyph; it has no partitioned plan.
struct Mesh;

impl Glyph for Mesh {
    fn kind(&self) -> GlyphKind {
        GlyphKind::Triangles
    }

    fn x_label(&self) -> &str {
        "x"
    }

    fn y_label(&self) -> &str {
        "y"
    }

    fn required_columns(&self) -> &[ColId] {
        &[X, Y]
    }

    fn extents(&self, frame: &Frame) -> Result<Extents, RasterError> {
        Ok(Extents::of_columns(
            frame.column(X).unwrap_or_default(),
            frame.column(Y).unwrap_or_default(),
        ))
    }

    fn extend(
        &self,
        _: &Frame,
        _: &Viewport,
        _: bool,
        _: &mut dyn FnMut(usize, usize, usize),
    ) -> Result<(), RasterError> {
        Ok(())
    }
}

#[test_log::test]
fn three_partitions_of_ten_points_count_thirty() {
    let frame = samples(30, 7);
    let dataset = PartitionedFrame::split_even(&frame, 3).unwrap();
    assert!(dataset.partitions().iter().all(|p| p.row_count() == 10));

    let grid = aggregate(
        &Canvas::new(100, 100),
        &dataset,
        &vizir_raster_glyphs::Point::new(X, Y),
        &Count::rows(),
    )
    .unwrap();
    assert_eq!(grid.values().len(), 100 * 100);
    assert_eq!(grid.sum(), 30.0);
    assert_eq!(grid.dims(), ["y", "x"]);
}

#[test_log::test]
fn point_aggregates_do_not_depend_on_partitioning() {
    let frame = samples(400, 42);
    let canvas = Canvas::new(17, 11);
    let glyph = vizir_raster_glyphs::Point::new(X, Y).with_labels("lon", "lat");
    let whole = PartitionedFrame::new(vec![frame.clone()]).unwrap();

    let layouts = [
        PartitionedFrame::split_even(&frame, 3).unwrap(),
        PartitionedFrame::split_even(&frame, 20).unwrap(),
        PartitionedFrame::split_at(&frame, &[0, 0, 1, 200, 200, 399]).unwrap(),
    ];
    for options in [PlanOptions::default(), PlanOptions::default().with_split_every(2)] {
        let count = aggregate_with(&canvas, &whole, &glyph, &Count::rows(), options).unwrap();
        let sum = aggregate_with(&canvas, &whole, &glyph, &Sum::new(V), options).unwrap();
        let mean = aggregate_with(&canvas, &whole, &glyph, &Mean::new(V), options).unwrap();
        assert_eq!(count.sum(), 400.0);
        assert_eq!(count.dims(), ["lat", "lon"]);
        for parts in &layouts {
            let c = aggregate_with(&canvas, parts, &glyph, &Count::rows(), options).unwrap();
            assert_eq!(c, count);
            assert_close(
                &aggregate_with(&canvas, parts, &glyph, &Sum::new(V), options).unwrap(),
                &sum,
            );
            assert_close(
                &aggregate_with(&canvas, parts, &glyph, &Mean::new(V), options).unwrap(),
                &mean,
            );
        }
    }
}

#[test_log::test]
fn line_aggregates_do_not_depend_on_partitioning() {
    let frame = samples(60, 3);
    let canvas = Canvas::new(23, 19);
    let glyph = LineAxis0::new(X, Y);
    let whole = PartitionedFrame::new(vec![frame.clone()]).unwrap();
    let want = aggregate(&canvas, &whole, &glyph, &Count::rows()).unwrap();
    assert!(want.sum() > 60.0, "segments cover more than their vertices");

    for cut in 0..=frame.row_count() {
        let parts = PartitionedFrame::split_at(&frame, &[cut]).unwrap();
        let got = aggregate(&canvas, &parts, &glyph, &Count::rows()).unwrap();
        assert_eq!(got, want, "split at {cut}");
    }
    // Empty and single-row partitions hand the boundary row past themselves.
    for offsets in [
        &[0, 1, 1, 2, 30, 31, 31, 59][..],
        &[1, 2, 3, 4, 5][..],
        &[60, 60][..],
    ] {
        let parts = PartitionedFrame::split_at(&frame, offsets).unwrap();
        let got = aggregate(&canvas, &parts, &glyph, &Count::rows()).unwrap();
        assert_eq!(got, want, "split at {offsets:?}");
    }
}

#[test_log::test]
fn line_breaks_survive_partitioning() {
    let mut points: Vec<(f64, f64)> = (0..12).map(|i| (i as f64, (i % 4) as f64)).collect();
    points[5] = (f64::NAN, f64::NAN);
    let frame = xy(&points);
    let canvas = Canvas::new(12, 4)
        .with_x_range((0.0, 12.0))
        .with_y_range((0.0, 4.0));
    let glyph = LineAxis0::new(X, Y);
    let whole = PartitionedFrame::new(vec![frame.clone()]).unwrap();
    let want = aggregate(&canvas, &whole, &glyph, &Count::rows()).unwrap();

    for offsets in [
        &[3, 9][..],
        &[5][..],
        &[6][..],
        &[7][..],
        &[3, 5, 6, 9][..],
        &[6, 7][..],
        &[6, 6, 7][..],
    ] {
        let parts = PartitionedFrame::split_at(&frame, offsets).unwrap();
        let got = aggregate(&canvas, &parts, &glyph, &Count::rows()).unwrap();
        assert_eq!(got, want, "split at {offsets:?}");
    }
}

#[test_log::test]
fn segment_after_a_break_keeps_its_first_pixel_across_a_cut() {
    let frame = xy(&[(0.5, 0.5), (f64::NAN, f64::NAN), (1.5, 0.5), (3.5, 0.5)]);
    let canvas = Canvas::new(4, 1)
        .with_x_range((0.0, 4.0))
        .with_y_range((0.0, 1.0));
    let glyph = LineAxis0::new(X, Y);
    let whole = PartitionedFrame::new(vec![frame.clone()]).unwrap();
    let want = aggregate(&canvas, &whole, &glyph, &Count::rows()).unwrap();
    assert_eq!(want.values(), &[0.0, 1.0, 1.0, 1.0]);

    for offsets in [&[3][..], &[2, 3][..], &[1, 3, 3][..]] {
        let parts = PartitionedFrame::split_at(&frame, offsets).unwrap();
        let got = aggregate(&canvas, &parts, &glyph, &Count::rows()).unwrap();
        assert_eq!(got, want, "split at {offsets:?}");
    }
}

/// Replaces x (and, for every other break, y) with NaN at `rows`.
fn with_breaks(frame: &Frame, rows: &[usize]) -> Frame {
    let mut xs = frame.column(X).unwrap().to_vec();
    let mut ys = frame.column(Y).unwrap().to_vec();
    for (k, &row) in rows.iter().enumerate() {
        xs[row] = f64::NAN;
        if k % 2 == 0 {
            ys[row] = f64::NAN;
        }
    }
    Frame::from_columns([(X, xs), (Y, ys)]).unwrap()
}

#[test_log::test]
fn scattered_breaks_do_not_depend_on_partitioning() {
    // Single, consecutive, leading and trailing breaks.
    let breaks = [0, 4, 11, 17, 18, 19, 26, 33, 40, 41, 47, 55, 59];
    let frame = with_breaks(&samples(60, 13), &breaks);
    let n = frame.row_count();
    let canvas = Canvas::new(17, 13);
    let glyph = LineAxis0::new(X, Y);
    let whole = PartitionedFrame::new(vec![frame.clone()]).unwrap();
    let want = aggregate(&canvas, &whole, &glyph, &Count::rows()).unwrap();

    for cut in 0..=n {
        let parts = PartitionedFrame::split_at(&frame, &[cut]).unwrap();
        let got = aggregate(&canvas, &parts, &glyph, &Count::rows()).unwrap();
        assert_eq!(got, want, "split at {cut}");
    }

    let mut state = 0x9e37_79b9_7f4a_7c15_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    for round in 0..64 {
        let mut offsets: Vec<usize> = (0..1 + round % 6)
            .map(|_| (next() % (n as u64 + 1)) as usize)
            .collect();
        offsets.sort_unstable();
        let parts = PartitionedFrame::split_at(&frame, &offsets).unwrap();
        let got = aggregate(&canvas, &parts, &glyph, &Count::rows()).unwrap();
        assert_eq!(got, want, "split at {offsets:?}");
    }

    let pooled = canvas.with_policy(ExecutionPolicy::ThreadPool {
        num_threads: Some(3),
    });
    let parts = PartitionedFrame::split_at(&frame, &[5, 12, 18, 19, 19, 20, 41, 42]).unwrap();
    let got = aggregate(&pooled, &parts, &glyph, &Count::rows()).unwrap();
    assert_eq!(got.values(), want.values());
}

#[test_log::test]
fn boundary_segment_is_drawn_once() {
    let left = xy(&[(0.5, 0.5), (1.5, 0.5)]);
    let right = xy(&[(8.5, 0.5), (9.5, 0.5)]);
    let dataset = PartitionedFrame::new(vec![left, right]).unwrap();
    let canvas = Canvas::new(10, 1)
        .with_x_range((0.0, 10.0))
        .with_y_range((0.0, 1.0));
    let grid = aggregate(&canvas, &dataset, &LineAxis0::new(X, Y), &Count::rows()).unwrap();
    assert_eq!(grid.values(), &[1.0; 10]);
}

#[test_log::test]
fn empty_dataset_needs_explicit_bounds() {
    let empty = xy(&[]);
    let dataset = PartitionedFrame::split_even(&empty, 3).unwrap();
    let glyph = vizir_raster_glyphs::Point::new(X, Y);

    let canvas = Canvas::new(4, 3)
        .with_x_range((0.0, 1.0))
        .with_y_range((0.0, 1.0));
    let grid = aggregate(&canvas, &dataset, &glyph, &Count::rows()).unwrap();
    assert_eq!(grid.values(), &[0.0; 12]);
    assert_eq!(grid.coords().x.len(), 4);
    assert_eq!(grid.coords().y.len(), 3);

    let lines = aggregate(&canvas, &dataset, &LineAxis0::new(X, Y), &Count::rows()).unwrap();
    assert_eq!(lines.values(), &[0.0; 12]);

    let err = aggregate(&Canvas::new(4, 3), &dataset, &glyph, &Count::rows()).unwrap_err();
    assert_eq!(err, RasterError::EmptyDataset);

    let none = PartitionedFrame::new(Vec::new()).unwrap();
    let grid = aggregate(&canvas, &none, &glyph, &Count::rows()).unwrap();
    assert_eq!(grid.values(), &[0.0; 12]);
}

#[test_log::test]
fn triangles_fail_before_reading_data() {
    let dataset = Watched {
        inner: PartitionedFrame::split_even(&samples(10, 1), 2).unwrap(),
        reads: AtomicUsize::new(0),
    };
    let err = aggregate(&Canvas::new(4, 4), &dataset, &Mesh, &Count::rows()).unwrap_err();
    assert_eq!(err, RasterError::UnsupportedGlyph(GlyphKind::Triangles));
    assert_eq!(dataset.reads.load(Ordering::Relaxed), 0);
}

#[test_log::test]
fn supplied_bounds_skip_the_extent_scan() {
    let dataset = Watched {
        inner: PartitionedFrame::split_even(&samples(50, 9), 5).unwrap(),
        reads: AtomicUsize::new(0),
    };
    let canvas = Canvas::new(8, 8)
        .with_x_range((0.0, 100.0))
        .with_y_range((0.0, 100.0));
    let grid = aggregate(
        &canvas,
        &dataset,
        &vizir_raster_glyphs::Point::new(X, Y),
        &Count::rows(),
    )
    .unwrap();
    assert_eq!(grid.sum(), 50.0);
    // One read per leaf; none for bounds.
    assert_eq!(dataset.reads.load(Ordering::Relaxed), 5);
}

#[test_log::test]
fn execution_paths_agree() {
    let frame = samples(300, 11);
    let dataset = PartitionedFrame::split_even(&frame, 9).unwrap();
    let points = vizir_raster_glyphs::Point::new(X, Y);
    let line = LineAxis0::new(X, Y);
    let base = Canvas::new(31, 29);

    let policies = [
        ExecutionPolicy::Serial,
        ExecutionPolicy::ThreadPool {
            num_threads: Some(1),
        },
        ExecutionPolicy::ThreadPool {
            num_threads: Some(4),
        },
    ];
    let serial_points = aggregate(&base, &dataset, &points, &Max::new(V)).unwrap();
    let serial_lines = aggregate(&base, &dataset, &line, &Count::rows()).unwrap();
    for policy in policies {
        for backend in [Backend::Cpu, Backend::Accelerator] {
            let canvas = base.with_policy(policy).with_backend(backend);
            let got = aggregate(&canvas, &dataset, &points, &Max::new(V)).unwrap();
            assert_eq!(got.backend(), backend);
            assert_close(&got, &serial_points);
            let got = aggregate(&canvas, &dataset, &line, &Count::rows()).unwrap();
            assert_eq!(got.values(), serial_lines.values(), "{policy:?} {backend:?}");
        }
    }

    let pooled = dataset.with_default_policy(ExecutionPolicy::ThreadPool { num_threads: None });
    let got = aggregate(&base, &pooled, &points, &Max::new(V)).unwrap();
    assert_close(&got, &serial_points);
}

#[test_log::test]
fn log_axes_label_bin_centers_in_data_units() {
    let frame = xy(&[(1.0, 1.0), (10.0, 10.0), (100.0, 100.0)]);
    let dataset = PartitionedFrame::split_even(&frame, 2).unwrap();
    let canvas = Canvas::new(2, 2).with_axes(AxisKind::Log, AxisKind::Linear);
    let grid = aggregate(
        &canvas,
        &dataset,
        &vizir_raster_glyphs::Point::new(X, Y),
        &Count::rows(),
    )
    .unwrap();
    let xs = &grid.coords().x;
    assert!((xs[0] - 10.0_f64.powf(0.5)).abs() < 1e-9, "{xs:?}");
    assert!((xs[1] - 10.0_f64.powf(1.5)).abs() < 1e-9, "{xs:?}");
    assert_eq!(grid.sum(), 3.0);
}

#[test_log::test]
fn errors_abort_the_run() {
    let dataset = PartitionedFrame::split_even(&samples(20, 5), 4).unwrap();
    let glyph = vizir_raster_glyphs::Point::new(X, Y);
    let canvas = Canvas::new(4, 4).with_policy(ExecutionPolicy::ThreadPool {
        num_threads: Some(2),
    });
    let err = aggregate(&canvas, &dataset, &glyph, &Sum::new(ColId(9))).unwrap_err();
    assert_eq!(err, RasterError::MissingColumn(ColId(9)));

    let log = Canvas::new(4, 4)
        .with_axes(AxisKind::Log, AxisKind::Linear)
        .with_x_range((0.0, 1.0))
        .with_y_range((0.0, 1.0));
    let err = aggregate(&log, &dataset, &glyph, &Count::rows()).unwrap_err();
    assert_eq!(err, RasterError::InvalidAxisRange { range: (0.0, 1.0) });
}

#[cfg(feature = "multithreading")]
#[test_log::test]
fn caller_owned_pools_serve_many_runs() {
    use vizir_raster_exec::{ThreadPoolScheduler, aggregate_on};

    let frame = samples(120, 17);
    let dataset = PartitionedFrame::split_even(&frame, 6).unwrap();
    let canvas = Canvas::new(13, 11);
    let points = vizir_raster_glyphs::Point::new(X, Y);
    let line = LineAxis0::new(X, Y);
    let serial_points = aggregate(&canvas, &dataset, &points, &Sum::new(V)).unwrap();
    let serial_lines = aggregate(&canvas, &dataset, &line, &Count::rows()).unwrap();

    let pool = ThreadPoolScheduler::new(Some(2)).unwrap();
    // A serial canvas policy does not pull the run off the supplied pool.
    let serial_canvas = canvas.with_policy(ExecutionPolicy::Serial);
    for _ in 0..4 {
        let got = aggregate_on(
            &pool,
            &serial_canvas,
            &dataset,
            &points,
            &Sum::new(V),
            PlanOptions::default(),
        )
        .unwrap();
        assert_close(&got, &serial_points);
        let got = aggregate_on(
            &pool,
            &canvas,
            &dataset,
            &line,
            &Count::rows(),
            PlanOptions::default(),
        )
        .unwrap();
        assert_eq!(got, serial_lines);
    }

    // Policy-driven runs share one pool per thread count.
    let pooled = canvas.with_policy(ExecutionPolicy::ThreadPool {
        num_threads: Some(3),
    });
    for _ in 0..4 {
        let got = aggregate(&pooled, &dataset, &points, &Sum::new(V)).unwrap();
        assert_close(&got, &serial_points);
    }
    let shared = ThreadPoolScheduler::shared(Some(3)).unwrap();
    assert!(std::sync::Arc::ptr_eq(
        &shared,
        &ThreadPoolScheduler::shared(Some(3)).unwrap()
    ));
}

#[test_log::test]
fn oversized_grids_fail_before_allocating() {
    let dataset = PartitionedFrame::split_even(&samples(10, 2), 2).unwrap();
    let canvas = Canvas::new(usize::MAX, 3)
        .with_x_range((0.0, 100.0))
        .with_y_range((0.0, 100.0));
    let glyph = vizir_raster_glyphs::Point::new(X, Y);
    let err = aggregate(&canvas, &dataset, &glyph, &Count::rows()).unwrap_err();
    assert_eq!(
        err,
        RasterError::GridTooLarge {
            height: 3,
            width: usize::MAX,
        }
    );
}
