// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster aggregation demos for `vizir_raster`.
//!
//! Aggregates synthetic scatter and trajectory data with both plan strategies and every
//! execution policy, prints ASCII previews and writes PGM images.

mod shade;

use std::time::Instant;

use log::info;
use vizir_raster::{
    Canvas, ColId, ExecutionPolicy, Frame, Glyph, LabeledGrid, PartitionedFrame, Reduction,
};
use vizir_raster_exec::aggregate;
use vizir_raster_glyphs::{Count, LineAxis0, Mean, Point};

const X: ColId = ColId(0);
const Y: ColId = ColId(1);
const V: ColId = ColId(2);

/// Xorshift generator; the demo must be reproducible.
struct Rng(u64);

impl Rng {
    fn uniform(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1_u64 << 53) as f64
    }

    /// Approximately standard normal (Irwin-Hall with 12 terms).
    fn normal(&mut self) -> f64 {
        (0..12).map(|_| self.uniform()).sum::<f64>() - 6.0
    }
}

/// Three gaussian clusters; `v` is the distance to the origin.
fn clusters(n: usize) -> Frame {
    let centers = [(-2.0, -1.0, 0.6), (1.5, 1.0, 0.9), (2.5, -2.0, 0.3)];
    let mut rng = Rng(0x5eed);
    let (mut xs, mut ys, mut vs) = (Vec::new(), Vec::new(), Vec::new());
    for i in 0..n {
        let (cx, cy, s) = centers[i % centers.len()];
        let x = cx + s * rng.normal();
        let y = cy + s * rng.normal();
        xs.push(x);
        ys.push(y);
        vs.push(x.hypot(y));
    }
    Frame::from_columns([(X, xs), (Y, ys), (V, vs)]).expect("equal column lengths")
}

/// An archimedean spiral with a gap every `break_every` rows.
fn spiral(n: usize, break_every: usize) -> Frame {
    let (mut xs, mut ys) = (Vec::with_capacity(n), Vec::with_capacity(n));
    for i in 0..n {
        let t = i as f64 * 0.05;
        if i % break_every == break_every - 1 {
            xs.push(f64::NAN);
            ys.push(f64::NAN);
        } else {
            xs.push(t * t.cos());
            ys.push(t * t.sin());
        }
    }
    Frame::from_columns([(X, xs), (Y, ys)]).expect("equal column lengths")
}

fn run<G: Glyph, R: Reduction>(
    name: &str,
    canvas: Canvas,
    dataset: &PartitionedFrame,
    glyph: &G,
    reduction: &R,
) -> LabeledGrid {
    let policies = [
        ExecutionPolicy::Serial,
        ExecutionPolicy::ThreadPool { num_threads: None },
    ];
    let mut grids = Vec::new();
    for policy in policies {
        let start = Instant::now();
        let grid = aggregate(&canvas.with_policy(policy), dataset, glyph, reduction)
            .unwrap_or_else(|err| panic!("{name}: {err}"));
        info!(
            "{name}: {policy:?} over {} partitions in {:.2?}",
            dataset.partitions().len(),
            start.elapsed()
        );
        grids.push(grid);
    }
    let last = grids.pop().expect("one grid per policy");
    let drift = grids
        .iter()
        .flat_map(|g| g.values().iter().zip(last.values()))
        .filter(|(a, b)| !(a.is_nan() && b.is_nan()))
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    if drift > 1e-9 {
        log::warn!("{name}: execution policies differ by up to {drift:e}");
    }
    last
}

fn show(name: &str, grid: &LabeledGrid) {
    println!("{name} ({} x {}):", grid.shape().width, grid.shape().height);
    print!("{}", shade::ascii(grid));
    let path = format!("vizir_raster_demo_{name}.pgm");
    std::fs::write(&path, shade::pgm(grid)).expect("write pgm");
    println!("wrote {path}");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let points = PartitionedFrame::split_even(&clusters(60_000), 16).expect("split clusters");
    let canvas = Canvas::new(72, 28);
    let glyph = Point::new(X, Y);
    let density = run("density", canvas, &points, &glyph, &Count::rows());
    show("density", &density);

    let distance = run("distance", canvas, &points, &glyph, &Mean::new(V));
    info!(
        "distance: mean over cells {:.3}",
        distance.sum() / distance.values().iter().filter(|v| !v.is_nan()).count() as f64
    );

    let track = PartitionedFrame::split_even(&spiral(4_000, 700), 7).expect("split spiral");
    let canvas = Canvas::new(72, 36)
        .with_x_range((-200.0, 200.0))
        .with_y_range((-200.0, 200.0));
    let lines = run("spiral", canvas, &track, &LineAxis0::new(X, Y), &Count::rows());
    show("spiral", &lines);
}
