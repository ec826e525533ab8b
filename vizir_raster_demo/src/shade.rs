// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text renderings of a finalized grid.

use vizir_raster::LabeledGrid;

const RAMP: &[u8] = b" .:-=+*#%@";

/// Log-scaled intensity in `0..=1`; NaN and non-positive cells are `0`.
fn intensity(value: f64, max: f64) -> f64 {
    if value.is_nan() || max.is_nan() || value <= 0.0 || max <= 0.0 {
        return 0.0;
    }
    (value.ln_1p() / max.ln_1p()).clamp(0.0, 1.0)
}

/// Renders `grid` as ASCII art, top row first.
pub(crate) fn ascii(grid: &LabeledGrid) -> String {
    let shape = grid.shape();
    let max = grid.max().unwrap_or(0.0);
    let mut out = String::with_capacity((shape.width + 1) * shape.height);
    for y in (0..shape.height).rev() {
        for x in 0..shape.width {
            let t = intensity(grid.get(y, x).unwrap_or(f64::NAN), max);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "t is in 0..=1, so the index is within the ramp"
            )]
            let i = (t * (RAMP.len() - 1) as f64).round() as usize;
            out.push(char::from(RAMP[i.min(RAMP.len() - 1)]));
        }
        out.push('\n');
    }
    out
}

/// Encodes `grid` as a plain (P2) PGM image, top row first.
pub(crate) fn pgm(grid: &LabeledGrid) -> String {
    let shape = grid.shape();
    let max = grid.max().unwrap_or(0.0);
    let mut out = format!("P2\n{} {}\n255\n", shape.width, shape.height);
    for y in (0..shape.height).rev() {
        let row: Vec<String> = (0..shape.width)
            .map(|x| {
                let t = intensity(grid.get(y, x).unwrap_or(f64::NAN), max);
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "t is in 0..=1, so the level fits a u8"
                )]
                let level = (t * 255.0).round() as u8;
                level.to_string()
            })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}
