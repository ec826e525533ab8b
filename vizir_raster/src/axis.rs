// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis transforms.
//!
//! An axis maps a data range onto `n` pixels with an affine `(scale, translate)` pair applied
//! after the axis mapper (identity for linear axes, `log10` for log axes).

extern crate alloc;

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

use crate::error::RasterError;

/// The kind of a grid axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxisKind {
    /// Linear axis; the mapper is the identity.
    #[default]
    Linear,
    /// Base-10 log axis; the data range must be positive.
    Log,
}

/// Affine parameters mapping mapped data space onto pixel space.
///
/// `pixel = mapper(value) * scale + translate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleTranslate {
    /// Pixels per mapped data unit.
    pub scale: f64,
    /// Pixel offset of mapped zero.
    pub translate: f64,
}

impl ScaleTranslate {
    /// Applies the transform to an already mapped value.
    pub fn apply(&self, mapped: f64) -> f64 {
        mapped * self.scale + self.translate
    }

    /// Inverts [`ScaleTranslate::apply`].
    pub fn invert(&self, pixel: f64) -> f64 {
        (pixel - self.translate) / self.scale
    }

    /// Pixel index of an already mapped value, clamped into `0..n`.
    ///
    /// Returns `None` for non-finite values and for an empty axis.
    pub fn clamped_index(&self, mapped: f64, n: usize) -> Option<usize> {
        let px = self.apply(mapped);
        if n == 0 || !px.is_finite() {
            return None;
        }
        let px = px.floor().max(0.0);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "saturating float to int conversion; clamped below"
        )]
        let px = px as usize;
        Some(px.min(n - 1))
    }
}

impl AxisKind {
    /// Maps a data value into the axis' mapped space.
    pub fn mapper(self, value: f64) -> f64 {
        match self {
            Self::Linear => value,
            Self::Log => value.log10(),
        }
    }

    /// Inverse of [`AxisKind::mapper`].
    pub fn inverse_mapper(self, value: f64) -> f64 {
        match self {
            Self::Linear => value,
            Self::Log => 10.0_f64.powf(value),
        }
    }

    /// Computes the transform sending `range.0` to pixel `0` and `range.1` to pixel `n`.
    ///
    /// A degenerate range (both ends map to the same value) is widened to one mapped unit
    /// centred on that value, so every sample lands in the middle bin.
    pub fn compute_scale_and_translate(
        self,
        range: (f64, f64),
        n: usize,
    ) -> Result<ScaleTranslate, RasterError> {
        let mut start = self.mapper(range.0);
        let mut end = self.mapper(range.1);
        if !start.is_finite() || !end.is_finite() {
            return Err(RasterError::InvalidAxisRange { range });
        }
        if start == end {
            start -= 0.5;
            end += 0.5;
        }
        let scale = n as f64 / (end - start);
        Ok(ScaleTranslate {
            scale,
            translate: -start * scale,
        })
    }

    /// Returns the `n` bin-center coordinates, in data units.
    pub fn compute_index(self, st: ScaleTranslate, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| self.inverse_mapper(st.invert(i as f64 + 0.5)))
            .collect()
    }

    /// Maps a data value to a bin index in `0..n`, clamping values on the far edge into the
    /// last bin.
    ///
    /// Returns `None` for non-finite values and for values outside `0..=n` in pixel space.
    pub fn bin(self, st: ScaleTranslate, value: f64, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        let px = st.apply(self.mapper(value));
        if !px.is_finite() {
            return None;
        }
        if px < 0.0 || px > n as f64 {
            return None;
        }
        let px = px.floor();
        #[allow(
            clippy::cast_possible_truncation,
            reason = "px is in 0..=n, which fits a usize"
        )]
        let px = px as usize;
        Some(px.min(n - 1))
    }
}
