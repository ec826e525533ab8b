// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execution-policy resolution.

use vizir_raster::{Canvas, Dataset, ExecutionPolicy};

/// Resolves the policy of one run: the canvas override if present, else the dataset default.
pub fn resolve_policy<D: Dataset + ?Sized>(canvas: &Canvas, dataset: &D) -> ExecutionPolicy {
    let (policy, source) = match canvas.policy {
        Some(policy) => (policy, "canvas"),
        None => (dataset.default_policy(), "dataset default"),
    };
    log::debug!("execution policy {policy:?} ({source})");
    policy
}
