// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plan-builder selection keyed on glyph kind and backend.

use hashbrown::HashMap;

use crate::buffer::Backend;
use crate::error::RasterError;
use crate::glyph::GlyphKind;

/// Which plan builder a run uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Independent leaves reduced through a merge tree.
    Generic,
    /// Leaves chained by boundary handoffs, combined once at the end.
    SequentialOverlap,
}

/// Closed lookup table from `(GlyphKind, Backend)` to [`Strategy`].
#[derive(Clone, Debug)]
pub struct StrategyTable {
    entries: HashMap<(GlyphKind, Backend), Strategy>,
}

impl StrategyTable {
    /// The built-in table: points use the generic tree, lines the overlap chain, on either
    /// backend. Triangle meshes have no entry.
    pub fn standard() -> Self {
        let mut entries = HashMap::new();
        for backend in [Backend::Cpu, Backend::Accelerator] {
            entries.insert((GlyphKind::Point, backend), Strategy::Generic);
            entries.insert((GlyphKind::LineAxis0, backend), Strategy::SequentialOverlap);
        }
        Self { entries }
    }

    /// Looks up the strategy for a glyph kind on a backend.
    pub fn lookup(&self, kind: GlyphKind, backend: Backend) -> Result<Strategy, RasterError> {
        self.entries
            .get(&(kind, backend))
            .copied()
            .ok_or(RasterError::UnsupportedGlyph(kind))
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::standard()
    }
}
