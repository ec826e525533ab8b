// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partitioned datasets.

extern crate alloc;

use alloc::vec::Vec;

use crate::error::RasterError;
use crate::frame::{Frame, Row};

/// How a plan should be executed.
///
/// A caller-level override on [`crate::Canvas`] wins; otherwise the dataset's
/// [`Dataset::default_policy`] is used. The policy is resolved once per run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionPolicy {
    /// Run every task on the calling thread, in plan order.
    #[default]
    Serial,
    /// Run independent tasks on a worker pool.
    ThreadPool {
        /// Worker count; `None` lets the pool pick (usually one per core).
        num_threads: Option<usize>,
    },
}

/// An ordered collection of partitions.
///
/// Partitions are immutable for the duration of a run and addressed by their position.
pub trait Dataset: Sync {
    /// Number of partitions.
    fn partition_count(&self) -> usize;

    /// Borrows partition `index`.
    fn partition(&self, index: usize) -> Result<&Frame, RasterError>;

    /// Number of rows in partition `index`.
    fn partition_len(&self, index: usize) -> Result<usize, RasterError> {
        Ok(self.partition(index)?.row_count())
    }

    /// The last row of partition `index`, used for the boundary handoff of line glyphs.
    fn boundary_row(&self, index: usize) -> Result<Option<Row>, RasterError> {
        Ok(self.partition(index)?.last_row())
    }

    /// The execution policy to use when the caller does not override it.
    fn default_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy::Serial
    }
}

/// An in-memory dataset made of [`Frame`]s sharing one column set.
#[derive(Debug, Clone)]
pub struct PartitionedFrame {
    partitions: Vec<Frame>,
    policy: ExecutionPolicy,
}

impl PartitionedFrame {
    /// Creates a dataset from partitions in order.
    ///
    /// All partitions must carry the same columns in the same order.
    pub fn new(partitions: Vec<Frame>) -> Result<Self, RasterError> {
        if let Some(first) = partitions.first()
            && partitions.iter().any(|p| p.columns() != first.columns())
        {
            return Err(RasterError::InvalidFrame);
        }
        Ok(Self {
            partitions,
            policy: ExecutionPolicy::Serial,
        })
    }

    /// Splits `frame` before each of the given row offsets.
    ///
    /// Offsets must be non-decreasing and at most `frame.row_count()`; repeated offsets produce
    /// empty partitions.
    pub fn split_at(frame: &Frame, offsets: &[usize]) -> Result<Self, RasterError> {
        let n = frame.row_count();
        let mut start = 0;
        let mut partitions = Vec::with_capacity(offsets.len() + 1);
        for &end in offsets {
            if end < start || end > n {
                return Err(RasterError::InvalidFrame);
            }
            partitions.push(frame.slice(start, end));
            start = end;
        }
        partitions.push(frame.slice(start, n));
        Self::new(partitions)
    }

    /// Splits `frame` into `count` partitions of near-equal size.
    pub fn split_even(frame: &Frame, count: usize) -> Result<Self, RasterError> {
        if count == 0 {
            return Self::new(Vec::new());
        }
        let n = frame.row_count();
        let offsets: Vec<usize> = (1..count).map(|i| i * n / count).collect();
        Self::split_at(frame, &offsets)
    }

    /// Sets the policy reported by [`Dataset::default_policy`].
    pub fn with_default_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the partitions.
    pub fn partitions(&self) -> &[Frame] {
        &self.partitions
    }

    /// Total number of rows across all partitions.
    pub fn row_count(&self) -> usize {
        self.partitions.iter().map(Frame::row_count).sum()
    }
}

impl Dataset for PartitionedFrame {
    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn partition(&self, index: usize) -> Result<&Frame, RasterError> {
        self.partitions
            .get(index)
            .ok_or(RasterError::MissingPartition(index))
    }

    fn default_policy(&self) -> ExecutionPolicy {
        self.policy
    }
}
