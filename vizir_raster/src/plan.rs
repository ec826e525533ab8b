// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execution plans and the two plan builders.
//!
//! A plan is a DAG stored in topological order: every task lists the tasks whose outputs it
//! consumes, each non-terminal output is consumed exactly once, and the last task is the single
//! [`TaskKind::Finalize`]. Plans carry no data; a [`crate::TaskKernel`] gives the tasks meaning.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::dataset::Dataset;
use crate::error::RasterError;
use crate::strategy::Strategy;

/// Position of a task within its plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

/// A row addressed by partition and position within that partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowRef {
    /// Partition index.
    pub partition: usize,
    /// Row index within the partition.
    pub row: usize,
}

/// Dependency edge carrying the last row of partition `source` into a leaf.
///
/// Only line-like glyphs use it: the segment joining `source`'s last row to the leaf's first
/// row is drawn by the leaf. Whether that segment starts a line depends on the row before the
/// handed-off one, so the edge also locates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundaryHandoff {
    /// Partition whose last row is prepended.
    pub source: usize,
    /// The row preceding the handed-off row in dataset order; `None` when the handed-off row
    /// is the first row of the dataset.
    pub previous: Option<RowRef>,
}

/// Rasterize one partition into a fresh buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LeafTask {
    /// Partition index.
    pub partition: usize,
    /// Boundary row to prepend, if any.
    pub handoff: Option<BoundaryHandoff>,
    /// Whether the first row of the (possibly extended) partition starts a new line
    /// regardless of the data. A leaf whose handoff has a `previous` row still starts a line
    /// when the glyph reports a break at that row.
    pub plot_start: bool,
}

impl LeafTask {
    /// A leaf that only sees its own partition.
    pub fn standalone(partition: usize) -> Self {
        Self {
            partition,
            handoff: None,
            plot_start: true,
        }
    }
}

/// One node of an [`ExecutionPlan`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Partition to partial aggregate.
    Leaf(LeafTask),
    /// Partial aggregates to one partial aggregate.
    Merge {
        /// Producers, in partition order.
        inputs: SmallVec<[TaskId; 8]>,
    },
    /// Partial aggregates to the finalized output. An empty input list yields the identity grid.
    Finalize {
        /// Producers, in partition order.
        inputs: Vec<TaskId>,
    },
}

impl TaskKind {
    /// Tasks whose outputs this task consumes.
    pub fn inputs(&self) -> &[TaskId] {
        match self {
            Self::Leaf(_) => &[],
            Self::Merge { inputs } => inputs,
            Self::Finalize { inputs } => inputs,
        }
    }
}

/// Plan construction options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanOptions {
    /// Maximum fan-in of merge tasks in tree-shaped plans (at least 2).
    pub split_every: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self { split_every: 8 }
    }
}

impl PlanOptions {
    /// Sets the merge fan-in; values below 2 are raised to 2.
    pub fn with_split_every(mut self, split_every: usize) -> Self {
        self.split_every = split_every.max(2);
        self
    }
}

/// A task DAG over the partitions of one dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPlan {
    strategy: Strategy,
    partitions: usize,
    tasks: Vec<TaskKind>,
}

impl ExecutionPlan {
    fn new(strategy: Strategy, partitions: usize) -> Self {
        Self {
            strategy,
            partitions,
            tasks: Vec::new(),
        }
    }

    fn push(&mut self, task: TaskKind) -> TaskId {
        self.tasks.push(task);
        TaskId(self.tasks.len() - 1)
    }

    /// The builder that produced this plan.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of partitions the plan covers.
    pub fn partition_count(&self) -> usize {
        self.partitions
    }

    /// Tasks in topological order.
    pub fn tasks(&self) -> &[TaskKind] {
        &self.tasks
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always `false` for built plans: the finalize task is always present.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns a task by id.
    pub fn task(&self, id: TaskId) -> Option<&TaskKind> {
        self.tasks.get(id.0)
    }

    /// The finalize task.
    pub fn terminal(&self) -> TaskId {
        TaskId(self.tasks.len().saturating_sub(1))
    }

    /// Leaf tasks, in partition order.
    pub fn leaves(&self) -> impl Iterator<Item = &LeafTask> + '_ {
        self.tasks.iter().filter_map(|t| match t {
            TaskKind::Leaf(leaf) => Some(leaf),
            _ => None,
        })
    }

    /// Dependency depth of every task (leaves are 0).
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            depths[i] = task
                .inputs()
                .iter()
                .map(|dep| depths[dep.0] + 1)
                .max()
                .unwrap_or(0);
        }
        depths
    }

    /// Tasks grouped by depth; tasks within one wave are independent of each other.
    pub fn waves(&self) -> Vec<Vec<TaskId>> {
        let depths = self.depths();
        let count = depths.iter().max().map_or(0, |d| d + 1);
        let mut waves = vec![Vec::new(); count];
        for (i, d) in depths.into_iter().enumerate() {
            waves[d].push(TaskId(i));
        }
        waves
    }

    /// Checks the structural invariants: inputs precede their consumer, every non-terminal
    /// output is consumed exactly once, and only the last task is a finalize.
    pub fn is_well_formed(&self) -> bool {
        let Some(TaskKind::Finalize { .. }) = self.tasks.last() else {
            return false;
        };
        let mut consumed = vec![0_usize; self.tasks.len()];
        for (i, task) in self.tasks.iter().enumerate() {
            if i + 1 != self.tasks.len() && matches!(task, TaskKind::Finalize { .. }) {
                return false;
            }
            for dep in task.inputs() {
                if dep.0 >= i {
                    return false;
                }
                consumed[dep.0] += 1;
            }
        }
        let last = self.tasks.len() - 1;
        consumed[..last].iter().all(|&c| c == 1)
    }
}

/// Builds a tree reduction: one leaf per partition, merges of at most `split_every`
/// siblings, and a finalize over the remaining partials.
///
/// With zero partitions the plan is a lone finalize with no inputs.
pub fn build_generic_plan(partition_count: usize, options: PlanOptions) -> ExecutionPlan {
    let fan_in = options.split_every.max(2);
    let mut plan = ExecutionPlan::new(Strategy::Generic, partition_count);
    let mut level: Vec<TaskId> = (0..partition_count)
        .map(|p| plan.push(TaskKind::Leaf(LeafTask::standalone(p))))
        .collect();
    while level.len() > fan_in {
        level = level
            .chunks(fan_in)
            .map(|group| {
                plan.push(TaskKind::Merge {
                    inputs: group.iter().copied().collect(),
                })
            })
            .collect();
    }
    plan.push(TaskKind::Finalize { inputs: level });
    log::debug!(
        "generic plan: {} partitions, {} tasks, fan-in {fan_in}",
        partition_count,
        plan.len()
    );
    debug_assert!(plan.is_well_formed(), "generic plan is malformed");
    plan
}

/// Builds the chain-with-overlap plan used by line glyphs.
///
/// Leaf `i` receives the last row of the nearest non-empty partition before it (normally
/// `i - 1`) through a [`BoundaryHandoff`], together with the location of the row before that
/// one, looking back across empty and single-row partitions. Such a leaf has
/// `plot_start == false` unless the handed-off row is the first row of the whole dataset. All
/// leaves feed one finalize.
pub fn build_overlap_plan(partition_lens: &[usize]) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(Strategy::SequentialOverlap, partition_lens.len());
    let mut rows = 0_usize;
    // Last row seen so far, and the row before it.
    let mut last: Option<RowRef> = None;
    let mut before_last: Option<RowRef> = None;
    let mut leaves = Vec::with_capacity(partition_lens.len());
    for (partition, &len) in partition_lens.iter().enumerate() {
        let leaf = match last {
            None => LeafTask::standalone(partition),
            Some(tail) => LeafTask {
                partition,
                handoff: Some(BoundaryHandoff {
                    source: tail.partition,
                    previous: before_last,
                }),
                plot_start: before_last.is_none(),
            },
        };
        leaves.push(plan.push(TaskKind::Leaf(leaf)));
        match len {
            0 => {}
            1 => before_last = last,
            _ => {
                before_last = Some(RowRef {
                    partition,
                    row: len - 2,
                });
            }
        }
        if len > 0 {
            last = Some(RowRef {
                partition,
                row: len - 1,
            });
        }
        rows += len;
    }
    plan.push(TaskKind::Finalize { inputs: leaves });
    log::debug!(
        "overlap plan: {} partitions, {} rows, {} tasks",
        partition_lens.len(),
        rows,
        plan.len()
    );
    debug_assert!(plan.is_well_formed(), "overlap plan is malformed");
    plan
}

/// Builds the plan for `strategy` over `dataset`.
pub fn build_plan<D: Dataset + ?Sized>(
    strategy: Strategy,
    dataset: &D,
    options: PlanOptions,
) -> Result<ExecutionPlan, RasterError> {
    let n = dataset.partition_count();
    match strategy {
        Strategy::Generic => Ok(build_generic_plan(n, options)),
        Strategy::SequentialOverlap => {
            let lens = (0..n)
                .map(|i| dataset.partition_len(i))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(build_overlap_plan(&lens))
        }
    }
}
