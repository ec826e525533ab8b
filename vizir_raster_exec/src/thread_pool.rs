// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A `rayon`-backed scheduler.

use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use vizir_raster::{
    CombineInput, ExecutionPlan, LeafTask, RasterError, Scheduler, TaskId, TaskKernel, TaskKind,
    take_inputs,
};

/// Output of one task: a partial for a later task, or the run's result.
enum Step<P, O> {
    Partial(P),
    Done(O),
}

/// Pools handed out by [`ThreadPoolScheduler::shared`], keyed by requested thread count.
static SHARED: Mutex<Vec<(Option<usize>, Arc<ThreadPoolScheduler>)>> = Mutex::new(Vec::new());

/// Runs plans on a dedicated `rayon` thread pool.
///
/// Task graphs run wavefront by wavefront: all tasks at the same dependency depth run in
/// parallel, and their partials are moved into the slots read by the next wave.
pub struct ThreadPoolScheduler {
    pool: ThreadPool,
}

impl core::fmt::Debug for ThreadPoolScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadPoolScheduler")
            .field("threads", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl ThreadPoolScheduler {
    /// Builds a pool with `num_threads` workers, or `rayon`'s default when `None`.
    pub fn new(num_threads: Option<usize>) -> Result<Self, RasterError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("vizir-raster-{i}"));
        if let Some(n) = num_threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|err| RasterError::Scheduler(err.to_string()))?;
        log::debug!("thread pool ready: {} workers", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Returns the process-wide pool for `num_threads`, building it on first use.
    ///
    /// Shared pools live until the process exits. This is what [`crate::aggregate`] runs on.
    pub fn shared(num_threads: Option<usize>) -> Result<Arc<Self>, RasterError> {
        let mut pools = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, pool)) = pools.iter().find(|(n, _)| *n == num_threads) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(Self::new(num_threads)?);
        pools.push((num_threads, Arc::clone(&pool)));
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs the leaves of `plan` as a parallel `map` and folds their partials pairwise with
    /// `reduce`, then finalizes the single survivor.
    ///
    /// This skips the plan's merge tasks entirely, so it only agrees with [`Scheduler::run`]
    /// when the finalize merely combines its inputs, as it does for tree reductions.
    pub fn map_reduce<K: TaskKernel>(
        &self,
        plan: &ExecutionPlan,
        kernel: &K,
    ) -> Result<K::Output, RasterError> {
        let leaves: Vec<LeafTask> = plan.leaves().copied().collect();
        log::debug!("map-reduce over {} leaves", leaves.len());
        self.pool.install(|| {
            let merged = leaves
                .par_iter()
                .map(|leaf| kernel.leaf(leaf))
                .try_reduce_with(|a, b| kernel.merge(CombineInput::Batch(vec![a, b])));
            match merged {
                Some(partial) => kernel.finalize(vec![partial?]),
                None => kernel.finalize(Vec::new()),
            }
        })
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn name(&self) -> &'static str {
        "thread-pool"
    }

    fn run<K: TaskKernel>(
        &self,
        plan: &ExecutionPlan,
        kernel: &K,
    ) -> Result<K::Output, RasterError> {
        let mut slots: Vec<Option<K::Partial>> = (0..plan.len()).map(|_| None).collect();
        for (depth, wave) in plan.waves().into_iter().enumerate() {
            log::trace!("thread-pool: wave {depth}, {} tasks", wave.len());
            let jobs = wave
                .into_iter()
                .map(|id| {
                    let task = plan.task(id).ok_or(RasterError::InvalidPlan(id))?;
                    let inputs = take_inputs(&mut slots, task.inputs())?;
                    Ok((id, task, inputs))
                })
                .collect::<Result<Vec<_>, RasterError>>()?;

            let steps = self.pool.install(|| {
                jobs.into_par_iter()
                    .map(|(id, task, inputs)| run_task(kernel, task, inputs).map(|s| (id, s)))
                    .collect::<Result<Vec<_>, RasterError>>()
            })?;

            for (id, step) in steps {
                match step {
                    Step::Partial(partial) => slots[id.0] = Some(partial),
                    Step::Done(output) => return Ok(output),
                }
            }
        }
        Err(RasterError::InvalidPlan(plan.terminal()))
    }
}

fn run_task<K: TaskKernel>(
    kernel: &K,
    task: &TaskKind,
    inputs: Vec<K::Partial>,
) -> Result<Step<K::Partial, K::Output>, RasterError> {
    match task {
        TaskKind::Leaf(leaf) => kernel.leaf(leaf).map(Step::Partial),
        TaskKind::Merge { .. } => kernel
            .merge(CombineInput::from_vec(inputs))
            .map(Step::Partial),
        TaskKind::Finalize { .. } => kernel.finalize(inputs).map(Step::Done),
    }
}
