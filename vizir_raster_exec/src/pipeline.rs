// Copyright 2025 the VizIR Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The end-to-end aggregation pipeline.
//!
//! Strategy lookup and policy resolution happen before any data is read, so an unsupported
//! glyph fails without touching a partition. Bounds are then resolved to completion, and only
//! afterwards is the main plan built and executed.

use vizir_raster::{
    AggregationKernel, Backend, Canvas, Dataset, ExecutionPlan, ExecutionPolicy, Glyph,
    LabeledGrid, PlanOptions, RasterError, Reduction, Scheduler, SerialScheduler, Strategy,
    StrategyTable, build_plan, resolve_bounds,
};

use crate::policy::resolve_policy;

/// How a plan is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lowering {
    /// Task by task, honoring the plan's dependency edges.
    TaskGraph,
    /// As a parallel `map` over leaves followed by a pairwise `reduce`.
    ArrayNative,
}

/// Picks the lowering of a run.
///
/// Tree reductions on the CPU backend under a thread-pool policy use the array-native path;
/// everything else runs the task graph. Both produce the same grid.
pub fn select_lowering(strategy: Strategy, backend: Backend, policy: ExecutionPolicy) -> Lowering {
    match (strategy, backend, policy) {
        (Strategy::Generic, Backend::Cpu, ExecutionPolicy::ThreadPool { .. }) => {
            Lowering::ArrayNative
        }
        _ => Lowering::TaskGraph,
    }
}

/// Aggregates `dataset` onto `canvas` with default [`PlanOptions`].
///
/// Returns one grid of `canvas.plot_height × canvas.plot_width` cells with dimensions
/// `[y_label, x_label]`, or the first error raised by any step. No partial grid is returned.
pub fn aggregate<D, G, R>(
    canvas: &Canvas,
    dataset: &D,
    glyph: &G,
    reduction: &R,
) -> Result<LabeledGrid, RasterError>
where
    D: Dataset + ?Sized,
    G: Glyph + ?Sized,
    R: Reduction + ?Sized,
{
    aggregate_with(canvas, dataset, glyph, reduction, PlanOptions::default())
}

/// Like [`aggregate`], with explicit plan options.
///
/// A thread-pool policy runs on [`ThreadPoolScheduler::shared`], so repeated calls with the
/// same thread count reuse one pool.
///
/// [`ThreadPoolScheduler::shared`]: crate::ThreadPoolScheduler::shared
pub fn aggregate_with<D, G, R>(
    canvas: &Canvas,
    dataset: &D,
    glyph: &G,
    reduction: &R,
    options: PlanOptions,
) -> Result<LabeledGrid, RasterError>
where
    D: Dataset + ?Sized,
    G: Glyph + ?Sized,
    R: Reduction + ?Sized,
{
    let policy = resolve_policy(canvas, dataset);
    let (run, lowering) = Run::start(canvas, dataset, glyph, reduction, options, policy)?;
    match policy {
        ExecutionPolicy::Serial => run.on_graph(&SerialScheduler),
        ExecutionPolicy::ThreadPool { num_threads } => run.on_shared_pool(num_threads, lowering),
    }
}

/// Like [`aggregate_with`], but always runs on `pool`, whatever policy the canvas or the
/// dataset asks for.
#[cfg(feature = "multithreading")]
pub fn aggregate_on<D, G, R>(
    pool: &crate::ThreadPoolScheduler,
    canvas: &Canvas,
    dataset: &D,
    glyph: &G,
    reduction: &R,
    options: PlanOptions,
) -> Result<LabeledGrid, RasterError>
where
    D: Dataset + ?Sized,
    G: Glyph + ?Sized,
    R: Reduction + ?Sized,
{
    let policy = ExecutionPolicy::ThreadPool {
        num_threads: Some(pool.threads()),
    };
    let (run, lowering) = Run::start(canvas, dataset, glyph, reduction, options, policy)?;
    run.on_pool(pool, lowering)
}

/// The inputs of one pipeline run.
struct Run<'a, D: ?Sized, G: ?Sized, R: ?Sized> {
    canvas: &'a Canvas,
    dataset: &'a D,
    glyph: &'a G,
    reduction: &'a R,
    strategy: Strategy,
    options: PlanOptions,
}

impl<'a, D, G, R> Run<'a, D, G, R>
where
    D: Dataset + ?Sized,
    G: Glyph + ?Sized,
    R: Reduction + ?Sized,
{
    /// Looks up the strategy and lowering; reads no data.
    fn start(
        canvas: &'a Canvas,
        dataset: &'a D,
        glyph: &'a G,
        reduction: &'a R,
        options: PlanOptions,
        policy: ExecutionPolicy,
    ) -> Result<(Self, Lowering), RasterError> {
        let strategy = StrategyTable::standard().lookup(glyph.kind(), canvas.backend)?;
        let lowering = select_lowering(strategy, canvas.backend, policy);
        log::debug!(
            "aggregate: {:?} glyph on {:?}, {} partitions, {strategy:?}, {policy:?}, {lowering:?}",
            glyph.kind(),
            canvas.backend,
            dataset.partition_count()
        );
        let run = Self {
            canvas,
            dataset,
            glyph,
            reduction,
            strategy,
            options,
        };
        Ok((run, lowering))
    }

    /// Resolves bounds through `scheduler`, then builds the kernel and the main plan.
    fn prepare<S: Scheduler + ?Sized>(
        &self,
        scheduler: &S,
    ) -> Result<(AggregationKernel<'a, G, R, D>, ExecutionPlan), RasterError> {
        let bounds = resolve_bounds(self.canvas, self.glyph, self.dataset, scheduler)?;
        let kernel =
            AggregationKernel::new(self.canvas, bounds, self.glyph, self.reduction, self.dataset)?;
        let plan = build_plan(self.strategy, self.dataset, self.options)?;
        log::debug!(
            "plan ready: {} tasks over {} partitions, bounds {bounds:?}, grid {:?}",
            plan.len(),
            plan.partition_count(),
            kernel.viewport().shape
        );
        Ok((kernel, plan))
    }

    fn on_graph<S: Scheduler>(&self, scheduler: &S) -> Result<LabeledGrid, RasterError> {
        let (kernel, plan) = self.prepare(scheduler)?;
        scheduler.run(&plan, &kernel)
    }

    #[cfg(feature = "multithreading")]
    fn on_pool(
        &self,
        pool: &crate::ThreadPoolScheduler,
        lowering: Lowering,
    ) -> Result<LabeledGrid, RasterError> {
        match lowering {
            Lowering::TaskGraph => self.on_graph(pool),
            Lowering::ArrayNative => {
                let (kernel, plan) = self.prepare(pool)?;
                pool.map_reduce(&plan, &kernel)
            }
        }
    }

    #[cfg(feature = "multithreading")]
    fn on_shared_pool(
        &self,
        num_threads: Option<usize>,
        lowering: Lowering,
    ) -> Result<LabeledGrid, RasterError> {
        let pool = crate::ThreadPoolScheduler::shared(num_threads)?;
        self.on_pool(&pool, lowering)
    }

    #[cfg(not(feature = "multithreading"))]
    fn on_shared_pool(
        &self,
        _num_threads: Option<usize>,
        _lowering: Lowering,
    ) -> Result<LabeledGrid, RasterError> {
        Err(RasterError::Scheduler(
            "thread-pool policy requires the `multithreading` feature".into(),
        ))
    }
}
