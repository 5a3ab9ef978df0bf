use std::num::NonZeroUsize;

use log::info;
use rand::Rng;

use crate::{
    EpochMetrics, EpochRunner, EvalMetrics, EvalModel, InMemoryDataset, ParamTree, PolyakAverage,
    Result, TrainStep,
};

/// Everything observed during one epoch: training means plus both held-out
/// evaluations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub train: EpochMetrics,
    pub live_eval: EvalMetrics,
    pub polyak_eval: EvalMetrics,
}

/// Final state of a completed training run.
#[derive(Debug)]
pub struct TrainOutcome<S> {
    /// The optimizer state after the last epoch.
    pub state: S,
    /// The averaged parameter tree after the last epoch.
    pub averaged: ParamTree,
    /// One report per epoch, in order.
    pub history: Vec<EpochReport>,
}

/// Multi-epoch training orchestration with dual evaluation.
///
/// Runs the epoch driver for a fixed number of epochs; after each one the
/// held-out dataset is evaluated twice - once with the live parameters, once
/// with the averaged snapshot substituted into the same model structure -
/// and both results are logged. The averaged evaluation is observational
/// only: it is never fed back into training.
pub struct TrainLoop<R: Rng> {
    epochs: NonZeroUsize,
    runner: EpochRunner<R>,
}

impl<R: Rng> TrainLoop<R> {
    /// Creates a new `TrainLoop`.
    ///
    /// # Arguments
    /// * `epochs` - Number of epochs to run.
    /// * `runner` - The configured epoch driver.
    pub fn new(epochs: NonZeroUsize, runner: EpochRunner<R>) -> Self {
        Self { epochs, runner }
    }

    /// Runs the full training loop.
    ///
    /// An unseeded `tracker` is seeded with an exact copy of the initial
    /// live parameters before the first step, so the averaged tree mirrors
    /// the live tree's structure for the whole run.
    ///
    /// # Arguments
    /// * `step_fn` - The external training computation.
    /// * `eval_fn` - The external evaluation, reused for both parameter sets.
    /// * `state` - The initial optimizer state.
    /// * `tracker` - The averaged-parameter tracker.
    /// * `train_data` - Samples trained on, reshuffled every epoch.
    /// * `holdout` - Samples evaluated after every epoch, never trained on.
    ///
    /// # Errors
    /// Propagates any `TrainErr` from the collaborators or the tracker.
    pub fn run<T, E>(
        &mut self,
        step_fn: &mut T,
        eval_fn: &E,
        mut state: T::State,
        mut tracker: PolyakAverage,
        train_data: &InMemoryDataset,
        holdout: &InMemoryDataset,
    ) -> Result<TrainOutcome<T::State>>
    where
        T: TrainStep,
        E: EvalModel,
    {
        if tracker.is_empty() {
            tracker.push(&step_fn.params(&state))?;
        }

        let mut history = Vec::with_capacity(self.epochs.get());

        for epoch in 0..self.epochs.get() {
            let (next_state, train) =
                self.runner
                    .run_epoch(step_fn, state, &mut tracker, train_data)?;
            state = next_state;

            let live_eval = eval_fn.eval(&step_fn.params(&state), holdout)?;
            info!(
                "eval epoch: {epoch}, loss: {:.4}, accuracy: {:.2}",
                live_eval.loss,
                live_eval.accuracy * 100.0
            );

            let averaged = tracker
                .params()
                .expect("tracker is seeded before the first epoch");
            let polyak_eval = eval_fn.eval(averaged, holdout)?;
            info!(
                "polyak eval epoch: {epoch}, loss: {:.4}, accuracy: {:.2}",
                polyak_eval.loss,
                polyak_eval.accuracy * 100.0
            );

            history.push(EpochReport {
                epoch,
                train,
                live_eval,
                polyak_eval,
            });
        }

        let averaged = tracker
            .into_params()
            .expect("tracker is seeded before the first epoch");

        Ok(TrainOutcome {
            state,
            averaged,
            history,
        })
    }
}
