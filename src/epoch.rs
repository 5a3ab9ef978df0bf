use std::num::NonZeroUsize;

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::{EpochMetrics, InMemoryDataset, PolyakAverage, Result, TrainStep};

/// Drives one pass over shuffled training data.
///
/// Owns the batch size and the rng so that repeated runs with the same seed
/// are bit-identical.
pub struct EpochRunner<R: Rng> {
    batch_size: NonZeroUsize,
    rng: R,
}

impl<R: Rng> EpochRunner<R> {
    /// Creates a new `EpochRunner`.
    ///
    /// # Arguments
    /// * `batch_size` - Samples per batch; every produced batch is full-size.
    /// * `rng` - The generator used to permute sample indices each epoch.
    pub fn new(batch_size: NonZeroUsize, rng: R) -> Self {
        Self { batch_size, rng }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Runs one epoch: shuffle, step, track, accumulate.
    ///
    /// Partitions the dataset into `floor(N / batch_size)` batches drawn from
    /// a fresh random permutation; remainder samples are dropped for this
    /// epoch (truncation policy, not a bug - they rejoin the pool next
    /// epoch). For every batch the step function runs first and the tracker
    /// folds in the live parameters it produced.
    ///
    /// # Arguments
    /// * `step_fn` - The external training computation.
    /// * `state` - The optimizer state entering the epoch.
    /// * `tracker` - The averaged-parameter tracker updated once per step.
    /// * `dataset` - The training samples.
    ///
    /// # Returns
    /// The state leaving the epoch and the unweighted mean of per-batch
    /// metrics. A dataset smaller than one batch yields zero batches and the
    /// state passes through untouched.
    pub fn run_epoch<T: TrainStep>(
        &mut self,
        step_fn: &mut T,
        mut state: T::State,
        tracker: &mut PolyakAverage,
        dataset: &InMemoryDataset,
    ) -> Result<(T::State, EpochMetrics)> {
        let plan = plan_batches(dataset.len(), self.batch_size.get(), &mut self.rng);
        let mut epoch = EpochMetrics::default();

        for indices in &plan {
            let batch = dataset.gather(indices);
            let (next_state, live, step_metrics) = step_fn.step(state, batch.as_ref())?;

            tracker.push(&live)?;
            epoch.record(step_metrics);
            state = next_state;

            debug!(batch = epoch.batches(), loss = step_metrics.loss as f64;
                "trained batch");
        }

        Ok((state, epoch))
    }
}

/// Splits a random permutation of `0..n` into full-size index batches.
fn plan_batches<R: Rng>(n: usize, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    order.truncate((n / batch_size) * batch_size);
    order
        .chunks_exact(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}
