/// Metrics reported by one training step over one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    pub loss: f32,
    pub accuracy: f32,
}

/// Accumulated per-batch metrics for one epoch.
///
/// Means are *unweighted* across batches. Every batch the driver produces is
/// full-size (the remainder is dropped), so this equals the sample-weighted
/// mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochMetrics {
    loss_sum: f32,
    accuracy_sum: f32,
    batches: usize,
}

impl EpochMetrics {
    /// Folds one batch's metrics into the accumulator.
    pub fn record(&mut self, step: StepMetrics) {
        self.loss_sum += step.loss;
        self.accuracy_sum += step.accuracy;
        self.batches += 1;
    }

    /// Number of batches recorded so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Mean per-batch loss. NaN when no batches were recorded.
    pub fn mean_loss(&self) -> f32 {
        self.loss_sum / self.batches as f32
    }

    /// Mean per-batch accuracy. NaN when no batches were recorded.
    pub fn mean_accuracy(&self) -> f32 {
        self.accuracy_sum / self.batches as f32
    }
}

/// Metrics reported by one held-out evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub loss: f32,
    pub accuracy: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn means_are_unweighted_across_batches() {
        let mut epoch = EpochMetrics::default();
        epoch.record(StepMetrics {
            loss: 2.0,
            accuracy: 0.5,
        });
        epoch.record(StepMetrics {
            loss: 1.0,
            accuracy: 1.0,
        });

        assert_eq!(epoch.batches(), 2);
        assert!((epoch.mean_loss() - 1.5).abs() < 1e-6);
        assert!((epoch.mean_accuracy() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn empty_epoch_reports_zero_batches() {
        let epoch = EpochMetrics::default();
        assert_eq!(epoch.batches(), 0);
        assert!(epoch.mean_loss().is_nan());
    }
}
