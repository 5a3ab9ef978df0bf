use crate::{
    BatchRef, EvalMetrics, InMemoryDataset, ParamTree, Result, StepMetrics,
};

/// Abstraction over the external training computation.
///
/// Implementations own all model-, loss- and optimizer-specific logic; the
/// epoch driver treats this trait as a black box that maps a batch into new
/// optimizer state plus the live parameters it produced. One call is one
/// optimizer update.
pub trait TrainStep {
    /// Opaque optimizer state (momentum buffers, step count, and so on).
    ///
    /// The driver threads it through by value and never inspects it.
    type State;

    /// Executes one training step.
    ///
    /// # Args
    /// * `state` - The optimizer state entering this step.
    /// * `batch` - The samples to fit against.
    ///
    /// # Returns
    /// The state leaving the step, the freshly updated live parameter tree,
    /// and the step's metrics.
    ///
    /// # Errors
    /// Implementations report invariant violations through `TrainErr` rather
    /// than panicking.
    fn step(
        &mut self,
        state: Self::State,
        batch: BatchRef<'_>,
    ) -> Result<(Self::State, ParamTree, StepMetrics)>;

    /// Extracts the live parameter tree from `state` without stepping.
    ///
    /// Used to seed the averaged snapshot before the first update and to
    /// evaluate the live model at epoch boundaries.
    fn params(&self, state: &Self::State) -> ParamTree;
}

/// Abstraction over held-out evaluation.
///
/// The same implementation is called twice per epoch: once with the live
/// parameter tree and once with the averaged one substituted into the same
/// model structure.
pub trait EvalModel {
    /// Evaluates the model under the given parameters.
    ///
    /// # Args
    /// * `params` - The parameter tree to substitute into the model.
    /// * `data` - The held-out dataset.
    ///
    /// # Errors
    /// Returns `TrainErr` when `params` does not fit the model structure.
    fn eval(&self, params: &ParamTree, data: &InMemoryDataset) -> Result<EvalMetrics>;
}
