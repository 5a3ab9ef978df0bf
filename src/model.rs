use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Ix1, Ix2};

use crate::{
    BatchRef, EvalMetrics, EvalModel, InMemoryDataset, ParamTree, Result, StepMetrics, TrainErr,
    TrainStep,
};

/// A multinomial logistic ("softmax") classifier with a plain SGD update.
///
/// Reference collaborator for the averaging harness: it implements both
/// [`TrainStep`] and [`EvalModel`] over a two-leaf parameter tree (`w`:
/// features x classes, `b`: classes). Its optimizer state *is* the live
/// parameter tree - plain SGD carries no extra buffers.
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier {
    num_features: usize,
    num_classes: usize,
    learning_rate: f32,
}

impl SoftmaxClassifier {
    /// Creates a new `SoftmaxClassifier`.
    ///
    /// # Arguments
    /// * `num_features` - Feature dimension of every input row.
    /// * `num_classes` - Number of output classes.
    /// * `learning_rate` - Step length of the SGD update.
    pub fn new(num_features: usize, num_classes: usize, learning_rate: f32) -> Self {
        Self {
            num_features,
            num_classes,
            learning_rate,
        }
    }

    /// Initial live parameters: all zeros.
    ///
    /// Zeros give the uniform predictive distribution, so the first loss is
    /// exactly `ln(num_classes)`.
    pub fn init_params(&self) -> ParamTree {
        let mut params = ParamTree::new();
        params.insert_leaf(
            "w",
            Array2::<f32>::zeros((self.num_features, self.num_classes)).into_dyn(),
        );
        params.insert_leaf("b", Array1::<f32>::zeros(self.num_classes).into_dyn());
        params
    }

    fn unpack(&self, params: &ParamTree) -> Result<(Array2<f32>, Array1<f32>)> {
        let w = leaf_with_rank::<Ix2>(params, "w")?;
        let b = leaf_with_rank::<Ix1>(params, "b")?;

        if w.shape() != [self.num_features, self.num_classes] {
            return Err(TrainErr::LeafShapeMismatch {
                path: "w".to_string(),
                got: w.shape().to_vec(),
                expected: vec![self.num_features, self.num_classes],
            });
        }
        if b.len() != self.num_classes {
            return Err(TrainErr::LeafShapeMismatch {
                path: "b".to_string(),
                got: b.shape().to_vec(),
                expected: vec![self.num_classes],
            });
        }

        Ok((w, b))
    }

    fn check_batch(&self, batch: &BatchRef<'_>) -> Result<()> {
        if batch.xs.ncols() != self.num_features {
            return Err(TrainErr::ShapeMismatch {
                what: "features",
                got: batch.xs.ncols(),
                expected: self.num_features,
            });
        }

        if let Some(&bad) = batch.ys.iter().find(|&&y| y as usize >= self.num_classes) {
            return Err(TrainErr::ShapeMismatch {
                what: "label",
                got: bad as usize,
                expected: self.num_classes,
            });
        }

        Ok(())
    }

    fn probabilities(w: &Array2<f32>, b: &Array1<f32>, xs: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut logits = xs.dot(w) + b;

        // Row-wise softmax, shifted by the row max for stability.
        for mut row in logits.outer_iter_mut() {
            let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|p| p / sum);
        }

        logits
    }

    fn batch_metrics(probs: &Array2<f32>, ys: ArrayView1<'_, u32>) -> (f32, f32) {
        let mut loss = 0.0;
        let mut correct = 0usize;

        for (row, &y) in probs.outer_iter().zip(ys) {
            loss -= row[y as usize].max(1e-12).ln();
            if argmax(row) == y as usize {
                correct += 1;
            }
        }

        let n = ys.len() as f32;
        (loss / n, correct as f32 / n)
    }

    fn pack(w: Array2<f32>, b: Array1<f32>) -> ParamTree {
        let mut params = ParamTree::new();
        params.insert_leaf("w", w.into_dyn());
        params.insert_leaf("b", b.into_dyn());
        params
    }
}

impl TrainStep for SoftmaxClassifier {
    type State = ParamTree;

    fn step(
        &mut self,
        state: Self::State,
        batch: BatchRef<'_>,
    ) -> Result<(Self::State, ParamTree, StepMetrics)> {
        self.check_batch(&batch)?;
        let (mut w, mut b) = self.unpack(&state)?;

        let probs = Self::probabilities(&w, &b, batch.xs);
        let (loss, accuracy) = Self::batch_metrics(&probs, batch.ys);

        // dL/dlogits for mean cross-entropy: (softmax - onehot) / n.
        let mut grad_logits = probs;
        for (mut row, &y) in grad_logits.outer_iter_mut().zip(batch.ys) {
            row[y as usize] -= 1.0;
        }
        grad_logits /= batch.len() as f32;

        let grad_w = batch.xs.t().dot(&grad_logits);
        let grad_b = grad_logits.sum_axis(Axis(0));

        w.scaled_add(-self.learning_rate, &grad_w);
        b.scaled_add(-self.learning_rate, &grad_b);

        let live = Self::pack(w, b);
        Ok((live.clone(), live, StepMetrics { loss, accuracy }))
    }

    fn params(&self, state: &Self::State) -> ParamTree {
        state.clone()
    }
}

impl EvalModel for SoftmaxClassifier {
    fn eval(&self, params: &ParamTree, data: &InMemoryDataset) -> Result<EvalMetrics> {
        let batch = data.view();
        self.check_batch(&batch)?;
        let (w, b) = self.unpack(params)?;

        let probs = Self::probabilities(&w, &b, batch.xs);
        let (loss, accuracy) = Self::batch_metrics(&probs, batch.ys);

        Ok(EvalMetrics { loss, accuracy })
    }
}

fn leaf_with_rank<D: ndarray::Dimension>(
    params: &ParamTree,
    name: &str,
) -> Result<ndarray::Array<f32, D>> {
    let values = params.leaf(name).ok_or_else(|| TrainErr::MissingParam {
        path: name.to_string(),
    })?;

    values
        .clone()
        .into_dimensionality::<D>()
        .map_err(|_| TrainErr::RankMismatch {
            path: name.to_string(),
            got: values.ndim(),
            expected: D::NDIM.unwrap_or(0),
        })
}

fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;

    for (idx, &value) in row.iter().enumerate() {
        if value > best_value {
            best = idx;
            best_value = value;
        }
    }

    best
}
