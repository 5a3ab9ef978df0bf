use std::num::NonZeroUsize;

use ndarray::{Array1, Array2, arr1};
use rand::SeedableRng;

use polyak_trainer::{
    BatchRef, EpochRunner, EvalMetrics, InMemoryDataset, ParamTree, PolyakAverage, Result,
    SoftmaxClassifier, StepMetrics, TrainConfig, TrainLoop, TrainStep, polyak_update,
};

fn tree_of(entries: &[(&str, &[f32])]) -> ParamTree {
    let mut tree = ParamTree::new();
    for (name, values) in entries {
        tree.insert_leaf(*name, arr1(values).into_dyn());
    }
    tree
}

/// Two tightly packed clusters around -1 and +1, strictly separable.
fn clusters(samples: usize) -> InMemoryDataset {
    let mut xs = Array2::<f32>::zeros((samples, 2));
    let mut ys = Array1::<u32>::zeros(samples);

    for i in 0..samples {
        let class = (i % 2) as u32;
        let center = if class == 0 { -1.0 } else { 1.0 };
        let offset = ((i * 37 % 100) as f32 / 100.0 - 0.5) * 0.6;

        xs[[i, 0]] = center + offset;
        xs[[i, 1]] = center - offset;
        ys[i] = class;
    }

    InMemoryDataset::new(xs, ys).unwrap()
}

fn run_once(seed: u64) -> polyak_trainer::TrainOutcome<ParamTree> {
    let train_data = clusters(64);
    let holdout = clusters(32);

    let config = TrainConfig {
        epochs: NonZeroUsize::new(10).unwrap(),
        batch_size: NonZeroUsize::new(8).unwrap(),
        decay: 0.9,
        seed: Some(seed),
    };
    config.validate().unwrap();

    let evaluator = SoftmaxClassifier::new(2, 2, 0.5);
    let mut model = evaluator.clone();
    let state = model.init_params();

    let mut train_loop = TrainLoop::new(
        config.epochs,
        EpochRunner::new(config.batch_size, config.rng()),
    );
    train_loop
        .run(
            &mut model,
            &evaluator,
            state,
            config.tracker().unwrap(),
            &train_data,
            &holdout,
        )
        .unwrap()
}

#[test]
fn documented_update_scenario() {
    let averaged = tree_of(&[("w", &[1.0, 2.0])]);
    let live = tree_of(&[("w", &[1.2, 1.8])]);

    let next = polyak_update(&averaged, &live, 0.99).unwrap();
    let values: Vec<f32> = next.leaf("w").unwrap().iter().copied().collect();

    assert!((values[0] - 1.002).abs() < 1e-6);
    assert!((values[1] - 1.998).abs() < 1e-6);
}

#[test]
fn update_is_a_convex_combination() {
    let averaged = tree_of(&[("w", &[1.0, -2.0, 0.0]), ("b", &[5.0])]);
    let live = tree_of(&[("w", &[-1.0, 4.0, 0.0]), ("b", &[2.0])]);

    for decay in [0.1, 0.5, 0.99] {
        let next = polyak_update(&averaged, &live, decay).unwrap();

        for ((path, out), (_, a)) in next.leaves().iter().zip(averaged.leaves()) {
            let l = live.leaf(path.as_str()).unwrap();
            for ((&o, &a), &l) in out.iter().zip(a).zip(l) {
                let lo = a.min(l) - 1e-6;
                let hi = a.max(l) + 1e-6;
                assert!(o >= lo && o <= hi, "leaf {path}: {o} outside [{lo}, {hi}]");
            }
        }
    }
}

#[test]
fn self_update_is_a_fixed_point() {
    let tree = tree_of(&[("w", &[0.5, -3.25, 7.0])]);

    for decay in [0.01, 0.37, 0.99] {
        let next = polyak_update(&tree, &tree, decay).unwrap();
        for ((_, out), (_, original)) in next.leaves().iter().zip(tree.leaves()) {
            for (&o, &v) in out.iter().zip(original) {
                assert!((o - v).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn update_preserves_structure() {
    let mut inner = ParamTree::new();
    inner.insert_leaf("w", arr1(&[1.0f32, 2.0]).into_dyn());
    let mut averaged = ParamTree::new();
    averaged.insert_tree("dense", inner.clone());
    let mut live = ParamTree::new();
    live.insert_tree("dense", inner);

    let next = polyak_update(&averaged, &live, 0.5).unwrap();

    let out: Vec<_> = next.leaves().into_iter().map(|(p, a)| (p, a.shape().to_vec())).collect();
    let expected: Vec<_> = averaged
        .leaves()
        .into_iter()
        .map(|(p, a)| (p, a.shape().to_vec()))
        .collect();
    assert_eq!(out, expected);
}

#[test]
fn mismatched_trees_fail_loudly() {
    let averaged = tree_of(&[("w", &[1.0])]);
    let renamed = tree_of(&[("v", &[1.0])]);
    let reshaped = tree_of(&[("w", &[1.0, 2.0])]);

    assert!(polyak_update(&averaged, &renamed, 0.5).is_err());
    assert!(polyak_update(&averaged, &reshaped, 0.5).is_err());
}

/// Records the first feature of every sample each step sees; the live tree
/// never changes.
struct RecordingStep {
    live: ParamTree,
    seen: Vec<Vec<f32>>,
}

impl TrainStep for RecordingStep {
    type State = ();

    fn step(
        &mut self,
        _state: (),
        batch: BatchRef<'_>,
    ) -> Result<((), ParamTree, StepMetrics)> {
        self.seen.push(batch.xs.column(0).to_vec());
        Ok((
            (),
            self.live.clone(),
            StepMetrics {
                loss: 0.0,
                accuracy: 0.0,
            },
        ))
    }

    fn params(&self, _state: &()) -> ParamTree {
        self.live.clone()
    }
}

#[test]
fn epoch_drops_the_remainder() {
    // Feature value == sample index, so batches reveal which samples ran.
    let xs = Array2::from_shape_fn((10, 1), |(i, _)| i as f32);
    let dataset = InMemoryDataset::new(xs, Array1::zeros(10)).unwrap();

    let mut step = RecordingStep {
        live: tree_of(&[("w", &[0.0])]),
        seen: Vec::new(),
    };
    let mut tracker = PolyakAverage::new(0.9).unwrap();

    let mut runner = EpochRunner::new(
        NonZeroUsize::new(4).unwrap(),
        rand::rngs::StdRng::seed_from_u64(3),
    );
    assert_eq!(runner.batch_size(), 4);

    let (_, metrics) = runner
        .run_epoch(&mut step, (), &mut tracker, &dataset)
        .unwrap();

    assert_eq!(metrics.batches(), 2);
    assert_eq!(step.seen.len(), 2);
    assert!(step.seen.iter().all(|batch| batch.len() == 4));

    let mut indices: Vec<usize> = step
        .seen
        .iter()
        .flatten()
        .map(|&x| x as usize)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), 8, "exactly two samples must be dropped");
    assert!(indices.iter().all(|&idx| idx < 10));
}

#[test]
fn seeded_runs_are_bit_identical() {
    let a = run_once(42);
    let b = run_once(42);

    assert_eq!(a.state, b.state);
    assert_eq!(a.averaged, b.averaged);
    assert_eq!(a.history, b.history);
}

#[test]
fn both_models_learn_the_clusters() {
    let outcome = run_once(7);
    let last = outcome.history.last().unwrap();

    assert_eq!(outcome.history.len(), 10);
    assert_eq!(last.live_eval.accuracy, 1.0);
    assert_eq!(last.polyak_eval.accuracy, 1.0);

    // The averaged tree lags the live one: same structure, different values.
    let live_paths: Vec<_> = outcome.state.leaves().into_iter().map(|(p, _)| p).collect();
    let avg_paths: Vec<_> = outcome.averaged.leaves().into_iter().map(|(p, _)| p).collect();
    assert_eq!(live_paths, avg_paths);
    assert_ne!(outcome.state, outcome.averaged);
}

#[test]
fn averaged_eval_is_well_defined_from_the_first_epoch() {
    let outcome = run_once(1);

    for report in &outcome.history {
        let EvalMetrics { loss, accuracy } = report.polyak_eval;
        assert!(loss.is_finite());
        assert!((0.0..=1.0).contains(&accuracy));
    }
}
