use std::{env, error::Error, fs};

use log::info;
use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Normal;
use rand::{SeedableRng, rngs::StdRng};

use polyak_trainer::{
    EpochRunner, InMemoryDataset, Result as TrainResult, SoftmaxClassifier, TrainConfig, TrainLoop,
};

const NUM_FEATURES: usize = 2;
const NUM_CLASSES: usize = 2;
const LEARNING_RATE: f32 = 0.5;
const TRAIN_SAMPLES: usize = 256;
const HOLDOUT_SAMPLES: usize = 64;
const DATA_SEED: u64 = 1;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => TrainConfig {
            seed: Some(0),
            ..TrainConfig::default()
        },
    };
    config.validate()?;

    let mut data_rng = StdRng::seed_from_u64(DATA_SEED);
    let train_data = synthetic_clusters(TRAIN_SAMPLES, &mut data_rng)?;
    let holdout = synthetic_clusters(HOLDOUT_SAMPLES, &mut data_rng)?;

    info!(
        "training {} samples, holding out {}, decay {}",
        train_data.len(),
        holdout.len(),
        config.decay
    );

    let evaluator = SoftmaxClassifier::new(NUM_FEATURES, NUM_CLASSES, LEARNING_RATE);
    let mut model = evaluator.clone();
    let state = model.init_params();
    let tracker = config.tracker()?;

    let runner = EpochRunner::new(config.batch_size, config.rng());
    let mut train_loop = TrainLoop::new(config.epochs, runner);

    let outcome = train_loop.run(
        &mut model,
        &evaluator,
        state,
        tracker,
        &train_data,
        &holdout,
    )?;

    let last = outcome
        .history
        .last()
        .ok_or("training produced no epochs")?;
    info!(
        "done: live accuracy {:.2}, polyak accuracy {:.2}",
        last.live_eval.accuracy * 100.0,
        last.polyak_eval.accuracy * 100.0
    );

    Ok(())
}

/// Loads a [`TrainConfig`] from a JSON file.
fn load_config(path: &str) -> std::result::Result<TrainConfig, Box<dyn Error>> {
    let content = fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}"))?;
    let config: TrainConfig =
        serde_json::from_str(&content).map_err(|e| format!("invalid config: {e}"))?;
    Ok(config)
}

/// Two gaussian clusters, one per class, centered at -1 and +1.
fn synthetic_clusters(samples: usize, rng: &mut StdRng) -> TrainResult<InMemoryDataset> {
    let per_class = samples / 2;
    let noise = Normal::new(0.0f32, 0.4).expect("finite std dev");

    let mut xs = Array2::<f32>::zeros((per_class * 2, NUM_FEATURES));
    let mut ys = Array1::<u32>::zeros(per_class * 2);

    for class in 0..2u32 {
        let center = if class == 0 { -1.0 } else { 1.0 };
        let offsets = Array2::random_using((per_class, NUM_FEATURES), noise, rng);

        for i in 0..per_class {
            let row = class as usize * per_class + i;
            for j in 0..NUM_FEATURES {
                xs[[row, j]] = center + offsets[[i, j]];
            }
            ys[row] = class;
        }
    }

    InMemoryDataset::new(xs, ys)
}
