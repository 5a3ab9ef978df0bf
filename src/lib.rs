pub mod average;
pub mod config;
pub mod dataset;
pub mod epoch;
pub mod error;
pub mod loop_;
pub mod metrics;
pub mod model;
pub mod params;
pub mod train;

pub use average::{PolyakAverage, polyak_update};
pub use config::TrainConfig;
pub use dataset::{Batch, BatchRef, InMemoryDataset};
pub use epoch::EpochRunner;
pub use error::{Result, TrainErr};
pub use loop_::{EpochReport, TrainLoop, TrainOutcome};
pub use metrics::{EpochMetrics, EvalMetrics, StepMetrics};
pub use model::SoftmaxClassifier;
pub use params::{ParamNode, ParamTree};
pub use train::{EvalModel, TrainStep};
