use std::num::NonZeroUsize;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{PolyakAverage, Result, TrainErr};

/// Declarative configuration for a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of epochs to run.
    pub epochs: NonZeroUsize,
    /// Samples per training batch; remainder samples are dropped each epoch.
    pub batch_size: NonZeroUsize,
    /// Polyak averaging decay, strictly inside (0, 1).
    pub decay: f32,
    /// Seed for batch shuffling. `None` draws entropy from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: NonZeroUsize::new(20).unwrap(),
            batch_size: NonZeroUsize::new(16).unwrap(),
            decay: 0.99,
            seed: None,
        }
    }
}

impl TrainConfig {
    /// Checks the value-level invariants serde cannot express.
    ///
    /// # Errors
    /// Returns `TrainErr::InvalidDecay` for a decay outside `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(TrainErr::InvalidDecay { got: self.decay });
        }

        Ok(())
    }

    /// Builds the run's rng, seeded when the config asks for determinism.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Builds an unseeded tracker with this config's decay.
    ///
    /// # Errors
    /// Returns `TrainErr::InvalidDecay` for a decay outside `(0, 1)`.
    pub fn tracker(&self) -> Result<PolyakAverage> {
        PolyakAverage::new(self.decay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_json() {
        let config: TrainConfig =
            serde_json::from_str(r#"{ "epochs": 5, "batch_size": 32, "decay": 0.999 }"#).unwrap();

        assert_eq!(config.epochs.get(), 5);
        assert_eq!(config.batch_size.get(), 32);
        assert!(config.seed.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_zero_batch_size_at_parse_time() {
        let parsed = serde_json::from_str::<TrainConfig>(
            r#"{ "epochs": 5, "batch_size": 0, "decay": 0.99 }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_boundary_decay() {
        let config = TrainConfig {
            decay: 1.0,
            ..TrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrainErr::InvalidDecay { got }) if got == 1.0
        ));
    }

    #[test]
    fn seeded_rngs_agree() {
        let config = TrainConfig {
            seed: Some(42),
            ..TrainConfig::default()
        };

        let mut a = config.rng();
        let mut b = config.rng();
        assert_eq!(rand::Rng::random::<u64>(&mut a), rand::Rng::random::<u64>(&mut b));
    }
}
