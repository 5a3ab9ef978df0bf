use crate::{ParamTree, Result, TrainErr};

/// Blends two structurally identical parameter trees.
///
/// Every output leaf is `averaged * decay + live * (1 - decay)`, element-wise.
/// A fresh tree is returned; neither input is mutated, so earlier snapshots
/// stay valid if retained elsewhere. Non-finite inputs propagate exactly as
/// float arithmetic dictates.
///
/// `decay` may take the closed boundaries: `1.0` returns `averaged`
/// unchanged and `0.0` returns `live` unchanged.
///
/// # Arguments
/// * `averaged` - The previous averaged snapshot.
/// * `live` - The freshly updated live tree, mirroring `averaged`'s structure.
/// * `decay` - The blending weight; close to 1 means heavy smoothing.
///
/// # Errors
/// Returns `TrainErr::StructureMismatch` or `TrainErr::LeafShapeMismatch`
/// when the trees diverge - a symptom of mismatched model architectures.
pub fn polyak_update(averaged: &ParamTree, live: &ParamTree, decay: f32) -> Result<ParamTree> {
    averaged.zip_map(live, |a, l| a * decay + l * (1.0 - decay))
}

/// Tracker for a Polyak (exponential moving average) parameter snapshot.
///
/// Keeps a shadow copy of the model parameters that lags the live ones,
/// reducing variance from noisy stochastic updates. The shadow is seeded
/// with the first tree pushed and blended with every tree pushed after it.
#[derive(Debug, Clone)]
pub struct PolyakAverage {
    decay: f32,
    shadow: Option<ParamTree>,
}

impl PolyakAverage {
    /// Creates an empty tracker.
    ///
    /// # Arguments
    /// * `decay` - The blending weight applied on every [`push`](Self::push).
    ///
    /// # Errors
    /// Returns `TrainErr::InvalidDecay` unless `decay` lies strictly inside
    /// `(0, 1)`. Unlike [`polyak_update`], the boundaries are rejected.
    pub fn new(decay: f32) -> Result<Self> {
        if !(decay > 0.0 && decay < 1.0) {
            return Err(TrainErr::InvalidDecay { got: decay });
        }

        Ok(Self {
            decay,
            shadow: None,
        })
    }

    /// Creates a tracker already seeded with a snapshot.
    ///
    /// # Arguments
    /// * `decay` - The blending weight applied on every `push`.
    /// * `params` - The initial averaged snapshot, normally an exact copy of
    ///   the initial live parameters.
    ///
    /// # Errors
    /// Returns `TrainErr::InvalidDecay` for a decay outside `(0, 1)`.
    pub fn from_params(decay: f32, params: ParamTree) -> Result<Self> {
        let mut tracker = Self::new(decay)?;
        tracker.shadow = Some(params);
        Ok(tracker)
    }

    /// Returns the configured decay.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Whether the tracker has been seeded yet.
    pub fn is_empty(&self) -> bool {
        self.shadow.is_none()
    }

    /// Folds a fresh live tree into the shadow snapshot.
    ///
    /// The first push clones `live` as-is; every later push replaces the
    /// shadow with `shadow * decay + live * (1 - decay)`.
    ///
    /// # Errors
    /// Returns a structural error when `live` stops mirroring the shadow.
    /// A failed push leaves the snapshot unchanged, so the drift keeps
    /// failing on every retry instead of re-seeding from the foreign tree.
    pub fn push(&mut self, live: &ParamTree) -> Result<()> {
        let next = match &self.shadow {
            Some(shadow) => polyak_update(shadow, live, self.decay)?,
            None => live.clone(),
        };

        self.shadow = Some(next);
        Ok(())
    }

    /// Borrows the current averaged snapshot, if seeded.
    pub fn params(&self) -> Option<&ParamTree> {
        self.shadow.as_ref()
    }

    /// Consumes the tracker, yielding the averaged snapshot.
    pub fn into_params(self) -> Option<ParamTree> {
        self.shadow
    }
}
