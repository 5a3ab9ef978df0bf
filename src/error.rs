use std::{error::Error, fmt};

/// The crate's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Failures produced while tracking averaged parameters or driving epochs.
#[derive(Debug)]
pub enum TrainErr {
    /// The averaged and live trees disagree on their key sets at some level.
    ///
    /// This signals a programmer error (e.g. the model architecture changed
    /// mid-run) and is never tolerated silently.
    StructureMismatch { path: String },

    /// Two leaves share a key but carry arrays of different shapes.
    LeafShapeMismatch {
        path: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },

    /// A leaf with the given path was expected in the tree but is absent.
    MissingParam { path: String },

    /// A leaf exists but its array has the wrong number of dimensions.
    RankMismatch {
        path: String,
        got: usize,
        expected: usize,
    },

    /// The averaging decay is outside the open interval (0, 1).
    InvalidDecay { got: f32 },

    /// A length invariant was violated (e.g. features vs. labels).
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// The dataset contains no samples.
    EmptyDataset,
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::StructureMismatch { path } => {
                write!(f, "parameter tree structure mismatch at '{path}'")
            }
            TrainErr::LeafShapeMismatch {
                path,
                got,
                expected,
            } => write!(
                f,
                "leaf shape mismatch at '{path}': got {got:?}, expected {expected:?}"
            ),
            TrainErr::MissingParam { path } => {
                write!(f, "missing parameter '{path}'")
            }
            TrainErr::RankMismatch {
                path,
                got,
                expected,
            } => write!(
                f,
                "parameter '{path}' has rank {got}, expected rank {expected}"
            ),
            TrainErr::InvalidDecay { got } => {
                write!(f, "decay must lie strictly inside (0, 1), got {got}")
            }
            TrainErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "length mismatch for {what}: got {got}, expected {expected}"),
            TrainErr::EmptyDataset => write!(f, "dataset must contain at least one sample"),
        }
    }
}

impl Error for TrainErr {}
