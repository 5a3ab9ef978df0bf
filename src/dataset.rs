use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{Result, TrainErr};

/// An in-memory supervised classification dataset.
///
/// Rows of `xs` are feature vectors; `ys` holds one class label per row.
/// The dataset is immutable once built - epoch shuffling happens over
/// indices, never by rearranging the stored samples.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    xs: Array2<f32>,
    ys: Array1<u32>,
}

impl InMemoryDataset {
    /// Creates a dataset from owned feature rows and labels.
    ///
    /// # Errors
    /// Returns `TrainErr::ShapeMismatch` when `xs` and `ys` disagree on the
    /// sample count and `TrainErr::EmptyDataset` when there are no samples.
    pub fn new(xs: Array2<f32>, ys: Array1<u32>) -> Result<Self> {
        if xs.nrows() != ys.len() {
            return Err(TrainErr::ShapeMismatch {
                what: "labels",
                got: ys.len(),
                expected: xs.nrows(),
            });
        }
        if xs.nrows() == 0 {
            return Err(TrainErr::EmptyDataset);
        }

        Ok(Self { xs, ys })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.xs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.nrows() == 0
    }

    /// Number of features per sample.
    pub fn num_features(&self) -> usize {
        self.xs.ncols()
    }

    /// Gathers the rows at `indices` into an owned batch.
    ///
    /// Indices need not be contiguous; panics if any is out of bounds.
    pub fn gather(&self, indices: &[usize]) -> Batch {
        Batch {
            xs: self.xs.select(Axis(0), indices),
            ys: self.ys.select(Axis(0), indices),
        }
    }

    /// Borrows the whole dataset as one batch (zero-copy).
    pub fn view(&self) -> BatchRef<'_> {
        BatchRef {
            xs: self.xs.view(),
            ys: self.ys.view(),
        }
    }
}

/// An owned batch of training data.
#[derive(Debug, Clone)]
pub struct Batch {
    pub xs: Array2<f32>,
    pub ys: Array1<u32>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.nrows() == 0
    }

    /// Borrows the batch contents.
    #[inline]
    pub fn as_ref(&self) -> BatchRef<'_> {
        BatchRef {
            xs: self.xs.view(),
            ys: self.ys.view(),
        }
    }
}

/// Borrowed batch view (zero-copy).
#[derive(Debug, Clone, Copy)]
pub struct BatchRef<'a> {
    pub xs: ArrayView2<'a, f32>,
    pub ys: ArrayView1<'a, u32>,
}

impl BatchRef<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.nrows() == 0
    }
}
