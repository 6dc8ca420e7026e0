use crate::classifiers::cart::{StumpFitter, TreeStructure};
use crate::core::errors::FitResult;
use ndarray::{ArrayView1, ArrayView2};

/// Always answers with a single-node tree.
#[derive(Default)]
pub struct NoSplitStumpFitter;

impl StumpFitter for NoSplitStumpFitter {
    fn fit_stump(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        _sample_weight: Option<ArrayView1<f64>>,
    ) -> FitResult<TreeStructure> {
        let mut tree = TreeStructure::new();
        tree.add_leaf(0.0, x.nrows(), x.nrows() as f64, vec![0.0; y.ncols()]);
        Ok(tree)
    }
}
