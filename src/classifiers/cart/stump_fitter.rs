use crate::classifiers::cart::decision_tree::{DecisionTree, DecisionTreeParams, TreeTargets};
use crate::classifiers::cart::tree_structure::TreeStructure;
use crate::core::errors::FitResult;
use ndarray::{ArrayView1, ArrayView2};

/// Fits a shallow regression tree to multi-column targets.
///
/// The additive grower only reads the root's feature/threshold, the
/// per-node impurities and the per-node sample counts from the result.
pub trait StumpFitter {
    fn fit_stump(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        sample_weight: Option<ArrayView1<f64>>,
    ) -> FitResult<TreeStructure>;
}

/// Depth-1 squared-error CART regressor.
pub struct CartStumpFitter {
    params: DecisionTreeParams,
}

impl CartStumpFitter {
    pub fn new() -> Self {
        Self {
            params: DecisionTreeParams::stump(),
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            params: DecisionTreeParams {
                max_depth: Some(max_depth),
                ..DecisionTreeParams::default()
            },
        }
    }
}

impl Default for CartStumpFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl StumpFitter for CartStumpFitter {
    fn fit_stump(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        sample_weight: Option<ArrayView1<f64>>,
    ) -> FitResult<TreeStructure> {
        DecisionTree::new(self.params.clone()).fit(x, TreeTargets::Values(y), sample_weight)
    }
}
