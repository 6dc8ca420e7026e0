use crate::classifiers::additive_trees::multi_output_encoder::MultiOutputEncoder;
use crate::classifiers::additive_trees::nodes::{CandidateChildren, TreeNode};
use crate::classifiers::cart::StumpFitter;
use crate::core::errors::FitResult;
use ndarray::{ArrayView1, ArrayView2, Axis};

/// Evaluates the best single split of one node against a flattened target.
///
/// The views keep their own lifetimes since `ArrayView` is invariant over them.
pub struct StumpBuilder<'a, 'x, 'w> {
    fitter: &'a dyn StumpFitter,
    x: ArrayView2<'x, f64>,
    encoder: &'a MultiOutputEncoder,
    sample_weight: Option<ArrayView1<'w, f64>>,
}

impl<'a, 'x, 'w> StumpBuilder<'a, 'x, 'w> {
    pub fn new(
        fitter: &'a dyn StumpFitter,
        x: ArrayView2<'x, f64>,
        encoder: &'a MultiOutputEncoder,
        sample_weight: Option<ArrayView1<'w, f64>>,
    ) -> Self {
        Self {
            fitter,
            x,
            encoder,
            sample_weight,
        }
    }

    /// Fits a stump to `y_target` on the rows of `mask`.
    ///
    /// The returned node carries the class proportions of `mask` and, when a
    /// split exists, its impurity reduction and candidate children. Without a
    /// split the reduction is `None`.
    pub fn construct(
        &self,
        y_target: ArrayView2<f64>,
        mask: &[bool],
        tree_index: usize,
    ) -> FitResult<TreeNode> {
        let value = self.encoder.class_proportions(mask);
        let node = TreeNode::leaf(mask.to_vec(), tree_index, value);

        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
            .collect();
        if rows.is_empty() {
            return Ok(node);
        }

        let x_sub = self.x.select(Axis(0), &rows);
        let y_sub = y_target.select(Axis(0), &rows);
        let w_sub = self.sample_weight.map(|w| w.select(Axis(0), &rows));
        let stump =
            self.fitter
                .fit_stump(x_sub.view(), y_sub.view(), w_sub.as_ref().map(|w| w.view()))?;

        let (Some(feature), Some(left), Some(right)) = (
            stump.feature.first().copied().flatten(),
            stump.children_left.first().copied().flatten(),
            stump.children_right.first().copied().flatten(),
        ) else {
            return Ok(node);
        };

        let threshold = stump.threshold[0];
        let n0 = stump.n_node_samples[0] as f64;
        let impurity_reduction = (stump.impurity[0]
            - stump.impurity[left] * stump.n_node_samples[left] as f64 / n0
            - stump.impurity[right] * stump.n_node_samples[right] as f64 / n0)
            * rows.len() as f64;

        let goes_left: Vec<bool> = self
            .x
            .column(feature)
            .iter()
            .map(|&v| v <= threshold)
            .collect();
        let left_mask: Vec<bool> = mask.iter().zip(&goes_left).map(|(&m, &l)| m && l).collect();
        let right_mask: Vec<bool> = mask
            .iter()
            .zip(&goes_left)
            .map(|(&m, &l)| m && !l)
            .collect();

        let children = CandidateChildren {
            left: TreeNode::leaf(
                left_mask.clone(),
                tree_index,
                self.encoder.class_proportions(&left_mask),
            ),
            right: TreeNode::leaf(
                right_mask.clone(),
                tree_index,
                self.encoder.class_proportions(&right_mask),
            ),
        };
        Ok(node.with_split(feature, threshold, impurity_reduction, children))
    }
}
