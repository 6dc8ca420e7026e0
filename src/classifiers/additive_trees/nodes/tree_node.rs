use crate::classifiers::cart::tree_structure::{NodeId, TREE_UNDEFINED};
use crate::utils::memory::{MemoryMeter, MemorySized};
use ndarray::ArrayD;
use std::mem::size_of;

/// Children computed for a split that has not been committed yet.
#[derive(Debug, Clone)]
pub struct CandidateChildren {
    pub left: TreeNode,
    pub right: TreeNode,
}

/// One node of a tree in the additive forest.
///
/// `value` is the class-proportion tensor of the rows in `sample_mask`,
/// computed from the original targets. `impurity_reduction == None` means no
/// viable split was found for this node.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub is_root: bool,
    pub sample_mask: Vec<bool>,
    pub tree_index: usize,
    pub feature: Option<usize>,
    pub threshold: f64,
    pub value: ArrayD<f64>,
    pub impurity_reduction: Option<f64>,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    candidate: Option<Box<CandidateChildren>>,
}

impl TreeNode {
    pub fn leaf(sample_mask: Vec<bool>, tree_index: usize, value: ArrayD<f64>) -> Self {
        Self {
            is_root: false,
            sample_mask,
            tree_index,
            feature: None,
            threshold: TREE_UNDEFINED,
            value,
            impurity_reduction: None,
            parent: None,
            left: None,
            right: None,
            candidate: None,
        }
    }

    pub fn with_split(
        mut self,
        feature: usize,
        threshold: f64,
        impurity_reduction: f64,
        children: CandidateChildren,
    ) -> Self {
        self.refresh_split(
            Some(feature),
            threshold,
            Some(impurity_reduction),
            Some(children),
        );
        self
    }

    /// Replaces the split fields with a re-fitted evaluation, keeping the
    /// node's mask, tree, root flag and value.
    pub fn refresh_split(
        &mut self,
        feature: Option<usize>,
        threshold: f64,
        impurity_reduction: Option<f64>,
        children: Option<CandidateChildren>,
    ) {
        self.feature = feature;
        self.threshold = threshold;
        self.impurity_reduction = impurity_reduction;
        self.candidate = children.map(Box::new);
    }

    pub fn refresh_from(&mut self, refitted: TreeNode) {
        let children = refitted.candidate.map(|c| *c);
        self.refresh_split(
            refitted.feature,
            refitted.threshold,
            refitted.impurity_reduction,
            children,
        );
    }

    pub fn candidate(&self) -> Option<&CandidateChildren> {
        self.candidate.as_deref()
    }

    pub fn take_candidate(&mut self) -> Option<CandidateChildren> {
        self.candidate.take().map(|c| *c)
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_mask.iter().filter(|&&m| m).count()
    }
}

impl MemorySized for TreeNode {
    fn inline_size(&self) -> usize {
        size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        let mut total = self.sample_mask.capacity() * size_of::<bool>();
        total += meter.measure_field(&self.value);
        if let Some(c) = &self.candidate {
            total += size_of::<CandidateChildren>();
            total += meter.measure_field(&c.left);
            total += meter.measure_field(&c.right);
        }
        total
    }
}
