use crate::core::errors::{FitError, FitResult};
use crate::utils::memory::{MemoryMeter, MemorySized};
use ndarray::ArrayView1;
use std::mem::size_of;

pub type NodeId = usize;

/// Threshold stored on leaves, which have no split.
pub const TREE_UNDEFINED: f64 = -2.0;

/// A binary tree as parallel per-node arrays.
///
/// Node `n` is a leaf iff `children_left[n] == children_right[n]` (both `None`).
/// Rows go left when `x[feature[n]] <= threshold[n]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeStructure {
    pub children_left: Vec<Option<NodeId>>,
    pub children_right: Vec<Option<NodeId>>,
    pub feature: Vec<Option<usize>>,
    pub threshold: Vec<f64>,
    pub impurity: Vec<f64>,
    pub n_node_samples: Vec<usize>,
    pub weighted_n_node_samples: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl TreeStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf(
        &mut self,
        impurity: f64,
        n_samples: usize,
        weighted_n_samples: f64,
        value: Vec<f64>,
    ) -> NodeId {
        let id = self.node_count();
        self.children_left.push(None);
        self.children_right.push(None);
        self.feature.push(None);
        self.threshold.push(TREE_UNDEFINED);
        self.impurity.push(impurity);
        self.n_node_samples.push(n_samples);
        self.weighted_n_node_samples.push(weighted_n_samples);
        self.value.push(value);
        id
    }

    /// Turns leaf `node` into a split pointing at existing nodes `left` and `right`.
    pub fn set_split(
        &mut self,
        node: NodeId,
        feature: usize,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    ) {
        self.feature[node] = Some(feature);
        self.threshold[node] = threshold;
        self.children_left[node] = Some(left);
        self.children_right[node] = Some(right);
    }

    pub fn node_count(&self) -> usize {
        self.feature.len()
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.children_left[node] == self.children_right[node]
    }

    pub fn n_leaves(&self) -> usize {
        (0..self.node_count()).filter(|&n| self.is_leaf(n)).count()
    }

    pub fn internal_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_count()).filter(move |&n| !self.is_leaf(n))
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &TreeStructure, node: NodeId) -> usize {
            match (tree.children_left[node], tree.children_right[node]) {
                (Some(l), Some(r)) => 1 + walk(tree, l).max(walk(tree, r)),
                _ => 0,
            }
        }
        if self.node_count() == 0 { 0 } else { walk(self, 0) }
    }

    pub fn goes_left(&self, node: NodeId, row: ArrayView1<f64>) -> bool {
        match self.feature[node] {
            Some(f) => row[f] <= self.threshold[node],
            None => true,
        }
    }

    /// Leaf reached by `row` when descending from `node`.
    pub fn apply_from(&self, node: NodeId, row: ArrayView1<f64>) -> NodeId {
        let mut current = node;
        loop {
            let next = if self.goes_left(current, row) {
                self.children_left[current]
            } else {
                self.children_right[current]
            };
            match next {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    pub fn apply(&self, row: ArrayView1<f64>) -> NodeId {
        self.apply_from(0, row)
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> &[f64] {
        &self.value[self.apply(row)]
    }

    pub fn predict_from(&self, node: NodeId, row: ArrayView1<f64>) -> &[f64] {
        &self.value[self.apply_from(node, row)]
    }

    /// Checks that the arrays describe one binary tree rooted at node 0 in
    /// which every node is reached exactly once.
    pub fn check_topology(&self) -> FitResult<()> {
        let n = self.node_count();
        if n == 0 {
            return Err(FitError::shape("a tree with at least one node", "an empty tree"));
        }
        let lengths = [
            self.children_left.len(),
            self.children_right.len(),
            self.threshold.len(),
            self.impurity.len(),
            self.n_node_samples.len(),
            self.weighted_n_node_samples.len(),
            self.value.len(),
        ];
        if let Some(&len) = lengths.iter().find(|&&len| len != n) {
            return Err(FitError::shape(
                format!("{n} entries in every node array"),
                format!("an array of {len}"),
            ));
        }

        let mut seen = vec![false; n];
        seen[0] = true;
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            let (left, right) = match (self.children_left[node], self.children_right[node]) {
                (None, None) => continue,
                (Some(left), Some(right)) => (left, right),
                _ => {
                    return Err(FitError::shape(
                        "both children or none",
                        format!("a single child on node {node}"),
                    ));
                }
            };
            if self.feature[node].is_none() {
                return Err(FitError::shape(
                    "a split feature on every internal node",
                    format!("none on node {node}"),
                ));
            }
            for child in [left, right] {
                if child >= n {
                    return Err(FitError::shape(
                        format!("child ids below {n}"),
                        format!("child {child} on node {node}"),
                    ));
                }
                if std::mem::replace(&mut seen[child], true) {
                    return Err(FitError::shape(
                        "every node reached once from the root",
                        format!("node {child} reached twice"),
                    ));
                }
                stack.push(child);
            }
        }
        if let Some(orphan) = seen.iter().position(|&s| !s) {
            return Err(FitError::shape(
                "every node reached from the root",
                format!("node {orphan} unreachable"),
            ));
        }
        Ok(())
    }
}

impl MemorySized for TreeStructure {
    fn inline_size(&self) -> usize {
        size_of::<Self>()
    }

    fn extra_heap_size(&self, _meter: &mut MemoryMeter) -> usize {
        let mut total = 0;
        total += self.children_left.capacity() * size_of::<Option<NodeId>>();
        total += self.children_right.capacity() * size_of::<Option<NodeId>>();
        total += self.feature.capacity() * size_of::<Option<usize>>();
        total += self.threshold.capacity() * size_of::<f64>();
        total += self.impurity.capacity() * size_of::<f64>();
        total += self.n_node_samples.capacity() * size_of::<usize>();
        total += self.weighted_n_node_samples.capacity() * size_of::<f64>();
        total += self.value.capacity() * size_of::<Vec<f64>>();
        total += self
            .value
            .iter()
            .map(|v| v.capacity() * size_of::<f64>())
            .sum::<usize>();
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// root: x0 <= 0.5 ; left leaf [1, 0] ; right: x1 <= 2.0 -> [0, 1] / [0.5, 0.5]
    fn two_level_tree() -> TreeStructure {
        let mut tree = TreeStructure::new();
        let root = tree.add_leaf(0.5, 4, 4.0, vec![0.5, 0.5]);
        let left = tree.add_leaf(0.0, 2, 2.0, vec![1.0, 0.0]);
        let right = tree.add_leaf(0.5, 2, 2.0, vec![0.5, 0.5]);
        tree.set_split(root, 0, 0.5, left, right);
        let rl = tree.add_leaf(0.0, 1, 1.0, vec![0.0, 1.0]);
        let rr = tree.add_leaf(0.0, 1, 1.0, vec![0.5, 0.5]);
        tree.set_split(right, 1, 2.0, rl, rr);
        tree
    }

    #[test]
    fn leaf_iff_children_equal() {
        let tree = two_level_tree();
        assert!(!tree.is_leaf(0));
        assert!(tree.is_leaf(1));
        assert!(!tree.is_leaf(2));
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.internal_nodes().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn apply_follows_thresholds_inclusively() {
        let tree = two_level_tree();
        assert_eq!(tree.apply(array![0.5, 9.0].view()), 1);
        assert_eq!(tree.apply(array![0.6, 2.0].view()), 3);
        assert_eq!(tree.apply(array![0.6, 2.1].view()), 4);
    }

    #[test]
    fn predict_from_subtree_ignores_ancestors() {
        let tree = two_level_tree();
        let row = array![0.0, 1.0];
        assert_eq!(tree.predict_row(row.view()), &[1.0, 0.0]);
        assert_eq!(tree.predict_from(2, row.view()), &[0.0, 1.0]);
    }

    #[test]
    fn depth_counts_split_levels() {
        assert_eq!(two_level_tree().depth(), 2);
        let mut stump = TreeStructure::new();
        stump.add_leaf(0.0, 1, 1.0, vec![1.0]);
        assert_eq!(stump.depth(), 0);
    }

    #[test]
    fn well_formed_trees_pass_the_topology_check() {
        two_level_tree().check_topology().unwrap();
        let mut single = TreeStructure::new();
        single.add_leaf(0.0, 1, 1.0, vec![1.0]);
        single.check_topology().unwrap();
    }

    #[test]
    fn broken_topologies_are_rejected() {
        let mut out_of_range = TreeStructure::new();
        let root = out_of_range.add_leaf(0.5, 2, 2.0, vec![0.5, 0.5]);
        let left = out_of_range.add_leaf(0.0, 1, 1.0, vec![1.0, 0.0]);
        out_of_range.set_split(root, 0, 0.5, left, 7);

        let mut shared = TreeStructure::new();
        let root = shared.add_leaf(0.5, 2, 2.0, vec![0.5, 0.5]);
        let leaf = shared.add_leaf(0.0, 1, 1.0, vec![1.0, 0.0]);
        shared.set_split(root, 0, 0.5, leaf, leaf);

        let mut cycle = two_level_tree();
        cycle.children_right[2] = Some(0);

        let mut one_child = two_level_tree();
        one_child.children_right[0] = None;

        let mut orphan = two_level_tree();
        orphan.add_leaf(0.0, 0, 0.0, vec![1.0, 0.0]);

        let mut short = two_level_tree();
        short.impurity.pop();

        for tree in [out_of_range, shared, cycle, one_child, orphan, short, TreeStructure::new()] {
            assert!(matches!(
                tree.check_topology(),
                Err(FitError::InputShape { .. })
            ));
        }
    }

    #[test]
    fn leaves_carry_undefined_threshold() {
        let tree = two_level_tree();
        assert_eq!(tree.threshold[1], TREE_UNDEFINED);
        assert_eq!(tree.feature[1], None);
    }
}
