use crate::classifiers::additive_trees::nodes::tree_node::TreeNode;
use crate::classifiers::cart::tree_structure::NodeId;
use crate::utils::memory::{MemoryMeter, MemorySized};
use ndarray::{ArrayD, ArrayView1};
use std::mem::size_of;

/// Flat storage for every node of the forest; nodes refer to each other by id.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<TreeNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: TreeNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Moves the candidate children of `id` into the arena as its real children.
    ///
    /// Returns the new child ids, or `None` when the node had no candidate.
    pub fn promote_candidate_children(&mut self, id: NodeId) -> Option<(NodeId, NodeId)> {
        let children = self.nodes[id].take_candidate()?;
        let mut left = children.left;
        let mut right = children.right;
        left.parent = Some(id);
        right.parent = Some(id);
        let left_id = self.push(left);
        let right_id = self.push(right);

        let node = &mut self.nodes[id];
        node.left = Some(left_id);
        node.right = Some(right_id);
        Some((left_id, right_id))
    }

    /// Value tensor of the node reached from `root` by `row`.
    pub fn predict_row(&self, root: NodeId, row: ArrayView1<f64>) -> &ArrayD<f64> {
        let mut current = root;
        loop {
            let node = &self.nodes[current];
            let Some(feature) = node.feature else {
                return &node.value;
            };
            let next = if row[feature] <= node.threshold {
                node.left
            } else {
                node.right
            };
            match next {
                Some(child) => current = child,
                None => return &node.value,
            }
        }
    }

    /// Ids of the committed tree below `root`, pre-order with depths.
    pub fn walk(&self, root: NodeId) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut stack = vec![(root, 0)];
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            let node = &self.nodes[id];
            if let Some(r) = node.right {
                stack.push((r, depth + 1));
            }
            if let Some(l) = node.left {
                stack.push((l, depth + 1));
            }
        }
        out
    }
}

impl MemorySized for NodeArena {
    fn inline_size(&self) -> usize {
        size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        meter.measure_field(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::additive_trees::nodes::tree_node::CandidateChildren;
    use ndarray::{IxDyn, array};

    fn value(v: f64) -> ArrayD<f64> {
        ArrayD::from_elem(IxDyn(&[1]), v)
    }

    fn split_root() -> (NodeArena, NodeId) {
        let mut arena = NodeArena::new();
        let root = TreeNode::leaf(vec![true; 4], 0, value(0.5)).with_split(
            0,
            1.5,
            1.0,
            CandidateChildren {
                left: TreeNode::leaf(vec![true, true, false, false], 0, value(0.0)),
                right: TreeNode::leaf(vec![false, false, true, true], 0, value(1.0)),
            },
        );
        let id = arena.push(root);
        (arena, id)
    }

    #[test]
    fn promotion_links_children_and_parent() {
        let (mut arena, root) = split_root();
        let (l, r) = arena.promote_candidate_children(root).unwrap();
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.get(root).left, Some(l));
        assert_eq!(arena.get(root).right, Some(r));
        assert_eq!(arena.get(l).parent, Some(root));
        assert!(arena.get(root).candidate().is_none());
        assert!(arena.promote_candidate_children(root).is_none());
    }

    #[test]
    fn uncommitted_split_predicts_own_value() {
        let (arena, root) = split_root();
        assert_eq!(arena.predict_row(root, array![3.0].view())[[0]], 0.5);
    }

    #[test]
    fn committed_split_routes_rows() {
        let (mut arena, root) = split_root();
        arena.promote_candidate_children(root);
        assert_eq!(arena.predict_row(root, array![1.5].view())[[0]], 0.0);
        assert_eq!(arena.predict_row(root, array![2.0].view())[[0]], 1.0);
    }

    #[test]
    fn walk_is_pre_order() {
        let (mut arena, root) = split_root();
        let (l, r) = arena.promote_candidate_children(root).unwrap();
        assert_eq!(arena.walk(root), vec![(root, 0), (l, 1), (r, 1)]);
    }
}
