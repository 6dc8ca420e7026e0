use crate::classifiers::cart::{NodeId, TreeStructure};
use ndarray::ArrayView2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Ancestors of a node with the branch taken at each, root first.
pub type NodePath = Vec<(NodeId, Direction)>;

/// Every node with its root-to-node path, depth-first from the root.
///
/// Children are pushed left then right, so right subtrees are visited first.
pub fn node_paths(tree: &TreeStructure) -> Vec<(NodeId, NodePath)> {
    let mut out = Vec::with_capacity(tree.node_count());
    if tree.node_count() == 0 {
        return out;
    }
    let mut stack: Vec<(NodeId, NodePath)> = vec![(0, Vec::new())];
    while let Some((node, path)) = stack.pop() {
        if let (Some(left), Some(right)) = (tree.children_left[node], tree.children_right[node]) {
            let mut left_path = path.clone();
            left_path.push((node, Direction::Left));
            let mut right_path = path.clone();
            right_path.push((node, Direction::Right));
            stack.push((left, left_path));
            stack.push((right, right_path));
        }
        out.push((node, path));
    }
    out
}

/// Rows of `x` that follow `path` under the tree's current splits.
pub fn rows_reaching(tree: &TreeStructure, x: ArrayView2<f64>, path: &[(NodeId, Direction)]) -> Vec<usize> {
    (0..x.nrows())
        .filter(|&r| {
            let row = x.row(r);
            path.iter().all(|&(node, direction)| {
                let left = tree.goes_left(node, row);
                match direction {
                    Direction::Left => left,
                    Direction::Right => !left,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_level_tree() -> TreeStructure {
        let mut tree = TreeStructure::new();
        let root = tree.add_leaf(0.5, 4, 4.0, vec![0.5, 0.5]);
        let left = tree.add_leaf(0.0, 2, 2.0, vec![1.0, 0.0]);
        let right = tree.add_leaf(0.5, 2, 2.0, vec![0.5, 0.5]);
        tree.set_split(root, 0, 0.5, left, right);
        let rl = tree.add_leaf(0.0, 1, 1.0, vec![0.0, 1.0]);
        let rr = tree.add_leaf(0.0, 1, 1.0, vec![1.0, 0.0]);
        tree.set_split(right, 1, 2.0, rl, rr);
        tree
    }

    #[test]
    fn right_subtrees_come_first() {
        let order: Vec<NodeId> = node_paths(&two_level_tree()).into_iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec![0, 2, 4, 3, 1]);
    }

    #[test]
    fn paths_record_every_ancestor() {
        let paths = node_paths(&two_level_tree());
        let (_, path_to_3) = paths.iter().find(|(n, _)| *n == 3).unwrap();
        assert_eq!(path_to_3, &vec![(0, Direction::Right), (2, Direction::Left)]);
        assert!(paths[0].1.is_empty());
    }

    #[test]
    fn filtering_follows_current_splits() {
        let tree = two_level_tree();
        let x = array![[0.0, 0.0], [1.0, 1.0], [1.0, 3.0], [0.2, 5.0]];
        assert_eq!(rows_reaching(&tree, x.view(), &[]), vec![0, 1, 2, 3]);
        assert_eq!(rows_reaching(&tree, x.view(), &[(0, Direction::Left)]), vec![0, 3]);
        assert_eq!(
            rows_reaching(&tree, x.view(), &[(0, Direction::Right), (2, Direction::Right)]),
            vec![2]
        );
    }
}
