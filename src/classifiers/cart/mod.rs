pub mod decision_tree;
pub mod split_criteria;
pub mod stump_fitter;
pub mod tree_structure;

pub use decision_tree::{DecisionTree, DecisionTreeParams, TreeTargets};
pub use stump_fitter::{CartStumpFitter, StumpFitter};
pub use tree_structure::{NodeId, TREE_UNDEFINED, TreeStructure};
