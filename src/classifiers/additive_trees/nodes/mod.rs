pub mod node_arena;
pub mod tree_node;

pub use node_arena::NodeArena;
pub use tree_node::{CandidateChildren, TreeNode};
