pub mod additive_trees;
pub mod cart;
pub mod learner;
pub mod linear;
pub mod tao;

pub use additive_trees::{AdditiveTreeGrower, AdditiveTreeGrowerConfig};
pub use learner::Learner;
pub use tao::{PathOptimizer, PathOptimizerConfig};
