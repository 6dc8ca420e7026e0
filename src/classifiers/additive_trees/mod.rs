pub mod additive_tree_grower;
pub mod multi_output_encoder;
pub mod nodes;
pub mod stump_builder;

pub use additive_tree_grower::{AdditiveTreeGrower, AdditiveTreeGrowerConfig, CommittedSplit};
pub use multi_output_encoder::MultiOutputEncoder;
