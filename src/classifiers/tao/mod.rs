pub mod node_model;
pub mod node_paths;
pub mod path_optimizer;

pub use node_model::{ModelType, NodeModel, StumpThresholdRule};
pub use path_optimizer::{PathOptimizer, PathOptimizerConfig, SweepRecord};
