pub mod dataset;
pub mod errors;
pub mod prediction_task;

pub use dataset::Dataset;
pub use errors::{FitError, FitResult};
pub use prediction_task::PredictionTask;
