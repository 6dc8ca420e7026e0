pub mod metrics;
mod report;

pub use metrics::{weighted_accuracy, weighted_r2};
pub use report::{FitReport, ReportFormat};
