use std::path::PathBuf;

/// Errors surfaced by fitting, prediction and dataset handling.
///
/// Every failure is reported to the caller of `fit`/`predict` immediately; a
/// failed fit leaves the model unfit.
#[derive(Debug, thiserror::Error)]
pub enum FitError {
    /// Row/column counts of the supplied arrays do not line up.
    #[error("input shape mismatch: expected {expected}, got {actual}")]
    InputShape { expected: String, actual: String },

    /// Target values cannot be used as class codes.
    #[error("invalid target value {value} at row {row}, column {column}: {reason}")]
    InvalidTarget {
        row: usize,
        column: usize,
        value: f64,
        reason: &'static str,
    },

    /// A hyperparameter is out of range or names an unsupported variant.
    #[error("invalid configuration for '{param}': {reason}")]
    Configuration { param: String, reason: String },

    /// The requested operation is not implemented for this configuration.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// `predict` or a sweep was requested before `fit`.
    #[error("model has not been fitted")]
    NotFitted,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed dataset {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl FitError {
    pub fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        FitError::InputShape {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn config(param: impl Into<String>, reason: impl Into<String>) -> Self {
        FitError::Configuration {
            param: param.into(),
            reason: reason.into(),
        }
    }
}

pub type FitResult<T> = Result<T, FitError>;
