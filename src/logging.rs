//! Tracing setup for the `figtao` binary.
//!
//! Events go to stderr so that stdout only carries the fitted model and the
//! report line.

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The `--log-level` directive could not be parsed.
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber.
///
/// An explicit `level` wins over `RUST_LOG`, which wins over `info`.
pub fn init(level: Option<&str>) -> Result<(), LoggingError> {
    let env_filter = build_env_filter(level)?;
    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let subscriber = Registry::default().with(env_filter).with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)
}

fn build_env_filter(level: Option<&str>) -> Result<EnvFilter, LoggingError> {
    match level {
        Some(directive) => {
            EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
                directive: directive.to_string(),
                source,
            })
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_is_parsed() {
        let filter = build_env_filter(Some("figtao=debug")).unwrap();
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn malformed_level_is_rejected() {
        let err = build_env_filter(Some("figtao=loud")).unwrap_err();
        assert!(matches!(err, LoggingError::Filter { .. }));
        assert!(err.to_string().contains("figtao=loud"));
    }
}
