//! Error types for the mover and its configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Contract violations rejected by the mover before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoverError {
    #[error("{what} must be finite")]
    NonFinite { what: &'static str },

    #[error("delta time must not be negative, got {0}")]
    NegativeDeltaTime(f32),

    #[error("invalid movement parameters: {0}")]
    InvalidParams(String),
}

/// Errors that can occur when loading mover configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config in {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: MoverError,
    },
}

/// Rejects NaN and infinite scalars.
pub(crate) fn ensure_finite(value: f32, what: &'static str) -> Result<f32, MoverError> {
    if value.is_finite() {
        Ok(value)
    } else {
        tracing::warn!(what, value, "rejected non-finite input");
        Err(MoverError::NonFinite { what })
    }
}

/// Rejects vectors with any NaN or infinite component.
pub(crate) fn ensure_finite_slice(values: &[f32], what: &'static str) -> Result<(), MoverError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        tracing::warn!(what, ?values, "rejected non-finite input");
        Err(MoverError::NonFinite { what })
    }
}
