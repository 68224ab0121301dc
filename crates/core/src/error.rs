//! Error types for the EOTS metrics engine.
//!
//! Top-level failures (bad inputs, bad configuration, unreachable data
//! sources) are typed so callers can tell a rejected cycle apart from a
//! partial one. Individual metric stages report through `anyhow` and are
//! folded into the bundle's error list instead.

use thiserror::Error;

/// Errors that abort a processing cycle.
#[derive(Debug, Error)]
pub enum EotsError {
    /// An input record failed schema validation.
    #[error("validation failed for {record}.{field}: {message}")]
    Validation {
        /// Record type that failed (e.g. "underlying", "contract").
        record: String,
        /// Offending field.
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external data source failed.
    #[error("data source error: {0}")]
    DataSource(String),

    /// Filesystem error at the I/O boundary.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The cycle cannot continue safely.
    #[error("metrics calculation aborted: {0}")]
    CycleAborted(String),
}

impl EotsError {
    /// Creates a validation error.
    pub fn validation(
        record: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            record: record.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error came from input validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<figment::Error> for EotsError {
    fn from(err: figment::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result alias for operations that can abort a cycle.
pub type EotsResult<T> = std::result::Result<T, EotsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_record_and_field() {
        let err = EotsError::validation("underlying", "price", "must be > 0, got -1");
        assert_eq!(
            err.to_string(),
            "validation failed for underlying.price: must be > 0, got -1"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EotsError = io.into();
        assert!(matches!(err, EotsError::Io(_)));
        assert!(!err.is_validation());
    }
}
