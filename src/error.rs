//! Error types for the panel-forecast library.

use thiserror::Error;

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while fitting, predicting, or persisting.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Predict or save was called before a successful fit.
    #[error("model is not fitted yet")]
    NotFitted,

    /// A series is too short for the requested operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter or input value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error (ordering, parsing).
    #[error("timestamp error: {0}")]
    Timestamp(String),

    /// Error raised by the underlying statistical model.
    #[error("model error: {0}")]
    Model(String),

    /// Worker pool construction failed.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Persisted predictor file has an unknown format version.
    #[error("unsupported predictor file version: found {found}, supported {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Filesystem error during save or load.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error during save, load, or config parsing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::NotFitted;
        assert_eq!(err.to_string(), "model is not fitted yet");

        let err = ForecastError::InsufficientData { needed: 3, got: 1 };
        assert_eq!(err.to_string(), "insufficient data: need at least 3, got 1");

        let err = ForecastError::UnsupportedVersion {
            found: 9,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported predictor file version: found 9, supported 1"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ForecastError = io.into();
        assert!(matches!(err, ForecastError::Io(_)));
    }
}
