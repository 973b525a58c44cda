//! Error types for the fairhire-core crate.
//!
//! Uses `thiserror` for the public error surface. `PipelineError` aborts the
//! group in progress; `GeneratorError` is what the decision generator signals
//! and is only promoted to a `PipelineError` once retries are exhausted or the
//! fault is permanent.

use thiserror::Error;

/// Top-level error type for audit pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Misconfiguration that makes the run meaningless (e.g. missing prior results).
    #[error("Configuration error: {0}")]
    FatalConfig(String),

    #[error("Insufficient data: {available} eligible candidates, {required} required")]
    InsufficientData { available: usize, required: usize },

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Artifact error in {path}: {message}")]
    Artifact { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn fatal_config(msg: impl Into<String>) -> Self {
        Self::FatalConfig(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn artifact(path: impl std::fmt::Display, msg: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.to_string(),
            message: msg.into(),
        }
    }
}

/// Faults signalled by a decision generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("API request failed: {message}")]
    Api { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Generator returned {got} responses for a batch of {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

impl GeneratorError {
    /// Whether the fault is transient and the same chunk may be resubmitted.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Connection { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            GeneratorError::RateLimited {
                retry_after_secs: 30
            }
            .is_transient()
        );
        assert!(GeneratorError::Timeout { timeout_secs: 60 }.is_transient());
        assert!(
            GeneratorError::Connection {
                message: "reset".into()
            }
            .is_transient()
        );
        assert!(
            !GeneratorError::AuthFailed {
                provider: "openai".into()
            }
            .is_transient()
        );
        assert!(
            !GeneratorError::LengthMismatch {
                expected: 4,
                got: 3
            }
            .is_transient()
        );
    }

    #[test]
    fn test_generator_error_promotes() {
        let err: PipelineError = GeneratorError::Timeout { timeout_secs: 5 }.into();
        assert!(matches!(err, PipelineError::Generator(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = PipelineError::InsufficientData {
            available: 10,
            required: 450,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: 10 eligible candidates, 450 required"
        );
    }
}
