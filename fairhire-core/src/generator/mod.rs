//! The decision-generator capability and its retry wrapper.
//!
//! A generator takes an ordered batch of requests and returns one raw text
//! response per request, in the same order. How it parallelises the batch
//! internally is its own business.

pub mod openai_compat;
pub mod prompt;

use crate::config::RetryConfig;
use crate::error::GeneratorError;
use crate::types::GenerationRequest;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

pub use openai_compat::OpenAiCompatGenerator;

/// Batch text generation capability.
#[async_trait]
pub trait DecisionGenerator: Send + Sync {
    /// Generate one raw response per request, order preserved.
    async fn generate(&self, batch: &[GenerationRequest]) -> Result<Vec<String>, GeneratorError>;

    /// Identifier used in logs.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Run `operation` until it succeeds, fails permanently, or `max_attempts`
/// attempts have been made. Transient faults wait for the configured delay.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T, GeneratorError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GeneratorError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_transient() || attempt >= max_attempts {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt - 1, &e);
                tracing::warn!(
                    attempt,
                    max = max_attempts,
                    backoff_ms,
                    error = %e,
                    "Retrying chunk after transient generator fault"
                );
                if backoff_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                attempt += 1;
            }
        }
    }
}

/// Delay before the next attempt, honouring a provider's retry-after hint.
fn compute_backoff(config: &RetryConfig, retry_index: u32, err: &GeneratorError) -> u64 {
    let computed = compute_scaled_backoff(config, retry_index);
    if let GeneratorError::RateLimited { retry_after_secs } = err {
        return retry_after_secs.saturating_mul(1000).max(computed);
    }
    computed
}

fn compute_scaled_backoff(config: &RetryConfig, retry_index: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(retry_index as i32);
    let cap = config.max_backoff_ms.max(config.initial_backoff_ms);
    base.min(cap as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_backoff_is_fixed() {
        let config = RetryConfig::default();
        assert_eq!(compute_scaled_backoff(&config, 0), 30_000);
        assert_eq!(compute_scaled_backoff(&config, 5), 30_000);
    }

    #[test]
    fn test_exponential_backoff_respects_cap() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 1000,
            max_backoff_ms: 3000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(compute_scaled_backoff(&config, 0), 1000);
        assert_eq!(compute_scaled_backoff(&config, 1), 2000);
        assert_eq!(compute_scaled_backoff(&config, 2), 3000);
    }

    #[test]
    fn test_rate_limit_uses_server_value() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 1000,
            backoff_multiplier: 1.0,
        };
        let err = GeneratorError::RateLimited {
            retry_after_secs: 20,
        };
        assert_eq!(compute_backoff(&config, 0, &err), 20_000);
    }

    #[test]
    fn test_huge_retry_after_saturates() {
        let err = GeneratorError::RateLimited {
            retry_after_secs: u64::MAX,
        };
        assert_eq!(
            compute_backoff(&RetryConfig::immediate(3), 0, &err),
            u64::MAX
        );
    }

    #[tokio::test]
    async fn test_with_retry_counts_attempts() {
        let config = RetryConfig::immediate(4);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(&config, |_| {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(GeneratorError::Connection {
                        message: "reset".into(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_at_bound() {
        let config = RetryConfig::immediate(3);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = with_retry(&config, |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(GeneratorError::Timeout { timeout_secs: 1 })
            }
        })
        .await;
        assert!(matches!(result, Err(GeneratorError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_permanent_error_no_retry() {
        let config = RetryConfig::immediate(10);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), _> = with_retry(&config, |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(GeneratorError::AuthFailed {
                    provider: "test".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
