//! Chunked, retrying, checkpointed execution of generation requests.
//!
//! Rows are submitted one chunk at a time; a chunk is never split and never
//! resubmitted once it has succeeded. After every successful chunk the full
//! accumulated result list is rewritten to the checkpoint, so a crash loses at
//! most the chunk in flight.

use crate::config::{GenerationConfig, RetryConfig};
use crate::error::{GeneratorError, PipelineResult};
use crate::generator::{DecisionGenerator, with_retry};
use crate::persistence;
use crate::recovery::{RawResult, recover_response};
use crate::types::GenerationRequest;
use std::path::Path;
use tracing::{debug, info};

/// Drives a [`DecisionGenerator`] over an ordered request sequence.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    batch_size: usize,
    retry: RetryConfig,
    progress_every: usize,
}

impl BatchExecutor {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            retry: config.retry.clone(),
            progress_every: config.progress_every,
        }
    }

    pub fn with_policy(batch_size: usize, retry: RetryConfig) -> Self {
        Self {
            batch_size: batch_size.max(1),
            retry,
            progress_every: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Generate one result per request, in request order.
    ///
    /// A fault that is permanent, or still transient after the retry bound,
    /// aborts the whole sequence. Results of chunks completed before the fault
    /// remain in the checkpoint.
    pub async fn execute(
        &self,
        generator: &dyn DecisionGenerator,
        requests: &[GenerationRequest],
        checkpoint: Option<&Path>,
    ) -> PipelineResult<Vec<RawResult>> {
        let total = requests.len();
        let mut results: Vec<RawResult> = Vec::with_capacity(total);

        for (chunk_idx, chunk) in requests.chunks(self.batch_size).enumerate() {
            let responses = with_retry(&self.retry, |attempt| async move {
                debug!(
                    generator = generator.name(),
                    chunk = chunk_idx,
                    attempt,
                    rows = chunk.len(),
                    "Submitting chunk"
                );
                let responses = generator.generate(chunk).await?;
                if responses.len() != chunk.len() {
                    return Err(GeneratorError::LengthMismatch {
                        expected: chunk.len(),
                        got: responses.len(),
                    });
                }
                Ok(responses)
            })
            .await?;

            let before = results.len();
            results.extend(responses.iter().map(|raw| recover_response(raw)));

            if let Some(path) = checkpoint {
                persistence::atomic_write_jsonl(path, &results)?;
            }

            let every = self.progress_every;
            if every > 0 && results.len() / every > before / every {
                info!(done = results.len(), total, "Generation progress");
            }
        }

        Ok(results)
    }
}
