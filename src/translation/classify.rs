//! One remote call per chunk, classified into a [`ChunkOutcome`].
//!
//! Content-policy rejections are detected in two tiers. The structured tier inspects the
//! provider's error code and nested error code. The fallback tier looks for `content_filter`
//! anywhere in the error's text; it is a heuristic and can misfire on unrelated errors that
//! happen to mention the phrase.

use crate::completion::{Completion, CompletionClient, CompletionError, CompletionRequest};
use crate::metrics::TranslationMetrics;
use std::sync::Arc;

use super::types::ChunkOutcome;

/// Error codes providers use for content-policy rejections, compared case-insensitively.
pub const CONTENT_FILTER_CODES: &[&str] = &[
    "content_filter",
    "ResponsibleAIPolicyViolation",
    "content_policy_violation",
];

const CONTENT_FILTER_FINISH_REASON: &str = "content_filter";
const CONTENT_FILTER_FALLBACK_MARKER: &str = "content_filter";

/// Issues the remote call for a single chunk. Retries are the caller's concern.
pub struct ChunkTranslator {
    client: Arc<dyn CompletionClient>,
    system_prompt: String,
    temperature: Option<f64>,
    metrics: Arc<TranslationMetrics>,
}

impl ChunkTranslator {
    /// Bind a client to the system instruction and temperature used for every chunk.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        system_prompt: String,
        temperature: Option<f64>,
        metrics: Arc<TranslationMetrics>,
    ) -> Self {
        Self {
            client,
            system_prompt,
            temperature,
            metrics,
        }
    }

    /// Translate one chunk and classify the result.
    pub async fn translate(&self, chunk: &str) -> ChunkOutcome {
        self.metrics.record_remote_call();
        let result = self
            .client
            .complete(CompletionRequest {
                system_prompt: self.system_prompt.clone(),
                user_content: chunk.to_string(),
                temperature: self.temperature,
            })
            .await;

        let outcome = classify_completion(result);
        match &outcome {
            ChunkOutcome::Translated(_) => {}
            ChunkOutcome::Filtered(reason) => {
                self.metrics.record_filtered();
                tracing::warn!(
                    chunk_chars = chunk.chars().count(),
                    reason = %reason,
                    "Chunk blocked by content filter"
                );
            }
            ChunkOutcome::Failed(reason) => {
                self.metrics.record_failed();
                tracing::warn!(
                    chunk_chars = chunk.chars().count(),
                    error = %reason,
                    "Chunk translation failed"
                );
            }
        }
        outcome
    }
}

/// Map the raw result of a remote call onto the outcome taxonomy.
pub fn classify_completion(result: Result<Completion, CompletionError>) -> ChunkOutcome {
    match result {
        Ok(completion) => {
            let flagged = completion
                .finish_reason
                .as_deref()
                .is_some_and(|reason| reason.eq_ignore_ascii_case(CONTENT_FILTER_FINISH_REASON));
            if flagged {
                ChunkOutcome::Filtered("completion stopped by content filter".into())
            } else if completion.text.trim().is_empty() {
                ChunkOutcome::Filtered("provider returned an empty completion".into())
            } else {
                ChunkOutcome::Translated(completion.text.trim().to_string())
            }
        }
        Err(error) if is_content_filter_error(&error) => ChunkOutcome::Filtered(error.to_string()),
        Err(error) => ChunkOutcome::Failed(error.to_string()),
    }
}

/// Whether `error` is a content-policy rejection, by structured code or textual fallback.
pub fn is_content_filter_error(error: &CompletionError) -> bool {
    has_content_filter_code(error) || mentions_content_filter(error)
}

/// Structured tier: the provider's error code or nested error code names a content filter.
pub fn has_content_filter_code(error: &CompletionError) -> bool {
    match error {
        CompletionError::Api {
            code, inner_code, ..
        } => [code, inner_code]
            .into_iter()
            .flatten()
            .any(|value| is_content_filter_code(value)),
        _ => false,
    }
}

/// Fallback tier: case-insensitive substring match on the error text.
fn mentions_content_filter(error: &CompletionError) -> bool {
    error
        .to_string()
        .to_lowercase()
        .contains(CONTENT_FILTER_FALLBACK_MARKER)
}

fn is_content_filter_code(code: &str) -> bool {
    let code = code.trim();
    CONTENT_FILTER_CODES
        .iter()
        .any(|marker| marker.eq_ignore_ascii_case(code))
}
