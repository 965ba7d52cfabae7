//! Adaptive re-splitting of chunks rejected by the content filter.
//!
//! A filtered chunk is bisected and each half retried one level deeper. Recursion stops at the
//! configured depth, below the minimum splittable size, or when the chunk cannot be halved, so a
//! permanently filtered chunk costs at most `2^max_depth` leaf calls. Ordinary failures are
//! never retried here.

use crate::metrics::TranslationMetrics;
use futures_util::future::{BoxFuture, FutureExt};

use super::chunking::{PARAGRAPH_SEPARATOR, bisect, char_len};
use super::classify::ChunkTranslator;
use super::types::{ChunkOutcome, SKIPPED_PLACEHOLDER, error_placeholder};

/// Resolves a chunk to a translation or a placeholder, re-splitting on content-filter rejections.
pub struct RecoveryOrchestrator<'a> {
    translator: &'a ChunkTranslator,
    metrics: &'a TranslationMetrics,
    max_depth: usize,
    min_split_chars: usize,
    error_detail_chars: usize,
}

impl<'a> RecoveryOrchestrator<'a> {
    /// Build an orchestrator over `translator` with the given recovery bounds.
    pub fn new(
        translator: &'a ChunkTranslator,
        metrics: &'a TranslationMetrics,
        max_depth: usize,
        min_split_chars: usize,
        error_detail_chars: usize,
    ) -> Self {
        Self {
            translator,
            metrics,
            max_depth,
            min_split_chars,
            error_detail_chars,
        }
    }

    /// Translate `chunk` found at recursion `depth`; never fails.
    pub fn resolve<'b>(&'b self, chunk: &'b str, depth: usize) -> BoxFuture<'b, String> {
        async move {
            match self.translator.translate(chunk).await {
                ChunkOutcome::Translated(text) => text,
                ChunkOutcome::Failed(reason) => error_placeholder(&reason, self.error_detail_chars),
                ChunkOutcome::Filtered(_) => self.recover(chunk, depth).await,
            }
        }
        .boxed()
    }

    async fn recover(&self, chunk: &str, depth: usize) -> String {
        let chunk_chars = char_len(chunk);
        if depth >= self.max_depth || chunk_chars <= self.min_split_chars {
            return self.skip(chunk_chars, depth);
        }
        let Some((left, right)) = bisect(chunk) else {
            return self.skip(chunk_chars, depth);
        };

        self.metrics.record_split();
        tracing::debug!(
            depth,
            chunk_chars,
            left_chars = char_len(&left),
            right_chars = char_len(&right),
            "Retrying filtered chunk as two halves"
        );

        let left = self.resolve(&left, depth + 1).await;
        let right = self.resolve(&right, depth + 1).await;
        merge_recovered([left, right])
    }

    fn skip(&self, chunk_chars: usize, depth: usize) -> String {
        self.metrics.record_skipped();
        tracing::warn!(
            depth,
            chunk_chars,
            "Skipping chunk blocked by content filter"
        );
        SKIPPED_PLACEHOLDER.to_string()
    }
}

/// Join translated parts with a blank line, dropping empty parts.
pub(crate) fn join_translations<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

/// Join recovered halves with a blank line, falling back to the skip placeholder when nothing
/// usable remains.
///
/// A chunk whose every piece stayed blocked is a permanently filtered chunk and must read as a
/// single skip placeholder, not one marker per bisection leaf. Partial recoveries keep their
/// placeholders in place of the blocked pieces.
fn merge_recovered<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let joined = join_translations(parts);
    let only_skips = joined
        .split(PARAGRAPH_SEPARATOR)
        .all(|part| part.is_empty() || part == SKIPPED_PLACEHOLDER);
    if only_skips {
        SKIPPED_PLACEHOLDER.to_string()
    } else {
        joined
    }
}
