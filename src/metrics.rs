use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing translation activity.
#[derive(Default)]
pub struct TranslationMetrics {
    texts_translated: AtomicU64,
    empty_texts: AtomicU64,
    chunks_produced: AtomicU64,
    remote_calls: AtomicU64,
    filtered_outcomes: AtomicU64,
    failed_outcomes: AtomicU64,
    skipped_chunks: AtomicU64,
    recovery_splits: AtomicU64,
}

impl TranslationMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-empty text and the number of chunks the chunker produced for it.
    pub fn record_text(&self, chunk_count: u64) {
        self.texts_translated.fetch_add(1, Ordering::Relaxed);
        self.chunks_produced
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a blank text that was passed through without remote calls.
    pub fn record_empty_text(&self) {
        self.empty_texts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one outbound completion call.
    pub fn record_remote_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call classified as content-filtered.
    pub fn record_filtered(&self) {
        self.filtered_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call classified as a non-retryable failure.
    pub fn record_failed(&self) {
        self.failed_outcomes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk replaced by the skip placeholder.
    pub fn record_skipped(&self) {
        self.skipped_chunks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a filtered chunk being bisected for another attempt.
    pub fn record_split(&self) {
        self.recovery_splits.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            texts_translated: self.texts_translated.load(Ordering::Relaxed),
            empty_texts: self.empty_texts.load(Ordering::Relaxed),
            chunks_produced: self.chunks_produced.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            filtered_outcomes: self.filtered_outcomes.load(Ordering::Relaxed),
            failed_outcomes: self.failed_outcomes.load(Ordering::Relaxed),
            skipped_chunks: self.skipped_chunks.load(Ordering::Relaxed),
            recovery_splits: self.recovery_splits.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of translation counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Non-empty texts sent through the chunker.
    pub texts_translated: u64,
    /// Blank texts answered with an empty string.
    pub empty_texts: u64,
    /// Chunks produced by the chunker, before any recovery splits.
    pub chunks_produced: u64,
    /// Completion calls issued, including recovery attempts.
    pub remote_calls: u64,
    /// Calls classified as content-filtered.
    pub filtered_outcomes: u64,
    /// Calls classified as non-retryable failures.
    pub failed_outcomes: u64,
    /// Chunks replaced by the skip placeholder.
    pub skipped_chunks: u64,
    /// Filtered chunks that were bisected and retried.
    pub recovery_splits: u64,
}
