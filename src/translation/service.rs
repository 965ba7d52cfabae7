//! Batch entry point tying chunking, remote calls, and recovery together.

use crate::{
    completion::CompletionClient,
    metrics::{MetricsSnapshot, TranslationMetrics},
};
use std::sync::Arc;

use super::{
    chunking::{char_len, chunk_text},
    classify::ChunkTranslator,
    recovery::{RecoveryOrchestrator, join_translations},
    types::{SettingsError, TranslatorSettings, contains_placeholder},
};

/// Translates batches of plain-text documents through a chat-completion provider.
///
/// The translator holds only the shared client handle, its settings, and activity counters, so
/// one instance can be built at process start and reused for every batch. Texts and chunks are
/// processed sequentially with one outstanding remote call at a time.
pub struct Translator {
    chunk_translator: ChunkTranslator,
    settings: TranslatorSettings,
    metrics: Arc<TranslationMetrics>,
}

impl Translator {
    /// Build a translator over `client`, validating `settings` first.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        settings: TranslatorSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let metrics = Arc::new(TranslationMetrics::new());
        let chunk_translator = ChunkTranslator::new(
            client,
            settings.system_prompt(),
            settings.temperature,
            metrics.clone(),
        );
        Ok(Self {
            chunk_translator,
            settings,
            metrics,
        })
    }

    /// Translate every text in order; the output always has one entry per input.
    ///
    /// Blank texts map to empty strings without remote calls. Failures surface as placeholders
    /// inside the affected text rather than as errors.
    pub async fn translate_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        let mut translations = Vec::with_capacity(texts.len());
        for text in texts {
            translations.push(self.translate_text(text.as_ref()).await);
        }

        let with_placeholders = translations
            .iter()
            .filter(|translation| contains_placeholder(translation))
            .count();
        tracing::info!(
            texts = texts.len(),
            with_placeholders,
            "Translated batch"
        );
        translations
    }

    /// Translate a single text, chunking and recovering as needed.
    pub async fn translate_text(&self, text: &str) -> String {
        if text.trim().is_empty() {
            self.metrics.record_empty_text();
            return String::new();
        }

        let chunks = self.chunk(text);
        self.metrics.record_text(chunks.len() as u64);
        tracing::debug!(
            chunks = chunks.len(),
            total_chars = char_len(text),
            "Translating text"
        );

        let orchestrator = RecoveryOrchestrator::new(
            &self.chunk_translator,
            &self.metrics,
            self.settings.max_depth,
            self.settings.min_split_chars,
            self.settings.error_detail_chars,
        );
        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            translated.push(orchestrator.resolve(chunk, 0).await);
        }
        join_translations(translated)
    }

    /// Split `text` with the configured budget, exactly as a translation would.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(
            text,
            self.settings.max_chars,
            self.settings.min_backtrack_chars,
        )
    }

    /// Settings the translator was built with.
    pub fn settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    /// Current activity counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
