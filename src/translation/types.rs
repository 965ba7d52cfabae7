//! Settings, outcomes, and placeholder markers shared across the translation engine.

use thiserror::Error;

/// Prefix shared by every placeholder the engine substitutes for untranslated content.
pub const PLACEHOLDER_PREFIX: &str = "[Translation ";

/// Substituted for a chunk the content filter kept rejecting.
pub const SKIPPED_PLACEHOLDER: &str = "[Translation skipped: blocked by content filter]";

const ERROR_PLACEHOLDER_PREFIX: &str = "[Translation error: ";

/// Errors raised while validating engine settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Character budget per chunk must be positive.
    #[error("max_chars must be greater than zero")]
    InvalidChunkBudget,
    /// Target language and instruction were both blank.
    #[error("a target language or an explicit instruction is required")]
    MissingInstruction,
}

/// Tunables for chunking, recovery, and the remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorSettings {
    /// Language the text is translated into.
    pub target_language: String,
    /// Full system instruction; replaces the one derived from `target_language` when set.
    pub instruction: Option<String>,
    /// Upper bound on characters sent in one remote call.
    pub max_chars: usize,
    /// Maximum recursion depth when re-splitting filtered chunks.
    pub max_depth: usize,
    /// A filtered chunk must be longer than this to be split again.
    pub min_split_chars: usize,
    /// Hard splits only backtrack to whitespace found at least this far into the window.
    pub min_backtrack_chars: usize,
    /// Sampling temperature passed through unmodified.
    pub temperature: Option<f64>,
    /// Maximum characters of a failure description embedded in an error placeholder.
    pub error_detail_chars: usize,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            target_language: "Chinese (Traditional)".into(),
            instruction: None,
            max_chars: 4000,
            max_depth: 3,
            min_split_chars: 200,
            min_backtrack_chars: 20,
            temperature: None,
            error_detail_chars: 200,
        }
    }
}

impl TranslatorSettings {
    /// Reject settings the engine cannot operate with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_chars == 0 {
            return Err(SettingsError::InvalidChunkBudget);
        }
        let has_instruction = self
            .instruction
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty());
        if !has_instruction && self.target_language.trim().is_empty() {
            return Err(SettingsError::MissingInstruction);
        }
        Ok(())
    }

    /// System message sent with every chunk.
    pub fn system_prompt(&self) -> String {
        if let Some(instruction) = self
            .instruction
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return instruction.to_string();
        }
        format!(
            "Translate the following content into {}. Do not drop any sentences. \
             Preserve LaTeX/math symbols, URLs, Markdown, and fenced code exactly as-is. \
             Return only the translated text while keeping paragraph structure.",
            self.target_language.trim()
        )
    }
}

/// Classified result of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Provider returned usable text.
    Translated(String),
    /// Provider rejected the content on policy grounds; re-splitting may help.
    Filtered(String),
    /// Any other failure; never retried by re-splitting.
    Failed(String),
}

/// Build the placeholder substituted for a chunk whose remote call failed.
pub fn error_placeholder(reason: &str, max_chars: usize) -> String {
    let collapsed = reason.split_whitespace().collect::<Vec<_>>().join(" ");
    let detail = truncate_chars(&collapsed, max_chars);
    format!("{ERROR_PLACEHOLDER_PREFIX}{detail}]")
}

/// Whether `text` is one of the placeholders the engine emits.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == SKIPPED_PLACEHOLDER
        || (trimmed.starts_with(ERROR_PLACEHOLDER_PREFIX) && trimmed.ends_with(']'))
}

/// Whether `text` contains any placeholder, e.g. a partially recovered translation.
pub fn contains_placeholder(text: &str) -> bool {
    text.contains(SKIPPED_PLACEHOLDER) || text.contains(ERROR_PLACEHOLDER_PREFIX)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
