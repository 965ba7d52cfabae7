//! Translation engine: chunking, per-chunk classification, and content-filter recovery.

pub mod chunking;
pub mod classify;
pub mod recovery;
mod service;
pub mod types;

pub use service::Translator;
pub use types::{
    ChunkOutcome, PLACEHOLDER_PREFIX, SKIPPED_PLACEHOLDER, SettingsError, TranslatorSettings,
    contains_placeholder, error_placeholder, is_placeholder,
};
