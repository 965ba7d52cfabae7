use std::env;
use std::sync::OnceLock;
use thiserror::Error;

use crate::translation::TranslatorSettings;

const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TARGET_LANGUAGE: &str = "Chinese (Traditional)";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the translator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completion backend used for translation.
    pub provider: TranslationProvider,
    /// Credential sent to the provider.
    pub api_key: String,
    /// Azure resource endpoint (Azure only).
    pub azure_endpoint: Option<String>,
    /// Azure chat deployment name (Azure only).
    pub azure_deployment: Option<String>,
    /// Azure REST API version.
    pub azure_api_version: String,
    /// Base URL for OpenAI-compatible endpoints.
    pub openai_base_url: String,
    /// Model identifier for OpenAI-compatible endpoints.
    pub openai_model: Option<String>,
    /// Language the digest is translated into.
    pub target_language: String,
    /// Optional replacement for the derived system instruction.
    pub instruction: Option<String>,
    /// Optional override for the per-chunk character budget.
    pub max_chars: Option<usize>,
    /// Optional override for the recovery depth bound.
    pub max_depth: Option<usize>,
    /// Optional override for the smallest chunk that may be re-split.
    pub min_split_chars: Option<usize>,
    /// Optional override for the hard-split backtrack guard.
    pub min_backtrack_chars: Option<usize>,
    /// Optional sampling temperature passed through to the provider.
    pub temperature: Option<f64>,
    /// Per remote call timeout in seconds.
    pub request_timeout_secs: u64,
    /// Optional override for the error description length inside placeholders.
    pub error_detail_chars: Option<usize>,
}

/// Supported chat-completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslationProvider {
    /// Azure OpenAI deployment.
    Azure,
    /// OpenAI or any OpenAI-compatible endpoint.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match load_env_optional("TRANSLATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("TRANSLATION_PROVIDER".to_string()))?,
            None => TranslationProvider::Azure,
        };

        let (api_key, azure_endpoint, azure_deployment, openai_model) = match provider {
            TranslationProvider::Azure => (
                load_env("AZURE_OPENAI_KEY")?,
                Some(load_env("AZURE_OPENAI_ENDPOINT")?),
                Some(load_env("AZURE_OPENAI_DEPLOYMENT")?),
                None,
            ),
            TranslationProvider::OpenAI => (
                load_env("OPENAI_API_KEY")?,
                None,
                None,
                Some(load_env("OPENAI_MODEL")?),
            ),
        };

        Ok(Self {
            provider,
            api_key,
            azure_endpoint,
            azure_deployment,
            azure_api_version: load_env_optional("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model,
            target_language: load_env_optional("TARGET_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string()),
            instruction: load_env_optional("TRANSLATION_INSTRUCTION"),
            max_chars: parse_optional("TRANSLATION_MAX_CHARS")?,
            max_depth: parse_optional("TRANSLATION_MAX_DEPTH")?,
            min_split_chars: parse_optional("TRANSLATION_MIN_SPLIT_CHARS")?,
            min_backtrack_chars: parse_optional("TRANSLATION_MIN_BACKTRACK_CHARS")?,
            temperature: parse_optional("TRANSLATION_TEMPERATURE")?,
            request_timeout_secs: parse_optional("TRANSLATION_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            error_detail_chars: parse_optional("TRANSLATION_ERROR_DETAIL_CHARS")?,
        })
    }

    /// Derive engine settings, applying configured overrides on top of the defaults.
    pub fn translator_settings(&self) -> TranslatorSettings {
        let defaults = TranslatorSettings::default();
        TranslatorSettings {
            target_language: self.target_language.clone(),
            instruction: self.instruction.clone(),
            max_chars: self.max_chars.unwrap_or(defaults.max_chars),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            min_split_chars: self.min_split_chars.unwrap_or(defaults.min_split_chars),
            min_backtrack_chars: self
                .min_backtrack_chars
                .unwrap_or(defaults.min_backtrack_chars),
            temperature: self.temperature,
            error_detail_chars: self
                .error_detail_chars
                .unwrap_or(defaults.error_detail_chars),
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for TranslationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "azure" | "azure-openai" | "azure_openai" => Ok(Self::Azure),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<(), ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.provider,
        target_language = %config.target_language,
        max_chars = ?config.max_chars,
        max_depth = ?config.max_depth,
        timeout_secs = config.request_timeout_secs,
        "Loaded configuration"
    );
    let _ = CONFIG.set(config);
    Ok(())
}
