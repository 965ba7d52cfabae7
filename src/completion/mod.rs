//! Chat-completion capability used by the translation engine.
//!
//! The engine only sees the [`CompletionClient`] trait. The HTTP adapter speaks the chat
//! completions dialect shared by Azure OpenAI and OpenAI-compatible servers, and keeps the
//! provider's structured error payload intact so the engine can tell content-policy rejections
//! apart from every other failure.

use crate::config::{Config, ConfigError, TranslationProvider};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a chat-completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider could not be reached.
    #[error("Completion provider unavailable: {0}")]
    Unavailable(String),
    /// Provider did not answer within the configured timeout.
    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),
    /// Provider returned a structured error response.
    #[error("Provider returned {status}: {message} (code: {code:?}, inner code: {inner_code:?})")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Top-level `error.code` value, when present.
        code: Option<String>,
        /// Nested `error.innererror.code` value, when present.
        inner_code: Option<String>,
        /// Human readable message (or raw body when the payload was not JSON).
        message: String,
    },
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload for one chat-completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instruction sent as the system message.
    pub system_prompt: String,
    /// Text sent as the user message.
    pub user_content: String,
    /// Sampling temperature, omitted from the payload when `None`.
    pub temperature: Option<f64>,
}

/// Successful completion returned by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Assistant message text, trimmed. Empty when the provider returned no content.
    pub text: String,
    /// Completion reason reported by the provider (`stop`, `length`, `content_filter`, ...).
    pub finish_reason: Option<String>,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue a single chat-completion call.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}

/// Build the completion client selected by configuration.
pub fn build_completion_client(
    config: &Config,
) -> Result<Arc<dyn CompletionClient>, ConfigError> {
    let endpoint = match config.provider {
        TranslationProvider::Azure => {
            let base = config
                .azure_endpoint
                .clone()
                .ok_or_else(|| ConfigError::MissingVariable("AZURE_OPENAI_ENDPOINT".into()))?;
            let deployment = config
                .azure_deployment
                .clone()
                .ok_or_else(|| ConfigError::MissingVariable("AZURE_OPENAI_DEPLOYMENT".into()))?;
            ChatEndpoint::Azure {
                base_url: base,
                deployment,
                api_version: config.azure_api_version.clone(),
            }
        }
        TranslationProvider::OpenAI => ChatEndpoint::OpenAI {
            base_url: config.openai_base_url.clone(),
            model: config
                .openai_model
                .clone()
                .ok_or_else(|| ConfigError::MissingVariable("OPENAI_MODEL".into()))?,
        },
    };

    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
    let client = ChatCompletionClient::new(endpoint, config.api_key.clone(), timeout)
        .map_err(|error| ConfigError::InvalidValue(format!("HTTP client: {error}")))?;
    Ok(Arc::new(client))
}

/// Wire-level target of a [`ChatCompletionClient`].
#[derive(Debug, Clone)]
pub enum ChatEndpoint {
    /// Azure OpenAI deployment addressed by resource endpoint and deployment name.
    Azure {
        /// Resource endpoint, e.g. `https://name.openai.azure.com`.
        base_url: String,
        /// Chat deployment name.
        deployment: String,
        /// REST API version query parameter.
        api_version: String,
    },
    /// OpenAI-compatible server.
    OpenAI {
        /// Server base URL without the `/v1` suffix.
        base_url: String,
        /// Model identifier placed in the payload.
        model: String,
    },
}

impl ChatEndpoint {
    fn url(&self) -> String {
        match self {
            Self::Azure {
                base_url,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                base_url.trim_end_matches('/')
            ),
            Self::OpenAI { base_url, .. } => {
                format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
            }
        }
    }
}

/// HTTP chat-completion client for Azure OpenAI and OpenAI-compatible servers.
pub struct ChatCompletionClient {
    http: Client,
    endpoint: ChatEndpoint,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionClient {
    /// Construct a client with a per-request timeout.
    pub fn new(
        endpoint: ChatEndpoint,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("digest-translator")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            timeout,
        })
    }

    fn payload(&self, request: &CompletionRequest) -> Value {
        let mut payload = json!({
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_content },
            ],
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let ChatEndpoint::OpenAI { model, .. } = &self.endpoint {
            payload["model"] = json!(model);
        }
        payload
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.endpoint {
            ChatEndpoint::Azure { .. } => builder.header("api-key", &self.api_key),
            ChatEndpoint::OpenAI { .. } => builder.bearer_auth(&self.api_key),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "inner_error")]
    innererror: Option<InnerError>,
}

#[derive(Debug, Deserialize)]
struct InnerError {
    #[serde(default)]
    code: Option<Value>,
}

/// Error codes may arrive as strings or numbers depending on the provider.
fn code_to_string(code: Option<Value>) -> Option<String> {
    match code? {
        Value::String(value) => Some(value),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Convert a non-success response body into a structured [`CompletionError::Api`].
fn parse_api_error(status: u16, body: &str) -> CompletionError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => CompletionError::Api {
            status,
            code: code_to_string(envelope.error.code),
            inner_code: envelope
                .error
                .innererror
                .and_then(|inner| code_to_string(inner.code)),
            message: envelope
                .error
                .message
                .unwrap_or_else(|| body.trim().to_string()),
        },
        Err(_) => CompletionError::Api {
            status,
            code: None,
            inner_code: None,
            message: body.trim().to_string(),
        },
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let payload = self.payload(&request);
        let response = self
            .authorize(self.http.post(self.endpoint.url()))
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    CompletionError::Timeout(self.timeout)
                } else {
                    CompletionError::Unavailable(format!("failed to reach provider: {error}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &body));
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                CompletionError::Timeout(self.timeout)
            } else {
                CompletionError::InvalidResponse(format!("failed to decode response: {error}"))
            }
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("response had no choices".into()))?;

        Ok(Completion {
            text: choice
                .message
                .and_then(|message| message.content)
                .map(|content| content.trim().to_string())
                .unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn azure_client(base_url: String) -> ChatCompletionClient {
        ChatCompletionClient::new(
            ChatEndpoint::Azure {
                base_url,
                deployment: "gpt-4o".into(),
                api_version: "2024-02-01".into(),
            },
            "secret".into(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "Translate".into(),
            user_content: "Hello".into(),
            temperature: None,
        }
    }

    #[tokio::test]
    async fn azure_client_returns_trimmed_text_and_finish_reason() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-4o/chat/completions")
                    .query_param("api-version", "2024-02-01")
                    .header("api-key", "secret");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": "  Hallo \n" },
                        "finish_reason": "stop"
                    }]
                }));
            })
            .await;

        let completion = azure_client(server.base_url())
            .complete(request())
            .await
            .expect("completion");

        mock.assert_async().await;
        assert_eq!(completion.text, "Hallo");
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn null_content_becomes_empty_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": null },
                        "finish_reason": "content_filter"
                    }]
                }));
            })
            .await;

        let completion = azure_client(server.base_url())
            .complete(request())
            .await
            .expect("completion");

        assert!(completion.text.is_empty());
        assert_eq!(completion.finish_reason.as_deref(), Some("content_filter"));
    }

    #[tokio::test]
    async fn structured_error_codes_are_preserved() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400).json_body(json!({
                    "error": {
                        "code": "content_filter",
                        "message": "The response was filtered",
                        "innererror": { "code": "ResponsibleAIPolicyViolation" }
                    }
                }));
            })
            .await;

        let error = azure_client(server.base_url())
            .complete(request())
            .await
            .expect_err("api error");

        match error {
            CompletionError::Api {
                status,
                code,
                inner_code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("content_filter"));
                assert_eq!(inner_code.as_deref(), Some("ResponsibleAIPolicyViolation"));
                assert_eq!(message, "The response was filtered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_error_body_is_kept_as_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("upstream busy");
            })
            .await;

        let error = azure_client(server.base_url())
            .complete(request())
            .await
            .expect_err("api error");

        assert!(matches!(
            error,
            CompletionError::Api { status: 503, code: None, ref message, .. } if message == "upstream busy"
        ));
    }

    #[tokio::test]
    async fn openai_client_sends_model_temperature_and_bearer_auth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer secret")
                    .json_body_partial(r#"{ "model": "gpt-4o-mini", "temperature": 0.5 }"#);
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }]
                }));
            })
            .await;

        let client = ChatCompletionClient::new(
            ChatEndpoint::OpenAI {
                base_url: server.base_url(),
                model: "gpt-4o-mini".into(),
            },
            "secret".into(),
            Duration::from_secs(5),
        )
        .expect("client");

        let completion = client
            .complete(CompletionRequest {
                temperature: Some(0.5),
                ..request()
            })
            .await
            .expect("completion");

        mock.assert_async().await;
        assert_eq!(completion.text, "ok");
    }

    #[test]
    fn temperature_is_sent_exactly_as_configured() {
        let client = azure_client("http://localhost".into());
        let payload = client.payload(&CompletionRequest {
            temperature: Some(0.2),
            ..request()
        });

        assert_eq!(payload["temperature"].to_string(), "0.2");
        assert!(client.payload(&request()).get("temperature").is_none());
    }

    #[tokio::test]
    async fn non_binary_temperature_reaches_the_wire_unchanged() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-4o/chat/completions")
                    .body_contains(r#""temperature":0.2"#);
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }]
                }));
            })
            .await;

        let completion = azure_client(server.base_url())
            .complete(CompletionRequest {
                temperature: Some(0.2),
                ..request()
            })
            .await
            .expect("completion");

        mock.assert_async().await;
        assert_eq!(completion.text, "ok");
    }

    #[test]
    fn numeric_error_codes_are_stringified() {
        let error = parse_api_error(429, r#"{"error":{"code":429,"message":"slow down"}}"#);
        assert!(matches!(
            error,
            CompletionError::Api { code: Some(ref code), .. } if code == "429"
        ));
    }
}
