use crate::config::ModelConfig;
use anyhow::{Context, Result};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reply used when no credential is configured
pub const PLACEHOLDER_REPLY: &str =
    "{\n  \"predicted_stars\": 3,\n  \"explanation\": \"API key missing, placeholder response.\"\n}";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Api(#[from] OpenAIError),

    #[error("model returned no content")]
    EmptyReply,
}

/// Text-in, text-out access to a language model
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Send one prompt and return the raw reply text
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;

    /// Short description for logs and reports
    fn describe(&self) -> String;
}

/// Chat-completion adapter for any OpenAI-compatible endpoint
pub struct OpenAiCompatibleModel {
    client: Client<OpenAIConfig>,
    config: ModelConfig,
}

impl OpenAiCompatibleModel {
    /// Create the client for the given endpoint and credential
    pub fn new(config: ModelConfig, api_key: String) -> Result<Self> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_endpoint);

        let mut http = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            http = http.timeout(Duration::from_secs(secs));
        }
        let http = http.build().context("Failed to build HTTP client")?;

        // A zero retry window makes every call a single HTTP request, 429s included.
        let no_retry = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http)
            .with_backoff(no_retry);

        Ok(Self { client, config })
    }

    fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system_prompt) = &self.config.system_prompt {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt.clone())
                    .build()?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into(),
        );

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            request.temperature(temperature as f32);
        }
        request.build()
    }
}

#[async_trait]
impl ReviewModel for OpenAiCompatibleModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let request = self.build_request(prompt)?;
        let response = self.client.chat().create(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "model call finished"
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyReply)
    }

    fn describe(&self) -> String {
        format!("{} at {}", self.config.model, self.config.api_endpoint)
    }
}

/// Offline adapter that answers every prompt with the same reply
pub struct StubModel {
    reply: String,
}

impl StubModel {
    pub fn new() -> Self {
        Self::with_reply(PLACEHOLDER_REPLY)
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for StubModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewModel for StubModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Ok(self.reply.clone())
    }

    fn describe(&self) -> String {
        "offline stub".to_string()
    }
}

/// Pick the adapter for a run: the real endpoint when a credential is
/// available, the placeholder stub otherwise.
pub fn build_model(config: &ModelConfig, api_key: Option<String>) -> Result<Arc<dyn ReviewModel>> {
    match api_key {
        Some(key) => {
            let model = OpenAiCompatibleModel::new(config.clone(), key)?;
            info!(model = %model.describe(), "using remote model");
            Ok(Arc::new(model))
        }
        None => {
            warn!(
                env_var = %config.env_var_api_key,
                "API key not configured, model calls will return placeholder replies"
            );
            Ok(Arc::new(StubModel::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_reply;

    fn test_config(endpoint: &str) -> ModelConfig {
        ModelConfig {
            api_endpoint: endpoint.to_string(),
            ..ModelConfig::default()
        }
    }

    fn completion_body(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gemini-2.0-flash",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 20, "total_tokens": 32 }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_stub_returns_parsable_placeholder() {
        let stub = StubModel::new();
        let reply = stub.complete("anything").await.unwrap();
        assert_eq!(reply, PLACEHOLDER_REPLY);

        let parsed = parse_reply(&reply);
        assert!(parsed.is_valid);
        assert_eq!(parsed.predicted_stars, Some(3));
    }

    #[tokio::test]
    async fn test_stub_with_custom_reply() {
        let stub = StubModel::with_reply("I think 5 stars");
        assert_eq!(stub.complete("prompt").await.unwrap(), "I think 5 stars");
    }

    #[test]
    fn test_build_model_without_key_uses_stub() {
        let model = build_model(&ModelConfig::default(), None).unwrap();
        assert_eq!(model.describe(), "offline stub");
    }

    #[test]
    fn test_build_model_with_key_uses_remote() {
        let model = build_model(&ModelConfig::default(), Some("secret".to_string())).unwrap();
        assert!(model.describe().contains("gemini-2.0-flash"));
    }

    #[test]
    fn test_build_request_includes_system_prompt_and_temperature() {
        let mut config = test_config("http://localhost");
        config.system_prompt = Some("Be terse.".to_string());
        config.temperature = Some(0.2);
        let model = OpenAiCompatibleModel::new(config, "key".to_string()).unwrap();

        let request = model.build_request("Rate this").unwrap();
        assert_eq!(request.model, "gemini-2.0-flash");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn test_build_request_user_message_only_by_default() {
        let model = OpenAiCompatibleModel::new(test_config("http://localhost"), "key".to_string()).unwrap();
        let request = model.build_request("Rate this").unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, None);
        assert_eq!(request.max_tokens.map(u32::from), Some(1000));
    }

    #[test]
    fn test_build_request_keeps_large_max_tokens() {
        let mut config = test_config("http://localhost");
        config.max_tokens = u16::MAX;
        let model = OpenAiCompatibleModel::new(config, "key".to_string()).unwrap();
        let request = model.build_request("Rate this").unwrap();
        assert_eq!(request.max_tokens.map(u32::from), Some(65535));
    }

    #[tokio::test]
    async fn test_remote_model_returns_reply_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("{\"predicted_stars\": 4, \"explanation\": \"good\"}"))
            .expect(1)
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(test_config(&server.url()), "test-key".to_string()).unwrap();
        let reply = model.complete("Rate this review").await.unwrap();

        assert_eq!(reply, "{\"predicted_stars\": 4, \"explanation\": \"good\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_model_empty_content_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("   "))
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(test_config(&server.url()), "key".to_string()).unwrap();
        let err = model.complete("Rate this review").await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyReply));
    }

    #[tokio::test]
    async fn test_remote_model_auth_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error": {"message": "API key not valid", "type": "invalid_request_error", "param": null, "code": null}}"#,
            )
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(test_config(&server.url()), "bad".to_string()).unwrap();
        let err = model.complete("Rate this review").await.unwrap_err();
        assert!(matches!(err, ModelError::Api(_)));
    }

    #[tokio::test]
    async fn test_remote_model_does_not_retry_rate_limits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error": {"message": "Resource exhausted", "type": "rate_limit_error", "param": null, "code": null}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let model = OpenAiCompatibleModel::new(test_config(&server.url()), "key".to_string()).unwrap();
        assert!(model.complete("Rate this review").await.is_err());
        mock.assert_async().await;
    }
}
