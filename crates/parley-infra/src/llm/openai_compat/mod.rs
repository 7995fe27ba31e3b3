//! OpenAI-compatible completion provider.
//!
//! One [`OpenAiCompatibleProvider`] serves any endpoint that speaks the
//! OpenAI chat completions protocol; the base URL and model come from
//! configuration. Uses [`async_openai`] for request/response handling.

pub mod config;

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
};
use async_openai::Client;
use secrecy::ExposeSecret;
use tracing::debug;

use parley_core::llm::provider::LlmProvider;
use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason, Usage,
};

use self::config::OpenAiCompatConfig;

/// Provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    ///
    /// Request-level model and sampling values win over the configured ones.
    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let messages = request
            .messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => {
                    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    })
                }
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                                msg.content.clone(),
                            )),
                            refusal: None,
                            name: None,
                            audio: None,
                            tool_calls: None,
                            function_call: None,
                        },
                    )
                }
            })
            .collect();

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: request.max_tokens.or(self.max_tokens),
            temperature: request.temperature.or(self.temperature).map(|t| t as f32),
            ..Default::default()
        }
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request);
        debug!(
            provider = %self.provider_name,
            model = %oai_request.model,
            messages = oai_request.messages.len(),
            "Sending chat completion"
        );

        let chat = self.client.chat();
        let call = chat.create(oai_request);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LlmError::Timeout(limit.as_secs()))?,
            None => call.await,
        }
        .map_err(map_openai_error)?;

        let choice = response.choices.first().ok_or(LlmError::EmptyReply)?;
        let content = match choice.message.content.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => return Err(LlmError::EmptyReply),
        };

        let stop_reason = choice
            .finish_reason
            .as_ref()
            .map(|fr| match fr {
                FinishReason::Length => StopReason::MaxTokens,
                FinishReason::ContentFilter => StopReason::ContentFilter,
                _ => StopReason::EndTurn,
            })
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                LlmError::ContextLengthExceeded
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(503) | Some(529) => LlmError::Overloaded(err.to_string()),
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::llm::Message;
    use secrecy::SecretString;

    fn openai_config(model: &str) -> OpenAiCompatConfig {
        OpenAiCompatConfig {
            provider_name: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: SecretString::from("sk-test"),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            timeout: Some(Duration::from_secs(60)),
        }
    }

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(openai_config("gpt-3.5-turbo"))
    }

    fn message(role: MessageRole, content: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_provider_exposes_config() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model, "gpt-3.5-turbo");
        assert_eq!(provider.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_build_request_keeps_transcript_order() {
        let provider = provider();
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![
                message(MessageRole::System, "persona"),
                message(MessageRole::User, "hello"),
                message(MessageRole::Assistant, "salut!"),
                message(MessageRole::User, "encore"),
            ],
            max_tokens: Some(128),
            temperature: Some(0.7),
        };

        let oai_req = provider.build_request(&request);
        assert_eq!(oai_req.model, "gpt-3.5-turbo");
        assert_eq!(oai_req.messages.len(), 4);
        assert!(matches!(
            oai_req.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            oai_req.messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert_eq!(oai_req.max_completion_tokens, Some(128));
        assert!(oai_req.stream.is_none());
    }

    #[test]
    fn test_build_request_falls_back_to_configured_values() {
        let mut config = openai_config("gpt-4o-mini");
        config.max_tokens = Some(64);
        config.temperature = Some(0.5);
        let provider = OpenAiCompatibleProvider::new(config);

        let request = CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![message(MessageRole::User, "hi")],
            max_tokens: None,
            temperature: None,
        };
        let oai_req = provider.build_request(&request);
        assert_eq!(oai_req.model, "gpt-4o");
        assert_eq!(oai_req.max_completion_tokens, Some(64));
        assert_eq!(oai_req.temperature, Some(0.5));
    }

    #[test]
    fn test_map_openai_error_api_auth() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: Some("invalid_api_key".to_string()),
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[test]
    fn test_map_openai_error_rate_limit() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Rate limit exceeded".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn test_map_openai_error_context_length() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "This model's maximum context length is 4097 tokens".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: Some("messages".to_string()),
            code: Some("context_length_exceeded".to_string()),
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, LlmError::ContextLengthExceeded));
    }

    #[test]
    fn test_map_openai_error_invalid_argument() {
        use async_openai::error::OpenAIError;
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_provider_error() {
        let mut config = openai_config("gpt-3.5-turbo");
        // Nothing listens on port 9 locally.
        config.base_url = "http://127.0.0.1:9/v1".to_string();
        config.timeout = Some(Duration::from_secs(5));
        let provider = OpenAiCompatibleProvider::new(config);

        let request = CompletionRequest {
            model: String::new(),
            messages: vec![message(MessageRole::User, "hi")],
            max_tokens: None,
            temperature: None,
        };
        let err = provider.complete(&request).await.unwrap_err();
        assert!(matches!(
            err,
            LlmError::Provider { .. } | LlmError::Timeout(_)
        ));
    }
}
