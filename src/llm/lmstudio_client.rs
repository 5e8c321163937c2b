use super::base_client::{
    LLMClient, LLMError, LLMMessage, LLMResponse, ToolChoice, ToolDefinition,
};
use crate::config::RuntimeConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    /// Always present, including as an empty list on the closing round.
    tools: &'a [ToolDefinition],
    tool_choice: ToolChoice,
    temperature: f32,
    max_tokens: u32,
}

/// Client for an LM Studio (or any OpenAI-compatible) Chat Completions
/// endpoint.
#[derive(Debug)]
pub struct LmStudioClient {
    http_client: HttpClient,
    base_url: String,
    model_name: String,
    response_temperature: f32,
    max_generation_tokens: u32,
}

impl LmStudioClient {
    /// Builds a client from the runtime configuration.
    ///
    /// The API key goes into a default Authorization header; LM Studio does
    /// not check it but the wire format expects one.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, LLMError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| LLMError::ApiError(format!("Invalid API key format: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs_f64(config.request_timeout_seconds))
            .build()
            .map_err(LLMError::Network)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            response_temperature: config.response_temperature,
            max_generation_tokens: config.max_generation_tokens,
        })
    }
}

#[async_trait]
impl LLMClient for LmStudioClient {
    #[instrument(skip(self, messages, tools))]
    async fn chat(
        &self,
        messages: &[LLMMessage],
        tools: &[ToolDefinition],
        tool_choice: ToolChoice,
    ) -> Result<LLMResponse, LLMError> {
        let request_payload = ChatCompletionRequest {
            model: &self.model_name,
            messages,
            tools,
            tool_choice,
            temperature: self.response_temperature,
            max_tokens: self.max_generation_tokens,
        };

        debug!(message_count = messages.len(), tool_count = tools.len(), "Sending chat request");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&request_payload)
            .send()
            .await
            .map_err(LLMError::Network)?;

        let status = response.status();
        debug!(status = ?status, "Received chat response status");

        if !status.is_success() {
            let error_body = response.text().await.map_err(LLMError::Network)?;
            error!(error_body = %error_body, "Chat endpoint returned an error");
            return Err(LLMError::ApiError(format!(
                "API request failed with status {}: {}",
                status, error_body
            )));
        }

        let llm_response = response.json::<LLMResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to decode chat completion body");
            if e.is_decode() {
                LLMError::Decode(e.to_string())
            } else {
                LLMError::Network(e)
            }
        })?;

        Ok(llm_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> RuntimeConfig {
        RuntimeConfig {
            base_url,
            api_key: "test-key".to_string(),
            model_name: "test-model".to_string(),
            ..RuntimeConfig::default()
        }
    }

    #[tokio::test]
    async fn chat_simple_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("test-key"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "test-model",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello there!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
            })))
            .mount(&server)
            .await;

        let client = LmStudioClient::from_config(&test_config(server.uri())).unwrap();
        let messages = vec![LLMMessage::user("Hello")];
        let response = client.chat(&messages, &[], ToolChoice::Auto).await.unwrap();
        assert_eq!(
            response.first_choice_message().unwrap().content.as_deref(),
            Some("Hello there!")
        );
    }

    #[tokio::test]
    async fn chat_request_carries_model_tools_and_tool_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "tools": [],
                "tool_choice": "none"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "done"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LmStudioClient::from_config(&test_config(server.uri())).unwrap();
        let messages = vec![LLMMessage::user("wrap up")];
        client.chat(&messages, &[], ToolChoice::None).await.unwrap();
    }

    #[tokio::test]
    async fn chat_surfaces_structured_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "get_weather",
                                "arguments": "{\"location\": \"Tokyo\", \"date\": \"tomorrow\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let client = LmStudioClient::from_config(&test_config(server.uri())).unwrap();
        let messages = vec![LLMMessage::user("weather in Tokyo tomorrow?")];
        let response = client.chat(&messages, &[], ToolChoice::Auto).await.unwrap();

        let message = response.first_choice_message().unwrap();
        let tool_calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].function.name, "get_weather");
        assert_eq!(
            tool_calls[0].function.arguments,
            "{\"location\": \"Tokyo\", \"date\": \"tomorrow\"}"
        );
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let client = LmStudioClient::from_config(&test_config(server.uri())).unwrap();
        let messages = vec![LLMMessage::user("Hello")];
        let error = client
            .chat(&messages, &[], ToolChoice::Auto)
            .await
            .unwrap_err();
        match error {
            LLMError::ApiError(text) => assert!(text.contains("model not loaded")),
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }
}
